//! Multivariate panel of time series

use crate::error::{KolosalError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A batch of multivariate time series.
///
/// Storage is dimension-major: `columns[d][i]` is the series of instance `i`
/// in dimension `d`. Dimension indices follow the order of `names` and are
/// the indices used for word encoding, so fit and predict must present the
/// dimensions in the same order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    names: Vec<String>,
    columns: Vec<Vec<Array1<f64>>>,
}

impl Panel {
    /// Create a panel from dimension-major columns
    pub fn new(names: Vec<String>, columns: Vec<Vec<Array1<f64>>>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} dimension columns", names.len()),
                actual: format!("{} dimension columns", columns.len()),
            });
        }

        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(KolosalError::InvalidInput(format!(
                    "duplicate dimension name '{}'",
                    name
                )));
            }
        }

        if let Some(first) = columns.first() {
            let n_instances = first.len();
            for (name, column) in names.iter().zip(columns.iter()) {
                if column.len() != n_instances {
                    return Err(KolosalError::ShapeError {
                        expected: format!("{} instances in dimension '{}'", n_instances, name),
                        actual: format!("{} instances", column.len()),
                    });
                }
            }
        }

        Ok(Self { names, columns })
    }

    /// Create a panel from instance-major data: `instances[i][d]`
    pub fn from_instances(names: Vec<String>, instances: Vec<Vec<Array1<f64>>>) -> Result<Self> {
        let n_dims = names.len();
        let mut columns: Vec<Vec<Array1<f64>>> = (0..n_dims)
            .map(|_| Vec::with_capacity(instances.len()))
            .collect();

        for (i, instance) in instances.into_iter().enumerate() {
            if instance.len() != n_dims {
                return Err(KolosalError::ShapeError {
                    expected: format!("{} dimensions for instance {}", n_dims, i),
                    actual: format!("{} dimensions", instance.len()),
                });
            }
            for (column, series) in columns.iter_mut().zip(instance) {
                column.push(series);
            }
        }

        Self::new(names, columns)
    }

    /// Create a univariate panel with a single dimension
    pub fn univariate(name: impl Into<String>, series: Vec<Array1<f64>>) -> Result<Self> {
        Self::new(vec![name.into()], vec![series])
    }

    /// Number of instances
    pub fn n_instances(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of dimensions
    pub fn n_dimensions(&self) -> usize {
        self.names.len()
    }

    /// Dimension names in index order
    pub fn dimension_names(&self) -> &[String] {
        &self.names
    }

    /// All series of one dimension
    pub fn dimension(&self, index: usize) -> Option<&[Array1<f64>]> {
        self.columns.get(index).map(|c| c.as_slice())
    }

    /// Shortest series length in a dimension
    pub fn series_length(&self, index: usize) -> Option<usize> {
        self.columns
            .get(index)
            .map(|c| c.iter().map(|s| s.len()).min().unwrap_or(0))
    }

    /// Append a dimension after the existing ones
    pub fn push_dimension(&mut self, name: impl Into<String>, series: Vec<Array1<f64>>) -> Result<()> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(KolosalError::InvalidInput(format!(
                "duplicate dimension name '{}'",
                name
            )));
        }
        if !self.columns.is_empty() && series.len() != self.n_instances() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} instances", self.n_instances()),
                actual: format!("{} instances", series.len()),
            });
        }
        self.names.push(name);
        self.columns.push(series);
        Ok(())
    }

    /// Iterate over `(index, name, series)` for every dimension
    pub fn dimensions(&self) -> impl Iterator<Item = (usize, &str, &[Array1<f64>])> {
        self.names
            .iter()
            .zip(self.columns.iter())
            .enumerate()
            .map(|(i, (name, column))| (i, name.as_str(), column.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_instances_is_dimension_major() {
        let panel = Panel::from_instances(
            vec!["a".into(), "b".into()],
            vec![
                vec![array![1.0, 2.0, 3.0], array![9.0, 8.0]],
                vec![array![4.0, 5.0], array![7.0, 6.0, 5.0]],
            ],
        )
        .unwrap();

        assert_eq!(panel.n_instances(), 2);
        assert_eq!(panel.n_dimensions(), 2);
        assert_eq!(panel.dimension(1).unwrap()[0], array![9.0, 8.0]);
        assert_eq!(panel.series_length(0), Some(2));
        assert_eq!(panel.series_length(1), Some(2));
        assert_eq!(panel.series_length(2), None);
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let result = Panel::new(
            vec!["a".into(), "b".into()],
            vec![vec![array![1.0]], vec![array![1.0], array![2.0]]],
        );
        assert!(matches!(result, Err(KolosalError::ShapeError { .. })));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let result = Panel::new(
            vec!["a".into(), "a".into()],
            vec![vec![array![1.0]], vec![array![1.0]]],
        );
        assert!(matches!(result, Err(KolosalError::InvalidInput(_))));
    }

    #[test]
    fn test_push_dimension() {
        let mut panel = Panel::univariate("x", vec![array![1.0, 2.0], array![3.0, 4.0]]).unwrap();
        panel.push_dimension("y", vec![array![0.0], array![1.0]]).unwrap();
        assert_eq!(panel.dimension_names(), &["x".to_string(), "y".to_string()]);
        assert!(panel.push_dimension("z", vec![array![0.0]]).is_err());
        assert!(panel.push_dimension("y", vec![array![0.0], array![1.0]]).is_err());
    }
}
