//! Time series transformations

use super::Panel;
use crate::error::{KolosalError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Differencing augmenter.
///
/// Appends, for every dimension `D`, a dimension `D_diff` holding the
/// first-order differences of its series. The original dimensions are left
/// untouched and keep their indices; each differenced series is one sample
/// shorter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Differencer;

impl Differencer {
    /// Suffix appended to the source dimension name
    pub const SUFFIX: &'static str = "_diff";

    /// First-order differences of a single series
    pub fn transform(&self, series: &Array1<f64>) -> Array1<f64> {
        diff_once(series)
    }

    /// Return a new panel with one differenced dimension appended per dimension
    pub fn augment(&self, panel: &Panel) -> Result<Panel> {
        let mut augmented = panel.clone();
        for (_, name, column) in panel.dimensions() {
            let diffed: Vec<Array1<f64>> = column.iter().map(|s| self.transform(s)).collect();
            let diff_name = format!("{}{}", name, Self::SUFFIX);
            augmented.push_dimension(diff_name, diffed).map_err(|e| {
                KolosalError::InvalidInput(format!("cannot add differences for '{}': {}", name, e))
            })?;
        }
        Ok(augmented)
    }
}

fn diff_once(series: &Array1<f64>) -> Array1<f64> {
    let n = series.len();
    if n <= 1 {
        return Array1::zeros(0);
    }

    let mut result = Array1::zeros(n - 1);
    for i in 1..n {
        result[i - 1] = series[i] - series[i - 1];
    }
    result
}
