//! Linear models over sparse bag-of-words features

use crate::dictionary::{Bag, EncodedWord};
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Classifier trained on merged bags of encoded words
pub trait BagClassifier: Send + Sync {
    /// Fit on one bag per instance; `labels` are class indices below `n_classes`
    fn fit(&mut self, bags: &[Bag], labels: &[usize], n_classes: usize) -> Result<()>;

    /// Class probabilities, one row per bag
    fn predict_proba(&self, bags: &[Bag]) -> Result<Array2<f64>>;

    /// Most probable class index per bag
    fn predict(&self, bags: &[Bag]) -> Result<Vec<usize>> {
        let proba = self.predict_proba(bags)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (i, &p)| if p > best.1 { (i, p) } else { best })
                    .0
            })
            .collect())
    }

    fn is_fitted(&self) -> bool;

    /// Number of distinct features seen during fit
    fn vocabulary_size(&self) -> usize;
}

/// Sparse row: (feature index, value) sorted by feature index
pub type SparseRow = Vec<(usize, f64)>;

/// Maps encoded words to feature columns.
///
/// The vocabulary is frozen by `fit`; words unseen at fit time are dropped
/// by `transform`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictVectorizer {
    vocabulary: HashMap<EncodedWord, usize>,
}

impl DictVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the vocabulary from every word in `bags`, columns in ascending word order
    pub fn fit(&mut self, bags: &[Bag]) -> &mut Self {
        let mut words: Vec<EncodedWord> = bags.iter().flat_map(|b| b.iter().map(|(w, _)| w)).collect();
        words.sort_unstable();
        words.dedup();

        self.vocabulary = words.into_iter().enumerate().map(|(i, w)| (w, i)).collect();
        self
    }

    pub fn transform(&self, bags: &[Bag]) -> Vec<SparseRow> {
        bags.iter()
            .map(|bag| {
                let mut row: SparseRow = bag
                    .iter()
                    .filter_map(|(w, c)| self.vocabulary.get(&w).map(|&i| (i, c as f64)))
                    .collect();
                row.sort_unstable_by_key(|&(i, _)| i);
                row
            })
            .collect()
    }

    pub fn fit_transform(&mut self, bags: &[Bag]) -> Vec<SparseRow> {
        self.fit(bags);
        self.transform(bags)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn column(&self, word: EncodedWord) -> Option<usize> {
        self.vocabulary.get(&word).copied()
    }
}

/// Settings for [`LogisticRegression`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// L2 regularisation strength
    pub alpha: f64,
    /// Maximum gradient descent iterations
    pub max_iter: usize,
    /// Stop when the gradient norm falls below this
    pub tol: f64,
    /// Whether to fit per-class intercepts
    pub fit_intercept: bool,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            alpha: 1e-3,
            max_iter: 5000,
            tol: 1e-6,
            fit_intercept: true,
        }
    }
}

impl LogisticConfig {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.alpha >= 0.0) {
            return Err(KolosalError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        if self.max_iter == 0 {
            return Err(KolosalError::InvalidParameter {
                name: "max_iter".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Multinomial logistic regression with L2 penalty on sparse bag features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub config: LogisticConfig,
    vectorizer: DictVectorizer,
    /// Weights, one row per class
    coefficients: Option<Array2<f64>>,
    intercepts: Option<Array1<f64>>,
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticConfig::default())
    }
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            vectorizer: DictVectorizer::new(),
            coefficients: None,
            intercepts: None,
            n_iter: 0,
        }
    }

    /// Gradient descent iterations run by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn coefficients(&self) -> Option<&Array2<f64>> {
        self.coefficients.as_ref()
    }

    fn logits(row: &SparseRow, weights: &Array2<f64>, intercepts: &Array1<f64>) -> Array1<f64> {
        let mut z = intercepts.clone();
        for (k, zk) in z.iter_mut().enumerate() {
            for &(j, v) in row {
                *zk += weights[[k, j]] * v;
            }
        }
        z
    }

    /// Numerically stable softmax, in place
    fn softmax(z: &mut Array1<f64>) {
        let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        z.mapv_inplace(|v| (v - max).exp());
        let sum = z.sum();
        z.mapv_inplace(|v| v / sum);
    }
}

impl BagClassifier for LogisticRegression {
    fn fit(&mut self, bags: &[Bag], labels: &[usize], n_classes: usize) -> Result<()> {
        let n_samples = bags.len();
        if n_samples != labels.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("labels length = {}", n_samples),
                actual: format!("labels length = {}", labels.len()),
            });
        }
        if n_samples == 0 {
            return Err(KolosalError::TrainingError("Empty dataset".to_string()));
        }
        if n_classes < 2 {
            return Err(KolosalError::TrainingError(format!(
                "need at least 2 classes, got {}",
                n_classes
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(KolosalError::TrainingError(format!(
                "label {} out of range for {} classes",
                bad, n_classes
            )));
        }
        self.config.validate()?;

        let rows = self.vectorizer.fit_transform(bags);
        let n_features = self.vectorizer.vocabulary_size();
        let n = n_samples as f64;
        let alpha = self.config.alpha;

        // Step 1/L with L bounding the curvature of the mean softmax loss
        let max_sq_norm = rows
            .iter()
            .map(|r| r.iter().map(|&(_, v)| v * v).sum::<f64>())
            .fold(0.0, f64::max);
        let intercept_term = if self.config.fit_intercept { 1.0 } else { 0.0 };
        let lipschitz = 0.5 * (max_sq_norm + intercept_term) + alpha;
        let step = if lipschitz > 0.0 { 1.0 / lipschitz } else { 1.0 };

        let mut weights = Array2::<f64>::zeros((n_classes, n_features));
        let mut intercepts = Array1::<f64>::zeros(n_classes);
        let mut grad_w = Array2::<f64>::zeros((n_classes, n_features));
        let mut grad_b = Array1::<f64>::zeros(n_classes);

        self.n_iter = 0;
        for _ in 0..self.config.max_iter {
            self.n_iter += 1;
            grad_w.fill(0.0);
            grad_b.fill(0.0);

            for (row, &label) in rows.iter().zip(labels) {
                let mut p = Self::logits(row, &weights, &intercepts);
                Self::softmax(&mut p);
                p[label] -= 1.0;

                for (k, &err) in p.iter().enumerate() {
                    grad_b[k] += err;
                    for &(j, v) in row {
                        grad_w[[k, j]] += err * v;
                    }
                }
            }

            grad_w.mapv_inplace(|g| g / n);
            grad_w.scaled_add(alpha, &weights);
            grad_b.mapv_inplace(|g| g / n);
            if !self.config.fit_intercept {
                grad_b.fill(0.0);
            }

            let grad_norm = (grad_w.iter().map(|g| g * g).sum::<f64>()
                + grad_b.iter().map(|g| g * g).sum::<f64>())
            .sqrt();
            if !grad_norm.is_finite() {
                return Err(KolosalError::TrainingError(
                    "gradient diverged during logistic regression fit".to_string(),
                ));
            }
            if grad_norm < self.config.tol {
                break;
            }

            weights.scaled_add(-step, &grad_w);
            intercepts.scaled_add(-step, &grad_b);
        }

        self.coefficients = Some(weights);
        self.intercepts = Some(intercepts);
        Ok(())
    }

    fn predict_proba(&self, bags: &[Bag]) -> Result<Array2<f64>> {
        let (weights, intercepts) = match (&self.coefficients, &self.intercepts) {
            (Some(w), Some(b)) => (w, b),
            _ => return Err(KolosalError::ModelNotFitted),
        };

        let rows = self.vectorizer.transform(bags);
        let mut proba = Array2::zeros((rows.len(), weights.nrows()));
        for (i, row) in rows.iter().enumerate() {
            let mut p = Self::logits(row, weights, intercepts);
            Self::softmax(&mut p);
            proba.row_mut(i).assign(&p);
        }
        Ok(proba)
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    fn vocabulary_size(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }
}
