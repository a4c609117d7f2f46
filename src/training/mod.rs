//! Model training module
//!
//! Provides the classifier trained on merged bags of encoded words:
//! - `BagClassifier` trait for pluggable bag-of-words classifiers
//! - `DictVectorizer` mapping encoded words to feature columns
//! - L2-regularised multinomial logistic regression

pub mod linear_models;

pub use linear_models::{BagClassifier, DictVectorizer, LogisticConfig, LogisticRegression, SparseRow};
