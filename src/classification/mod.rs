//! Time series classifiers
//!
//! - `MuseClassifier`: multivariate bag-of-words classification over
//!   per-dimension, per-window symbolic words

pub mod muse;

pub use muse::MuseClassifier;
