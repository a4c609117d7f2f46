//! Preprocessing module
//!
//! Supervised word selection applied to bags of raw words before they are
//! encoded and merged.

pub mod feature_selection;

pub use feature_selection::{Chi2Test, RelevanceFilter, RelevanceTest, RetainedWords};
