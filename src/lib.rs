//! Kolosal MUSE - multivariate symbolic bag-of-words time series classification
//!
//! Each dimension of a multivariate series is scanned with several sliding
//! window lengths. For every (dimension, window) pair a word transform turns
//! every instance into a bag of discrete words; irrelevant words are pruned
//! by a chi-squared test, the survivors are bit-packed into keys unique across
//! dimensions and windows, and all bags of an instance are merged into one
//! sparse feature vector for a single linear classifier.
//!
//! # Modules
//!
//! - [`config`] - Pipeline configuration and the per-window word space
//! - [`timeseries`] - Panel data model, differencing, window scheduling
//! - [`dictionary`] - Word sources (SFA), word encoding and bag merging
//! - [`preprocessing`] - Relevance filtering of words
//! - [`training`] - Bag-of-words classifiers
//! - [`classification`] - The `MuseClassifier` fit/predict pipeline
//! - [`utils`] - Parallel processing helpers
//!
//! # Example
//!
//! ```no_run
//! use kolosal_muse::prelude::*;
//! use ndarray::{array, Array1};
//!
//! let up: Array1<f64> = Array1::linspace(0.0, 1.0, 64);
//! let down: Array1<f64> = Array1::linspace(1.0, 0.0, 64);
//! let panel = Panel::new(
//!     vec!["x".to_string(), "y".to_string()],
//!     vec![
//!         vec![up.clone(), down.clone()],
//!         vec![down.clone(), up.clone()],
//!     ],
//! )?;
//!
//! let config = MuseConfig::default().with_random_state(42);
//! let mut muse = MuseClassifier::new(config);
//! muse.fit(&panel, &array![0.0, 1.0])?;
//! let labels = muse.predict(&panel)?;
//! # Ok::<(), kolosal_muse::KolosalError>(())
//! ```

pub mod error;

pub mod config;
pub mod timeseries;
pub mod dictionary;
pub mod preprocessing;
pub mod training;
pub mod classification;

pub mod utils;

pub use error::{KolosalError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::MuseClassifier;
    pub use crate::config::{BinningStrategy, MuseConfig, WordSpace};
    pub use crate::dictionary::{
        Bag, BagMerger, EncodedWord, RawBag, RawWord, SfaWordSource, WordConfig, WordEncoder,
        WordSource, WordTransform,
    };
    pub use crate::error::{KolosalError, Result};
    pub use crate::preprocessing::{Chi2Test, RelevanceFilter, RelevanceTest};
    pub use crate::timeseries::{Differencer, Panel, WindowSchedule, WindowScheduler};
    pub use crate::training::{BagClassifier, LogisticConfig, LogisticRegression};
}
