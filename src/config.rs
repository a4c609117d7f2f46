//! MUSE configuration

use crate::dictionary::ENCODED_WORD_BITS;
use crate::error::{KolosalError, Result};
use crate::training::LogisticConfig;
use serde::{Deserialize, Serialize};

/// Breakpoint learning strategy used when discretising Fourier coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinningStrategy {
    /// Uniform intervals between the observed min and max
    EquiWidth,
    /// Quantile intervals holding the same number of values
    EquiDepth,
}

/// Candidate word configurations sampled once per window length
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSpace {
    /// Number of symbols per coefficient (power of two)
    pub alphabet_size: usize,
    /// Candidate word lengths
    pub word_lengths: Vec<usize>,
    /// Candidate normalisation flags (drop the DC coefficient)
    pub norm_options: Vec<bool>,
    /// Candidate binning strategies
    pub binning_strategies: Vec<BinningStrategy>,
    /// Select coefficients by one-way ANOVA F-score instead of taking the first ones
    pub anova: bool,
    /// Also emit bigrams of words one window apart
    pub bigrams: bool,
}

impl Default for WordSpace {
    fn default() -> Self {
        Self {
            alphabet_size: 4,
            word_lengths: vec![4, 6],
            norm_options: vec![false],
            binning_strategies: vec![BinningStrategy::EquiWidth, BinningStrategy::EquiDepth],
            anova: true,
            bigrams: true,
        }
    }
}

impl WordSpace {
    /// Bits per symbol, `log2(alphabet_size)`
    pub fn symbol_bits(&self) -> u32 {
        self.alphabet_size.trailing_zeros()
    }

    /// Worst-case raw word width over every candidate configuration.
    ///
    /// Bigrams hold two words plus a marker bit.
    pub fn max_raw_word_bits(&self) -> u64 {
        let max_length = self.word_lengths.iter().copied().max().unwrap_or(0) as u64;
        let word_bits = max_length.saturating_mul(self.symbol_bits() as u64);
        if self.bigrams {
            word_bits.saturating_mul(2).saturating_add(1)
        } else {
            word_bits
        }
    }
}

/// Configuration for the MUSE classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuseConfig {
    /// Append a first-order difference series for every dimension
    pub use_first_order_differences: bool,

    /// Chi-squared p-value threshold for keeping a word.
    /// Values >= 1 disable relevance filtering.
    pub p_threshold: f64,

    /// Smallest window length
    pub min_window: usize,

    /// Largest window length (capped by series length, exclusive)
    pub max_window: usize,

    /// Step between consecutive window lengths for series of length >= 100
    pub window_inc: usize,

    /// Word configurations sampled per window
    pub word_space: WordSpace,

    /// Downstream classifier settings
    pub classifier: LogisticConfig,

    /// Number of worker threads (None = all available)
    pub n_jobs: Option<usize>,

    /// Random seed for reproducibility
    pub random_state: Option<u64>,
}

impl Default for MuseConfig {
    fn default() -> Self {
        Self {
            use_first_order_differences: true,
            p_threshold: 0.05,
            min_window: 6,
            max_window: 100,
            window_inc: 2,
            word_space: WordSpace::default(),
            classifier: LogisticConfig::default(),
            n_jobs: None,
            random_state: None,
        }
    }
}

impl MuseConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable first-order differences
    pub fn with_first_order_differences(mut self, enabled: bool) -> Self {
        self.use_first_order_differences = enabled;
        self
    }

    /// Set the relevance p-value threshold
    pub fn with_p_threshold(mut self, p_threshold: f64) -> Self {
        self.p_threshold = p_threshold;
        self
    }

    /// Set the window bounds
    pub fn with_window_bounds(mut self, min_window: usize, max_window: usize) -> Self {
        self.min_window = min_window;
        self.max_window = max_window;
        self
    }

    /// Set the window increment
    pub fn with_window_inc(mut self, window_inc: usize) -> Self {
        self.window_inc = window_inc;
        self
    }

    /// Replace the word configuration space
    pub fn with_word_space(mut self, word_space: WordSpace) -> Self {
        self.word_space = word_space;
        self
    }

    /// Replace the classifier settings
    pub fn with_classifier(mut self, classifier: LogisticConfig) -> Self {
        self.classifier = classifier;
        self
    }

    /// Set number of threads
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// Set random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Whether the chi-squared relevance filter runs at fit time
    pub fn relevance_filter_enabled(&self) -> bool {
        self.p_threshold < 1.0
    }

    /// Check the configuration before fitting
    pub fn validate(&self) -> Result<()> {
        if self.min_window < 2 {
            return Err(invalid("min_window", self.min_window, "must be at least 2"));
        }
        if self.max_window < self.min_window {
            return Err(invalid(
                "max_window",
                self.max_window,
                &format!("must not be below min_window = {}", self.min_window),
            ));
        }
        if self.window_inc == 0 {
            return Err(invalid("window_inc", self.window_inc, "must be positive"));
        }
        if self.p_threshold.is_nan() || self.p_threshold <= 0.0 {
            return Err(invalid("p_threshold", self.p_threshold, "must be in (0, 1]"));
        }
        if self.n_jobs == Some(0) {
            return Err(invalid("n_jobs", 0, "must be positive"));
        }

        let space = &self.word_space;
        if !(2..=256).contains(&space.alphabet_size) || !space.alphabet_size.is_power_of_two() {
            return Err(invalid(
                "alphabet_size",
                space.alphabet_size,
                "must be a power of two in [2, 256]",
            ));
        }
        if space.word_lengths.is_empty() || space.word_lengths.contains(&0) {
            return Err(KolosalError::ConfigError(
                "word_lengths must be non-empty and positive".to_string(),
            ));
        }
        let raw_bits = space.max_raw_word_bits();
        if raw_bits > ENCODED_WORD_BITS as u64 {
            return Err(KolosalError::ConfigError(format!(
                "raw words need up to {} bits (word length {} x {} bits per symbol{}), \
                 more than the {} of an encoded word; reduce word_lengths or alphabet_size",
                raw_bits,
                space.word_lengths.iter().copied().max().unwrap_or(0),
                space.symbol_bits(),
                if space.bigrams { ", doubled for bigrams" } else { "" },
                ENCODED_WORD_BITS
            )));
        }
        if space.norm_options.is_empty() {
            return Err(KolosalError::ConfigError("norm_options must be non-empty".to_string()));
        }
        if space.binning_strategies.is_empty() {
            return Err(KolosalError::ConfigError(
                "binning_strategies must be non-empty".to_string(),
            ));
        }

        self.classifier.validate()
    }
}

fn invalid(name: &str, value: impl ToString, reason: &str) -> KolosalError {
    KolosalError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MuseConfig::default();
        assert_eq!(config.min_window, 6);
        assert_eq!(config.max_window, 100);
        assert_eq!(config.window_inc, 2);
        assert!(config.use_first_order_differences);
        assert!(config.relevance_filter_enabled());
        assert_eq!(config.word_space.alphabet_size, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = MuseConfig::new()
            .with_first_order_differences(false)
            .with_p_threshold(1.0)
            .with_window_bounds(4, 20)
            .with_window_inc(4)
            .with_n_jobs(2)
            .with_random_state(7);

        assert!(!config.use_first_order_differences);
        assert!(!config.relevance_filter_enabled());
        assert_eq!((config.min_window, config.max_window), (4, 20));
        assert_eq!(config.window_inc, 4);
        assert_eq!(config.n_jobs, Some(2));
        assert_eq!(config.random_state, Some(7));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(MuseConfig::new().with_window_bounds(1, 10).validate().is_err());
        assert!(MuseConfig::new().with_window_bounds(12, 10).validate().is_err());
        assert!(MuseConfig::new().with_window_inc(0).validate().is_err());
        assert!(MuseConfig::new().with_p_threshold(0.0).validate().is_err());
        assert!(MuseConfig::new().with_p_threshold(f64::NAN).validate().is_err());

        let mut config = MuseConfig::new();
        config.word_space.alphabet_size = 3;
        let err = config.validate().unwrap_err();
        assert!(err.is_config());

        let mut config = MuseConfig::new();
        config.word_space.word_lengths.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_raw_word_bits() {
        // default: 6 symbols x 2 bits, bigram pairs plus marker
        assert_eq!(WordSpace::default().max_raw_word_bits(), 25);

        let space = WordSpace {
            alphabet_size: 16,
            word_lengths: vec![3, 20],
            bigrams: false,
            ..WordSpace::default()
        };
        assert_eq!(space.max_raw_word_bits(), 80);
    }

    #[test]
    fn test_validate_rejects_oversized_words() {
        // 16 x 2 bits doubled for bigrams, plus the marker: 65
        let mut config = MuseConfig::new();
        config.word_space.word_lengths = vec![4, 16];
        let err = config.validate().unwrap_err();
        assert!(matches!(err, KolosalError::ConfigError(_)));

        // unigrams of 20 x 4 bits
        let mut config = MuseConfig::new();
        config.word_space.word_lengths = vec![20];
        config.word_space.alphabet_size = 16;
        config.word_space.bigrams = false;
        assert!(config.validate().unwrap_err().is_config());

        // 31 x 1 bit doubled plus marker: 63 bits
        let mut config = MuseConfig::new();
        config.word_space.word_lengths = vec![31];
        config.word_space.alphabet_size = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = MuseConfig::new().with_random_state(3);
        let json = serde_json::to_string(&config).unwrap();
        let back: MuseConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.random_state, Some(3));
        assert_eq!(back.word_space.binning_strategies.len(), 2);
    }
}
