//! Word source abstraction and per-window configuration sampling

use crate::config::{BinningStrategy, WordSpace};
use crate::error::Result;
use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Discretised subsequence pattern produced by a word transform
pub type RawWord = u64;

/// Raw word -> occurrence count for one instance
pub type RawBag = HashMap<RawWord, u32>;

/// Word configuration for one (dimension, window) slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordConfig {
    pub word_length: usize,
    pub alphabet_size: usize,
    pub norm: bool,
    pub binning: BinningStrategy,
    pub anova: bool,
    pub bigrams: bool,
}

impl Default for WordConfig {
    fn default() -> Self {
        Self {
            word_length: 4,
            alphabet_size: 4,
            norm: false,
            binning: BinningStrategy::EquiDepth,
            anova: false,
            bigrams: false,
        }
    }
}

/// A fitted word transform for one (dimension, window) slot
pub trait WordTransform: Send + Sync {
    /// One bag of raw words per series, using the fitted state
    fn transform(&self, series: &[Array1<f64>]) -> Result<Vec<RawBag>>;

    /// Number of bits needed to hold any raw word this transform emits
    fn raw_word_bits(&self) -> u32;
}

/// Produces fitted word transforms
pub trait WordSource: Send + Sync {
    type Transform: WordTransform;

    /// Fit a transform on one dimension at one window length and return the
    /// bags of the training series alongside it.
    ///
    /// `labels` holds a class index per series.
    fn fit_transform(
        &self,
        series: &[Array1<f64>],
        labels: &[usize],
        window_length: usize,
        config: &WordConfig,
    ) -> Result<(Self::Transform, Vec<RawBag>)>;
}

/// Draws one word configuration per window from a seeded generator.
///
/// The generator is threaded through the window loop explicitly, so the
/// sequence of configurations depends only on the seed and the number of
/// draws.
#[derive(Debug, Clone)]
pub struct WordConfigSampler {
    space: WordSpace,
    rng: ChaCha8Rng,
}

impl WordConfigSampler {
    /// `space` must hold non-empty candidate lists (see `MuseConfig::validate`)
    pub fn new(space: &WordSpace, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            space: space.clone(),
            rng,
        }
    }

    /// Draw the configuration for the next window
    pub fn sample(&mut self) -> WordConfig {
        let word_length = pick(&mut self.rng, &self.space.word_lengths);
        let norm = pick(&mut self.rng, &self.space.norm_options);
        let binning = pick(&mut self.rng, &self.space.binning_strategies);

        WordConfig {
            word_length,
            alphabet_size: self.space.alphabet_size,
            norm,
            binning,
            anova: self.space.anova,
            bigrams: self.space.bigrams,
        }
    }
}

fn pick<T: Copy>(rng: &mut ChaCha8Rng, options: &[T]) -> T {
    options[rng.gen_range(0..options.len())]
}
