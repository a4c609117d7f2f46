//! Word relevance selection
//!
//! Scores every raw word of one (dimension, window) slot against the class
//! labels and keeps the words whose p-value passes a threshold.

use crate::dictionary::{RawBag, RawWord};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Statistical test scoring words against class labels
pub trait RelevanceTest: Send + Sync {
    /// p-value of every word occurring in `bags`
    fn p_values(
        &self,
        bags: &[RawBag],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<HashMap<RawWord, f64>>;
}

/// Chi-squared test of independence between word counts and class.
///
/// For each word, the observed count per class is compared with the count
/// expected from the class priors. A word missing from a class is scored by
/// the same formula (observed zero); classes with no instances contribute
/// nothing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Chi2Test;

impl Chi2Test {
    /// Chi-squared statistic of every word
    pub fn statistics(
        &self,
        bags: &[RawBag],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<HashMap<RawWord, f64>> {
        if bags.len() != labels.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} labels", bags.len()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(KolosalError::InvalidInput(format!(
                "label {} out of range for {} classes",
                bad, n_classes
            )));
        }

        let n_samples = bags.len() as f64;
        let mut class_counts = vec![0usize; n_classes];
        for &label in labels {
            class_counts[label] += 1;
        }

        // observed[word][class]
        let mut observed: HashMap<RawWord, Vec<f64>> = HashMap::new();
        for (bag, &label) in bags.iter().zip(labels) {
            for (&word, &count) in bag {
                observed.entry(word).or_insert_with(|| vec![0.0; n_classes])[label] += count as f64;
            }
        }

        Ok(observed
            .into_iter()
            .map(|(word, per_class)| {
                let total: f64 = per_class.iter().sum();
                let chi2: f64 = per_class
                    .iter()
                    .zip(&class_counts)
                    .filter(|(_, &n_c)| n_c > 0)
                    .map(|(&obs, &n_c)| {
                        let expected = total * n_c as f64 / n_samples;
                        (obs - expected).powi(2) / expected
                    })
                    .sum();
                (word, chi2)
            })
            .collect())
    }
}

impl RelevanceTest for Chi2Test {
    fn p_values(
        &self,
        bags: &[RawBag],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<HashMap<RawWord, f64>> {
        if n_classes < 2 {
            return Err(KolosalError::InvalidInput(format!(
                "chi-squared relevance needs at least 2 classes, got {}",
                n_classes
            )));
        }

        let dist = ChiSquared::new((n_classes - 1) as f64)
            .map_err(|e| KolosalError::ComputationError(e.to_string()))?;
        let stats = self.statistics(bags, labels, n_classes)?;

        Ok(stats
            .into_iter()
            .map(|(word, chi2)| {
                let p = if chi2 > 0.0 { dist.sf(chi2) } else { 1.0 };
                (word, p.clamp(0.0, 1.0))
            })
            .collect())
    }
}

/// Words kept for one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetainedWords {
    /// Filtering disabled
    All,
    /// Words that passed the test
    Only(HashSet<RawWord>),
}

impl RetainedWords {
    pub fn contains(&self, word: RawWord) -> bool {
        match self {
            RetainedWords::All => true,
            RetainedWords::Only(words) => words.contains(&word),
        }
    }

    /// Number of kept words, None when filtering is disabled
    pub fn len(&self) -> Option<usize> {
        match self {
            RetainedWords::All => None,
            RetainedWords::Only(words) => Some(words.len()),
        }
    }

    /// Entries of `bag` that are kept
    pub fn filter<'a>(&'a self, bag: &'a RawBag) -> impl Iterator<Item = (RawWord, u32)> + 'a {
        bag.iter()
            .filter(move |(&w, _)| self.contains(w))
            .map(|(&w, &c)| (w, c))
    }
}

/// Fit-time word filter for one (dimension, window) slot
#[derive(Clone)]
pub struct RelevanceFilter {
    threshold: f64,
    test: Arc<dyn RelevanceTest>,
}

impl std::fmt::Debug for RelevanceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceFilter")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl RelevanceFilter {
    /// Chi-squared filter keeping words with `p <= threshold`
    pub fn new(threshold: f64) -> Self {
        Self::with_test(threshold, Arc::new(Chi2Test))
    }

    pub fn with_test(threshold: f64, test: Arc<dyn RelevanceTest>) -> Self {
        Self { threshold, test }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Thresholds of 1 or more keep every word without running the test
    pub fn is_enabled(&self) -> bool {
        self.threshold < 1.0
    }

    /// Select the relevant words of one slot; bags are not modified
    pub fn fit(&self, bags: &[RawBag], labels: &[usize], n_classes: usize) -> Result<RetainedWords> {
        if !self.is_enabled() {
            return Ok(RetainedWords::All);
        }

        let p_values = self.test.p_values(bags, labels, n_classes)?;
        Ok(RetainedWords::Only(
            p_values
                .into_iter()
                .filter(|(_, p)| *p <= self.threshold)
                .map(|(w, _)| w)
                .collect(),
        ))
    }
}
