//! Bags of encoded words and their multi-pass merging

use super::encoder::EncodedWord;
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Encoded word -> occurrence count for one instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bag {
    counts: HashMap<EncodedWord, u32>,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` occurrences of `word`; zero counts are ignored
    pub fn add(&mut self, word: EncodedWord, count: u32) {
        if count == 0 {
            return;
        }
        *self.counts.entry(word).or_insert(0) += count;
    }

    pub fn get(&self, word: EncodedWord) -> u32 {
        self.counts.get(&word).copied().unwrap_or(0)
    }

    pub fn contains(&self, word: EncodedWord) -> bool {
        self.counts.contains_key(&word)
    }

    /// Number of distinct words
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts
    pub fn total_count(&self) -> u64 {
        self.counts.values().map(|&c| c as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EncodedWord, u32)> + '_ {
        self.counts.iter().map(|(&w, &c)| (w, c))
    }
}

impl FromIterator<(EncodedWord, u32)> for Bag {
    fn from_iter<I: IntoIterator<Item = (EncodedWord, u32)>>(iter: I) -> Self {
        let mut bag = Bag::new();
        for (word, count) in iter {
            bag.add(word, count);
        }
        bag
    }
}

/// Encoded words contributed by one (dimension, window) slot, per instance
pub type SlotWords = Vec<Vec<(EncodedWord, u32)>>;

/// Accumulates per-instance bags across (dimension, window) passes.
///
/// Each pass revisits the same per-instance bags; counts for a word seen
/// twice in one instance are added.
#[derive(Debug, Clone)]
pub struct BagMerger {
    bags: Vec<Bag>,
}

impl BagMerger {
    pub fn new(n_instances: usize) -> Self {
        Self {
            bags: vec![Bag::new(); n_instances],
        }
    }

    pub fn n_instances(&self) -> usize {
        self.bags.len()
    }

    /// One-shot merge of a word sequence into a single bag
    pub fn merge(words: impl IntoIterator<Item = (EncodedWord, u32)>) -> Bag {
        words.into_iter().collect()
    }

    /// Merge words into the bag of one instance
    pub fn merge_instance(
        &mut self,
        instance: usize,
        words: impl IntoIterator<Item = (EncodedWord, u32)>,
    ) -> Result<()> {
        let n_instances = self.bags.len();
        let bag = self.bags.get_mut(instance).ok_or_else(|| {
            KolosalError::InvalidInput(format!(
                "instance {} out of range for {} bags",
                instance, n_instances
            ))
        })?;
        for (word, count) in words {
            bag.add(word, count);
        }
        Ok(())
    }

    /// Merge one slot's contribution, holding one word list per instance
    pub fn merge_slot(&mut self, slot: SlotWords) -> Result<()> {
        if slot.len() != self.bags.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} instance word lists", self.bags.len()),
                actual: format!("{} instance word lists", slot.len()),
            });
        }
        for (bag, words) in self.bags.iter_mut().zip(slot) {
            for (word, count) in words {
                bag.add(word, count);
            }
        }
        Ok(())
    }

    pub fn bags(&self) -> &[Bag] {
        &self.bags
    }

    pub fn into_bags(self) -> Vec<Bag> {
        self.bags
    }
}
