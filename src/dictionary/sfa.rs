//! Symbolic Fourier Approximation (SFA) words
//!
//! Every sliding window (stride 1) of a series is standardised and reduced to
//! a few Fourier coefficients. Each coefficient is quantised against
//! breakpoints learned on the training windows, and the symbols are packed
//! into one integer word.

use super::source::{RawBag, RawWord, WordConfig, WordSource, WordTransform};
use crate::config::BinningStrategy;
use crate::error::{KolosalError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Default word source for the MUSE pipeline
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SfaWordSource;

/// SFA transform fitted for one window length
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SfaTransform {
    window_length: usize,
    config: WordConfig,
    /// Indices of the kept Fourier values, ascending
    selected: Vec<usize>,
    /// Ascending breakpoints, one list per kept value
    breakpoints: Vec<Vec<f64>>,
    symbol_bits: u32,
}

impl SfaTransform {
    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn config(&self) -> &WordConfig {
        &self.config
    }

    /// Indices of the Fourier values that make up a word
    pub fn selected_coefficients(&self) -> &[usize] {
        &self.selected
    }

    /// Symbols per word
    pub fn word_length(&self) -> usize {
        self.selected.len()
    }

    fn word_bits(&self) -> u32 {
        self.symbol_bits * self.selected.len() as u32
    }

    fn quantise(&self, values: &[f64]) -> RawWord {
        let mut word: RawWord = 0;
        for (i, (&v, bps)) in values.iter().zip(self.breakpoints.iter()).enumerate() {
            let symbol = bps.partition_point(|&bp| bp <= v) as u64;
            word |= symbol << (self.symbol_bits * i as u32);
        }
        word
    }

    fn bag_from_values(&self, windows: &[Vec<f64>]) -> RawBag {
        let words: Vec<RawWord> = windows.iter().map(|v| self.quantise(v)).collect();
        words_to_bag(&words, self.window_length, self.config.bigrams, self.word_bits())
    }
}

impl WordTransform for SfaTransform {
    fn transform(&self, series: &[Array1<f64>]) -> Result<Vec<RawBag>> {
        let basis = FourierBasis::new(self.window_length, self.config.norm, &self.selected);
        Ok(series
            .iter()
            .map(|s| self.bag_from_values(&basis.windows(s)))
            .collect())
    }

    fn raw_word_bits(&self) -> u32 {
        raw_bits(self.word_bits(), self.config.bigrams)
    }
}

impl WordSource for SfaWordSource {
    type Transform = SfaTransform;

    fn fit_transform(
        &self,
        series: &[Array1<f64>],
        labels: &[usize],
        window_length: usize,
        config: &WordConfig,
    ) -> Result<(SfaTransform, Vec<RawBag>)> {
        if series.len() != labels.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} labels", series.len()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if window_length < 2 {
            return Err(KolosalError::InvalidInput(format!(
                "window length must be at least 2, got {}",
                window_length
            )));
        }
        if config.alphabet_size < 2 || !config.alphabet_size.is_power_of_two() {
            return Err(KolosalError::InvalidInput(format!(
                "alphabet size must be a power of two >= 2, got {}",
                config.alphabet_size
            )));
        }

        let available = available_values(window_length, config.norm);
        let n_symbols = config.word_length.min(available).max(1);
        let symbol_bits = config.alphabet_size.trailing_zeros();
        let word_bits = symbol_bits.saturating_mul(n_symbols as u32);
        let needed = raw_bits(word_bits, config.bigrams);
        if needed > RawWord::BITS {
            return Err(KolosalError::ConfigError(format!(
                "SFA words of {} symbols over {} letters need {} bits, more than {}",
                n_symbols,
                config.alphabet_size,
                needed,
                RawWord::BITS
            )));
        }

        let n_classes = labels.iter().max().map(|&m| m + 1).unwrap_or(0);
        let use_anova = config.anova && n_classes > 1;
        let n_candidates = if use_anova {
            (2 * n_symbols).min(available)
        } else {
            n_symbols
        };

        let candidates: Vec<usize> = (0..n_candidates).collect();
        let basis = FourierBasis::new(window_length, config.norm, &candidates);
        let per_series: Vec<Vec<Vec<f64>>> = series.iter().map(|s| basis.windows(s)).collect();

        let selected = if use_anova && n_candidates > n_symbols {
            select_by_anova(&per_series, labels, n_classes, n_candidates, n_symbols)
        } else {
            (0..n_symbols).collect()
        };

        let breakpoints: Vec<Vec<f64>> = selected
            .iter()
            .map(|&c| {
                let mut column: Vec<f64> = per_series
                    .iter()
                    .flat_map(|windows| windows.iter().map(move |v| v[c]))
                    .collect();
                learn_breakpoints(&mut column, config.alphabet_size, config.binning)
            })
            .collect();

        let transform = SfaTransform {
            window_length,
            config: *config,
            selected: selected.clone(),
            breakpoints,
            symbol_bits,
        };

        let bags = per_series
            .iter()
            .map(|windows| {
                let kept: Vec<Vec<f64>> = windows
                    .iter()
                    .map(|v| selected.iter().map(|&c| v[c]).collect())
                    .collect();
                transform.bag_from_values(&kept)
            })
            .collect();

        Ok((transform, bags))
    }
}

/// Count of Fourier values per window: the DC real part (unless `norm`),
/// then real and imaginary parts for frequencies `1..=window_length / 2`
fn available_values(window_length: usize, norm: bool) -> usize {
    let dc = if norm { 0 } else { 1 };
    dc + 2 * (window_length / 2)
}

/// Rows of DFT weights for selected Fourier values of one window length
struct FourierBasis {
    window_length: usize,
    norm: bool,
    rows: Vec<Vec<f64>>,
}

impl FourierBasis {
    fn new(window_length: usize, norm: bool, indices: &[usize]) -> Self {
        let n = window_length as f64;
        let rows = indices
            .iter()
            .map(|&index| {
                // value order: [re(0)], re(1), im(1), re(2), im(2), ...
                let shifted = if norm { index + 1 } else { index };
                let (freq, imaginary) = if shifted == 0 {
                    (0, false)
                } else {
                    ((shifted + 1) / 2, shifted % 2 == 0)
                };
                (0..window_length)
                    .map(|t| {
                        let angle = 2.0 * PI * freq as f64 * t as f64 / n;
                        if imaginary {
                            -angle.sin()
                        } else {
                            angle.cos()
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            window_length,
            norm,
            rows,
        }
    }

    /// Fourier values of every window of a series
    fn windows(&self, series: &Array1<f64>) -> Vec<Vec<f64>> {
        let w = self.window_length;
        let values: Vec<f64> = series.iter().copied().collect();
        if values.len() < w {
            return Vec::new();
        }

        let mut buffer = vec![0.0; w];
        (0..=values.len() - w)
            .map(|start| {
                let window = &values[start..start + w];
                let mean = window.iter().sum::<f64>() / w as f64;
                let var = window.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / w as f64;
                let std = if var.sqrt() > 1e-8 { var.sqrt() } else { 1.0 };
                let offset = if self.norm { mean } else { 0.0 };
                for (b, &v) in buffer.iter_mut().zip(window) {
                    *b = (v - offset) / std;
                }

                self.rows
                    .iter()
                    .map(|row| row.iter().zip(buffer.iter()).map(|(a, b)| a * b).sum())
                    .collect()
            })
            .collect()
    }
}

/// Keep the `n_keep` values with the highest one-way ANOVA F-score
fn select_by_anova(
    per_series: &[Vec<Vec<f64>>],
    labels: &[usize],
    n_classes: usize,
    n_candidates: usize,
    n_keep: usize,
) -> Vec<usize> {
    let mut scored: Vec<(usize, f64)> = (0..n_candidates)
        .map(|c| {
            let f = anova_f_score(per_series, labels, n_classes, c);
            (c, if f.is_nan() { 0.0 } else { f })
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut selected: Vec<usize> = scored.into_iter().take(n_keep).map(|(c, _)| c).collect();
    selected.sort_unstable();
    selected
}

fn anova_f_score(per_series: &[Vec<Vec<f64>>], labels: &[usize], n_classes: usize, column: usize) -> f64 {
    let mut sums = vec![0.0; n_classes];
    let mut counts = vec![0usize; n_classes];
    for (windows, &label) in per_series.iter().zip(labels) {
        for v in windows {
            sums[label] += v[column];
            counts[label] += 1;
        }
    }

    let total: usize = counts.iter().sum();
    let groups = counts.iter().filter(|&&c| c > 0).count();
    if groups < 2 || total <= groups {
        return 0.0;
    }

    let grand_mean = sums.iter().sum::<f64>() / total as f64;
    let means: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();

    let ss_between: f64 = means
        .iter()
        .zip(&counts)
        .map(|(&m, &c)| c as f64 * (m - grand_mean).powi(2))
        .sum();
    let mut ss_within = 0.0;
    for (windows, &label) in per_series.iter().zip(labels) {
        for v in windows {
            ss_within += (v[column] - means[label]).powi(2);
        }
    }

    let df_between = (groups - 1) as f64;
    let df_within = (total - groups) as f64;
    if ss_within <= f64::EPSILON {
        return if ss_between > f64::EPSILON { f64::INFINITY } else { 0.0 };
    }
    (ss_between / df_between) / (ss_within / df_within)
}

/// `alphabet_size - 1` ascending breakpoints for one Fourier value
fn learn_breakpoints(values: &mut [f64], alphabet_size: usize, binning: BinningStrategy) -> Vec<f64> {
    let n_breaks = alphabet_size - 1;
    if values.is_empty() {
        return vec![0.0; n_breaks];
    }

    match binning {
        BinningStrategy::EquiDepth => {
            values.sort_by(|a, b| a.total_cmp(b));
            let n = values.len();
            (1..alphabet_size)
                .map(|b| values[(b * n / alphabet_size).min(n - 1)])
                .collect()
        }
        BinningStrategy::EquiWidth => {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let width = (max - min) / alphabet_size as f64;
            (1..alphabet_size).map(|b| min + b as f64 * width).collect()
        }
    }
}

/// Width of a raw word: a bigram holds two words plus a marker bit
fn raw_bits(word_bits: u32, bigrams: bool) -> u32 {
    if bigrams {
        word_bits.saturating_mul(2).saturating_add(1)
    } else {
        word_bits
    }
}

/// Count unigrams and, optionally, bigrams of words one window apart.
/// Bigrams carry a marker bit above both halves so they never equal a unigram.
fn words_to_bag(words: &[RawWord], window_length: usize, bigrams: bool, word_bits: u32) -> RawBag {
    let mut bag = RawBag::new();
    for &word in words {
        *bag.entry(word).or_insert(0) += 1;
    }

    if bigrams && words.len() > window_length {
        let marker = 1u64 << (2 * word_bits);
        for p in window_length..words.len() {
            let bigram = marker | (words[p - window_length] << word_bits) | words[p];
            *bag.entry(bigram).or_insert(0) += 1;
        }
    }
    bag
}
