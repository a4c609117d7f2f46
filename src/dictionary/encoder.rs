//! Bit-packing of raw words into globally unique keys
//!
//! An encoded word packs three fields, from the least significant bit up:
//!
//! ```text
//! | raw word (remaining bits) | window length (window_bits) | dimension (dimension_bits) |
//! ```
//!
//! The dimension field has the same width for every dimension, so it can be
//! read back first; it then selects the window width, which may differ per
//! dimension. Both widths are fixed at fit time and reused unchanged at
//! predict time.

use super::source::RawWord;
use crate::error::{KolosalError, Result};
use crate::timeseries::WindowSchedule;
use serde::{Deserialize, Serialize};

/// Word key unique across (raw word, window length, dimension)
pub type EncodedWord = u64;

/// Width of the encoded word type
pub const ENCODED_WORD_BITS: u32 = EncodedWord::BITS;

/// `ceil(log2(n))`, with `ceil_log2(0) == ceil_log2(1) == 0`
pub fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

/// Bits reserved for the dimension index, plus one guard bit
pub fn dimension_bit_width(n_dimensions: usize) -> u32 {
    ceil_log2(n_dimensions) + 1
}

/// Encoder for the words of one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEncoder {
    window_bits: u32,
    dimension_bits: u32,
}

impl WordEncoder {
    pub fn new(window_bits: u32, dimension_bits: u32) -> Self {
        Self {
            window_bits,
            dimension_bits,
        }
    }

    /// Encoder sized for a fitted window schedule among `n_dimensions` dimensions
    pub fn for_schedule(schedule: &WindowSchedule, n_dimensions: usize) -> Self {
        Self::new(schedule.window_bit_width(), dimension_bit_width(n_dimensions))
    }

    pub fn window_bits(&self) -> u32 {
        self.window_bits
    }

    pub fn dimension_bits(&self) -> u32 {
        self.dimension_bits
    }

    /// Bits left for the raw word
    pub fn raw_word_capacity(&self) -> u32 {
        ENCODED_WORD_BITS.saturating_sub(self.window_bits + self.dimension_bits)
    }

    /// Fail if raw words of `raw_word_bits` bits would overflow the key
    pub fn check_capacity(&self, raw_word_bits: u32) -> Result<()> {
        let total = raw_word_bits + self.window_bits + self.dimension_bits;
        if total > ENCODED_WORD_BITS {
            return Err(KolosalError::ConfigError(format!(
                "encoded words need {} bits ({} raw + {} window + {} dimension), \
                 more than the {} available; reduce word_length or alphabet_size",
                total, raw_word_bits, self.window_bits, self.dimension_bits, ENCODED_WORD_BITS
            )));
        }
        Ok(())
    }

    /// Pack a raw word with its window length and dimension index
    #[inline]
    pub fn encode(&self, raw_word: RawWord, window_length: usize, dimension: usize) -> EncodedWord {
        debug_assert!((window_length as u64) < 1u64 << self.window_bits);
        debug_assert!((dimension as u64) < 1u64 << self.dimension_bits);

        let word = (raw_word << self.window_bits) | window_length as u64;
        (word << self.dimension_bits) | dimension as u64
    }

    /// Unpack `(raw_word, window_length, dimension)`
    #[inline]
    pub fn decode(&self, encoded: EncodedWord) -> (RawWord, usize, usize) {
        let dimension = decode_dimension(encoded, self.dimension_bits);
        let rest = encoded >> self.dimension_bits;
        let window_length = (rest & mask(self.window_bits)) as usize;
        let raw_word = rest >> self.window_bits;
        (raw_word, window_length, dimension)
    }
}

/// Dimension index of an encoded word
#[inline]
pub fn decode_dimension(encoded: EncodedWord, dimension_bits: u32) -> usize {
    (encoded & mask(dimension_bits)) as usize
}

#[inline]
fn mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
