//! Symbolic word dictionaries
//!
//! Word production and the bag-of-words plumbing around it:
//! - `WordSource` / `WordTransform`: per (dimension, window) word producers
//! - SFA words as the default producer
//! - Bit-packed word keys unique across dimensions and window lengths
//! - Per-instance bag merging

mod bag;
mod encoder;
mod sfa;
mod source;

pub use bag::{Bag, BagMerger, SlotWords};
pub use encoder::{
    ceil_log2, decode_dimension, dimension_bit_width, EncodedWord, WordEncoder, ENCODED_WORD_BITS,
};
pub use sfa::{SfaTransform, SfaWordSource};
pub use source::{RawBag, RawWord, WordConfig, WordConfigSampler, WordSource, WordTransform};
