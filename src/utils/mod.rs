//! Utility functions and types

mod parallel;

pub use parallel::{try_parallel_map, ParallelConfig};
