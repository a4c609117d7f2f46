//! Parallel processing utilities

use crate::error::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Number of threads (None = use all available)
    pub n_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of threads
    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n.max(1));
        self
    }

    /// Get the number of threads to use
    pub fn num_threads(&self) -> usize {
        self.n_threads.unwrap_or_else(rayon::current_num_threads)
    }
}

/// Fallible parallel map on a pool sized by `config`.
///
/// Output order matches input order. The first error aborts the map and is
/// returned; no partial results are produced.
pub fn try_parallel_map<T, U, F>(items: Vec<T>, config: &ParallelConfig, f: F) -> Result<Vec<U>>
where
    T: Send,
    U: Send,
    F: Fn(T) -> Result<U> + Send + Sync,
{
    if config.num_threads() <= 1 || items.len() <= 1 {
        return items.into_iter().map(f).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_threads())
        .build()?;

    pool.install(|| items.into_par_iter().map(f).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KolosalError;

    #[test]
    fn test_try_parallel_map_keeps_order() {
        let items: Vec<i32> = (0..1000).collect();
        let config = ParallelConfig::new().with_threads(4);
        let results = try_parallel_map(items, &config, |x| Ok(x * 2)).unwrap();

        assert_eq!(results.len(), 1000);
        assert_eq!(results[0], 0);
        assert_eq!(results[500], 1000);
    }

    #[test]
    fn test_try_parallel_map_propagates_error() {
        let items: Vec<i32> = (0..100).collect();
        let config = ParallelConfig::new().with_threads(3);
        let result = try_parallel_map(items, &config, |x| {
            if x == 57 {
                Err(KolosalError::ComputationError("bad item".to_string()))
            } else {
                Ok(x)
            }
        });
        assert!(matches!(result, Err(KolosalError::ComputationError(_))));
    }

    #[test]
    fn test_single_thread_runs_inline() {
        let config = ParallelConfig::new().with_threads(1);
        let results = try_parallel_map(vec![3, 1, 2], &config, |x| Ok(x + 1)).unwrap();
        assert_eq!(results, vec![4, 2, 3]);
    }

    #[test]
    fn test_parallel_config() {
        let config = ParallelConfig::new().with_threads(4);
        assert_eq!(config.n_threads, Some(4));
        assert_eq!(config.num_threads(), 4);
        assert!(ParallelConfig::new().num_threads() >= 1);
    }
}
