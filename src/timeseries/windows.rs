//! Window length scheduling

use crate::config::MuseConfig;
use crate::dictionary::ceil_log2;
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};

/// Series shorter than this are scanned with an increment of 1
pub const SHORT_SERIES_LENGTH: usize = 100;

/// Ordered window lengths for one dimension, fixed at fit time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSchedule {
    windows: Vec<usize>,
    max_window: usize,
}

impl WindowSchedule {
    /// Window lengths in ascending order
    pub fn windows(&self) -> &[usize] {
        &self.windows
    }

    /// Effective (exclusive) upper bound the schedule was built with
    pub fn max_window(&self) -> usize {
        self.max_window
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Bits reserved for the window length when encoding words of this dimension
    pub fn window_bit_width(&self) -> u32 {
        ceil_log2(self.max_window) + 1
    }
}

/// Builds window schedules from series length
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowScheduler {
    min_window: usize,
    max_window: usize,
    window_inc: usize,
}

impl WindowScheduler {
    pub fn new(min_window: usize, max_window: usize, window_inc: usize) -> Self {
        Self {
            min_window,
            max_window,
            window_inc: window_inc.max(1),
        }
    }

    pub fn from_config(config: &MuseConfig) -> Self {
        Self::new(config.min_window, config.max_window, config.window_inc)
    }

    /// Increment actually used for a series of the given length
    pub fn effective_increment(&self, series_length: usize) -> usize {
        if series_length < SHORT_SERIES_LENGTH {
            1
        } else {
            self.window_inc
        }
    }

    /// Upper window bound actually used for a series of the given length
    pub fn effective_max_window(&self, series_length: usize) -> usize {
        self.max_window.min(series_length)
    }

    /// Half-open range `[min_window, effective_max)` stepped by the effective increment
    pub fn schedule(&self, series_length: usize) -> Result<WindowSchedule> {
        let max_window = self.effective_max_window(series_length);
        if self.min_window > max_window {
            return Err(KolosalError::ConfigError(format!(
                "min_window = {} is bigger than max_window = {} for series length {}; \
                 set min_window below the series length",
                self.min_window, max_window, series_length
            )));
        }

        let step = self.effective_increment(series_length);
        let windows: Vec<usize> = (self.min_window..max_window).step_by(step).collect();
        if windows.is_empty() {
            return Err(KolosalError::ConfigError(format!(
                "empty window range [{}, {}) for series length {}",
                self.min_window, max_window, series_length
            )));
        }

        Ok(WindowSchedule { windows, max_window })
    }
}
