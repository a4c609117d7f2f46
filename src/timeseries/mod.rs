//! Time series module
//!
//! Provides the multivariate data model and the per-dimension preparation
//! steps of the MUSE pipeline:
//! - Panels of named dimensions
//! - First-order differencing as extra dimensions
//! - Window length scheduling

mod panel;
mod transforms;
mod windows;

pub use panel::Panel;
pub use transforms::Differencer;
pub use windows::{WindowSchedule, WindowScheduler, SHORT_SERIES_LENGTH};
