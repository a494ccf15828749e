//! Metrics
//!
//! Accuracy summaries comparing observed counts with predicted counts.
pub mod evaluation;
pub mod regression;

pub use evaluation::Metric;
pub use regression::{mean_absolute_error, root_mean_squared_error};
