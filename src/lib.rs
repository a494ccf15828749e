//! Cross-validation, split-conformal prediction intervals and the bootstrap for
//! a least-squares model of cell counts against stain intensity.

#[cfg(test)]
mod testing;

// Modules
pub mod bootstrap;
pub mod config;
pub mod conformal;
pub mod cross_validation;
pub mod data;
pub mod errors;
pub mod linear;
pub mod metrics;
pub mod model;
pub mod report;
pub mod sampler;
pub mod trials;
pub mod utils;

// Individual classes, and functions
pub use bootstrap::{Bootstrap, BootstrapResult, ConfidenceInterval};
pub use config::{ConfigIO, ResamplingConfig};
pub use conformal::{ConformalCalibration, SplitConformal};
pub use cross_validation::{holdout_score, stain_shift, CrossValidationResult, CrossValidator};
pub use data::{Dataset, Observation, Stain};
pub use errors::CountError;
pub use linear::{coefficient_statistic, LinearModel, ModelSpec, Term};
pub use metrics::Metric;
pub use model::{Predictor, Regressor};
pub use report::{build_report, Report};
