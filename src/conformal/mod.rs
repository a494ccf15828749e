//! Conformal Prediction
//!
//! Split conformal prediction intervals: residual quantiles from rows held out
//! of the fit, added around new point predictions.
//!
//! Coverage holds on average over future rows that look like the held-out rows.
//! If the stain mix of the query rows differs from the held-out mix, the interval
//! can over- or under-cover.

pub mod split;

pub use split::{ConformalCalibration, SplitConformal};
