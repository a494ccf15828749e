use crate::errors::CountError;
use crate::metrics::regression;
use crate::utils::items_to_strings;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type MetricFn = fn(&[f64], &[f64]) -> Result<f64, CountError>;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub enum Metric {
    #[default]
    RootMeanSquaredError,
    MeanAbsoluteError,
}

fn get_parse_error(s: &str) -> CountError {
    CountError::ParseString(
        s.to_string(),
        "Metric".to_string(),
        items_to_strings(vec!["RootMeanSquaredError", "RMSE", "MeanAbsoluteError", "MAE"]),
    )
}

impl FromStr for Metric {
    type Err = CountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RootMeanSquaredError" | "RMSE" => Ok(Metric::RootMeanSquaredError),
            "MeanAbsoluteError" | "MAE" => Ok(Metric::MeanAbsoluteError),
            _ => Err(get_parse_error(s)),
        }
    }
}

impl Metric {
    /// Score `yhat` against `y`.
    pub fn score(&self, y: &[f64], yhat: &[f64]) -> Result<f64, CountError> {
        metric_callables(self)(y, yhat)
    }
}

/// Error metrics only, lower is better for every one of them.
pub fn metric_callables(metric_type: &Metric) -> MetricFn {
    match metric_type {
        Metric::RootMeanSquaredError => regression::RootMeanSquaredErrorMetric::calculate_metric,
        Metric::MeanAbsoluteError => regression::MeanAbsoluteErrorMetric::calculate_metric,
    }
}

pub trait EvaluationMetric {
    fn calculate_metric(y: &[f64], yhat: &[f64]) -> Result<f64, CountError>;
}
