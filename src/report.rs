//! Report
//!
//! Runs every procedure of the worked example from one config: cross-validation,
//! the held-out test score, a conformal interval and bootstrap intervals for the
//! slope of each stain.
use crate::bootstrap::{Bootstrap, ConfidenceInterval};
use crate::config::ResamplingConfig;
use crate::conformal::SplitConformal;
use crate::cross_validation::{holdout_score, CrossValidator};
use crate::data::{Dataset, Stain};
use crate::errors::CountError;
use crate::linear::{coefficient_statistic, Term};
use crate::metrics::Metric;
use log::info;
use serde::{Deserialize, Serialize};

/// Bootstrap summary of one coefficient.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct CoefficientSummary {
    pub term: Term,
    pub estimate: f64,
    pub standard_error: f64,
    pub bias: f64,
    pub interval: ConfidenceInterval,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Report {
    pub metric: Metric,
    /// Mean cross-validated score on the training data.
    pub cross_validation: f64,
    /// Score of the full-data fit on the test data, when it is labeled.
    pub holdout: Option<f64>,
    /// Residual quantiles added around a prediction.
    pub conformal: (f64, f64),
    pub coefficients: Vec<CoefficientSummary>,
}

impl Report {
    pub fn coefficient(&self, term: Term) -> Option<&CoefficientSummary> {
        self.coefficients.iter().find(|c| c.term == term)
    }

    /// Bootstrap interval of the slope of one stain.
    pub fn slope_interval(&self, stain: Stain) -> Option<ConfidenceInterval> {
        self.coefficient(Term::Slope(stain)).map(|c| c.interval)
    }

    pub fn to_json(&self) -> Result<String, CountError> {
        serde_json::to_string_pretty(self).map_err(|e| CountError::UnableToWrite(e.to_string()))
    }
}

/// Build a report on `train`, scoring on `test` when it is given and labeled.
pub fn build_report(train: &Dataset, test: Option<&Dataset>, config: &ResamplingConfig) -> Result<Report, CountError> {
    config.validate()?;
    let cv = CrossValidator::from_config(config).run(train, &config.model, config.metric)?;
    let holdout = match test {
        Some(test) if test.is_labeled() => Some(holdout_score(train, test, &config.model, config.metric)?),
        _ => None,
    };
    let calibration = SplitConformal::from_config(config).calibrate(train, &config.model)?;

    let bootstrap = Bootstrap::from_config(config);
    let mut coefficients = Vec::new();
    for term in config.model.terms() {
        let result = bootstrap.run(train, coefficient_statistic(config.model, term)?)?;
        coefficients.push(CoefficientSummary {
            term,
            estimate: result.estimate,
            standard_error: result.standard_error()?,
            bias: result.bias()?,
            interval: result.confidence_interval(config.level)?,
        });
    }
    if let Some(h) = holdout {
        info!(
            "Cross-validated {:?} {:.4} against {:.4} on the test data.",
            config.metric, cv.mean, h
        );
    }
    Ok(Report {
        metric: config.metric,
        cross_validation: cv.mean,
        holdout,
        conformal: (calibration.lower, calibration.upper),
        coefficients,
    })
}
