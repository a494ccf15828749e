use crate::errors::CountError;
use crate::metrics::evaluation::EvaluationMetric;

fn check_lengths(y: &[f64], yhat: &[f64]) -> Result<(), CountError> {
    if y.len() != yhat.len() || y.is_empty() {
        Err(CountError::LengthMismatch(y.len(), yhat.len()))
    } else {
        Ok(())
    }
}

pub struct RootMeanSquaredErrorMetric {}
impl EvaluationMetric for RootMeanSquaredErrorMetric {
    fn calculate_metric(y: &[f64], yhat: &[f64]) -> Result<f64, CountError> {
        root_mean_squared_error(y, yhat)
    }
}

pub struct MeanAbsoluteErrorMetric {}
impl EvaluationMetric for MeanAbsoluteErrorMetric {
    fn calculate_metric(y: &[f64], yhat: &[f64]) -> Result<f64, CountError> {
        mean_absolute_error(y, yhat)
    }
}

/// Square root of the mean squared difference between `y` and `yhat`.
pub fn root_mean_squared_error(y: &[f64], yhat: &[f64]) -> Result<f64, CountError> {
    check_lengths(y, yhat)?;
    let res = y
        .iter()
        .zip(yhat)
        .map(|(y_, yhat_)| (y_ - yhat_).powi(2))
        .sum::<f64>();
    Ok((res / y.len() as f64).sqrt())
}

pub fn mean_absolute_error(y: &[f64], yhat: &[f64]) -> Result<f64, CountError> {
    check_lengths(y, yhat)?;
    let res = y.iter().zip(yhat).map(|(y_, yhat_)| (y_ - yhat_).abs()).sum::<f64>();
    Ok(res / y.len() as f64)
}
