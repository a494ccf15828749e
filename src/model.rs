//! Model
//!
//! The fit and predict seams used by the resampling procedures. Cross-validation
//! and the conformal estimator are written against these traits so any model can
//! be evaluated with them.
use crate::data::Dataset;
use crate::errors::CountError;

/// Something that can be fit to a dataset.
pub trait Regressor: Sync {
    type Model: Predictor;

    /// Fit a model on every row of `data`. All rows must be labeled.
    fn fit(&self, data: &Dataset) -> Result<Self::Model, CountError>;
}

/// A fitted model.
pub trait Predictor {
    /// Predicted count for every row of `data`, labeled or not.
    fn predict(&self, data: &Dataset) -> Vec<f64>;

    /// Truth minus prediction for every row of `data`.
    fn residuals(&self, data: &Dataset) -> Result<Vec<f64>, CountError> {
        let y = data.targets()?;
        Ok(y.iter().zip(self.predict(data)).map(|(y_, yhat_)| y_ - yhat_).collect())
    }
}
