use crate::config::ResamplingConfig;
use crate::data::Dataset;
use crate::errors::CountError;
use crate::model::{Predictor, Regressor};
use crate::sampler::{Sampler, SplitSampler};
use crate::utils::{quantiles, trial_rng, validate_open_interval};
use log::info;

/// Split conformal calibration settings.
#[derive(Clone, Debug)]
pub struct SplitConformal {
    /// Rows used to fit the model, the rest are used for residuals.
    pub train_size: usize,
    /// Lower residual quantile, the upper one is `1 - alpha`.
    pub alpha: f64,
    pub seed: u64,
}

impl SplitConformal {
    pub fn new(train_size: usize, alpha: f64) -> Self {
        SplitConformal {
            train_size,
            alpha,
            seed: 0,
        }
    }

    pub fn from_config(config: &ResamplingConfig) -> Self {
        SplitConformal {
            train_size: config.train_size,
            alpha: config.alpha,
            seed: config.seed,
        }
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit on `train_size` random rows of `data` and derive the interval from the
    /// residuals on the remaining rows.
    pub fn calibrate<R: Regressor>(
        &self,
        data: &Dataset,
        regressor: &R,
    ) -> Result<ConformalCalibration<R::Model>, CountError> {
        validate_open_interval(self.alpha, 0.0, 0.5, "alpha")?;
        let index: Vec<usize> = (0..data.len()).collect();
        let mut rng = trial_rng(self.seed, 0);
        let (fit_indices, holdout_indices) = SplitSampler::new(self.train_size).sample(&mut rng, &index)?;

        let model = regressor.fit(&data.subset(&fit_indices)?)?;
        let holdout = data.subset(&holdout_indices)?;
        let residuals = model.residuals(&holdout)?;
        let bounds = quantiles(&residuals, &[self.alpha, 1.0 - self.alpha])?;
        info!(
            "Conformal calibration on {} held-out rows: residual quantiles [{:.4}, {:.4}] at alpha {}.",
            residuals.len(),
            bounds[0],
            bounds[1],
            self.alpha
        );
        Ok(ConformalCalibration {
            model,
            fit_indices,
            holdout_indices,
            residuals,
            lower: bounds[0],
            upper: bounds[1],
            alpha: self.alpha,
        })
    }
}

/// A fitted model together with its held-out residual quantiles.
#[derive(Clone, Debug)]
pub struct ConformalCalibration<M> {
    pub model: M,
    /// Rows the model was fit on.
    pub fit_indices: Vec<usize>,
    /// Rows the residuals were computed on, the complement of `fit_indices`.
    pub holdout_indices: Vec<usize>,
    /// Truth minus prediction on the held-out rows, in `holdout_indices` order.
    pub residuals: Vec<f64>,
    /// The `alpha` residual quantile.
    pub lower: f64,
    /// The `1 - alpha` residual quantile.
    pub upper: f64,
    pub alpha: f64,
}

impl<M: Predictor> ConformalCalibration<M> {
    /// Interval around a point prediction, asymmetric when the residuals are.
    pub fn interval(&self, prediction: f64) -> (f64, f64) {
        (prediction + self.lower, prediction + self.upper)
    }

    /// Interval of `prediction ± w`, `w` the larger of the two quantile magnitudes.
    pub fn symmetric_interval(&self, prediction: f64) -> (f64, f64) {
        let w = self.lower.abs().max(self.upper.abs());
        (prediction - w, prediction + w)
    }

    /// Intervals for every row of `data`.
    pub fn predict_intervals(&self, data: &Dataset) -> Vec<(f64, f64)> {
        self.model
            .predict(data)
            .into_iter()
            .map(|p| self.interval(p))
            .collect()
    }

    /// Fraction of the labeled rows of `data` whose count lies in its interval.
    pub fn coverage(&self, data: &Dataset) -> Result<f64, CountError> {
        let y = data.targets()?;
        if y.is_empty() {
            return Err(CountError::EmptyQuantileInput("coverage".to_string()));
        }
        let covered = y
            .iter()
            .zip(self.predict_intervals(data))
            .filter(|(y_, (lo, hi))| lo <= *y_ && *y_ <= hi)
            .count();
        Ok(covered as f64 / y.len() as f64)
    }
}
