//! Bootstrap
//!
//! Nonparametric bootstrap of a scalar statistic: rows are resampled with
//! replacement, the statistic is recomputed on every resample, and the spread of
//! the replicates estimates the sampling variance, bias and a basic confidence
//! interval of the statistic.
use crate::config::ResamplingConfig;
use crate::data::Dataset;
use crate::errors::CountError;
use crate::sampler::{BootstrapSampler, Sampler};
use crate::trials::{run_trials, FailurePolicy, TrialFailure, TrialSettings};
use crate::utils::{mean, quantile, quantiles, trial_rng, validate_open_interval, variance};
use log::info;
use serde::{Deserialize, Serialize};

/// A two-sided interval with its nominal coverage.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

impl ConfidenceInterval {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Statistic on the original data and its bootstrap replicates.
#[derive(Clone, Debug)]
pub struct BootstrapResult {
    /// The statistic computed on the original data.
    pub estimate: f64,
    /// One value per successful replicate, in replicate order.
    pub replicates: Vec<f64>,
    /// Replicates skipped under `FailurePolicy::Skip`.
    pub failed: Vec<TrialFailure>,
}

impl BootstrapResult {
    pub fn mean(&self) -> Result<f64, CountError> {
        mean(&self.replicates)
    }

    /// Mean squared deviation of the replicates from their mean.
    pub fn variance(&self) -> Result<f64, CountError> {
        variance(&self.replicates)
    }

    pub fn standard_error(&self) -> Result<f64, CountError> {
        Ok(self.variance()?.sqrt())
    }

    /// Mean of `estimate - replicate`.
    pub fn bias(&self) -> Result<f64, CountError> {
        Ok(self.estimate - self.mean()?)
    }

    fn deviations(&self) -> Vec<f64> {
        self.replicates.iter().map(|r| (self.estimate - r).abs()).collect()
    }

    /// Basic bootstrap interval `[estimate - t, estimate + t]`, with `t` the
    /// `level` quantile of `|estimate - replicate|`.
    pub fn confidence_interval(&self, level: f64) -> Result<ConfidenceInterval, CountError> {
        validate_open_interval(level, 0.0, 1.0, "level")?;
        let t = quantile(&self.deviations(), level)?;
        Ok(ConfidenceInterval {
            lower: self.estimate - t,
            upper: self.estimate + t,
            level,
        })
    }

    /// Percentile interval, the central `level` range of the replicates.
    pub fn percentile_interval(&self, level: f64) -> Result<ConfidenceInterval, CountError> {
        validate_open_interval(level, 0.0, 1.0, "level")?;
        let tail = (1.0 - level) / 2.0;
        let q = quantiles(&self.replicates, &[tail, 1.0 - tail])?;
        Ok(ConfidenceInterval {
            lower: q[0],
            upper: q[1],
            level,
        })
    }
}

/// Bootstrap settings.
#[derive(Clone, Debug)]
pub struct Bootstrap {
    pub replicates: usize,
    pub seed: u64,
    pub settings: TrialSettings,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Bootstrap {
            replicates: 1000,
            seed: 0,
            settings: TrialSettings::default(),
        }
    }
}

impl Bootstrap {
    pub fn new(replicates: usize) -> Self {
        Bootstrap {
            replicates,
            ..Default::default()
        }
    }

    pub fn from_config(config: &ResamplingConfig) -> Self {
        Bootstrap {
            replicates: config.replicates,
            seed: config.seed,
            settings: config.trial_settings(),
        }
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Run the replicates on a rayon pool of `num_threads` threads, all cores when `None`.
    pub fn set_parallel(mut self, parallel: bool, num_threads: Option<usize>) -> Self {
        self.settings.parallel = parallel;
        self.settings.num_threads = num_threads;
        self
    }

    pub fn set_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.settings.failure_policy = failure_policy;
        self
    }

    /// Rows drawn for one replicate of a dataset with `n` rows.
    pub fn resample_indices(&self, n: usize, replicate: usize) -> Result<Vec<usize>, CountError> {
        let index: Vec<usize> = (0..n).collect();
        let mut rng = trial_rng(self.seed, replicate);
        let (chosen, _) = BootstrapSampler::new().sample(&mut rng, &index)?;
        Ok(chosen)
    }

    /// Share of the `n` rows that one replicate never draws.
    pub fn out_of_bag_fraction(&self, n: usize, replicate: usize) -> Result<f64, CountError> {
        let index: Vec<usize> = (0..n).collect();
        let mut rng = trial_rng(self.seed, replicate);
        let (_, excluded) = BootstrapSampler::new().sample(&mut rng, &index)?;
        Ok(excluded.len() as f64 / n as f64)
    }

    /// Bootstrap `statistic` over the rows of `data`.
    ///
    /// * `statistic` - Computes the scalar of interest from a dataset, for example
    ///   one coefficient of a refit model.
    pub fn run<F>(&self, data: &Dataset, statistic: F) -> Result<BootstrapResult, CountError>
    where
        F: Fn(&Dataset) -> Result<f64, CountError> + Sync,
    {
        let estimate = statistic(data)?;
        info!(
            "Bootstrapping a statistic of {:.4} on {} rows with {} replicates.",
            estimate,
            data.len(),
            self.replicates
        );
        let outcome = run_trials("Bootstrap", self.replicates, &self.settings, |b| {
            let resample = data.subset(&self.resample_indices(data.len(), b)?)?;
            statistic(&resample)
        })?;
        let result = BootstrapResult {
            estimate,
            replicates: outcome.values,
            failed: outcome.failed,
        };
        if let (Ok(se), Ok(bias)) = (result.standard_error(), result.bias()) {
            info!(
                "Bootstrap finished, standard error {:.4}, bias {:.4} over {} replicates, {} skipped.",
                se,
                bias,
                result.replicates.len(),
                result.failed.len()
            );
        }
        Ok(result)
    }
}
