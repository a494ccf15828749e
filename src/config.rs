//! Config
//!
//! Settings of the resampling procedures, loadable from and savable to json.
use crate::errors::CountError;
use crate::linear::ModelSpec;
use crate::metrics::Metric;
use crate::sampler::SampleMethod;
use crate::trials::{FailurePolicy, TrialSettings};
use crate::utils::validate_open_interval;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_seed() -> u64 {
    0
}
fn default_validation_size() -> usize {
    30
}
fn default_repetitions() -> usize {
    100
}
fn default_train_size() -> usize {
    70
}
fn default_alpha() -> f64 {
    0.05
}
fn default_replicates() -> usize {
    1000
}
fn default_level() -> f64 {
    0.95
}
fn default_num_threads() -> Option<usize> {
    None
}

/// Configuration shared by cross-validation, conformal calibration and the bootstrap.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
pub struct ResamplingConfig {
    /// Seed every trial generator is derived from.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Model fit by every procedure.
    #[serde(default)]
    pub model: ModelSpec,
    /// Cross-validation score.
    #[serde(default)]
    pub metric: Metric,
    /// How cross-validation draws validation rows.
    #[serde(default)]
    pub sample_method: SampleMethod,
    /// Validation rows per cross-validation trial.
    #[serde(default = "default_validation_size")]
    pub validation_size: usize,
    /// Number of cross-validation trials.
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
    /// Rows the conformal model is fit on.
    #[serde(default = "default_train_size")]
    pub train_size: usize,
    /// Lower residual quantile of the conformal interval.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Number of bootstrap replicates.
    #[serde(default = "default_replicates")]
    pub replicates: usize,
    /// Coverage of bootstrap confidence intervals.
    #[serde(default = "default_level")]
    pub level: f64,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_num_threads")]
    pub num_threads: Option<usize>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        ResamplingConfig {
            seed: default_seed(),
            model: ModelSpec::default(),
            metric: Metric::default(),
            sample_method: SampleMethod::default(),
            validation_size: default_validation_size(),
            repetitions: default_repetitions(),
            train_size: default_train_size(),
            alpha: default_alpha(),
            replicates: default_replicates(),
            level: default_level(),
            parallel: false,
            num_threads: default_num_threads(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl ResamplingConfig {
    pub fn trial_settings(&self) -> TrialSettings {
        TrialSettings {
            parallel: self.parallel,
            num_threads: self.num_threads,
            failure_policy: self.failure_policy,
        }
    }

    /// Check the parameters that do not depend on the size of the data.
    pub fn validate(&self) -> Result<(), CountError> {
        validate_open_interval(self.alpha, 0.0, 0.5, "alpha")?;
        validate_open_interval(self.level, 0.0, 1.0, "level")?;
        if self.num_threads == Some(0) {
            return Err(CountError::InvalidParameter(
                "num_threads".to_string(),
                "a positive number of threads".to_string(),
                "0".to_string(),
            ));
        }
        Ok(())
    }
}

/// IO
pub trait ConfigIO: Serialize + DeserializeOwned + Sized {
    /// Save a config as a json object to a file.
    ///
    /// * `path` - Path to save the config.
    fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<(), CountError> {
        fs::write(path, self.json_dump()?).map_err(|e| CountError::UnableToWrite(e.to_string()))
    }

    /// Dump a config as a json object
    fn json_dump(&self) -> Result<String, CountError> {
        serde_json::to_string(self).map_err(|e| CountError::UnableToWrite(e.to_string()))
    }

    /// Load a config from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, CountError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| CountError::UnableToRead(e.to_string()))
    }

    /// Load a config from a path to a json object.
    ///
    /// * `path` - Path to load the config from.
    fn load_config<P: AsRef<Path>>(path: P) -> Result<Self, CountError> {
        let json_str = fs::read_to_string(path).map_err(|e| CountError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl ConfigIO for ResamplingConfig {}
