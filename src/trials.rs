//! Trials
//!
//! Runs the independent trials of a resampling procedure, sequentially or on a
//! rayon pool, and applies the failure policy to trials that error.
use crate::errors::CountError;
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// What to do when a single trial fails.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub enum FailurePolicy {
    /// Return the error of the first failing trial.
    #[default]
    Abort,
    /// Record the failing trial and continue with the others.
    Skip,
}

/// A trial that failed and was skipped.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct TrialFailure {
    pub trial: usize,
    pub message: String,
}

/// Parallelism and failure settings shared by the resampling procedures.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub struct TrialSettings {
    pub parallel: bool,
    /// Size of the rayon pool, all available cores when `None`.
    pub num_threads: Option<usize>,
    pub failure_policy: FailurePolicy,
}

/// Scores of the successful trials, in trial order, and the skipped trials.
pub(crate) struct TrialOutcome {
    pub values: Vec<f64>,
    pub failed: Vec<TrialFailure>,
}

fn build_pool(num_threads: Option<usize>) -> Result<rayon::ThreadPool, CountError> {
    let num_threads = match num_threads {
        Some(num_threads) => num_threads,
        None => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| CountError::ThreadPool(e.to_string()))
}

/// Run `trial` for every index in `0..trials`.
///
/// Every trial derives its own randomness from its index, so the values do not
/// depend on whether the trials ran in parallel.
pub(crate) fn run_trials<F>(
    label: &str,
    trials: usize,
    settings: &TrialSettings,
    trial: F,
) -> Result<TrialOutcome, CountError>
where
    F: Fn(usize) -> Result<f64, CountError> + Sync,
{
    let results: Vec<Result<f64, CountError>> = if settings.parallel {
        let pool = build_pool(settings.num_threads)?;
        pool.install(|| (0..trials).into_par_iter().map(&trial).collect())
    } else {
        (0..trials).map(&trial).collect()
    };

    let mut values = Vec::with_capacity(trials);
    let mut failed = Vec::new();
    let mut last_error = None;
    for (t, result) in results.into_iter().enumerate() {
        match result {
            Ok(v) => {
                debug!("{} trial {}: {:.6}", label, t, v);
                values.push(v);
            }
            Err(e) => match settings.failure_policy {
                FailurePolicy::Abort => return Err(e),
                FailurePolicy::Skip => {
                    warn!("{} trial {} skipped: {}", label, t, e);
                    failed.push(TrialFailure {
                        trial: t,
                        message: e.to_string(),
                    });
                    last_error = Some(e);
                }
            },
        }
    }
    if values.is_empty() {
        if let Some(e) = last_error {
            return Err(CountError::NoSuccessfulTrials(trials, e.to_string()));
        }
    }
    Ok(TrialOutcome { values, failed })
}
