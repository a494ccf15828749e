//! Cross Validation
//!
//! Repeated random train/validation splits (Monte Carlo cross-validation) and
//! the single held-out test score it is meant to estimate.
//!
//! Validation rows are drawn uniformly by default. When the stain proportions of
//! the data the model will be used on differ from those of the training data,
//! the cross-validated error can underestimate the test error; a stratified split
//! is available but does not correct for such a shift.
use crate::config::ResamplingConfig;
use crate::data::{Dataset, Stain};
use crate::errors::CountError;
use crate::metrics::Metric;
use crate::model::{Predictor, Regressor};
use crate::sampler::{SampleMethod, Sampler, Split, SplitSampler, StratifiedSplitSampler};
use crate::trials::{run_trials, FailurePolicy, TrialFailure, TrialSettings};
use crate::utils::{mean, trial_rng, variance};
use log::{info, warn};

/// Scores of the individual trials and their mean.
#[derive(Clone, Debug)]
pub struct CrossValidationResult {
    /// One score per successful trial, in trial order.
    pub scores: Vec<f64>,
    pub mean: f64,
    /// Trials skipped under `FailurePolicy::Skip`.
    pub failed: Vec<TrialFailure>,
}

impl CrossValidationResult {
    /// Population standard deviation of the trial scores.
    pub fn standard_deviation(&self) -> Result<f64, CountError> {
        Ok(variance(&self.scores)?.sqrt())
    }
}

/// Monte Carlo cross-validation.
#[derive(Clone, Debug)]
pub struct CrossValidator {
    /// Rows held out for validation in every trial.
    pub validation_size: usize,
    pub repetitions: usize,
    pub seed: u64,
    pub sample_method: SampleMethod,
    pub settings: TrialSettings,
}

impl Default for CrossValidator {
    fn default() -> Self {
        CrossValidator {
            validation_size: 30,
            repetitions: 100,
            seed: 0,
            sample_method: SampleMethod::Uniform,
            settings: TrialSettings::default(),
        }
    }
}

impl CrossValidator {
    pub fn new(validation_size: usize, repetitions: usize) -> Self {
        CrossValidator {
            validation_size,
            repetitions,
            ..Default::default()
        }
    }

    pub fn from_config(config: &ResamplingConfig) -> Self {
        CrossValidator {
            validation_size: config.validation_size,
            repetitions: config.repetitions,
            seed: config.seed,
            sample_method: config.sample_method,
            settings: config.trial_settings(),
        }
    }

    /// Set the seed the per-trial generators are derived from.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set how validation rows are drawn.
    pub fn set_sample_method(mut self, sample_method: SampleMethod) -> Self {
        self.sample_method = sample_method;
        self
    }

    /// Run the trials on a rayon pool of `num_threads` threads, all cores when `None`.
    pub fn set_parallel(mut self, parallel: bool, num_threads: Option<usize>) -> Self {
        self.settings.parallel = parallel;
        self.settings.num_threads = num_threads;
        self
    }

    pub fn set_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.settings.failure_policy = failure_policy;
        self
    }

    /// Training and validation rows of one trial. The same trial always gets
    /// the same split for a given seed.
    pub fn split(&self, data: &Dataset, trial: usize) -> Result<Split, CountError> {
        let index: Vec<usize> = (0..data.len()).collect();
        let mut rng = trial_rng(self.seed, trial);
        let (validation, training) = match self.sample_method {
            SampleMethod::Uniform => SplitSampler::new(self.validation_size).sample(&mut rng, &index)?,
            SampleMethod::Stratified => {
                let strata: Vec<Stain> = data.stains();
                StratifiedSplitSampler::new(self.validation_size, &strata).sample(&mut rng, &index)?
            }
        };
        Ok(Split { training, validation })
    }

    /// Cross-validate `regressor`, scoring every trial with `metric`.
    pub fn run<R: Regressor>(
        &self,
        data: &Dataset,
        regressor: &R,
        metric: Metric,
    ) -> Result<CrossValidationResult, CountError> {
        self.run_with(data, regressor, |y, yhat| metric.score(y, yhat))
    }

    /// Cross-validate `regressor` with an arbitrary scoring function of the
    /// validation truth and predictions.
    pub fn run_with<R, F>(&self, data: &Dataset, regressor: &R, score: F) -> Result<CrossValidationResult, CountError>
    where
        R: Regressor,
        F: Fn(&[f64], &[f64]) -> Result<f64, CountError> + Sync,
    {
        if self.validation_size == 0 || self.validation_size >= data.len() {
            return Err(CountError::InvalidSplitSize(self.validation_size, data.len()));
        }
        info!(
            "Cross-validating on {} rows: {} trials of {} validation rows ({:?} split).",
            data.len(),
            self.repetitions,
            self.validation_size,
            self.sample_method
        );

        let outcome = run_trials("Cross-validation", self.repetitions, &self.settings, |t| {
            let split = self.split(data, t)?;
            let train = data.subset(&split.training)?;
            let valid = data.subset(&split.validation)?;
            let model = regressor.fit(&train)?;
            let yhat = model.predict(&valid);
            score(&valid.targets()?, &yhat)
        })?;

        let mean = mean(&outcome.values)?;
        info!(
            "Cross-validation finished, mean score {:.4} over {} trials, {} skipped.",
            mean,
            outcome.values.len(),
            outcome.failed.len()
        );
        Ok(CrossValidationResult {
            scores: outcome.values,
            mean,
            failed: outcome.failed,
        })
    }
}

/// Largest difference in stain proportions tolerated before a holdout
/// evaluation is logged as shifted.
pub const STAIN_SHIFT_TOLERANCE: f64 = 0.05;

/// Largest absolute difference between the stain proportions of two datasets.
pub fn stain_shift(train: &Dataset, test: &Dataset) -> f64 {
    Stain::ALL
        .iter()
        .map(|s| (train.stain_fraction(*s) - test.stain_fraction(*s)).abs())
        .fold(0.0, f64::max)
}

/// Fit on all of `train` and score the predictions for the labeled `test` rows.
pub fn holdout_score<R: Regressor>(
    train: &Dataset,
    test: &Dataset,
    regressor: &R,
    metric: Metric,
) -> Result<f64, CountError> {
    let shift = stain_shift(train, test);
    if shift > STAIN_SHIFT_TOLERANCE {
        warn!(
            "Stain proportions differ between training and test data: stain 2 makes up {:.3} of {} training rows and {:.3} of {} test rows, cross-validated scores may be optimistic.",
            train.stain_fraction(Stain::Two),
            train.len(),
            test.stain_fraction(Stain::Two),
            test.len()
        );
    } else {
        info!(
            "Holdout evaluation on {} training and {} test rows, stain proportions within {:.3}.",
            train.len(),
            test.len(),
            shift
        );
    }
    let model = regressor.fit(train)?;
    let yhat = model.predict(test);
    metric.score(&test.targets()?, &yhat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use crate::linear::ModelSpec;
    use crate::metrics::root_mean_squared_error;
    use crate::testing::synthetic_cells;
    use hashbrown::HashSet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cells(n: usize) -> Dataset {
        let mut rng = StdRng::seed_from_u64(11);
        synthetic_cells(&mut rng, n, [5.0, 8.0], 4.0)
    }

    #[test]
    fn test_split_partitions_rows() {
        let data = cells(50);
        for p in [1, 10, 25, 49] {
            let cv = CrossValidator::new(p, 10).set_seed(5);
            for trial in 0..10 {
                let split = cv.split(&data, trial).unwrap();
                assert_eq!(split.validation.len(), p);
                assert_eq!(split.training.len(), 50 - p);
                let training: HashSet<usize> = split.training.iter().copied().collect();
                let validation: HashSet<usize> = split.validation.iter().copied().collect();
                assert!(training.is_disjoint(&validation));
                let union: HashSet<usize> = training.union(&validation).copied().collect();
                assert_eq!(union, (0..50).collect::<HashSet<usize>>());
            }
        }
    }

    #[test]
    fn test_split_reproducible() {
        let data = cells(40);
        let cv = CrossValidator::new(10, 3).set_seed(9);
        assert_eq!(cv.split(&data, 2).unwrap(), cv.split(&data, 2).unwrap());
        assert_ne!(cv.split(&data, 1).unwrap(), cv.split(&data, 2).unwrap());
    }

    #[test]
    fn test_invalid_split_size() {
        let data = cells(20);
        for p in [0, 20, 21] {
            assert!(matches!(
                CrossValidator::new(p, 5).run(&data, &ModelSpec::SlopesOnly, Metric::RootMeanSquaredError),
                Err(CountError::InvalidSplitSize(..))
            ));
        }
    }

    #[test]
    fn test_run_scores_and_mean() {
        let data = cells(100);
        let result = CrossValidator::new(30, 25)
            .set_seed(1)
            .run(&data, &ModelSpec::SlopesOnly, Metric::RootMeanSquaredError)
            .unwrap();
        assert_eq!(result.scores.len(), 25);
        let mean = result.scores.iter().sum::<f64>() / 25.0;
        assert!((result.mean - mean).abs() < 1e-12);
        // Uniform noise on [-4, 4] has standard deviation 4 / sqrt(3).
        assert!(result.mean > 1.5 && result.mean < 3.5);
        assert!(result.standard_deviation().unwrap() > 0.0);
    }

    #[test]
    fn test_run_matches_manual_trial() {
        let data = cells(60);
        let cv = CrossValidator::new(15, 3).set_seed(4);
        let result = cv.run(&data, &ModelSpec::SharedIntercept, Metric::RootMeanSquaredError).unwrap();
        let split = cv.split(&data, 1).unwrap();
        let model = ModelSpec::SharedIntercept.fit(&data.subset(&split.training).unwrap()).unwrap();
        let valid = data.subset(&split.validation).unwrap();
        let expected = root_mean_squared_error(&valid.targets().unwrap(), &model.predict(&valid)).unwrap();
        assert!((result.scores[1] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_is_reproducible() {
        let data = cells(80);
        let cv = CrossValidator::new(20, 40).set_seed(3);
        let sequential = cv.run(&data, &ModelSpec::SlopesOnly, Metric::MeanAbsoluteError).unwrap();
        let parallel = cv
            .clone()
            .set_parallel(true, Some(4))
            .run(&data, &ModelSpec::SlopesOnly, Metric::MeanAbsoluteError)
            .unwrap();
        assert_eq!(sequential.scores, parallel.scores);
    }

    #[test]
    fn test_run_with_custom_score() {
        let data = cells(30);
        let result = CrossValidator::new(10, 5)
            .run_with(&data, &ModelSpec::SlopesOnly, |y, _| Ok(y.len() as f64))
            .unwrap();
        assert_eq!(result.scores, vec![10.0; 5]);
    }

    #[test]
    fn test_skip_degenerate_trials() {
        // Only two rows of stain two, so some training sets lose the stain.
        let mut rows: Vec<Observation> = (0..10)
            .map(|i| Observation::new(Stain::One, 1.0 + i as f64, Some(5 * (i + 1))).unwrap())
            .collect();
        rows.push(Observation::new(Stain::Two, 2.0, Some(16)).unwrap());
        rows.push(Observation::new(Stain::Two, 3.0, Some(24)).unwrap());
        let data = Dataset::new(rows);
        let cv = CrossValidator::new(6, 30).set_seed(2);
        assert!(cv.run(&data, &ModelSpec::SlopesOnly, Metric::RootMeanSquaredError).is_err());
        let result = cv
            .set_failure_policy(FailurePolicy::Skip)
            .run(&data, &ModelSpec::SlopesOnly, Metric::RootMeanSquaredError)
            .unwrap();
        assert!(!result.failed.is_empty());
        assert_eq!(result.scores.len() + result.failed.len(), 30);
    }

    #[test]
    fn test_stratified_split() {
        let data = cells(100);
        let cv = CrossValidator::new(20, 1).set_sample_method(SampleMethod::Stratified);
        let split = cv.split(&data, 0).unwrap();
        let valid = data.subset(&split.validation).unwrap();
        assert_eq!(valid.stain_fraction(Stain::Two), 0.5);
    }

    #[test]
    fn test_holdout_underestimate_with_shifted_stains() {
        let train = Dataset::from_csv("resources/cells_train.csv").unwrap();
        let test = Dataset::from_csv("resources/cells_test.csv").unwrap();
        let cv = CrossValidator::new(30, 200)
            .set_seed(2024)
            .run(&train, &ModelSpec::SlopesOnly, Metric::RootMeanSquaredError)
            .unwrap();
        let holdout = holdout_score(&train, &test, &ModelSpec::SlopesOnly, Metric::RootMeanSquaredError).unwrap();
        assert!(cv.mean < holdout);
    }

    #[test]
    fn test_stain_shift() {
        let train = Dataset::from_csv("resources/cells_train.csv").unwrap();
        let test = Dataset::from_csv("resources/cells_test.csv").unwrap();
        // 20 of 100 training rows and 45 of 60 test rows are stain 2.
        assert!((stain_shift(&train, &test) - 0.55).abs() < 1e-12);
        assert!(stain_shift(&train, &test) > STAIN_SHIFT_TOLERANCE);
        assert_eq!(stain_shift(&train, &train), 0.0);
        let balanced = cells(40);
        assert!(stain_shift(&balanced, &cells(60)) <= STAIN_SHIFT_TOLERANCE);
    }
}
