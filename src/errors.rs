//! Errors
//!
//! Custom error types used throughout the `cellcount` crate.
use thiserror::Error;

/// Errors that can occur while loading data, fitting or resampling.
#[derive(Debug, Error)]
pub enum CountError {
    /// Not enough rows, or a rank deficient design matrix.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),
    /// First value is the length of the truth, second the length of the prediction.
    #[error("Length mismatch: {0} true values and {1} predicted values, both must be equal and non-empty.")]
    LengthMismatch(usize, usize),
    /// First value is the requested split size, second the number of rows available.
    #[error("Invalid split size {0} for a dataset of {1} rows, expected a value in 1..{1}.")]
    InvalidSplitSize(usize, usize),
    /// A quantile or moment was requested over zero values.
    #[error("Cannot compute {0} of an empty set of values.")]
    EmptyQuantileInput(String),
    /// A row without an observed count was used where a target is needed.
    #[error("Row {0} has no observed count.")]
    MissingCount(usize),
    /// First value is the offending index, second the number of rows.
    #[error("Index {0} is out of bounds for a dataset of {1} rows.")]
    IndexOutOfBounds(usize, usize),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// Unable to read a dataset or config.
    #[error("Unable to read: {0}")]
    UnableToRead(String),
    /// Unable to write a config.
    #[error("Unable to write: {0}")]
    UnableToWrite(String),
    /// Every trial of a resampling run failed and was skipped.
    #[error("All {0} trials failed, last error: {1}")]
    NoSuccessfulTrials(usize, String),
    /// The rayon thread pool could not be built.
    #[error("Unable to build thread pool: {0}")]
    ThreadPool(String),
}
