//! Error types for the trend function engine

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Period or shift expression could not be resolved
    #[error("Time range error: {0}")]
    TimeParse(#[from] TimeParseError),

    /// Trend function evaluation failed
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// Rollup storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while resolving period and shift expressions
///
/// All of them are terminal for the call that produced them, there is
/// no partially resolved range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    /// No `<count><unit>` token at the start of the period
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// Period count is zero
    #[error("period must be greater than zero")]
    ZeroPeriod,

    /// Period spans more than a leap year
    #[error("period is too large")]
    PeriodTooLarge,

    /// Malformed shift or a unit that is not allowed in this position
    #[error("invalid period shift: {0}")]
    InvalidShift(String),

    /// Unexpected character inside a shift expression
    #[error("unexpected character starting at \"{0}\"")]
    UnexpectedCharacter(String),

    /// Shifted period ends too far from the evaluation time
    #[error("period shift is too large")]
    ShiftTooLarge,

    /// Broken-down time could not be converted to an absolute time
    #[error("cannot convert calendar time to timestamp")]
    InvalidTime,
}

/// Trend function evaluation errors
///
/// `NoData`, `Overflow` and `Unknown` mirror the non-normal result states
/// of a cached evaluation; `Storage` is a failed fallback query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// No rollup rows in the requested range
    #[error("not enough data")]
    NoData,

    /// Aggregate does not fit the numeric representation
    #[error("value is too large")]
    Overflow,

    /// Evaluation outcome is not known
    #[error("cannot evaluate trend function")]
    Unknown,

    /// Rollup storage query failed
    #[error("cannot query trends: {0}")]
    Storage(#[from] StoreError),
}

/// Errors reported by a rollup storage backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Query could not be executed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Table is not a trend table
    #[error("unknown table: {0}")]
    UnknownTable(String),
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value is out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name being validated
        field: String,
        /// The invalid value
        value: String,
        /// Minimum allowed value
        min: String,
        /// Maximum allowed value
        max: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    Failed(String),
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Configuration(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_error_messages() {
        assert_eq!(EvalError::NoData.to_string(), "not enough data");
        assert_eq!(EvalError::Overflow.to_string(), "value is too large");
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: EvalError = StoreError::QueryFailed("connection lost".into()).into();
        assert!(err.to_string().contains("connection lost"));

        let err: Error = err.into();
        assert!(matches!(err, Error::Eval(EvalError::Storage(_))));
    }

    #[test]
    fn test_unexpected_character_carries_input() {
        let err = TimeParseError::UnexpectedCharacter("*1d".into());
        assert!(err.to_string().contains("*1d"));
    }

    #[test]
    fn test_validation_error_into_configuration() {
        let err: Error = ValidationError::Failed("bad size".into()).into();
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("bad size")));
    }
}
