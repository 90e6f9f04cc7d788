use thiserror::Error;

/// Construction-time rejection of a record or argument.
///
/// These are never coerced: a validation failure stops the pipeline for the
/// fixture that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be positive: {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },

    #[error("outcome probabilities sum to {sum:.4}, expected 1.0 +/- 0.05")]
    ProbabilitySum { sum: f64 },

    #[error("malformed score {0:?}, expected \"H-A\"")]
    MalformedScore(String),

    #[error("invalid forecast record: {0}")]
    InvalidRecord(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("match {fixture_id} is not final (status: {status})")]
    NotFinal { fixture_id: String, status: String },

    #[error("prediction for {predicted} graded against result for {actual}")]
    FixtureMismatch { predicted: String, actual: String },
}

pub type Result<T, E = ValidationError> = std::result::Result<T, E>;

pub(crate) fn check_finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NonFinite { field })
    }
}

pub(crate) fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64> {
    let value = check_finite(field, value)?;
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<f64> {
    let value = check_finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::NonPositive { field, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_rejects_nan_before_bounds() {
        let err = check_range("confidence", f64::NAN, 0.0, 1.0).unwrap_err();
        assert_eq!(err, ValidationError::NonFinite { field: "confidence" });
    }

    #[test]
    fn range_check_is_inclusive() {
        assert_eq!(check_range("p", 0.0, 0.0, 1.0).unwrap(), 0.0);
        assert_eq!(check_range("p", 1.0, 0.0, 1.0).unwrap(), 1.0);
        assert!(check_range("p", 1.0001, 0.0, 1.0).is_err());
    }

    #[test]
    fn positive_check_rejects_zero() {
        assert!(matches!(
            check_positive("weight", 0.0),
            Err(ValidationError::NonPositive { .. })
        ));
    }
}
