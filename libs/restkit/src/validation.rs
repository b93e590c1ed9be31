//! Input and result validation.
//!
//! A failed *input* validation is a client error (400); a handler that
//! produces an invalid *result* is a server error (500). Both surface as
//! problem responses carrying the violations.

use http::StatusCode;

use crate::error::{Problem, ValidationViolation};
use crate::mappers::Thrown;

/// Self-validating payload.
pub trait Validate {
    /// # Errors
    /// Returns all violations found.
    fn validate(&self) -> Result<(), Vec<ValidationViolation>>;
}

/// Validate an incoming payload; violations become a 400 problem.
///
/// # Errors
/// A [`Thrown`] carrying the 400 problem response.
pub fn require_valid<T: Validate>(value: T) -> Result<T, Thrown> {
    match value.validate() {
        Ok(()) => Ok(value),
        Err(violations) => Err(Thrown::from(
            Problem::new(
                StatusCode::BAD_REQUEST,
                "Bad Request",
                "request payload validation failed",
            )
            .with_errors(violations),
        )),
    }
}

/// Validate a handler result; violations become a 500 problem.
///
/// # Errors
/// A [`Thrown`] carrying the 500 problem response.
pub fn require_valid_result<T: Validate>(value: T) -> Result<T, Thrown> {
    match value.validate() {
        Ok(()) => Ok(value),
        Err(violations) => Err(Thrown::from(
            Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "response payload validation failed",
            )
            .with_errors(violations),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappers::WebError;

    #[derive(Debug)]
    struct NamePair {
        first: Option<String>,
        last: Option<String>,
    }

    impl Validate for NamePair {
        fn validate(&self) -> Result<(), Vec<ValidationViolation>> {
            let mut violations = Vec::new();
            if self.first.is_none() {
                violations.push(ValidationViolation::new("first", "must not be null"));
            }
            if self.last.is_none() {
                violations.push(ValidationViolation::new("last", "must not be null"));
            }
            if violations.is_empty() {
                Ok(())
            } else {
                Err(violations)
            }
        }
    }

    #[test]
    fn valid_value_passes_through() {
        let pair = NamePair {
            first: Some("Bob".to_owned()),
            last: Some("Builder".to_owned()),
        };
        assert!(require_valid(pair).is_ok());
    }

    #[test]
    fn invalid_input_maps_to_400() {
        let pair = NamePair {
            first: Some("Bob".to_owned()),
            last: None,
        };
        let thrown = require_valid(pair).unwrap_err();
        assert!(thrown.is::<WebError>());
    }

    #[test]
    fn invalid_result_maps_to_500() {
        let pair = NamePair {
            first: None,
            last: None,
        };
        let thrown = require_valid_result(pair).unwrap_err();
        assert!(thrown.is::<WebError>());
    }
}
