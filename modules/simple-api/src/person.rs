use restkit::{Validate, ValidationViolation};
use serde::{Deserialize, Serialize};

/// JSON payload echoed by the person endpoints. `last` is required by
/// validation but optional on the wire so invalid payloads still decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub first: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

impl Person {
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last: Some(last.into()),
        }
    }
}

impl Validate for Person {
    fn validate(&self) -> Result<(), Vec<ValidationViolation>> {
        let mut violations = Vec::new();
        if self.first.is_empty() {
            violations.push(ValidationViolation::new("first", "must not be blank"));
        }
        if self.last.as_deref().unwrap_or_default().is_empty() {
            violations.push(ValidationViolation::new("last", "must not be blank"));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
