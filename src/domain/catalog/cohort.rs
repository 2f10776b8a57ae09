//! Cohort labels supplied by the identity layer.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// External label grouping users (e.g. `PREMIUM`, `VIP`).
///
/// Labels are trimmed and upper-cased so `vip` and `VIP` match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cohort(String);

impl Cohort {
    pub fn new(label: impl AsRef<str>) -> Result<Self, ValidationError> {
        let label = label.as_ref().trim();
        if label.is_empty() {
            return Err(ValidationError::empty_field("cohort"));
        }
        Ok(Self(label.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Cohort {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cohort> for String {
    fn from(cohort: Cohort) -> Self {
        cohort.0
    }
}
