//! Validation errors
//!
//! Rules fail with a typed [`ValidationError`] rather than a boolean so the
//! cause stays readable. A validator run collects every failure into one
//! [`Errors`] value; [`Errors::empty`] stands for "no errors".

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Failure of a single validation rule
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// Value has the wrong runtime kind for the rule
    #[error("expected {expected} value, got {actual}")]
    TypeMismatch {
        /// Kind the rule checks
        expected: &'static str,
        /// Kind that was found
        actual: &'static str,
    },

    /// Numeric lower bound violated
    #[error("value {actual} is below lower bound {min}")]
    BelowMinimum {
        /// Inclusive lower bound
        min: f64,
        /// Offending value
        actual: f64,
    },

    /// Numeric upper bound violated
    #[error("value {actual} exceeds upper bound {max}")]
    AboveMaximum {
        /// Inclusive upper bound
        max: f64,
        /// Offending value
        actual: f64,
    },

    /// Length limit exceeded
    #[error("length {actual} exceeds maximum {max}")]
    TooLong {
        /// Maximum length
        max: usize,
        /// Actual length
        actual: usize,
    },

    /// Empty string or list
    #[error("value must not be empty")]
    Empty,

    /// String does not match the expected format
    #[error("'{actual}' is not a valid {expected}")]
    InvalidFormat {
        /// Name of the expected format
        expected: String,
        /// Offending text
        actual: String,
    },

    /// Custom rule rejection
    #[error("{reason}")]
    Rejected {
        /// Human-readable cause
        reason: String,
    },
}

impl ValidationError {
    /// Create custom rejection
    #[inline]
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// One rejected field value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    /// Field name as declared
    pub field: String,
    /// Canonical policy name the rule came from
    pub policy: String,
    /// Tags the failing rule required (empty for base rules)
    pub required_tags: BTreeSet<String>,
    /// Rule failure
    pub error: ValidationError,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.required_tags.is_empty() {
            write!(f, "{}: {}", self.field, self.error)
        } else {
            let tags: Vec<&str> = self.required_tags.iter().map(String::as_str).collect();
            write!(f, "{} [{}]: {}", self.field, tags.join(","), self.error)
        }
    }
}

/// Immutable set of validation failures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Errors {
    violations: Vec<FieldViolation>,
}

impl Errors {
    /// The "no errors" value
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap collected violations
    #[inline]
    #[must_use]
    pub fn from_violations(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// Check for no errors
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Iterate in detection order
    pub fn iter(&self) -> impl Iterator<Item = &FieldViolation> {
        self.violations.iter()
    }

    /// Violations for one field
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldViolation> {
        self.violations.iter().filter(move |v| v.field == field)
    }

    /// Names of fields with at least one violation, in first-seen order
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for v in &self.violations {
            if !seen.contains(&v.field.as_str()) {
                seen.push(&v.field);
            }
        }
        seen
    }

    /// Combine two error sets, keeping order
    #[must_use]
    pub fn merge(mut self, other: Errors) -> Self {
        self.violations.extend(other.violations);
        self
    }

    /// `Ok(())` when empty, otherwise `Err(self)`
    ///
    /// # Errors
    /// Returns the set itself when it holds any violation
    pub fn into_result(self) -> Result<(), Errors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no errors");
        }
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a FieldViolation;
    type IntoIter = std::slice::Iter<'a, FieldViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}
