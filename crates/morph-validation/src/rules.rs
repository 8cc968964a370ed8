//! Reusable rule functions
//!
//! Each constructor returns a closure usable with
//! [`ValidationPolicy::rule`](crate::ValidationPolicy::rule) or
//! [`ValidationPolicy::tagged_rule`](crate::ValidationPolicy::tagged_rule).
//! Numeric and string rules reject any other kind, `Null` included, with
//! [`ValidationError::TypeMismatch`]. [`non_empty`] reports `Null` as
//! [`ValidationError::Empty`].

use crate::error::ValidationError;
use morph_types::Value;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

fn number(value: &Value) -> Result<f64, ValidationError> {
    value.as_float().ok_or(ValidationError::TypeMismatch {
        expected: "numeric",
        actual: value.kind(),
    })
}

fn text(value: &Value) -> Result<&str, ValidationError> {
    value.as_str().ok_or(ValidationError::TypeMismatch {
        expected: "str",
        actual: value.kind(),
    })
}

/// Inclusive lower bound
pub fn min(min: f64) -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static {
    move |value| {
        let actual = number(value)?;
        if actual < min {
            return Err(ValidationError::BelowMinimum { min, actual });
        }
        Ok(())
    }
}

/// Inclusive upper bound
pub fn max(max: f64) -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static {
    move |value| {
        let actual = number(value)?;
        if actual > max {
            return Err(ValidationError::AboveMaximum { max, actual });
        }
        Ok(())
    }
}

/// Zero or greater
pub fn non_negative() -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static {
    min(0.0)
}

/// Inclusive range, reporting whichever bound is violated
pub fn range(
    lower: f64,
    upper: f64,
) -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static {
    let below = min(lower);
    let above = max(upper);
    move |value| {
        below(value)?;
        above(value)
    }
}

/// Non-empty string or list
pub fn non_empty() -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static {
    |value| {
        let empty = match value {
            Value::Str(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        };
        if empty {
            Err(ValidationError::Empty)
        } else {
            Ok(())
        }
    }
}

/// Maximum string length in characters
pub fn max_length(
    max: usize,
) -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static {
    move |value| {
        let actual = text(value)?.chars().count();
        if actual > max {
            return Err(ValidationError::TooLong { max, actual });
        }
        Ok(())
    }
}

/// Plausible e-mail address
pub fn email() -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static {
    |value| {
        let s = text(value)?;
        if EMAIL.is_match(s) {
            Ok(())
        } else {
            Err(ValidationError::InvalidFormat {
                expected: "email address".to_string(),
                actual: s.to_string(),
            })
        }
    }
}

/// String matching a caller-supplied pattern
pub fn pattern(
    label: impl Into<String>,
    regex: Regex,
) -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static {
    let label = label.into();
    move |value| {
        let s = text(value)?;
        if regex.is_match(s) {
            Ok(())
        } else {
            Err(ValidationError::InvalidFormat {
                expected: label.clone(),
                actual: s.to_string(),
            })
        }
    }
}

/// Predicate with a fixed rejection message
pub fn custom<F>(
    reason: impl Into<String>,
    predicate: F,
) -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    let reason = reason.into();
    move |value| {
        if predicate(value) {
            Ok(())
        } else {
            Err(ValidationError::rejected(reason.clone()))
        }
    }
}
