//! Field validators.
//!
//! A validator runs after a field value has passed its type check. It
//! returns `Err(reason)` to reject the value; every validator declared on a
//! field is run and each rejection becomes its own error.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;

use crate::error::ConfigurationError;
use crate::types::value_type_name;

/// A named predicate over a type-valid field value.
pub trait Validator: Send + Sync {
    /// Name reported in `ValidatorFailed` errors.
    fn name(&self) -> &str;

    fn validate(&self, value: &Value) -> Result<(), String>;
}

impl fmt::Debug for dyn Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validator({})", self.name())
    }
}

/// Value must equal one of the listed literals.
#[derive(Debug, Clone)]
pub struct OneOf {
    allowed: Vec<Value>,
}

impl Validator for OneOf {
    fn name(&self) -> &str {
        "one_of"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if self.allowed.contains(value) {
            Ok(())
        } else {
            Err(format!("{} is not one of {}", value, Value::Array(self.allowed.clone())))
        }
    }
}

/// Length of a string (in characters) or sequence must fall within bounds.
#[derive(Debug, Clone)]
pub struct Length {
    min: usize,
    max: Option<usize>,
}

impl Validator for Length {
    fn name(&self) -> &str {
        "length"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        let len = match value {
            Value::String(s) => s.chars().count(),
            Value::Array(items) => items.len(),
            other => return Err(format!("{} has no length", value_type_name(other))),
        };
        if len < self.min {
            return Err(format!("length {} is shorter than {}", len, self.min));
        }
        match self.max {
            Some(max) if len > max => Err(format!("length {} is longer than {}", len, max)),
            _ => Ok(()),
        }
    }
}

/// Numeric bounds, both inclusive.
#[derive(Debug, Clone)]
pub struct Range {
    name: &'static str,
    min: Option<f64>,
    max: Option<f64>,
}

impl Validator for Range {
    fn name(&self) -> &str {
        self.name
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        let Some(n) = value.as_f64() else {
            return Err(format!("{} is not a number", value));
        };
        if let Some(min) = self.min {
            if n < min {
                return Err(format!("{} is less than {}", value, min));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                return Err(format!("{} is greater than {}", value, max));
            }
        }
        Ok(())
    }
}

/// String must match a regular expression.
#[derive(Debug, Clone)]
pub struct Pattern {
    name: &'static str,
    regex: Regex,
}

impl Validator for Pattern {
    fn name(&self) -> &str {
        self.name
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        match value.as_str() {
            Some(s) if self.regex.is_match(s) => Ok(()),
            Some(s) => Err(format!("\"{}\" does not match {}", s, self.regex.as_str())),
            None => Err(format!("{} is not a string", value)),
        }
    }
}

/// Wraps a caller-supplied boolean closure.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    func: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("name", &self.name).finish()
    }
}

impl Validator for Predicate {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if (self.func)(value) {
            Ok(())
        } else {
            Err(format!("{} was rejected", value))
        }
    }
}

pub fn one_of<I, T>(allowed: I) -> OneOf
where
    I: IntoIterator<Item = T>,
    T: Into<Value>,
{
    OneOf {
        allowed: allowed.into_iter().map(Into::into).collect(),
    }
}

/// Minimum length.
pub fn length(min: usize) -> Length {
    Length { min, max: None }
}

/// Length between `min` and `max` inclusive.
///
/// # Errors
///
/// Returns `ConfigurationError::InvalidValidator` if `min > max`.
pub fn length_between(min: usize, max: usize) -> Result<Length, ConfigurationError> {
    if min > max {
        return Err(ConfigurationError::InvalidValidator {
            validator: "length".into(),
            message: format!("minimum {} exceeds maximum {}", min, max),
        });
    }
    Ok(Length {
        min,
        max: Some(max),
    })
}

pub fn gte(min: f64) -> Range {
    Range {
        name: "gte",
        min: Some(min),
        max: None,
    }
}

pub fn lte(max: f64) -> Range {
    Range {
        name: "lte",
        min: None,
        max: Some(max),
    }
}

/// # Errors
///
/// Returns `ConfigurationError::InvalidValidator` if `min > max`.
pub fn between(min: f64, max: f64) -> Result<Range, ConfigurationError> {
    if min > max {
        return Err(ConfigurationError::InvalidValidator {
            validator: "between".into(),
            message: format!("minimum {} exceeds maximum {}", min, max),
        });
    }
    Ok(Range {
        name: "between",
        min: Some(min),
        max: Some(max),
    })
}

/// # Errors
///
/// Returns `ConfigurationError::InvalidPattern` if the expression does not compile.
pub fn pattern(expression: &str) -> Result<Pattern, ConfigurationError> {
    let regex = Regex::new(expression).map_err(|source| ConfigurationError::InvalidPattern {
        pattern: expression.to_string(),
        source,
    })?;
    Ok(Pattern {
        name: "pattern",
        regex,
    })
}

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// `pattern` preset for plausible email addresses, compiled once.
pub fn is_email() -> Result<Pattern, ConfigurationError> {
    static EMAIL: OnceLock<Pattern> = OnceLock::new();
    if let Some(email) = EMAIL.get() {
        return Ok(email.clone());
    }
    let email = Pattern {
        name: "email",
        ..pattern(EMAIL_PATTERN)?
    };
    Ok(EMAIL.get_or_init(|| email).clone())
}

pub fn predicate<F>(name: impl Into<String>, func: F) -> Predicate
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Predicate {
        name: name.into(),
        func: Arc::new(func),
    }
}
