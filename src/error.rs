//! Error types for schema construction, loading and document validation.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Structural misuse detected while building a schema.
///
/// These are raised eagerly by constructors; they are never collected
/// during validation.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("mixed type needs at least 2 member types, got {count}")]
    TooFewMixedMembers { count: usize },

    #[error("field '{field}' is declared more than once")]
    DuplicateField { field: String },

    #[error("field '{field}' is required and cannot also declare a default")]
    RequiredWithDefault { field: String },

    #[error("default for field '{field}' does not match its type: expected {expected}, got {actual}")]
    DefaultTypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("default for field '{field}' is rejected by validator {validator}: {reason}")]
    DefaultRejected {
        field: String,
        validator: String,
        reason: String,
    },

    #[error("invalid {validator} validator: {message}")]
    InvalidValidator { validator: String, message: String },

    #[error("invalid pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors while reading a schema description and building a [`Schema`](crate::Schema) from it.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Description errors (exit code 2)
    #[error("invalid schema description: {}", errors.join("; "))]
    InvalidDescription { errors: Vec<String> },

    #[error("unknown definition \"{name}\" at {path}")]
    UnknownDefinition { name: String, path: String },

    #[error("definition \"{name}\" references itself through {}", chain.join(" -> "))]
    CyclicDefinition { name: String, chain: Vec<String> },

    #[error("at {path}: {source}")]
    Configuration {
        path: String,
        #[source]
        source: ConfigurationError,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors from the validate-or-fail entry points.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<ValidationError> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Load(e) => e.exit_code(),
            ValidateError::Invalid { .. } => 1,
        }
    }
}

/// What went wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    MissingRequiredField,
    NullNotAllowed,
    TypeMismatch { expected: String, actual: String },
    ValidatorFailed { validator: String, reason: String },
    /// Key present in the document but not declared by a strict schema.
    UnknownField,
}

/// Single validation error with path context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Dot/bracket path to the offending field (e.g. `comments[1].commenter`).
    /// Empty for the document root.
    pub path: String,
    #[serde(flatten)]
    pub kind: ErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, kind: ErrorKind) -> Self {
        let message = match &kind {
            ErrorKind::MissingRequiredField => "missing required field".to_string(),
            ErrorKind::NullNotAllowed => "null is not allowed".to_string(),
            ErrorKind::TypeMismatch { expected, actual } => {
                format!("expected {}, got {}", expected, actual)
            }
            ErrorKind::ValidatorFailed { validator, reason } => {
                format!("{} validator failed: {}", validator, reason)
            }
            ErrorKind::UnknownField => "field is not declared in the schema".to_string(),
        };
        Self {
            path: path.into(),
            kind,
            message,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "<document>: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}
