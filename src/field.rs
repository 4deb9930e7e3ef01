//! Per-field declarations.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::types::TypeSpec;
use crate::validators::Validator;

/// Value inserted for an absent field.
#[derive(Clone)]
pub enum DefaultValue {
    /// Deep-cloned on every materialization.
    Literal(Value),
    /// Called on every materialization.
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Produce a fresh value, never shared with a previous call.
    pub fn materialize(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Producer(produce) => produce(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Type and constraints of a single field.
///
/// ```
/// use schemer::{FieldSpec, PrimitiveType, validators::length};
/// use serde_json::json;
///
/// let tags = FieldSpec::new(PrimitiveType::List)
///     .default(json!(["blog"]))
///     .validates(length(1));
/// assert!(!tags.is_required());
/// ```
#[derive(Debug, Clone)]
pub struct FieldSpec {
    type_spec: TypeSpec,
    required: bool,
    nullable: bool,
    default: Option<DefaultValue>,
    validators: Vec<Arc<dyn Validator>>,
}

impl FieldSpec {
    /// An optional, non-nullable field of the given type.
    pub fn new(type_spec: impl Into<TypeSpec>) -> Self {
        Self {
            type_spec: type_spec.into(),
            required: false,
            nullable: false,
            default: None,
            validators: Vec::new(),
        }
    }

    /// Field must be present in the document.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// An explicit null is accepted and skips type and validator checks.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Literal default, cloned into each document that lacks the field.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Default computed by calling `produce` for each document that lacks the field.
    pub fn default_with<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(produce)));
        self
    }

    pub fn validates(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn type_spec(&self) -> &TypeSpec {
        &self.type_spec
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn validators(&self) -> &[Arc<dyn Validator>] {
        &self.validators
    }
}
