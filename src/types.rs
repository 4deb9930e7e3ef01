//! Type specifications and the predicate layer that matches values against them.

use std::fmt;
use std::sync::Arc;

use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::array::Array;
use crate::error::{ErrorKind, ValidationError};
use crate::mixed::Mixed;
use crate::schema::Schema;

/// Returns the type name of a document value for error messages.
///
/// Numbers are split into `integer` and `float` so that mismatches against
/// integer fields read naturally.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Scalar and untyped container types a field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Integer,
    /// Any number; integers are accepted.
    Float,
    Boolean,
    /// RFC 3339 timestamp string.
    DateTime,
    /// Any mapping, contents unchecked.
    Object,
    /// Any sequence, elements unchecked.
    List,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Float => "float",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::DateTime => "datetime",
            PrimitiveType::Object => "object",
            PrimitiveType::List => "list",
        }
    }

    /// Whether `value` is an instance of this type.
    ///
    /// Booleans never satisfy the numeric types, and a float never
    /// satisfies `Integer` even when it has no fractional part.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (PrimitiveType::String, Value::String(_)) => true,
            (PrimitiveType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (PrimitiveType::Float, Value::Number(_)) => true,
            (PrimitiveType::Boolean, Value::Bool(_)) => true,
            (PrimitiveType::DateTime, Value::String(s)) => {
                chrono::DateTime::parse_from_rfc3339(s).is_ok()
            }
            (PrimitiveType::Object, Value::Object(_)) => true,
            (PrimitiveType::List, Value::Array(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature of a resolver: enclosing document in, concrete type out.
pub type ResolverFn = dyn Fn(&Map<String, Value>) -> TypeSpec + Send + Sync;

/// A document-dependent type.
///
/// The wrapped function is called with the document that contains the
/// field (not the field value) every time the field is checked. As the
/// member of an [`Array`], it is called with each element that is a
/// mapping instead.
#[derive(Clone)]
pub struct Resolver(Arc<ResolverFn>);

impl Resolver {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> TypeSpec + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    pub fn resolve(&self, document: &Map<String, Value>) -> TypeSpec {
        (self.0)(document)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver(..)")
    }
}

/// The declared type of a field.
#[derive(Debug, Clone)]
pub enum TypeSpec {
    Primitive(PrimitiveType),
    Schema(Arc<Schema>),
    Mixed(Mixed),
    Array(Array),
    Resolver(Resolver),
}

impl TypeSpec {
    /// Build a polymorphic type from a resolver function.
    pub fn resolver<F>(func: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> TypeSpec + Send + Sync + 'static,
    {
        TypeSpec::Resolver(Resolver::new(func))
    }

    /// Name used for the `expected` side of type mismatches.
    pub fn name(&self) -> String {
        match self {
            TypeSpec::Primitive(p) => p.as_str().to_string(),
            TypeSpec::Schema(_) => "object".to_string(),
            TypeSpec::Mixed(mixed) => mixed.name(),
            TypeSpec::Array(array) => array.name(),
            TypeSpec::Resolver(_) => "resolved type".to_string(),
        }
    }

    /// True when the concrete type can only be known from a document.
    pub fn depends_on_document(&self) -> bool {
        match self {
            TypeSpec::Resolver(_) => true,
            TypeSpec::Mixed(mixed) => mixed.members().iter().any(TypeSpec::depends_on_document),
            TypeSpec::Array(array) => array.member().depends_on_document(),
            TypeSpec::Primitive(_) | TypeSpec::Schema(_) => false,
        }
    }

    /// Whether `value` satisfies this type.
    ///
    /// `document` is the mapping that contains the value; resolvers are
    /// evaluated against it.
    pub fn matches(&self, value: &Value, document: &Map<String, Value>) -> bool {
        self.check(value, None, document, "", &mut Vec::new())
    }

    /// Check `value` and record every violation under `path`.
    ///
    /// When `target` is given it is the defaulted copy of `value`; nested
    /// schema defaults are written into it. Returns true when no error was
    /// recorded.
    pub(crate) fn check(
        &self,
        value: &Value,
        target: Option<&mut Value>,
        document: &Map<String, Value>,
        path: &str,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        match self {
            TypeSpec::Primitive(primitive) => {
                if primitive.matches(value) {
                    true
                } else {
                    errors.push(type_mismatch(path, primitive.as_str(), value));
                    false
                }
            }
            TypeSpec::Schema(schema) => match value {
                Value::Object(map) => {
                    schema.check_mapping(map, target.and_then(Value::as_object_mut), path, errors)
                }
                other => {
                    errors.push(type_mismatch(path, "object", other));
                    false
                }
            },
            TypeSpec::Mixed(mixed) => mixed.check(value, target, document, path, errors),
            TypeSpec::Array(array) => array.check(value, target, document, path, errors),
            TypeSpec::Resolver(resolver) => {
                let resolved = resolver.resolve(document);
                trace!("{}: resolved type to {}", display_path(path), resolved.name());
                resolved.check(value, target, document, path, errors)
            }
        }
    }
}

impl From<PrimitiveType> for TypeSpec {
    fn from(primitive: PrimitiveType) -> Self {
        TypeSpec::Primitive(primitive)
    }
}

impl From<Schema> for TypeSpec {
    fn from(schema: Schema) -> Self {
        TypeSpec::Schema(Arc::new(schema))
    }
}

impl From<Arc<Schema>> for TypeSpec {
    fn from(schema: Arc<Schema>) -> Self {
        TypeSpec::Schema(schema)
    }
}

impl From<&Arc<Schema>> for TypeSpec {
    fn from(schema: &Arc<Schema>) -> Self {
        TypeSpec::Schema(Arc::clone(schema))
    }
}

impl From<Mixed> for TypeSpec {
    fn from(mixed: Mixed) -> Self {
        TypeSpec::Mixed(mixed)
    }
}

impl From<Array> for TypeSpec {
    fn from(array: Array) -> Self {
        TypeSpec::Array(array)
    }
}

impl From<Resolver> for TypeSpec {
    fn from(resolver: Resolver) -> Self {
        TypeSpec::Resolver(resolver)
    }
}

pub(crate) fn type_mismatch(path: &str, expected: &str, value: &Value) -> ValidationError {
    ValidationError::new(
        path,
        ErrorKind::TypeMismatch {
            expected: expected.to_string(),
            actual: value_type_name(value).to_string(),
        },
    )
}

/// Path of a named field below `parent`.
pub(crate) fn field_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

/// Path of a sequence element below `parent`.
pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

pub(crate) fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<document>"
    } else {
        path
    }
}
