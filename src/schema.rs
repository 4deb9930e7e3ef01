//! Schemas and the document validation entry point.

use log::debug;
use serde_json::{Map, Value};

use crate::error::{ConfigurationError, ErrorKind, ValidateError, ValidationError};
use crate::field::{DefaultValue, FieldSpec};
use crate::types::{field_path, type_mismatch, value_type_name};

/// An ordered set of field declarations.
///
/// Schemas are immutable once built and can be shared between other
/// schemas (wrap in `Arc`) and across threads.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<(String, FieldSpec)>,
    strict: bool,
}

/// Outcome of validating one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    /// Every violation found, in field declaration order.
    pub errors: Vec<ValidationError>,
    /// Copy of the input with defaults materialized for absent fields.
    pub document: Value,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The defaulted document, or every error if there were any.
    pub fn into_result(self) -> Result<Value, ValidateError> {
        if self.errors.is_empty() {
            Ok(self.document)
        } else {
            Err(ValidateError::Invalid {
                errors: self.errors,
            })
        }
    }
}

impl Schema {
    /// Build a non-strict schema from `(name, spec)` pairs.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a name is repeated, a field is both
    /// required and defaulted, or a literal default does not satisfy its
    /// own type and validators.
    pub fn new<I, S>(fields: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (S, FieldSpec)>,
        S: Into<String>,
    {
        let mut declared: Vec<(String, FieldSpec)> = Vec::new();
        for (name, spec) in fields {
            let name = name.into();
            if declared.iter().any(|(existing, _)| *existing == name) {
                return Err(ConfigurationError::DuplicateField { field: name });
            }
            verify_field(&name, &spec)?;
            declared.push((name, spec));
        }
        Ok(Self {
            fields: declared,
            strict: false,
        })
    }

    /// Set strict mode: undeclared keys are reported as `UnknownField`.
    ///
    /// Applies to this schema only, not to schemas nested in it.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, spec)| spec)
    }

    /// Validate `document` and return every error plus a defaulted copy.
    ///
    /// Never fails: an invalid document yields a non-empty error list, and
    /// defaults are applied regardless of validity.
    pub fn validate(&self, document: &Value) -> Validation {
        let mut defaulted = document.clone();
        let mut errors = Vec::new();
        match document {
            Value::Object(map) => {
                self.check_mapping(map, defaulted.as_object_mut(), "", &mut errors);
            }
            other => errors.push(type_mismatch("", "object", other)),
        }
        Validation {
            errors,
            document: defaulted,
        }
    }

    /// Validate and write defaults straight into `document`.
    pub fn validate_in_place(&self, document: &mut Value) -> Vec<ValidationError> {
        let Validation {
            errors,
            document: defaulted,
        } = self.validate(document);
        *document = defaulted;
        errors
    }

    pub fn is_valid(&self, document: &Value) -> bool {
        match document {
            Value::Object(map) => self.check_mapping(map, None, "", &mut Vec::new()),
            _ => false,
        }
    }

    /// Check one mapping against the declared fields.
    ///
    /// `original` is read for presence and values; defaults go into
    /// `target`, the copy being built for the caller. Returns true when no
    /// error was recorded.
    pub(crate) fn check_mapping(
        &self,
        original: &Map<String, Value>,
        mut target: Option<&mut Map<String, Value>>,
        path: &str,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let before = errors.len();

        for (name, field) in &self.fields {
            let path = field_path(path, name);
            match original.get(name) {
                None => {
                    if let Some(default) = field.default_value() {
                        if let Some(target) = target.as_deref_mut() {
                            let filled = fill_default(field, default, original, &path);
                            target.insert(name.clone(), filled);
                            debug!("{}: applied default", path);
                        }
                    } else if field.is_required() {
                        errors.push(ValidationError::new(path, ErrorKind::MissingRequiredField));
                    }
                }
                Some(Value::Null) => {
                    if !field.is_nullable() {
                        errors.push(ValidationError::new(path, ErrorKind::NullNotAllowed));
                    }
                }
                Some(value) => {
                    let field_target = target.as_deref_mut().and_then(|t| t.get_mut(name));
                    let type_valid =
                        field
                            .type_spec()
                            .check(value, field_target, original, &path, errors);
                    if type_valid {
                        run_validators(field, value, &path, errors);
                    }
                }
            }
        }

        if self.strict {
            for key in original.keys() {
                if self.field(key).is_none() {
                    errors.push(ValidationError::new(field_path(path, key), ErrorKind::UnknownField));
                }
            }
        }

        errors.len() == before
    }
}

/// Materialize a default and apply the defaults its own type declares.
///
/// Errors found inside the default are not reported; literal defaults
/// were checked when the schema was built.
fn fill_default(
    field: &FieldSpec,
    default: &DefaultValue,
    enclosing: &Map<String, Value>,
    path: &str,
) -> Value {
    let value = default.materialize();
    let mut filled = value.clone();
    field
        .type_spec()
        .check(&value, Some(&mut filled), enclosing, path, &mut Vec::new());
    filled
}

fn run_validators(field: &FieldSpec, value: &Value, path: &str, errors: &mut Vec<ValidationError>) {
    for validator in field.validators() {
        if let Err(reason) = validator.validate(value) {
            errors.push(ValidationError::new(
                path,
                ErrorKind::ValidatorFailed {
                    validator: validator.name().to_string(),
                    reason,
                },
            ));
        }
    }
}

/// Construction-time checks for a single field.
fn verify_field(name: &str, field: &FieldSpec) -> Result<(), ConfigurationError> {
    let Some(default) = field.default_value() else {
        return Ok(());
    };
    if field.is_required() {
        return Err(ConfigurationError::RequiredWithDefault {
            field: name.to_string(),
        });
    }

    // Producers and document-dependent types can only be checked per document.
    let DefaultValue::Literal(value) = default else {
        return Ok(());
    };
    if field.type_spec().depends_on_document() || (value.is_null() && field.is_nullable()) {
        return Ok(());
    }
    if !field.type_spec().matches(value, &Map::new()) {
        return Err(ConfigurationError::DefaultTypeMismatch {
            field: name.to_string(),
            expected: field.type_spec().name(),
            actual: value_type_name(value).to_string(),
        });
    }
    for validator in field.validators() {
        if let Err(reason) = validator.validate(value) {
            return Err(ConfigurationError::DefaultRejected {
                field: name.to_string(),
                validator: validator.name().to_string(),
                reason,
            });
        }
    }
    Ok(())
}
