//! Schema descriptions: JSON documents that declare a [`Schema`].
//!
//! A description is checked against an embedded JSON Schema before it is
//! built, so shape errors come back with the JSON Pointer of the offending
//! node. See [`schema_from_description`] for the accepted format.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use chrono::{SecondsFormat, Utc};
use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::array::Array;
use crate::error::{ConfigurationError, LoadError};
use crate::field::FieldSpec;
use crate::mixed::Mixed;
use crate::schema::Schema;
use crate::types::{PrimitiveType, TypeSpec};
use crate::validators;

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_json_str(&content)
}

/// Parse a JSON document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_json_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load and build a schema from a description file.
pub fn load_schema(path: &Path) -> Result<Schema, LoadError> {
    debug!("loading schema description from {}", path.display());
    let description = load_json(path)?;
    schema_from_description(&description)
}

/// Build a schema from a description held in a string.
pub fn load_schema_str(content: &str) -> Result<Schema, LoadError> {
    let description = load_json_str(content)?;
    schema_from_description(&description)
}

/// Shape errors in a description, as `pointer: message` strings.
///
/// Empty when the description is well formed. Semantic problems (unknown
/// references, invalid mixed types) are only found by building it.
pub fn description_errors(description: &Value) -> Vec<String> {
    description_issues(description)
        .into_iter()
        .map(|(pointer, message)| format!("{}: {}", pointer, message))
        .collect()
}

/// Shape errors as `(pointer, message)` pairs.
pub(crate) fn description_issues(description: &Value) -> Vec<(String, String)> {
    let validator = match description_validator() {
        Ok(v) => v,
        Err(message) => return vec![("/".into(), message.to_string())],
    };

    validator
        .iter_errors(description)
        .map(|e| {
            let pointer = e.instance_path.to_string();
            let pointer = if pointer.is_empty() { "/".to_string() } else { pointer };
            (pointer, e.to_string())
        })
        .collect()
}

/// The compiled meta-schema, built on first use.
fn description_validator() -> Result<&'static jsonschema::Validator, &'static str> {
    static VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            let meta: Value = serde_json::from_str(DESCRIPTION_META_SCHEMA)
                .map_err(|e| format!("description meta-schema is not valid JSON: {}", e))?;
            jsonschema::validator_for(&meta)
                .map_err(|e| format!("description meta-schema is invalid: {}", e))
        })
        .as_ref()
        .map_err(String::as_str)
}

/// Build a schema from a JSON description.
///
/// ```
/// use schemer::schema_from_description;
/// use serde_json::json;
///
/// let schema = schema_from_description(&json!({
///     "definitions": {
///         "name": { "fields": {
///             "first": { "type": "string", "required": true },
///             "last": { "type": "string", "required": true }
///         } }
///     },
///     "fields": {
///         "author": { "type": { "ref": "name" }, "required": true },
///         "tags": {
///             "type": { "array": "string" },
///             "default": ["blog"],
///             "validates": [{ "length": { "min": 1 } }]
///         },
///         "misc": { "type": { "mixed": ["string", "integer"] } }
///     }
/// })).unwrap();
///
/// let result = schema.validate(&json!({ "author": { "first": "John", "last": "Humphreys" } }));
/// assert!(result.is_valid());
/// assert_eq!(result.document["tags"], json!(["blog"]));
/// ```
///
/// # Errors
///
/// Returns `LoadError::InvalidDescription` for shape errors,
/// `LoadError::UnknownDefinition`/`CyclicDefinition` for bad references, and
/// `LoadError::Configuration` when a declaration is rejected by a constructor.
pub fn schema_from_description(description: &Value) -> Result<Schema, LoadError> {
    let errors = description_errors(description);
    if !errors.is_empty() {
        return Err(LoadError::InvalidDescription { errors });
    }

    let parsed = RootDescription::deserialize(description).map_err(|e| invalid("/", e))?;
    let mut builder = Builder {
        definitions: &parsed.definitions,
        built: HashMap::new(),
        in_progress: Vec::new(),
    };
    let schema = builder.build_schema(&parsed.body, "")?;
    debug!(
        "built schema with {} field(s) and {} definition(s)",
        schema.fields().count(),
        builder.built.len()
    );
    Ok(schema)
}

// --- Description format ---

#[derive(Debug, Deserialize)]
struct RootDescription {
    #[serde(default)]
    definitions: Map<String, Value>,
    #[serde(flatten)]
    body: SchemaBody,
}

#[derive(Debug, Deserialize)]
struct SchemaBody {
    #[serde(default)]
    strict: bool,
    // Kept raw so declaration order survives and each field is parsed with its own path.
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct FieldDescription {
    #[serde(rename = "type")]
    type_desc: TypeDescription,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    nullable: bool,
    default: Option<Value>,
    #[serde(default)]
    default_now: bool,
    #[serde(default)]
    validates: Vec<ValidatorDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeDescription {
    Primitive(PrimitiveType),
    Composite(CompositeType),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CompositeType {
    Schema(SchemaBody),
    Ref(String),
    Array(Box<TypeDescription>),
    Mixed(Vec<TypeDescription>),
    Select(Box<SelectDescription>),
}

#[derive(Debug, Deserialize)]
struct SelectDescription {
    when: String,
    then: TypeDescription,
    #[serde(rename = "else")]
    otherwise: TypeDescription,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ValidatorDescription {
    OneOf(Vec<Value>),
    Length { min: usize, max: Option<usize> },
    Gte(f64),
    Lte(f64),
    Between { min: f64, max: f64 },
    Pattern(String),
    Email,
}

// --- Building ---

struct Builder<'a> {
    definitions: &'a Map<String, Value>,
    built: HashMap<String, Arc<Schema>>,
    in_progress: Vec<String>,
}

impl Builder<'_> {
    fn build_schema(&mut self, body: &SchemaBody, path: &str) -> Result<Schema, LoadError> {
        let mut fields = Vec::with_capacity(body.fields.len());
        for (name, raw) in &body.fields {
            let field_path = format!("{}/fields/{}", path, escape_pointer(name));
            let desc = FieldDescription::deserialize(raw).map_err(|e| invalid(&field_path, e))?;
            fields.push((name.clone(), self.build_field(&desc, &field_path)?));
        }
        let schema = Schema::new(fields).map_err(|source| configuration(path, source))?;
        Ok(schema.strict(body.strict))
    }

    fn build_field(&mut self, desc: &FieldDescription, path: &str) -> Result<FieldSpec, LoadError> {
        let type_spec = self.build_type(&desc.type_desc, &format!("{}/type", path))?;
        let mut field = FieldSpec::new(type_spec);
        if desc.required {
            field = field.required();
        }
        if desc.nullable {
            field = field.nullable();
        }
        if let Some(value) = &desc.default {
            field = field.default(value.clone());
        }
        if desc.default_now {
            field = field.default_with(|| {
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
            });
        }
        for (i, validator) in desc.validates.iter().enumerate() {
            let validator_path = format!("{}/validates/{}", path, i);
            field = add_validator(field, validator).map_err(|e| configuration(&validator_path, e))?;
        }
        Ok(field)
    }

    fn build_type(&mut self, desc: &TypeDescription, path: &str) -> Result<TypeSpec, LoadError> {
        let composite = match desc {
            TypeDescription::Primitive(primitive) => return Ok(TypeSpec::Primitive(*primitive)),
            TypeDescription::Composite(composite) => composite,
        };
        match composite {
            CompositeType::Schema(body) => {
                let schema = self.build_schema(body, &format!("{}/schema", path))?;
                Ok(schema.into())
            }
            CompositeType::Ref(name) => Ok(self.definition(name, path)?.into()),
            CompositeType::Array(member) => {
                let member = self.build_type(member, &format!("{}/array", path))?;
                Ok(Array::new(member).into())
            }
            CompositeType::Mixed(members) => {
                let mut specs = Vec::with_capacity(members.len());
                for (i, member) in members.iter().enumerate() {
                    specs.push(self.build_type(member, &format!("{}/mixed/{}", path, i))?);
                }
                let mixed = Mixed::new(specs).map_err(|e| configuration(path, e))?;
                Ok(mixed.into())
            }
            CompositeType::Select(select) => {
                let then = self.build_type(&select.then, &format!("{}/select/then", path))?;
                let otherwise = self.build_type(&select.otherwise, &format!("{}/select/else", path))?;
                let when: Vec<String> = select.when.split('.').map(String::from).collect();
                Ok(TypeSpec::resolver(move |document| {
                    if lookup(document, &when).is_some_and(|v| !v.is_null()) {
                        then.clone()
                    } else {
                        otherwise.clone()
                    }
                }))
            }
        }
    }

    /// Build (once) and return a named definition.
    fn definition(&mut self, name: &str, path: &str) -> Result<Arc<Schema>, LoadError> {
        if let Some(schema) = self.built.get(name) {
            return Ok(Arc::clone(schema));
        }
        if let Some(start) = self.in_progress.iter().position(|n| n == name) {
            let mut chain = self.in_progress[start..].to_vec();
            chain.push(name.to_string());
            return Err(LoadError::CyclicDefinition {
                name: name.to_string(),
                chain,
            });
        }
        let raw = self
            .definitions
            .get(name)
            .ok_or_else(|| LoadError::UnknownDefinition {
                name: name.to_string(),
                path: path.to_string(),
            })?;

        let def_path = format!("/definitions/{}", escape_pointer(name));
        let body = SchemaBody::deserialize(raw).map_err(|e| invalid(&def_path, e))?;

        self.in_progress.push(name.to_string());
        let built = self.build_schema(&body, &def_path);
        self.in_progress.pop();

        let schema = Arc::new(built?);
        self.built.insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }
}

fn add_validator(
    field: FieldSpec,
    desc: &ValidatorDescription,
) -> Result<FieldSpec, ConfigurationError> {
    Ok(match desc {
        ValidatorDescription::OneOf(values) => field.validates(validators::one_of(values.clone())),
        ValidatorDescription::Length { min, max: None } => field.validates(validators::length(*min)),
        ValidatorDescription::Length {
            min,
            max: Some(max),
        } => field.validates(validators::length_between(*min, *max)?),
        ValidatorDescription::Gte(min) => field.validates(validators::gte(*min)),
        ValidatorDescription::Lte(max) => field.validates(validators::lte(*max)),
        ValidatorDescription::Between { min, max } => {
            field.validates(validators::between(*min, *max)?)
        }
        ValidatorDescription::Pattern(expression) => {
            field.validates(validators::pattern(expression)?)
        }
        ValidatorDescription::Email => field.validates(validators::is_email()?),
    })
}

/// Follow a dotted path from the enclosing document.
fn lookup<'a>(document: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = document.get(first)?;
    for segment in rest {
        current = current.get(segment.as_str())?;
    }
    Some(current)
}

/// Escape a key for use in a JSON Pointer (RFC 6901).
pub(crate) fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn invalid(path: &str, error: serde_json::Error) -> LoadError {
    let path = if path.is_empty() { "/" } else { path };
    LoadError::InvalidDescription {
        errors: vec![format!("{}: {}", path, error)],
    }
}

fn configuration(path: &str, source: ConfigurationError) -> LoadError {
    let path = if path.is_empty() { "/" } else { path };
    LoadError::Configuration {
        path: path.to_string(),
        source,
    }
}

/// JSON Schema that every description must satisfy.
const DESCRIPTION_META_SCHEMA: &str = r##"{
    "$schema": "https://json-schema.org/draft/2020-12/schema",
    "$ref": "#/$defs/root",
    "$defs": {
        "root": {
            "type": "object",
            "required": ["fields"],
            "additionalProperties": false,
            "properties": {
                "strict": { "type": "boolean" },
                "definitions": {
                    "type": "object",
                    "additionalProperties": { "$ref": "#/$defs/body" }
                },
                "fields": { "$ref": "#/$defs/fields" }
            }
        },
        "body": {
            "type": "object",
            "required": ["fields"],
            "additionalProperties": false,
            "properties": {
                "strict": { "type": "boolean" },
                "fields": { "$ref": "#/$defs/fields" }
            }
        },
        "fields": {
            "type": "object",
            "additionalProperties": { "$ref": "#/$defs/field" }
        },
        "field": {
            "type": "object",
            "required": ["type"],
            "additionalProperties": false,
            "properties": {
                "type": { "$ref": "#/$defs/type" },
                "required": { "type": "boolean" },
                "nullable": { "type": "boolean" },
                "default": { "not": { "type": "null" } },
                "default_now": { "type": "boolean" },
                "validates": {
                    "type": "array",
                    "items": { "$ref": "#/$defs/validator" }
                }
            },
            "not": { "required": ["default", "default_now"] }
        },
        "type": {
            "oneOf": [
                { "enum": ["string", "integer", "float", "boolean", "datetime", "object", "list"] },
                {
                    "type": "object",
                    "required": ["schema"],
                    "additionalProperties": false,
                    "properties": { "schema": { "$ref": "#/$defs/body" } }
                },
                {
                    "type": "object",
                    "required": ["ref"],
                    "additionalProperties": false,
                    "properties": { "ref": { "type": "string", "minLength": 1 } }
                },
                {
                    "type": "object",
                    "required": ["array"],
                    "additionalProperties": false,
                    "properties": { "array": { "$ref": "#/$defs/type" } }
                },
                {
                    "type": "object",
                    "required": ["mixed"],
                    "additionalProperties": false,
                    "properties": {
                        "mixed": { "type": "array", "items": { "$ref": "#/$defs/type" } }
                    }
                },
                {
                    "type": "object",
                    "required": ["select"],
                    "additionalProperties": false,
                    "properties": {
                        "select": {
                            "type": "object",
                            "required": ["when", "then", "else"],
                            "additionalProperties": false,
                            "properties": {
                                "when": { "type": "string", "minLength": 1 },
                                "then": { "$ref": "#/$defs/type" },
                                "else": { "$ref": "#/$defs/type" }
                            }
                        }
                    }
                }
            ]
        },
        "validator": {
            "oneOf": [
                { "const": "email" },
                {
                    "type": "object",
                    "required": ["one_of"],
                    "additionalProperties": false,
                    "properties": { "one_of": { "type": "array", "minItems": 1 } }
                },
                {
                    "type": "object",
                    "required": ["length"],
                    "additionalProperties": false,
                    "properties": {
                        "length": {
                            "type": "object",
                            "required": ["min"],
                            "additionalProperties": false,
                            "properties": {
                                "min": { "type": "integer", "minimum": 0 },
                                "max": { "type": "integer", "minimum": 0 }
                            }
                        }
                    }
                },
                {
                    "type": "object",
                    "required": ["gte"],
                    "additionalProperties": false,
                    "properties": { "gte": { "type": "number" } }
                },
                {
                    "type": "object",
                    "required": ["lte"],
                    "additionalProperties": false,
                    "properties": { "lte": { "type": "number" } }
                },
                {
                    "type": "object",
                    "required": ["between"],
                    "additionalProperties": false,
                    "properties": {
                        "between": {
                            "type": "object",
                            "required": ["min", "max"],
                            "additionalProperties": false,
                            "properties": {
                                "min": { "type": "number" },
                                "max": { "type": "number" }
                            }
                        }
                    }
                },
                {
                    "type": "object",
                    "required": ["pattern"],
                    "additionalProperties": false,
                    "properties": { "pattern": { "type": "string" } }
                }
            ]
        }
    }
}"##;
