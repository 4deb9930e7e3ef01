//! Schemer
//!
//! Declarative validation for schema-less documents.
//!
//! A [`Schema`] maps field names to [`FieldSpec`]s. Validating a document
//! walks every declared field, checks presence, nullability, type and
//! validators, and materializes defaults for absent fields. Every violation
//! is collected; validation itself never fails.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use schemer::{Array, ErrorKind, FieldSpec, Mixed, PrimitiveType, Schema};
//! use schemer::validators::one_of;
//! use serde_json::json;
//!
//! let name = Arc::new(Schema::new([
//!     ("first", FieldSpec::new(PrimitiveType::String).required()),
//!     ("last", FieldSpec::new(PrimitiveType::String).required()),
//! ]).unwrap());
//!
//! let post = Schema::new([
//!     ("author", FieldSpec::new(&name).required()),
//!     ("category", FieldSpec::new(PrimitiveType::String).validates(one_of(["cooking", "politics"]))),
//!     ("tags", FieldSpec::new(Array::new(PrimitiveType::String)).default(json!(["blog"]))),
//!     ("linked_id", FieldSpec::new(Mixed::new([PrimitiveType::Integer, PrimitiveType::String]).unwrap())),
//! ]).unwrap();
//!
//! let result = post.validate(&json!({
//!     "author": { "first": "John" },
//!     "category": "cooking",
//! }));
//!
//! // Missing nested field is reported with its full path...
//! assert_eq!(result.errors.len(), 1);
//! assert_eq!(result.errors[0].path, "author.last");
//! assert_eq!(result.errors[0].kind, ErrorKind::MissingRequiredField);
//!
//! // ...and defaults are applied regardless.
//! assert_eq!(result.document["tags"], json!(["blog"]));
//! ```
//!
//! # Field semantics
//!
//! | Document state | Field declares | Outcome |
//! |----------------|----------------|---------|
//! | absent | `default` | default inserted into the copy |
//! | absent | `required` | `MissingRequiredField` |
//! | `null` | `nullable` | accepted, no further checks |
//! | `null` | - | `NullNotAllowed` |
//! | present | - | type check, then every validator |
//!
//! Types are [`TypeSpec`]s: primitives, nested schemas, [`Mixed`] unions,
//! [`Array`]s, and resolvers that pick a type from the enclosing document.

mod array;
mod error;
mod field;
mod linter;
mod loader;
mod mixed;
mod schema;
mod types;
pub mod validators;

pub use array::Array;
pub use error::{ConfigurationError, ErrorKind, LoadError, ValidateError, ValidationError};
pub use field::{DefaultValue, FieldSpec};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{
    description_errors, load_json, load_json_str, load_schema, load_schema_str,
    schema_from_description,
};
pub use mixed::Mixed;
pub use schema::{Schema, Validation};
pub use types::{value_type_name, PrimitiveType, Resolver, ResolverFn, TypeSpec};
pub use validators::Validator;
