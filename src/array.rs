//! Homogeneous sequence types.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::types::{index_path, type_mismatch, TypeSpec};

/// A sequence whose every element satisfies one member type.
#[derive(Debug, Clone)]
pub struct Array {
    member: Box<TypeSpec>,
}

impl Array {
    pub fn new(member: impl Into<TypeSpec>) -> Self {
        Self {
            member: Box::new(member.into()),
        }
    }

    pub fn member(&self) -> &TypeSpec {
        &self.member
    }

    /// e.g. `array(string)`
    pub fn name(&self) -> String {
        format!("array({})", self.member.name())
    }

    pub fn matches(&self, value: &Value, document: &Map<String, Value>) -> bool {
        self.check(value, None, document, "", &mut Vec::new())
    }

    /// Every failing element is reported under its own index.
    ///
    /// A mapping element is the document its member resolver sees, so
    /// elements of one list can resolve to different types. Other elements
    /// resolve against the mapping holding the list.
    pub(crate) fn check(
        &self,
        value: &Value,
        target: Option<&mut Value>,
        document: &Map<String, Value>,
        path: &str,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let Value::Array(items) = value else {
            errors.push(type_mismatch(path, &self.name(), value));
            return false;
        };

        let mut target_items = target.and_then(Value::as_array_mut);
        let mut valid = true;
        for (i, item) in items.iter().enumerate() {
            let item_target = target_items.as_deref_mut().and_then(|t| t.get_mut(i));
            let item_path = index_path(path, i);
            let context = item.as_object().unwrap_or(document);
            valid &= self
                .member
                .check(item, item_target, context, &item_path, errors);
        }
        valid
    }
}
