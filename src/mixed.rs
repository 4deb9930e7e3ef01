//! Union types.

use serde_json::{Map, Value};

use crate::error::{ConfigurationError, ValidationError};
use crate::types::{type_mismatch, TypeSpec};

/// A type satisfied by a value matching any one of its members.
///
/// Members are tried in declaration order and the first match wins.
#[derive(Debug, Clone)]
pub struct Mixed {
    members: Vec<TypeSpec>,
}

impl Mixed {
    /// Create a union of at least two member types.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::TooFewMixedMembers` when fewer than two
    /// members are given.
    pub fn new<I, T>(members: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeSpec>,
    {
        let members: Vec<TypeSpec> = members.into_iter().map(Into::into).collect();
        if members.len() < 2 {
            return Err(ConfigurationError::TooFewMixedMembers {
                count: members.len(),
            });
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[TypeSpec] {
        &self.members
    }

    /// e.g. `mixed(integer, string)`
    pub fn name(&self) -> String {
        let names: Vec<String> = self.members.iter().map(TypeSpec::name).collect();
        format!("mixed({})", names.join(", "))
    }

    /// Whether `value` is an instance of any member type.
    pub fn matches(&self, value: &Value, document: &Map<String, Value>) -> bool {
        self.members.iter().any(|m| m.matches(value, document))
    }

    pub(crate) fn check(
        &self,
        value: &Value,
        target: Option<&mut Value>,
        document: &Map<String, Value>,
        path: &str,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        match self.members.iter().find(|m| m.matches(value, document)) {
            Some(member) => {
                // Re-run the winning member so nested schema defaults land in the copy.
                if target.is_some() {
                    member.check(value, target, document, path, errors);
                }
                true
            }
            None => {
                errors.push(type_mismatch(path, &self.name(), value));
                false
            }
        }
    }
}
