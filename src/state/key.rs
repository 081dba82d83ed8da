//! Attribute keys - the storage address of a model instance

use super::model::StateModel;
use std::fmt;

/// Storage address of a model: its type name, optionally suffixed with
/// `:<id>`. Two keys are equal iff type and id both match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeKey {
    type_name: String,
    id: Option<String>,
}

impl AttributeKey {
    /// Build a key; an empty id is treated as absent
    pub fn new(type_name: impl Into<String>, id: Option<&str>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.filter(|id| !id.is_empty()).map(str::to_string),
        }
    }

    /// Key for model type `M` without needing an instance
    pub fn of<M: StateModel>(id: Option<&str>) -> Self {
        Self::new(M::type_name(), id)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.type_name, id),
            None => f.write_str(&self.type_name),
        }
    }
}
