//! Model reflector - per-type attribute classification
//!
//! Each model type's attribute table is resolved once (scopes inherited,
//! identity prepended, declarations validated) and cached for the life of
//! the process. The cache is the only shared mutable state in the engine:
//! entries are inserted at most once per type and never changed afterwards.

use super::attribute::{Attribute, AttributeDescriptor, Placement};
use super::model::{self, StateModel};
use super::scope::{Scope, ScopeFilter, ScopeSet};
use crate::error::{Result, StateError};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

lazy_static::lazy_static! {
    static ref CLASSIFICATIONS: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>> =
        RwLock::new(HashMap::new());
}

/// The resolved attribute table of one model type, in declaration order
/// with the identity attribute first.
pub struct Classification<M> {
    type_name: &'static str,
    attributes: Vec<Attribute<M>>,
}

impl<M: StateModel> Classification<M> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn attributes(&self) -> &[Attribute<M>] {
        &self.attributes
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter().map(Attribute::descriptor)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute<M>> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// Attributes eligible for persistence under `filter`
    pub fn save_state_attributes(&self, filter: ScopeFilter) -> impl Iterator<Item = &Attribute<M>> {
        self.attributes
            .iter()
            .filter(move |a| a.descriptor().is_saved_in(filter))
    }

    pub fn has_scoped_attribute(&self, scope: Scope) -> bool {
        self.descriptors().any(|d| d.declares(scope))
    }
}

/// Classify `M`, computing its attribute table on first access.
///
/// Invalid declarations (empty or duplicate names, a declared `id`, an
/// inheriting attribute on a model without default scopes) fail here rather
/// than at read or write time.
pub fn classify<M: StateModel>() -> Result<Arc<Classification<M>>> {
    let type_id = TypeId::of::<M>();

    let cached = CLASSIFICATIONS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
        .cloned();
    if let Some(entry) = cached {
        return downcast::<M>(entry);
    }

    let mut cache = CLASSIFICATIONS
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    // another thread may have won the race between the two locks
    if let Some(entry) = cache.get(&type_id) {
        return downcast::<M>(entry.clone());
    }

    let classification = Arc::new(build::<M>()?);
    tracing::debug!(
        "Classified {} with {} attributes",
        classification.type_name,
        classification.attributes.len()
    );
    cache.insert(type_id, classification.clone());
    Ok(classification)
}

/// Whether `M` declares at least one non-ignored attribute in `scope`
pub fn has_scoped_attribute<M: StateModel>(scope: Scope) -> Result<bool> {
    Ok(classify::<M>()?.has_scoped_attribute(scope))
}

/// Descriptors of the attributes persisted for `filter`, in declaration order.
///
/// The identity is not a save-state field; encoders add it on their own.
pub fn save_state_fields<M: StateModel>(
    filter: impl Into<ScopeFilter>,
) -> Result<Vec<AttributeDescriptor>> {
    let filter = filter.into();
    Ok(classify::<M>()?
        .save_state_attributes(filter)
        .filter(|a| a.name() != model::IDENTITY)
        .map(|a| a.descriptor().clone())
        .collect())
}

fn downcast<M: StateModel>(entry: Arc<dyn Any + Send + Sync>) -> Result<Arc<Classification<M>>> {
    entry
        .downcast::<Classification<M>>()
        .map_err(|_| StateError::configuration(M::type_name(), "classification cache type mismatch"))
}

fn build<M: StateModel>() -> Result<Classification<M>> {
    let type_name = M::type_name();
    let defaults = M::default_scopes();

    let mut attributes = vec![model::identity_attribute::<M>()];
    let mut seen = HashSet::new();

    for mut attribute in M::attributes() {
        let name = attribute.name();
        if name.is_empty() {
            return Err(StateError::configuration(type_name, "attribute with an empty name"));
        }
        if name == model::IDENTITY {
            return Err(StateError::configuration(
                type_name,
                "attribute name 'id' is reserved for the model identity",
            ));
        }
        if !seen.insert(name) {
            return Err(StateError::configuration(
                type_name,
                format!("attribute {} is declared twice", name),
            ));
        }

        let scopes = match attribute.placement() {
            Placement::Scoped(scopes) => scopes,
            Placement::Universal => ScopeSet::EMPTY,
            Placement::Inherit if defaults.is_empty() => {
                return Err(StateError::configuration(
                    type_name,
                    format!(
                        "attribute {} declares no scope and the model has no default scope",
                        name
                    ),
                ));
            }
            Placement::Inherit => defaults,
        };
        attribute.resolve(scopes);
        attributes.push(attribute);
    }

    Ok(Classification {
        type_name,
        attributes,
    })
}
