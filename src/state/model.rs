//! State models - scope-aware persistable entities
//!
//! A model type implements [`StateModel`] by declaring its attribute table and
//! exposing a [`Binding`] (id + attached handler). Everything else (scope
//! filtering, text and map encoding, merge-style decoding, key derivation and
//! the save/remove protocol) comes from the provided methods.

use super::attribute::{Attribute, AttributeDescriptor, ValueKind};
use super::codec::Form;
use super::key::AttributeKey;
use super::reflector;
use super::scope::{Scope, ScopeFilter, ScopeSet};
use crate::error::{Result, StateError};
use crate::handler::{HandlerExt, SharedHandler};
use crate::utils::validate_id;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Name of the identity attribute, always first in encoded state
pub const IDENTITY: &str = "id";

/// Id and handler of a model instance
#[derive(Clone, Default)]
pub struct Binding {
    id: Option<String>,
    handler: Option<SharedHandler>,
}

impl Binding {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Set or clear the id; an invalid id is rejected and the old one kept
    pub fn set_id(&mut self, id: Option<&str>) -> Result<()> {
        if let Some(id) = id {
            validate_id(id)?;
        }
        self.id = id.map(str::to_string);
        Ok(())
    }

    pub fn handler(&self) -> Option<&SharedHandler> {
        self.handler.as_ref()
    }

    pub fn set_handler(&mut self, handler: SharedHandler) {
        self.handler = Some(handler);
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("handler", &self.handler.as_ref().map(|h| h.scope()))
            .finish()
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        let same_handler = match (&self.handler, &other.handler) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.id == other.id && same_handler
    }
}

/// A persistable model.
///
/// ```ignore
/// #[derive(Debug, Clone, Default)]
/// struct Profile {
///     binding: Binding,
///     nickname: Option<String>,
///     visits: u32,
/// }
///
/// impl StateModel for Profile {
///     fn attributes() -> Vec<Attribute<Self>> {
///         vec![
///             attribute!("nickname" => scalar nickname).scoped(Scope::User),
///             attribute!("visits" => scalar visits).scoped(Scope::Session).scoped(Scope::User),
///         ]
///     }
///     fn binding(&self) -> &Binding { &self.binding }
///     fn binding_mut(&mut self) -> &mut Binding { &mut self.binding }
/// }
/// ```
pub trait StateModel: Clone + Default + Send + Sync + 'static {
    /// Declared attributes in declaration order, excluding the identity
    fn attributes() -> Vec<Attribute<Self>>;

    fn binding(&self) -> &Binding;

    fn binding_mut(&mut self) -> &mut Binding;

    /// Fully-qualified type name used in attribute keys
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Scopes for attributes declared without an explicit scope
    fn default_scopes() -> ScopeSet {
        ScopeSet::EMPTY
    }

    fn builder() -> ModelBuilder<Self> {
        ModelBuilder::new()
    }

    fn id(&self) -> Option<&str> {
        self.binding().id()
    }

    fn set_id(&mut self, id: Option<&str>) -> Result<()> {
        self.binding_mut().set_id(id)
    }

    fn handler(&self) -> Option<&SharedHandler> {
        self.binding().handler()
    }

    fn set_handler(&mut self, handler: SharedHandler) {
        self.binding_mut().set_handler(handler);
    }

    fn with_handler(mut self, handler: SharedHandler) -> Self {
        self.set_handler(handler);
        self
    }

    fn attribute_key(&self) -> AttributeKey {
        AttributeKey::new(Self::type_name(), self.id())
    }

    fn has_scoped_attribute(scope: Scope) -> Result<bool> {
        reflector::has_scoped_attribute::<Self>(scope)
    }

    fn has_session_scoped_attribute() -> Result<bool> {
        Self::has_scoped_attribute(Scope::Session)
    }

    fn has_user_scoped_attribute() -> Result<bool> {
        Self::has_scoped_attribute(Scope::User)
    }

    fn has_application_scoped_attribute() -> Result<bool> {
        Self::has_scoped_attribute(Scope::Application)
    }

    fn save_state_fields(filter: impl Into<ScopeFilter>) -> Result<Vec<AttributeDescriptor>> {
        reflector::save_state_fields::<Self>(filter)
    }

    /// Attributes for `scope` as a map; unset scalars are omitted, lists never are
    fn to_map(&self, scope: impl Into<ScopeFilter>) -> Result<Map<String, Value>> {
        encode_fields(self, scope.into(), Form::Map)
    }

    /// Attributes for `scope` as compact JSON in declaration order, nulls included
    fn to_text(&self, scope: impl Into<ScopeFilter>) -> Result<String> {
        let fields = encode_fields(self, scope.into(), Form::Text)?;
        Ok(serde_json::to_string(&Value::Object(fields))?)
    }

    /// Assign every attribute of `scope` present in `map`.
    ///
    /// Absent keys and attributes outside the scope keep their value; unknown
    /// keys are ignored. Nothing is assigned if any attribute fails to decode.
    fn from_map(&mut self, map: &Map<String, Value>, scope: impl Into<ScopeFilter>) -> Result<()> {
        let mut staged = self.clone();
        apply_fields(&mut staged, map, scope.into())?;
        *self = staged;
        Ok(())
    }

    /// Parse `text` as a JSON object and assign it like [`StateModel::from_map`]
    fn from_text(&mut self, text: &str, scope: impl Into<ScopeFilter>) -> Result<()> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => self.from_map(&map, scope),
            _ => Err(StateError::Parse("expected a JSON object".to_string())),
        }
    }

    /// Current value of a declared attribute, ignored ones included
    fn get_attribute(&self, name: &str) -> Result<Value> {
        let classification = reflector::classify::<Self>()?;
        let attribute = classification
            .attribute(name)
            .ok_or_else(|| unknown_attribute::<Self>(name))?;
        attribute.encode(self, ScopeFilter::Any, Form::Text)
    }

    /// Assign a declared attribute by name, ignored ones included
    fn set_attribute(&mut self, name: &str, value: Value) -> Result<()> {
        let classification = reflector::classify::<Self>()?;
        let attribute = classification
            .attribute(name)
            .ok_or_else(|| unknown_attribute::<Self>(name))?;
        let mut staged = self.clone();
        attribute.decode(&mut staged, value, ScopeFilter::Any)?;
        *self = staged;
        Ok(())
    }

    /// Persist through the attached handler
    fn save(&self) -> Result<()> {
        attached_handler(self)?.save(self)
    }

    /// Remove from the attached handler's store
    fn remove(&self) -> Result<()> {
        attached_handler(self)?.remove(self)
    }
}

/// Builder that binds a handler (required) and an id (optional)
pub struct ModelBuilder<M> {
    handler: Option<SharedHandler>,
    id: Option<String>,
    _model: PhantomData<M>,
}

impl<M: StateModel> ModelBuilder<M> {
    pub fn new() -> Self {
        Self {
            handler: None,
            id: None,
            _model: PhantomData,
        }
    }

    pub fn with_handler(mut self, handler: SharedHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn build(self) -> Result<M> {
        let handler = self.handler.ok_or(StateError::MissingHandler)?;
        let mut model = M::default();
        model.set_id(self.id.as_deref())?;
        model.set_handler(handler);
        Ok(model)
    }
}

impl<M: StateModel> Default for ModelBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

fn attached_handler<M: StateModel>(model: &M) -> Result<&SharedHandler> {
    model
        .handler()
        .ok_or_else(|| StateError::NoHandler(M::type_name().to_string()))
}

fn unknown_attribute<M: StateModel>(name: &str) -> StateError {
    StateError::UnknownAttribute {
        type_name: M::type_name().to_string(),
        name: name.to_string(),
    }
}

pub(crate) fn identity_attribute<M: StateModel>() -> Attribute<M> {
    Attribute::from_parts(
        IDENTITY,
        ValueKind::Primitive,
        Box::new(|model: &M, _: ScopeFilter, _: Form| {
            Ok(model.id().map_or(Value::Null, |id| Value::String(id.to_string())))
        }),
        Box::new(|model: &mut M, value: Value, _: ScopeFilter| match value {
            // a stored null never clears an id the caller addressed the model by
            Value::Null => Ok(()),
            Value::String(id) => model.set_id(Some(id.as_str())),
            other => Err(StateError::decode(
                IDENTITY,
                format!("expected a string, found {}", other),
            )),
        }),
    )
    .universal()
}

/// Encode every save-state attribute of `filter` in declaration order
pub(crate) fn encode_fields<M: StateModel>(
    model: &M,
    filter: ScopeFilter,
    form: Form,
) -> Result<Map<String, Value>> {
    let classification = reflector::classify::<M>()?;
    let mut fields = Map::new();
    for attribute in classification.save_state_attributes(filter) {
        let value = attribute.encode(model, filter, form)?;
        if form == Form::Map && value.is_null() && attribute.descriptor().kind != ValueKind::List {
            continue;
        }
        fields.insert(attribute.name().to_string(), value);
    }
    Ok(fields)
}

/// Decode the save-state attributes of `filter` found in `map` into `model`
pub(crate) fn apply_fields<M: StateModel>(
    model: &mut M,
    map: &Map<String, Value>,
    filter: ScopeFilter,
) -> Result<()> {
    let classification = reflector::classify::<M>()?;
    for attribute in classification.save_state_attributes(filter) {
        if let Some(value) = map.get(attribute.name()) {
            attribute.decode(model, value.clone(), filter)?;
        }
    }
    Ok(())
}
