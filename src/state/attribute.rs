//! Attribute declarations and their resolved descriptors.
//!
//! A model type declares its persistable attributes once, as a table of
//! [`Attribute`] entries. Each entry pairs static metadata (name, scopes,
//! ignore rule, value kind) with typed accessors that move the field value
//! in and out of its generic form.

use super::codec::{self, Form};
use super::model::StateModel;
use super::scope::{Scope, ScopeFilter, ScopeSet};
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// The kind of value an attribute holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// String, boolean, number, or an optional of these
    Primitive,
    /// A single nested persistable model
    Nested,
    /// An ordered list of nested persistable models
    List,
}

/// Scopes in which an attribute is excluded from persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ignore {
    #[default]
    Never,
    /// Never read, written or serialized
    Always,
    /// Excluded only when the requested scope is in the set
    In(ScopeSet),
}

impl Ignore {
    /// Whether a request for `scope` skips the attribute
    pub fn covers(&self, scope: Scope) -> bool {
        match self {
            Ignore::Never => false,
            Ignore::Always => true,
            Ignore::In(scopes) => scopes.contains(scope),
        }
    }
}

/// Where an attribute's scopes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Take the model type's default scopes
    Inherit,
    /// Empty scope set: included under every scope
    Universal,
    Scoped(ScopeSet),
}

/// Resolved metadata for one declared attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    /// Empty means the attribute is included regardless of requested scope
    pub scopes: ScopeSet,
    pub ignore: Ignore,
    pub kind: ValueKind,
}

impl AttributeDescriptor {
    /// Whether the attribute belongs to the save-state fields for `filter`.
    ///
    /// The wildcard accepts only attributes without any ignore rule.
    pub fn is_saved_in(&self, filter: ScopeFilter) -> bool {
        match filter {
            ScopeFilter::Any => self.ignore == Ignore::Never,
            ScopeFilter::Only(scope) => {
                !self.ignore.covers(scope) && (self.scopes.is_empty() || self.scopes.contains(scope))
            }
        }
    }

    /// Whether the attribute is explicitly declared (and not ignored) in `scope`
    pub fn declares(&self, scope: Scope) -> bool {
        !self.ignore.covers(scope) && self.scopes.contains(scope)
    }

    pub fn is_universal(&self) -> bool {
        self.scopes.is_empty()
    }
}

type EncodeFn<M> = Box<dyn Fn(&M, ScopeFilter, Form) -> Result<Value> + Send + Sync>;
type DecodeFn<M> = Box<dyn Fn(&mut M, Value, ScopeFilter) -> Result<()> + Send + Sync>;

/// A declared attribute of model type `M`.
///
/// Built with [`Attribute::scalar`], [`Attribute::nested`] or
/// [`Attribute::list`] (or the [`attribute!`](crate::attribute) macro) and
/// refined with the scope builders:
///
/// ```ignore
/// fn attributes() -> Vec<Attribute<Self>> {
///     vec![
///         attribute!("sampleString" => scalar sample_string).scoped(Scope::Session),
///         attribute!("users" => list users).scoped(Scope::Session).scoped(Scope::User),
///         attribute!("scratch" => scalar scratch).ignored(),
///     ]
/// }
/// ```
pub struct Attribute<M> {
    descriptor: AttributeDescriptor,
    placement: Placement,
    encode: EncodeFn<M>,
    decode: DecodeFn<M>,
}

impl<M: 'static> Attribute<M> {
    /// A primitive attribute stored through serde
    pub fn scalar<T>(name: &'static str, get: fn(&M) -> &T, get_mut: fn(&mut M) -> &mut T) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        Self::from_parts(
            name,
            ValueKind::Primitive,
            Box::new(move |model: &M, _: ScopeFilter, _: Form| codec::encode_scalar(get(model))),
            Box::new(move |model: &mut M, value: Value, _: ScopeFilter| {
                codec::decode_scalar(name, get_mut(model), value)
            }),
        )
    }

    /// An optional nested model, encoded under the parent's scope
    pub fn nested<N: StateModel>(
        name: &'static str,
        get: fn(&M) -> &Option<N>,
        get_mut: fn(&mut M) -> &mut Option<N>,
    ) -> Self {
        Self::from_parts(
            name,
            ValueKind::Nested,
            Box::new(move |model: &M, filter: ScopeFilter, form: Form| {
                codec::encode_nested(get(model), filter, form)
            }),
            Box::new(move |model: &mut M, value: Value, filter: ScopeFilter| {
                codec::decode_nested(name, get_mut(model), value, filter)
            }),
        )
    }

    /// An ordered list of nested models, always present when encoded
    pub fn list<N: StateModel>(
        name: &'static str,
        get: fn(&M) -> &Vec<N>,
        get_mut: fn(&mut M) -> &mut Vec<N>,
    ) -> Self {
        Self::from_parts(
            name,
            ValueKind::List,
            Box::new(move |model: &M, filter: ScopeFilter, form: Form| {
                codec::encode_list(get(model), filter, form)
            }),
            Box::new(move |model: &mut M, value: Value, filter: ScopeFilter| {
                codec::decode_list(name, get_mut(model), value, filter)
            }),
        )
    }

    pub(crate) fn from_parts(
        name: &'static str,
        kind: ValueKind,
        encode: EncodeFn<M>,
        decode: DecodeFn<M>,
    ) -> Self {
        Self {
            descriptor: AttributeDescriptor {
                name,
                scopes: ScopeSet::EMPTY,
                ignore: Ignore::Never,
                kind,
            },
            placement: Placement::Inherit,
            encode,
            decode,
        }
    }
}

impl<M> Attribute<M> {
    /// Add `scope` to the attribute's scope set
    pub fn scoped(mut self, scope: Scope) -> Self {
        self.placement = match self.placement {
            Placement::Scoped(scopes) => Placement::Scoped(scopes.with(scope)),
            Placement::Inherit | Placement::Universal => Placement::Scoped(ScopeSet::of(scope)),
        };
        self
    }

    /// Include the attribute under every scope
    pub fn universal(mut self) -> Self {
        self.placement = Placement::Universal;
        self
    }

    /// Exclude the attribute from persistence entirely
    pub fn ignored(mut self) -> Self {
        self.descriptor.ignore = Ignore::Always;
        self
    }

    /// Exclude the attribute when `scope` is requested
    pub fn ignored_in(mut self, scope: Scope) -> Self {
        self.descriptor.ignore = match self.descriptor.ignore {
            Ignore::Never => Ignore::In(ScopeSet::of(scope)),
            Ignore::In(scopes) => Ignore::In(scopes.with(scope)),
            Ignore::Always => Ignore::Always,
        };
        self
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn descriptor(&self) -> &AttributeDescriptor {
        &self.descriptor
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub(crate) fn resolve(&mut self, scopes: ScopeSet) {
        self.descriptor.scopes = scopes;
    }

    pub(crate) fn encode(&self, model: &M, filter: ScopeFilter, form: Form) -> Result<Value> {
        (self.encode)(model, filter, form)
    }

    pub(crate) fn decode(&self, model: &mut M, value: Value, filter: ScopeFilter) -> Result<()> {
        (self.decode)(model, value, filter)
    }
}

impl<M> fmt::Debug for Attribute<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("descriptor", &self.descriptor)
            .field("placement", &self.placement)
            .finish_non_exhaustive()
    }
}

/// Declare an [`Attribute`] for a field of `Self`.
///
/// ```ignore
/// attribute!("sampleString" => scalar sample_string)
/// attribute!("sampleUser" => nested sample_user)
/// attribute!("users" => list users)
/// ```
#[macro_export]
macro_rules! attribute {
    ($name:literal => scalar $field:ident) => {
        $crate::Attribute::scalar($name, |m: &Self| &m.$field, |m: &mut Self| &mut m.$field)
    };
    ($name:literal => nested $field:ident) => {
        $crate::Attribute::nested($name, |m: &Self| &m.$field, |m: &mut Self| &mut m.$field)
    };
    ($name:literal => list $field:ident) => {
        $crate::Attribute::list($name, |m: &Self| &m.$field, |m: &mut Self| &mut m.$field)
    };
}
