//! State engine - scoped models, their attribute tables and codecs

pub mod attribute;
pub mod codec;
pub mod key;
pub mod model;
pub mod reflector;
pub mod scope;

pub use attribute::{Attribute, AttributeDescriptor, Ignore, Placement, ValueKind};
pub use codec::Form;
pub use key::AttributeKey;
pub use model::{Binding, ModelBuilder, StateModel, IDENTITY};
pub use reflector::{classify, has_scoped_attribute, save_state_fields, Classification};
pub use scope::{Scope, ScopeFilter, ScopeSet};
