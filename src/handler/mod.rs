//! State handlers - scope-bound persistence strategies
//!
//! Each handler serves exactly one scope and one backing store. The typed
//! save/read/remove protocol lives in [`HandlerExt`] and is the same for
//! every handler: models are encoded for the handler's scope and decoded
//! back with `from_text`. Only the store addressing and the encoded form
//! differ between handlers.

pub mod partitioned;
pub mod session;

pub use partitioned::{ApplicationStateHandler, UserStateHandler};
pub use session::SessionStateHandler;

use crate::error::{Result, StateError};
use crate::state::{self, AttributeKey, Form, Scope, StateModel};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Raw storage operations of a handler
pub trait StateHandler: Send + Sync {
    /// The scope this handler reads and writes
    fn scope(&self) -> Scope;

    /// Encoding of stored state. Map form leaves unset scalars out, so a
    /// read merges without clearing values loaded from another scope.
    fn state_form(&self) -> Form {
        Form::Text
    }

    /// Address of `key` in the backing store
    fn store_key(&self, key: &AttributeKey) -> String;

    fn fetch_state(&self, store_key: &str) -> Result<Option<String>>;

    fn write_state(&self, store_key: &str, text: String) -> Result<()>;

    fn delete_state(&self, store_key: &str) -> Result<()>;
}

/// A handler shared between models and callers
pub type SharedHandler = Arc<dyn StateHandler>;

/// Identity of the request being served
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// End-user identifier, partitions user state
    pub user_id: Option<String>,
    /// Skill identifier, partitions application state
    pub application_id: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_application(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }
}

/// Typed model operations available on every [`SharedHandler`]
pub trait HandlerExt {
    /// Write the model's attributes for this handler's scope
    fn save<M: StateModel>(&self, model: &M) -> Result<()>;

    /// Load a new instance bound to this handler, `None` when nothing is stored
    fn read<M: StateModel>(&self, id: Option<&str>) -> Result<Option<M>>;

    /// Merge this handler's scope into `model`, returning whether state was found
    fn read_into<M: StateModel>(&self, model: &mut M) -> Result<bool>;

    fn remove<M: StateModel>(&self, model: &M) -> Result<()>;

    fn exists<M: StateModel>(&self, id: Option<&str>) -> Result<bool>;

    /// A default instance bound to this handler
    fn create_model<M: StateModel>(&self, id: Option<&str>) -> Result<M>;

    fn attribute_key_for<M: StateModel>(&self, id: Option<&str>) -> AttributeKey;
}

impl HandlerExt for SharedHandler {
    fn save<M: StateModel>(&self, model: &M) -> Result<()> {
        let scope = self.scope();
        ensure_scope::<M>(scope)?;
        let store_key = self.store_key(&model.attribute_key());
        let text = match self.state_form() {
            Form::Text => model.to_text(scope)?,
            Form::Map => serde_json::to_string(&Value::Object(model.to_map(scope)?))?,
        };
        self.write_state(&store_key, text)
            .map_err(|e| log_failure("save", &store_key, e))?;
        tracing::debug!("Saved {} state under {}", scope, store_key);
        Ok(())
    }

    fn read<M: StateModel>(&self, id: Option<&str>) -> Result<Option<M>> {
        let mut model: M = self.create_model(id)?;
        Ok(self.read_into(&mut model)?.then_some(model))
    }

    fn read_into<M: StateModel>(&self, model: &mut M) -> Result<bool> {
        let scope = self.scope();
        ensure_scope::<M>(scope)?;
        let store_key = self.store_key(&model.attribute_key());
        let text = self
            .fetch_state(&store_key)
            .map_err(|e| log_failure("read", &store_key, e))?;
        match text {
            Some(text) => {
                model.from_text(&text, scope)?;
                tracing::debug!("Read {} state from {}", scope, store_key);
                Ok(true)
            }
            None => {
                tracing::debug!("No {} state under {}", scope, store_key);
                Ok(false)
            }
        }
    }

    fn remove<M: StateModel>(&self, model: &M) -> Result<()> {
        let scope = self.scope();
        ensure_scope::<M>(scope)?;
        let store_key = self.store_key(&model.attribute_key());
        self.delete_state(&store_key)
            .map_err(|e| log_failure("remove", &store_key, e))?;
        tracing::debug!("Removed {} state under {}", scope, store_key);
        Ok(())
    }

    fn exists<M: StateModel>(&self, id: Option<&str>) -> Result<bool> {
        let store_key = self.store_key(&self.attribute_key_for::<M>(id));
        Ok(self.fetch_state(&store_key)?.is_some())
    }

    fn create_model<M: StateModel>(&self, id: Option<&str>) -> Result<M> {
        let mut builder = M::builder().with_handler(Arc::clone(self));
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            builder = builder.with_id(id);
        }
        builder.build()
    }

    fn attribute_key_for<M: StateModel>(&self, id: Option<&str>) -> AttributeKey {
        AttributeKey::of::<M>(id)
    }
}

/// Fail before touching the store when `M` has nothing to persist in `scope`
fn ensure_scope<M: StateModel>(scope: Scope) -> Result<()> {
    if !state::save_state_fields::<M>(scope)?.is_empty() {
        Ok(())
    } else {
        Err(StateError::ScopeMismatch {
            type_name: M::type_name().to_string(),
            scope,
        })
    }
}

fn log_failure(op: &str, store_key: &str, err: StateError) -> StateError {
    tracing::warn!("State {} failed for {}: {}", op, store_key, err);
    err
}
