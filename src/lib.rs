//! Skill State - scope-aware state persistence for voice-assistant skills
//!
//! Models declare their attributes once, tagged with the scopes they live in
//! (session, user, application). Handlers bound to one scope save and read
//! just that slice of a model, so a single instance can be assembled from
//! several backing stores.

pub mod config;
pub mod error;
pub mod handler;
pub mod state;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;

pub use config::{LoggingConfig, StateConfig};
pub use error::{Result, StateError, StoreError};
pub use handler::{
    ApplicationStateHandler, HandlerExt, RequestContext, SessionStateHandler, SharedHandler,
    StateHandler, UserStateHandler,
};
pub use state::{
    Attribute, AttributeDescriptor, AttributeKey, Binding, Ignore, ModelBuilder, Scope,
    ScopeFilter, ScopeSet, StateModel, ValueKind,
};
pub use store::{InMemoryStore, KeyValueStore, SessionAttributes, SessionContext, SledStore};

/// Install a fmt subscriber filtered by `RUST_LOG`, else the configured filter.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}
