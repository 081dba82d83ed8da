//! Error types for the state engine and its backing stores

use crate::state::Scope;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, StateError>;

/// Failures raised by a backing store.
///
/// These are produced by [`KeyValueStore`](crate::store::KeyValueStore)
/// implementations and surface to callers wrapped in
/// [`StateError::Persistence`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("stored value under {key} is not valid UTF-8")]
    Encoding { key: String },

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors produced by the state engine
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid model id {0:?}: only A-Z, a-z, 0-9, '_' and '-' are allowed")]
    InvalidId(String),

    #[error("model builder requires a handler")]
    MissingHandler,

    #[error("no state handler attached to {0}")]
    NoHandler(String),

    #[error("invalid attribute declaration on {type_name}: {reason}")]
    Configuration { type_name: String, reason: String },

    #[error("{type_name} has no attribute named {name}")]
    UnknownAttribute { type_name: String, name: String },

    #[error("request context has no {0}")]
    MissingContext(&'static str),

    #[error("{type_name} has no attributes in {scope} scope")]
    ScopeMismatch { type_name: String, scope: Scope },

    #[error("malformed state payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed state payload: {0}")]
    Parse(String),

    #[error("cannot decode attribute {attribute}: {reason}")]
    Decode { attribute: String, reason: String },

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),
}

impl StateError {
    /// Whether the failure came from the backing store and may succeed on retry.
    ///
    /// Everything else is a validation, parse or programming error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StateError::Persistence(_))
    }

    pub(crate) fn configuration(type_name: &str, reason: impl Into<String>) -> Self {
        StateError::Configuration {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(attribute: &str, reason: impl ToString) -> Self {
        StateError::Decode {
            attribute: attribute.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_persistence_is_recoverable() {
        let store = StateError::from(StoreError::Backend("timeout".into()));
        assert!(store.is_recoverable());
        assert!(!StateError::MissingHandler.is_recoverable());
        assert!(!StateError::InvalidId("a/b".into()).is_recoverable());
    }

    #[test]
    fn test_persistence_keeps_store_message() {
        let err = StateError::from(StoreError::Unavailable("table offline".into()));
        assert_eq!(
            err.to_string(),
            "persistence failure: store unavailable: table offline"
        );
    }
}
