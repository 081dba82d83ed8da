//! Session-scoped handler backed by the caller's session attributes

use super::StateHandler;
use crate::error::Result;
use crate::state::{AttributeKey, Form, Scope};
use crate::store::SessionAttributes;

/// Stores session state in the conversation's attribute map under the bare
/// attribute key, in map form. Never touches the network.
pub struct SessionStateHandler {
    attributes: Box<dyn SessionAttributes>,
}

impl SessionStateHandler {
    pub fn new(attributes: impl SessionAttributes + 'static) -> Self {
        Self {
            attributes: Box::new(attributes),
        }
    }
}

impl StateHandler for SessionStateHandler {
    fn scope(&self) -> Scope {
        Scope::Session
    }

    fn state_form(&self) -> Form {
        Form::Map
    }

    fn store_key(&self, key: &AttributeKey) -> String {
        key.to_string()
    }

    fn fetch_state(&self, store_key: &str) -> Result<Option<String>> {
        Ok(self.attributes.get(store_key))
    }

    fn write_state(&self, store_key: &str, text: String) -> Result<()> {
        self.attributes.set(store_key, text);
        Ok(())
    }

    fn delete_state(&self, store_key: &str) -> Result<()> {
        self.attributes.remove(store_key);
        Ok(())
    }
}
