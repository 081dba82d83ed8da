//! User and application handlers backed by a key-value store
//!
//! Both partition the store by a request-supplied discriminator: the
//! end-user id for user state, the application id for application state.
//! Store keys read `user:<user_id>/<attribute key>` and
//! `app:<application_id>/<attribute key>`.
//!
//! Either handler can carry the conversation's session attributes as a
//! write-through cache, keyed by the same store key. Reads check the session
//! first. Writes and removes hit the store, then the session.

use super::{RequestContext, StateHandler};
use crate::error::{Result, StateError};
use crate::state::{AttributeKey, Scope};
use crate::store::{KeyValueStore, SessionAttributes};
use std::sync::Arc;

/// A store slice owned by one partition of one scope
struct Partition {
    scope: Scope,
    discriminator: String,
    store: Arc<dyn KeyValueStore>,
    session: Option<Box<dyn SessionAttributes>>,
}

impl Partition {
    fn new(scope: Scope, discriminator: String, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            scope,
            discriminator,
            store,
            session: None,
        }
    }

    fn store_key(&self, key: &AttributeKey) -> String {
        format!("{}{}/{}", self.scope.prefix(), self.discriminator, key)
    }

    fn get(&self, store_key: &str) -> Result<Option<String>> {
        if let Some(text) = self.session.as_ref().and_then(|s| s.get(store_key)) {
            tracing::trace!("Session cache hit for {}", store_key);
            return Ok(Some(text));
        }
        let text = self.store.get(store_key)?;
        if let (Some(session), Some(text)) = (&self.session, &text) {
            session.set(store_key, text.clone());
        }
        Ok(text)
    }

    fn put(&self, store_key: &str, text: String) -> Result<()> {
        self.store.put(store_key, &text)?;
        if let Some(session) = &self.session {
            session.set(store_key, text);
        }
        Ok(())
    }

    fn delete(&self, store_key: &str) -> Result<()> {
        self.store.delete(store_key)?;
        if let Some(session) = &self.session {
            session.remove(store_key);
        }
        Ok(())
    }
}

/// Per-user state, shared across the user's sessions
pub struct UserStateHandler {
    partition: Partition,
}

impl UserStateHandler {
    pub fn new(store: Arc<dyn KeyValueStore>, user_id: impl Into<String>) -> Self {
        Self {
            partition: Partition::new(Scope::User, user_id.into(), store),
        }
    }

    /// Cache user state in the conversation's session attributes
    pub fn with_session(mut self, session: impl SessionAttributes + 'static) -> Self {
        self.partition.session = Some(Box::new(session));
        self
    }

    pub fn from_context(store: Arc<dyn KeyValueStore>, context: &RequestContext) -> Result<Self> {
        let user_id = context
            .user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(StateError::MissingContext("user id"))?;
        Ok(Self::new(store, user_id))
    }

    pub fn user_id(&self) -> &str {
        &self.partition.discriminator
    }
}

impl StateHandler for UserStateHandler {
    fn scope(&self) -> Scope {
        Scope::User
    }

    fn store_key(&self, key: &AttributeKey) -> String {
        self.partition.store_key(key)
    }

    fn fetch_state(&self, store_key: &str) -> Result<Option<String>> {
        self.partition.get(store_key)
    }

    fn write_state(&self, store_key: &str, text: String) -> Result<()> {
        self.partition.put(store_key, text)
    }

    fn delete_state(&self, store_key: &str) -> Result<()> {
        self.partition.delete(store_key)
    }
}

/// Application-wide state, shared by every user of the skill
pub struct ApplicationStateHandler {
    partition: Partition,
}

impl ApplicationStateHandler {
    pub fn new(store: Arc<dyn KeyValueStore>, application_id: impl Into<String>) -> Self {
        Self {
            partition: Partition::new(Scope::Application, application_id.into(), store),
        }
    }

    pub fn with_session(mut self, session: impl SessionAttributes + 'static) -> Self {
        self.partition.session = Some(Box::new(session));
        self
    }

    pub fn from_context(store: Arc<dyn KeyValueStore>, context: &RequestContext) -> Result<Self> {
        let application_id = context
            .application_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(StateError::MissingContext("application id"))?;
        Ok(Self::new(store, application_id))
    }

    pub fn application_id(&self) -> &str {
        &self.partition.discriminator
    }
}

impl StateHandler for ApplicationStateHandler {
    fn scope(&self) -> Scope {
        Scope::Application
    }

    fn store_key(&self, key: &AttributeKey) -> String {
        self.partition.store_key(key)
    }

    fn fetch_state(&self, store_key: &str) -> Result<Option<String>> {
        self.partition.get(store_key)
    }

    fn write_state(&self, store_key: &str, text: String) -> Result<()> {
        self.partition.put(store_key, text)
    }

    fn delete_state(&self, store_key: &str) -> Result<()> {
        self.partition.delete(store_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerExt, SessionStateHandler, SharedHandler};
    use crate::state::StateModel;
    use crate::store::{InMemoryStore, SessionAttributes, SessionContext, SledStore};
    use crate::testing::*;
    use tempfile::tempdir;

    fn user_handler(store: &Arc<InMemoryStore>) -> SharedHandler {
        Arc::new(UserStateHandler::new(store.clone(), "user-1"))
    }

    fn application_handler(store: &Arc<InMemoryStore>) -> SharedHandler {
        Arc::new(ApplicationStateHandler::new(store.clone(), "skill-1"))
    }

    #[test]
    fn test_scopes() {
        let store = Arc::new(InMemoryStore::new());
        assert_eq!(user_handler(&store).scope(), Scope::User);
        assert_eq!(application_handler(&store).scope(), Scope::Application);
    }

    #[test]
    fn test_store_keys_are_partitioned() {
        let store = Arc::new(InMemoryStore::new());
        let key = AttributeKey::new("my::Model", Some("id"));
        assert_eq!(user_handler(&store).store_key(&key), "user:user-1/my::Model:id");
        assert_eq!(application_handler(&store).store_key(&key), "app:skill-1/my::Model:id");
    }

    #[test]
    fn test_from_context() {
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        let context = RequestContext::new().with_user("u").with_application("a");
        let user = UserStateHandler::from_context(store.clone(), &context).unwrap();
        assert_eq!(user.user_id(), "u");
        let app = ApplicationStateHandler::from_context(store.clone(), &context).unwrap();
        assert_eq!(app.application_id(), "a");

        let empty = RequestContext::new().with_user("");
        assert!(matches!(
            UserStateHandler::from_context(store.clone(), &empty),
            Err(StateError::MissingContext("user id"))
        ));
        assert!(matches!(
            ApplicationStateHandler::from_context(store, &empty),
            Err(StateError::MissingContext("application id"))
        ));
    }

    #[test]
    fn test_crud() {
        let store = Arc::new(InMemoryStore::new());
        let handler = user_handler(&store);
        assert!(handler.read::<Model>(Some("id")).unwrap().is_none());

        let mut model: Model = handler.create_model(Some("id")).unwrap();
        model.sample_user = Some("value".into());
        model.sample_string = Some("session only".into());
        model.save().unwrap();

        let key = handler.store_key(&model.attribute_key());
        assert_eq!(
            store.get(&key).unwrap().as_deref(),
            Some(r#"{"id":"id","sampleUser":"value"}"#)
        );

        let read: Model = handler.read(Some("id")).unwrap().unwrap();
        assert_eq!(read.sample_user.as_deref(), Some("value"));
        assert_eq!(read.sample_string, None);

        model.sample_user = Some("updated".into());
        model.save().unwrap();
        let read: Model = handler.read(Some("id")).unwrap().unwrap();
        assert_eq!(read.sample_user.as_deref(), Some("updated"));

        model.remove().unwrap();
        assert!(store.is_empty());
        assert!(handler.read::<Model>(Some("id")).unwrap().is_none());
    }

    #[test]
    fn test_users_do_not_see_each_other() {
        let store = Arc::new(InMemoryStore::new());
        let alice: SharedHandler = Arc::new(UserStateHandler::new(store.clone(), "alice"));
        let bob: SharedHandler = Arc::new(UserStateHandler::new(store.clone(), "bob"));

        let mut model: Model = alice.create_model(None).unwrap();
        model.sample_user = Some("alice".into());
        model.save().unwrap();

        assert!(bob.read::<Model>(None).unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_one_instance_assembled_from_all_scopes() {
        let session = SessionContext::new();
        let store = Arc::new(InMemoryStore::new());
        let handlers: Vec<SharedHandler> = vec![
            Arc::new(SessionStateHandler::new(session.clone())),
            user_handler(&store),
            application_handler(&store),
        ];

        let mut model = sample_model();
        for handler in &handlers {
            model.set_handler(handler.clone());
            model.save().unwrap();
        }
        // one entry per scope
        assert_eq!(session.len(), 1);
        assert_eq!(store.len(), 2);

        let mut assembled: Model = handlers[0].create_model(model.id()).unwrap();
        for handler in &handlers {
            assert!(handler.read_into(&mut assembled).unwrap());
        }
        assert_eq!(assembled.sample_string, model.sample_string);
        assert_eq!(assembled.sample_user, model.sample_user);
        assert_eq!(assembled.sample_application, model.sample_application);
        assert_eq!(assembled.users, model.users);
        assert_eq!(assembled.sample_session, model.sample_session);
        // ignored attributes are never persisted
        assert_eq!(assembled.sample_ignore, None);
        assert_eq!(assembled.private_field, None);
    }

    #[test]
    fn test_sled_backed_round_trip() {
        let dir = tempdir().unwrap();
        let users = SledStore::open(dir.path().join("state.db"), "user_state").unwrap();
        let apps = users.sibling("application_state").unwrap();
        let user: SharedHandler = Arc::new(UserStateHandler::new(Arc::new(users), "u"));
        let app: SharedHandler = Arc::new(ApplicationStateHandler::new(Arc::new(apps), "a"));

        let mut model: Model = user.create_model(Some("id")).unwrap();
        model.sample_user = Some("stored".into());
        model.sample_application = true;
        model.save().unwrap();
        model.set_handler(app.clone());
        model.save().unwrap();

        let read: Model = user.read(Some("id")).unwrap().unwrap();
        assert_eq!(read.sample_user.as_deref(), Some("stored"));
        assert!(!read.sample_application);

        let read: Model = app.read(Some("id")).unwrap().unwrap();
        assert!(read.sample_application);
        assert_eq!(read.sample_user, None);
    }

    #[test]
    fn test_crud_with_session_cache() {
        let store = Arc::new(InMemoryStore::new());
        let session = SessionContext::new();
        let handler: SharedHandler = Arc::new(
            UserStateHandler::new(store.clone(), "user-1").with_session(session.clone()),
        );

        let mut model: Model = handler.create_model(Some("id")).unwrap();
        model.sample_user = Some("value".into());
        model.save().unwrap();
        let key = handler.store_key(&model.attribute_key());
        assert_eq!(store.keys(), vec![key.clone()]);
        assert_eq!(session.get(&key), store.get(&key).unwrap());

        // a cleared session falls back to the store and is refilled
        session.clear();
        let read: Model = handler.read(Some("id")).unwrap().unwrap();
        assert_eq!(read.sample_user.as_deref(), Some("value"));
        assert!(session.contains(&key));

        model.remove().unwrap();
        assert!(!session.contains(&key));
        assert!(store.is_empty());
        assert!(handler.read::<Model>(Some("id")).unwrap().is_none());
    }

    #[test]
    fn test_session_cache_is_read_first() {
        let store = Arc::new(InMemoryStore::new());
        let session = SessionContext::new();
        let handler: SharedHandler = Arc::new(
            ApplicationStateHandler::new(store.clone(), "skill-1").with_session(session.clone()),
        );

        let mut model: Model = handler.create_model(None).unwrap();
        model.sample_application = true;
        model.save().unwrap();

        store.set_unavailable(true);
        let read: Model = handler.read(None).unwrap().unwrap();
        assert!(read.sample_application);
        // writes still need the store
        assert!(handler.save(&model).unwrap_err().is_recoverable());
    }

    #[test]
    fn test_cache_does_not_clash_with_session_state() {
        let store = Arc::new(InMemoryStore::new());
        let session = SessionContext::new();
        let session_handler: SharedHandler = Arc::new(SessionStateHandler::new(session.clone()));
        let user: SharedHandler = Arc::new(
            UserStateHandler::new(store.clone(), "user-1").with_session(session.clone()),
        );

        let mut model = sample_model();
        model.set_handler(session_handler.clone());
        model.save().unwrap();
        model.set_handler(user.clone());
        model.save().unwrap();
        assert_eq!(session.len(), 2);

        let read: Model = session_handler.read(model.id()).unwrap().unwrap();
        assert_eq!(read.sample_string, model.sample_string);
        assert_eq!(read.sample_user, None);
        let read: Model = user.read(model.id()).unwrap().unwrap();
        assert_eq!(read.sample_user, model.sample_user);
        assert_eq!(read.sample_string, None);
    }
}
