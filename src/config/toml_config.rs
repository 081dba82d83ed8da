//! TOML Configuration with Environment Variable Overrides
//!
//! Resolution order:
//! - `$SKILL_STATE_CONFIG`, else `<config dir>/skill-state/config.toml`
//! - built-in defaults when the file is absent or unreadable
//! - `SKILL_STATE_*` environment variables on top

use crate::error::{Result, StateError};
use crate::handler::{ApplicationStateHandler, RequestContext, SharedHandler, UserStateHandler};
use crate::store::{InMemoryStore, KeyValueStore, SledStore};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

lazy_static::lazy_static! {
    static ref STATE_CONFIG: RwLock<Option<StateConfig>> = RwLock::new(None);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StateConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sled,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database path; the platform data directory when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_user_tree")]
    pub user_tree: String,
    #[serde(default = "default_application_tree")]
    pub application_tree: String,
}

fn default_user_tree() -> String {
    "user_state".to_string()
}

fn default_application_tree() -> String {
    "application_state".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sled,
            path: None,
            user_tree: default_user_tree(),
            application_tree: default_application_tree(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "skill_state=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

/// Backing stores for the user and application handlers
pub struct StateStores {
    pub user: Arc<dyn KeyValueStore>,
    pub application: Arc<dyn KeyValueStore>,
}

impl StateStores {
    pub fn user_handler(&self, context: &RequestContext) -> Result<SharedHandler> {
        Ok(Arc::new(UserStateHandler::from_context(
            Arc::clone(&self.user),
            context,
        )?))
    }

    pub fn application_handler(&self, context: &RequestContext) -> Result<SharedHandler> {
        Ok(Arc::new(ApplicationStateHandler::from_context(
            Arc::clone(&self.application),
            context,
        )?))
    }
}

impl StoreConfig {
    /// Open the configured backend. Sled trees share one database.
    pub fn open_stores(&self) -> Result<StateStores> {
        match self.backend {
            StoreBackend::Memory => Ok(StateStores {
                user: Arc::new(InMemoryStore::new()),
                application: Arc::new(InMemoryStore::new()),
            }),
            StoreBackend::Sled => {
                let path = match &self.path {
                    Some(path) => path.clone(),
                    None => SledStore::default_path()?,
                };
                let user = SledStore::open(&path, &self.user_tree)?;
                let application = user.sibling(&self.application_tree)?;
                Ok(StateStores {
                    user: Arc::new(user),
                    application: Arc::new(application),
                })
            }
        }
    }
}

/// Location of the config file
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("SKILL_STATE_CONFIG") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("skill-state");
    path.push("config.toml");
    path
}

/// Parse a config document without touching the process-wide cache
pub fn parse_config(text: &str) -> Result<StateConfig> {
    toml::from_str(text).map_err(|e| StateError::Config(e.to_string()))
}

pub fn load_config_file(path: &Path) -> anyhow::Result<StateConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
    let config = parse_config(&contents).with_context(|| format!("parsing config {:?}", path))?;
    Ok(config)
}

/// Load the config once per process, with environment overrides applied
pub fn load_config() -> StateConfig {
    if let Ok(config) = STATE_CONFIG.read() {
        if let Some(ref cfg) = *config {
            return cfg.clone();
        }
    }

    let path = config_path();
    let config = if path.exists() {
        match load_config_file(&path) {
            Ok(config) => {
                tracing::info!("Loaded state config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring state config: {:#}", e);
                StateConfig::default()
            }
        }
    } else {
        StateConfig::default()
    };
    let config = apply_env_overrides(config, |name| std::env::var(name).ok());

    if let Ok(mut cfg) = STATE_CONFIG.write() {
        *cfg = Some(config.clone());
    }
    config
}

/// Drop the cached config so the next load rereads file and environment
pub fn reset_config() {
    if let Ok(mut cfg) = STATE_CONFIG.write() {
        *cfg = None;
    }
}

fn apply_env_overrides(
    mut config: StateConfig,
    var: impl Fn(&str) -> Option<String>,
) -> StateConfig {
    if let Some(backend) = var("SKILL_STATE_BACKEND") {
        match backend.as_str() {
            "sled" => config.store.backend = StoreBackend::Sled,
            "memory" => config.store.backend = StoreBackend::Memory,
            other => tracing::warn!("Unknown SKILL_STATE_BACKEND {:?}", other),
        }
    }

    if let Some(path) = var("SKILL_STATE_DB_PATH") {
        if !path.is_empty() {
            config.store.path = Some(PathBuf::from(path));
        }
    }

    if let Some(tree) = var("SKILL_STATE_USER_TREE") {
        if !tree.is_empty() {
            config.store.user_tree = tree;
        }
    }

    if let Some(tree) = var("SKILL_STATE_APPLICATION_TREE") {
        if !tree.is_empty() {
            config.store.application_tree = tree;
        }
    }

    if let Some(filter) = var("SKILL_STATE_LOG") {
        if !filter.is_empty() {
            config.logging.filter = filter;
        }
    }

    config
}
