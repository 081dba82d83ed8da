//! Config module - store and logging settings

pub mod toml_config;

pub use toml_config::{
    config_path, load_config, load_config_file, parse_config, reset_config,
    LoggingConfig, StateConfig, StateStores, StoreBackend, StoreConfig,
};
