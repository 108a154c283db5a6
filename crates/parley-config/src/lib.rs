//! Configuration system for the Parley task server.
//!
//! Provides TOML-based configuration with:
//! - `[server]` bind address, base path, CORS, handler timeout, request logging
//! - `[store]` backend selection (`memory` or `file`) and directory
//! - `[agent]` the agent card served at `/.well-known/agent.json`
//! - Config file layering (user config dir + project-local `parley.toml`)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
