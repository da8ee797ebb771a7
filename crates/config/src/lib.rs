//! Configuration loading, validation and env substitution.
//!
//! Config files: `chatrelay.toml`, `chatrelay.yaml` or `chatrelay.json`.
//! Searched in `./` then `~/.config/chatrelay/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        BackendConfig, CommandsConfig, DedupeConfig, MetricsConfig, RelayConfig, RouterConfig,
        SourceConfig,
    },
    validate::{Diagnostic, Severity, validate},
};
