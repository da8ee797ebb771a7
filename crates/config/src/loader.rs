use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::RelayConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chatrelay.toml",
    "chatrelay.yaml",
    "chatrelay.yml",
    "chatrelay.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<RelayConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chatrelay.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chatrelay/chatrelay.{toml,yaml,yml,json}` (user-global)
///
/// Returns `RelayConfig::default()` if no config file is found. Env
/// overrides are applied on top either way.
pub fn discover_and_load() -> RelayConfig {
    let mut config = RelayConfig::default();
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => config = cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/chatrelay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatrelay").map(|d| d.config_dir().to_path_buf())
}

/// Apply `CHATRELAY_*` environment overrides on top of a loaded config.
///
/// Recognised: `CHATRELAY_BACKEND_URL`, `CHATRELAY_BACKEND_API_KEY`,
/// `CHATRELAY_BACKEND_USER_ID`, `CHATRELAY_BACKEND_TIMEOUT_SECS`,
/// `CHATRELAY_SOURCE_URL`. Empty values are ignored.
pub fn apply_env_overrides(config: &mut RelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(url) = get("CHATRELAY_BACKEND_URL") {
        config.backend.url = Some(url);
    }
    if let Some(key) = get("CHATRELAY_BACKEND_API_KEY") {
        config.backend.api_key = Some(Secret::new(key));
    }
    if let Some(user_id) = get("CHATRELAY_BACKEND_USER_ID") {
        config.backend.user_id = Some(user_id);
    }
    if let Some(raw) = get("CHATRELAY_BACKEND_TIMEOUT_SECS") {
        match raw.trim().parse() {
            Ok(secs) => config.backend.timeout_secs = secs,
            Err(e) => warn!(value = %raw, error = %e, "ignoring invalid CHATRELAY_BACKEND_TIMEOUT_SECS"),
        }
    }
    if let Some(url) = get("CHATRELAY_SOURCE_URL") {
        config.source.url = url;
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<RelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
