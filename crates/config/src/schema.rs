/// Config schema types (backend, router, dedupe, commands, message source, metrics).
use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub backend: BackendConfig,
    pub router: RouterConfig,
    pub dedupe: DedupeConfig,
    pub commands: CommandsConfig,
    pub source: SourceConfig,
    pub metrics: MetricsConfig,
}

/// Reply backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Endpoint receiving `{"messages": [...], "userId": "..."}` POSTs.
    /// Unset means every query fails with a configuration error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Sent as `Authorization: Bearer <key>` when present.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,

    /// Upper bound on a single backend call, in seconds.
    pub timeout_secs: u64,

    /// Caller identity forwarded as `userId`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 30,
            user_id: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backend URL, treating blank strings as unset.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Worker loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Number of worker tasks pulling from the message source.
    pub workers: usize,
    /// Idle timeout of a single receive call, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            poll_interval_ms: 1000,
        }
    }
}

impl RouterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Inbound message deduplication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    /// Window during which a repeated message id is suppressed.
    pub window_secs: u64,
    /// Hard cap on remembered ids; the oldest is evicted past it.
    pub max_entries: usize,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_entries: 10_000,
        }
    }
}

impl DedupeConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Control commands recognised by exact match on the message text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Clears the sender's conversation.
    pub clear_session: String,
    /// Clears every conversation.
    pub clear_all: String,
    pub clear_session_reply: String,
    pub clear_all_reply: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            clear_session: "clear-this-conversation".into(),
            clear_all: "clear-all-conversations".into(),
            clear_session_reply: "Conversation history cleared.".into(),
            clear_all_reply: "All conversation histories cleared.".into(),
        }
    }
}

/// Sidecar message source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// WebSocket URL of the chat client sidecar.
    pub url: String,
    /// Text prefixes that mark a request for image generation.
    pub image_create_prefixes: Vec<String>,
    /// Key group sessions by `room:sender` instead of sharing one per room.
    pub group_session_per_user: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:10086/ws".into(),
            image_create_prefixes: vec!["/draw".into()],
            group_session_per_user: false,
        }
    }
}

/// Prometheus exporter settings. Only honoured by builds with the
/// `metrics` feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Address of the scrape listener serving `/metrics`.
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, 9464)),
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

impl RelayConfig {
    /// Copy of the config with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.backend.api_key.is_some() {
            cfg.backend.api_key = Some(Secret::new("[REDACTED]".into()));
        }
        cfg
    }
}
