//! Semantic checks on a loaded configuration.
//!
//! Nothing here is fatal at runtime: a missing backend URL still lets the
//! relay start (every query then gets a configuration error reply). The
//! diagnostics exist so `chatrelay doctor` can point at the problem first.

use crate::schema::RelayConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "backend.url"
    pub path: &'static str,
    pub message: String,
}

impl Diagnostic {
    fn new(severity: Severity, path: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            path,
            message: message.into(),
        }
    }
}

/// Validate a configuration, returning diagnostics ordered by severity.
pub fn validate(config: &RelayConfig) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    match config.backend.url() {
        None => out.push(Diagnostic::new(
            Severity::Warning,
            "backend.url",
            "no reply backend configured; every query will be answered with an error",
        )),
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
            out.push(Diagnostic::new(
                Severity::Error,
                "backend.url",
                format!("expected an http(s) URL, got `{url}`"),
            ));
        },
        Some(url) if url.starts_with("http://") && config.backend.api_key.is_some() => {
            out.push(Diagnostic::new(
                Severity::Warning,
                "backend.api_key",
                "API key will be sent over plain http",
            ));
        },
        Some(_) => {},
    }

    if config.backend.timeout_secs == 0 {
        out.push(Diagnostic::new(
            Severity::Error,
            "backend.timeout_secs",
            "timeout must be at least one second",
        ));
    }

    if config.router.workers == 0 {
        out.push(Diagnostic::new(
            Severity::Error,
            "router.workers",
            "at least one worker is required",
        ));
    }

    if config.router.poll_interval_ms == 0 {
        out.push(Diagnostic::new(
            Severity::Warning,
            "router.poll_interval_ms",
            "a zero poll interval busy-spins the worker loop",
        ));
    }

    if config.dedupe.window_secs == 0 {
        out.push(Diagnostic::new(
            Severity::Warning,
            "dedupe.window_secs",
            "deduplication is effectively disabled",
        ));
    }

    let commands = &config.commands;
    if commands.clear_session.trim().is_empty() || commands.clear_all.trim().is_empty() {
        out.push(Diagnostic::new(
            Severity::Error,
            "commands",
            "control commands must not be empty",
        ));
    } else if commands.clear_session == commands.clear_all {
        out.push(Diagnostic::new(
            Severity::Error,
            "commands.clear_all",
            "clear_all must differ from clear_session",
        ));
    }

    let source_url = config.source.url.as_str();
    if !(source_url.starts_with("ws://") || source_url.starts_with("wss://")) {
        out.push(Diagnostic::new(
            Severity::Error,
            "source.url",
            format!("expected a ws(s) URL, got `{source_url}`"),
        ));
    }

    if config.backend.user_id.is_none() {
        out.push(Diagnostic::new(
            Severity::Info,
            "backend.user_id",
            "no user id configured; requests carry an empty userId",
        ));
    }

    out.sort_by_key(|d| d.severity);
    out
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn paths(diags: &[Diagnostic], severity: Severity) -> Vec<&'static str> {
        diags
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.path)
            .collect()
    }

    #[test]
    fn default_config_only_warns() {
        let diags = validate(&RelayConfig::default());
        assert!(paths(&diags, Severity::Error).is_empty());
        assert_eq!(paths(&diags, Severity::Warning), vec!["backend.url"]);
    }

    #[test]
    fn flags_bad_values() {
        let mut cfg = RelayConfig::default();
        cfg.backend.url = Some("ftp://backend".into());
        cfg.backend.timeout_secs = 0;
        cfg.router.workers = 0;
        cfg.commands.clear_all = cfg.commands.clear_session.clone();
        cfg.source.url = "http://127.0.0.1:10086".into();

        let errors = paths(&validate(&cfg), Severity::Error);
        assert_eq!(errors, vec![
            "backend.url",
            "backend.timeout_secs",
            "router.workers",
            "commands.clear_all",
            "source.url",
        ]);
    }

    #[test]
    fn warns_on_plain_http_credentials() {
        let mut cfg = RelayConfig::default();
        cfg.backend.url = Some("http://backend/chat".into());
        cfg.backend.api_key = Some(Secret::new("sk".into()));
        cfg.backend.user_id = Some("bot".into());

        let diags = validate(&cfg);
        assert_eq!(paths(&diags, Severity::Warning), vec!["backend.api_key"]);
        assert!(paths(&diags, Severity::Info).is_empty());
    }
}
