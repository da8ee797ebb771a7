//! `chatrelay doctor`: config validation and environment audit.
//!
//! Prints a structured report with `[ok]`, `[warn]`, `[fail]` or `[info]`
//! status indicators per item. Nothing is contacted over the network.

use std::path::Path;

use {
    anyhow::Result,
    chatrelay_config::{RelayConfig, Severity, validate},
    secrecy::ExposeSecret,
};

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Per-check result used to build the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Info => CYAN,
        }
    }
}

struct CheckItem {
    status: Status,
    message: String,
}

struct Section {
    title: String,
    items: Vec<CheckItem>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push(CheckItem {
            status,
            message: message.into(),
        });
    }
}

fn print_report(sections: &[Section]) -> (usize, usize) {
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for item in &section.items {
            let color = item.status.color();
            let label = item.status.label();
            eprintln!("  [{color}{label}{RESET}]  {}", item.message);
            match item.status {
                Status::Fail => errors += 1,
                Status::Warn => warnings += 1,
                _ => {},
            }
        }
        eprintln!();
    }

    (errors, warnings)
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub fn handle_doctor(config: &RelayConfig, explicit: Option<&Path>) -> Result<()> {
    eprintln!("{BOLD}chatrelay doctor{RESET}");
    eprintln!("{BOLD}================{RESET}\n");

    let config_path = explicit
        .map(Path::to_path_buf)
        .or_else(chatrelay_config::find_config_file);

    let sections = vec![
        check_config(config, config_path.as_deref()),
        check_backend(config),
        check_source(config),
    ];

    let (errors, warnings) = print_report(&sections);

    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

// ── Checks ──────────────────────────────────────────────────────────────────

fn check_config(config: &RelayConfig, path: Option<&Path>) -> Section {
    let label = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".into());
    let mut section = Section::new(format!("Config ({label})"));

    if path.is_none() {
        section.push(Status::Info, "no config file found; using built-in defaults");
    }

    let diagnostics = validate(config);
    if diagnostics.is_empty() {
        section.push(Status::Ok, "no issues found");
    }
    for d in diagnostics {
        let status = match d.severity {
            Severity::Error => Status::Fail,
            Severity::Warning => Status::Warn,
            Severity::Info => Status::Info,
        };
        section.push(status, format!("{}: {}", d.path, d.message));
    }
    section
}

fn check_backend(config: &RelayConfig) -> Section {
    let mut section = Section::new("Reply backend");
    let backend = &config.backend;

    match backend.url() {
        Some(url) => section.push(Status::Ok, format!("url: {url}")),
        None => section.push(
            Status::Warn,
            "url not set (backend.url or CHATRELAY_BACKEND_URL)",
        ),
    }

    match &backend.api_key {
        Some(key) if !key.expose_secret().is_empty() => {
            section.push(Status::Ok, "API key configured");
        },
        _ => section.push(
            Status::Info,
            "no API key; requests are sent without an Authorization header",
        ),
    }

    section.push(
        Status::Info,
        format!(
            "timeout {}s, userId {:?}",
            backend.timeout_secs,
            backend.user_id.as_deref().unwrap_or_default()
        ),
    );
    section
}

fn check_source(config: &RelayConfig) -> Section {
    let mut section = Section::new("Chat sidecar");
    let source = &config.source;

    if source.url.starts_with("ws://") || source.url.starts_with("wss://") {
        section.push(Status::Ok, format!("url: {}", source.url));
    } else {
        // Already reported as a config error above.
        section.push(Status::Info, format!("url: {} (not a WebSocket URL)", source.url));
    }

    if source.image_create_prefixes.is_empty() {
        section.push(Status::Info, "no image-create prefixes configured");
    } else {
        section.push(
            Status::Info,
            format!(
                "image-create prefixes: {}",
                source.image_create_prefixes.join(", ")
            ),
        );
    }

    section.push(
        Status::Info,
        format!(
            "{} worker(s), group sessions {}",
            config.router.workers,
            if source.group_session_per_user {
                "per member"
            } else {
                "per room"
            }
        ),
    );
    section
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn statuses(section: &Section) -> Vec<Status> {
        section.items.iter().map(|i| i.status).collect()
    }

    #[test]
    fn default_config_warns_about_backend() {
        let section = check_backend(&RelayConfig::default());
        assert_eq!(statuses(&section), vec![Status::Warn, Status::Info, Status::Info]);
    }

    #[test]
    fn configured_backend_is_ok() {
        let mut config = RelayConfig::default();
        config.backend.url = Some("https://backend.example/chat".into());
        config.backend.api_key = Some(Secret::new("sk".into()));

        let section = check_backend(&config);
        assert_eq!(statuses(&section), vec![Status::Ok, Status::Ok, Status::Info]);
    }

    #[test]
    fn empty_api_key_counts_as_missing() {
        let mut config = RelayConfig::default();
        config.backend.api_key = Some(Secret::new(String::new()));
        let section = check_backend(&config);
        assert_eq!(section.items[1].status, Status::Info);
    }

    #[test]
    fn bad_source_url_is_counted_once() {
        let mut config = RelayConfig::default();
        config.source.url = "127.0.0.1:10086".into();
        let (errors, _) = print_report(&[check_config(&config, None), check_source(&config)]);
        assert_eq!(errors, 1);
    }

    #[test]
    fn config_section_reports_validation() {
        let mut config = RelayConfig::default();
        config.router.workers = 0;
        let section = check_config(&config, None);
        assert!(
            section
                .items
                .iter()
                .any(|i| i.status == Status::Fail && i.message.starts_with("router.workers"))
        );
        let (errors, _) = print_report(&[section]);
        assert!(errors >= 1);
    }
}
