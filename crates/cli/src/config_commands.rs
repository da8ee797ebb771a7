use std::path::Path;

use {
    anyhow::Result,
    chatrelay_config::{RelayConfig, Severity, validate},
    clap::Subcommand,
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration with secrets redacted.
    Show,
    /// Validate the configuration and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the config file in use, if any.
    Path,
}

pub fn handle_config(
    action: ConfigAction,
    config: &RelayConfig,
    explicit: Option<&Path>,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", render(config)?);
            Ok(())
        },
        ConfigAction::Check { verbose } => check(config, verbose),
        ConfigAction::Path => {
            match explicit
                .map(Path::to_path_buf)
                .or_else(chatrelay_config::find_config_file)
            {
                Some(path) => println!("{}", path.display()),
                None => eprintln!("No config file found; using defaults."),
            }
            Ok(())
        },
    }
}

fn render(config: &RelayConfig) -> Result<String> {
    Ok(toml::to_string_pretty(&config.redacted())?)
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config: &RelayConfig, verbose: bool) -> Result<()> {
    let diagnostics = validate(config);

    let mut shown = 0;
    for d in &diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };
        eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        shown += 1;
    }

    let count = |severity| diagnostics.iter().filter(|d| d.severity == severity).count();
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    #[test]
    fn show_redacts_api_key() {
        let mut config = RelayConfig::default();
        config.backend.url = Some("https://backend.example/chat".into());
        config.backend.api_key = Some(Secret::new("sk-very-secret".into()));

        let out = render(&config).unwrap();
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains("sk-very-secret"));
        assert!(out.contains("https://backend.example/chat"));
    }
}
