mod config_commands;
mod doctor_commands;
mod relay_commands;

use std::path::{Path, PathBuf};

use {
    chatrelay_config::RelayConfig,
    clap::{Parser, Subcommand},
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "chatrelay",
    about = "chatrelay: answer chat messages from an HTTP reply backend"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "CHATRELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the chat sidecar and relay messages (default when no
    /// subcommand is provided).
    Run,
    /// Send one message through the router and print the reply.
    Ask {
        #[arg(short, long)]
        message: String,
        /// Conversation key the message belongs to.
        #[arg(long, default_value = "cli")]
        key: String,
    },
    /// Config validation and environment checks.
    Doctor,
    /// Configuration inspection.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the config named on the command line, or discover one.
///
/// An explicit path must load; discovery falls back to defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<RelayConfig> {
    match explicit {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            let mut config = chatrelay_config::load_config(path)?;
            chatrelay_config::apply_env_overrides(&mut config, |name| std::env::var(name).ok());
            Ok(config)
        },
        None => Ok(chatrelay_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chatrelay starting");

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        None | Some(Commands::Run) => relay_commands::run(config).await,
        Some(Commands::Ask { message, key }) => relay_commands::ask(config, message, key).await,
        Some(Commands::Doctor) => doctor_commands::handle_doctor(&config, cli.config.as_deref()),
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, &config, cli.config.as_deref())
        },
    }
}
