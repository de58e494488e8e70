//! etherealsd: ethereal secrets daemon
//!
//! Usage:
//!   etherealsd [--config /etc/ethereal/config.toml] [--log info] [--log-format text|json]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "etherealsd", version, about = "Ethereal secrets daemon")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(
        long,
        short = 'c',
        env = "ETHEREAL_CONFIG",
        default_value = "/etc/ethereal/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error) [default: server.log_level]
    #[arg(long, env = "ETHEREAL_LOG")]
    log: Option<String>,

    /// Log format (json, text) [default: server.log_format]
    #[arg(long, env = "ETHEREAL_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ethereal_server::daemon::load_config(&cli.config).await?;

    let level = cli.log.unwrap_or_else(|| config.server.log_level.clone());
    let format = cli.log_format.unwrap_or_else(|| {
        LogFormat::from_str(&config.server.log_format, true).unwrap_or(LogFormat::Text)
    });
    init_logging(&level, &format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "etherealsd starting"
    );
    if !cli.config.exists() {
        warn!(
            "config file not found: {}  (using defaults)",
            cli.config.display()
        );
    }

    ethereal_server::daemon::run(config).await
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}
