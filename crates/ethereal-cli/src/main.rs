//! ethereal: share secrets through an ethereal secrets service
//!
//! Commands:
//!   share [TEXT]          - upload TEXT (or stdin) and print its fragment identifier
//!   fetch <FRAGMENT>      - print the clear text behind a fragment identifier
//!   revoke <FRAGMENT>     - delete the secret behind a fragment identifier

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ethereal_client::{ClientConfig, EtherealClient, SaveRemoteOptions};
use ethereal_core::types::format_http_date;
use tokio::io::AsyncReadExt;
use tracing::debug;

// ── CLI structure ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "ethereal",
    version,
    about = "Ethereal secrets client",
    long_about = "ethereal: share a secret as a link-safe fragment identifier the server cannot decrypt"
)]
struct Cli {
    /// Service endpoint
    #[arg(
        long,
        short = 'e',
        env = "ETHEREAL_ENDPOINT",
        default_value = "http://localhost:8080/"
    )]
    endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ETHEREAL_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt and upload a secret, then print its fragment identifier
    Share {
        /// Secret text (read from stdin when omitted)
        text: Option<String>,

        /// Lifetime in seconds (the server default applies when out of range)
        #[arg(long)]
        ttl: Option<u64>,

        /// Extra value required to fetch or revoke the secret
        #[arg(long)]
        second_factor: Option<String>,
    },

    /// Download and decrypt a secret
    Fetch {
        /// `<remoteKey>;<localKey>` as printed by `share`
        fragment: String,

        #[arg(long)]
        second_factor: Option<String>,
    },

    /// Delete a secret before it expires
    Revoke {
        fragment: String,

        #[arg(long)]
        second_factor: Option<String>,
    },
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let client = EtherealClient::new(ClientConfig::new(&cli.endpoint))
        .with_context(|| format!("creating client for {}", cli.endpoint))?;
    debug!(endpoint = %cli.endpoint, "client ready");

    match cli.command {
        Commands::Share {
            text,
            ttl,
            second_factor,
        } => cmd_share(&client, text, ttl, second_factor).await,
        Commands::Fetch {
            fragment,
            second_factor,
        } => cmd_fetch(&client, &fragment, second_factor.as_deref()).await,
        Commands::Revoke {
            fragment,
            second_factor,
        } => cmd_revoke(&client, &fragment, second_factor.as_deref()).await,
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

// ── Commands ───────────────────────────────────────────────────────────────

async fn cmd_share(
    client: &EtherealClient,
    text: Option<String>,
    ttl: Option<u64>,
    second_factor: Option<String>,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("reading secret from stdin")?;
            strip_line_ending(buf)
        }
    };

    let saved = client
        .save_remote(&text, SaveRemoteOptions { ttl, second_factor })
        .await
        .context("sharing secret")?;

    println!("{}", saved.fragment_identifier);
    if let Some(expiry) = saved.expiry_date {
        eprintln!("expires: {}", format_http_date(expiry));
    }
    Ok(())
}

async fn cmd_fetch(
    client: &EtherealClient,
    fragment: &str,
    second_factor: Option<&str>,
) -> Result<()> {
    let secret = client
        .get_remote(fragment, second_factor)
        .await
        .context("fetching secret")?;

    println!("{}", secret.clear_text);
    if let Some(expiry) = secret.expiry_date {
        eprintln!("expires: {}", format_http_date(expiry));
    }
    Ok(())
}

async fn cmd_revoke(
    client: &EtherealClient,
    fragment: &str,
    second_factor: Option<&str>,
) -> Result<()> {
    client
        .remove_remote(fragment, second_factor)
        .await
        .context("revoking secret")?;
    eprintln!("revoked");
    Ok(())
}

/// Drop the single line ending a shell pipe appends.
fn strip_line_ending(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_share() {
        let cli = Cli::try_parse_from([
            "ethereal",
            "--endpoint",
            "http://secrets.local",
            "share",
            "hunter2",
            "--ttl",
            "60",
            "--second-factor",
            "pin",
        ])
        .unwrap();
        assert_eq!(cli.endpoint, "http://secrets.local");
        match cli.command {
            Commands::Share {
                text,
                ttl,
                second_factor,
            } => {
                assert_eq!(text.as_deref(), Some("hunter2"));
                assert_eq!(ttl, Some(60));
                assert_eq!(second_factor.as_deref(), Some("pin"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_fetch_requires_fragment() {
        assert!(Cli::try_parse_from(["ethereal", "fetch"]).is_err());
    }

    #[test]
    fn test_strip_line_ending() {
        assert_eq!(strip_line_ending("abc\n".into()), "abc");
        assert_eq!(strip_line_ending("abc\r\n".into()), "abc");
        assert_eq!(strip_line_ending("abc\n\n".into()), "abc\n");
        assert_eq!(strip_line_ending("abc".into()), "abc");
    }
}
