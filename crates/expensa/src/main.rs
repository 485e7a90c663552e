//! Expensa - command-line expense tracker
//!
//! Main entry point for the Expensa CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;

use commands::{auth, config, expense};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Expensa - track your expenses from the terminal
#[derive(Parser)]
#[command(name = "expensa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL including the API prefix (default: http://localhost:8080/api/v1)
    #[arg(long, global = true, env = "EXPENSA_SERVER_URL")]
    pub server: Option<String>,

    /// Client context to use instead of the current one
    #[arg(long, global = true)]
    pub context: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in, log out and inspect the session
    Auth(auth::AuthArgs),

    /// Record and review expenses
    Expense(expense::ExpenseArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

const CRATES: [&str; 4] = ["expensa", "expensa_client", "expensa_session", "expensa_config"];

/// Filter directive giving every workspace crate `level` and everything else `rest`.
fn directives(level: &str, rest: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .chain(std::iter::once(rest.to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Terse stderr output plus a daily JSON log under the config dir.
///
/// The returned guard flushes the file writer when dropped.
fn init_tracing(verbose: bool) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let console = if verbose {
        directives("debug", "info")
    } else {
        directives("warn", "error")
    };

    let appender = tracing_appender::rolling::daily(expensa_config::log_dir(), "expensa.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(console)),
        )
        .with(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(directives("trace", "info"))),
        )
        .init();

    guard
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_tracing(cli.verbose);

    // Flags override the selected context, which overrides built-in defaults
    let client_config = expensa_config::load_client_config()?;
    let resolved = client_config.resolve(cli.context.as_deref())?;
    let server_url = cli.server.unwrap_or(resolved.server);
    tracing::debug!(server = %server_url, context = ?resolved.name, "Resolved connection");

    let ctx = commands::Context {
        server_url,
        context_name: resolved.name,
        timeout: resolved.timeout,
        refresh_timeout: resolved.refresh_timeout,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Auth(args) => auth::run(args, &ctx).await,
        Commands::Expense(args) => expense::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
