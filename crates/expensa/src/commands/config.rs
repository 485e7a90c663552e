//! Config command - client context management.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use expensa_config::Context as ClientContext;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved connection settings and all contexts
    Show,

    /// Show configuration file path
    Path,

    /// Switch to a different context
    UseContext {
        /// Context name to switch to
        name: String,
    },

    /// Create or update a context
    SetContext {
        /// Context name
        name: String,

        /// Server URL (e.g., http://localhost:8080/api/v1)
        #[arg(long)]
        server: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Session refresh timeout in seconds
        #[arg(long)]
        refresh_timeout: Option<u64>,
    },

    /// Delete a context
    DeleteContext {
        /// Context name to delete
        name: String,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(),
        ConfigCommand::UseContext { name } => cmd_use_context(&name),
        ConfigCommand::SetContext {
            name,
            server,
            timeout,
            refresh_timeout,
        } => cmd_set_context(&name, server, timeout, refresh_timeout),
        ConfigCommand::DeleteContext { name } => cmd_delete_context(&name),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = expensa_config::load_client_config()?;

    if ctx.json_output {
        let output = serde_json::json!({
            "server_url": ctx.server_url,
            "context": ctx.context_name,
            "timeout_secs": ctx.timeout.as_secs(),
            "refresh_timeout_secs": ctx.refresh_timeout.as_secs(),
            "contexts": config.context_names(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("Connection").bold());
    println!("  {} {}", dim.apply_to("Server:"), ctx.server_url);
    println!(
        "  {} {}",
        dim.apply_to("Context:"),
        ctx.context_name.as_deref().unwrap_or("(none)")
    );
    println!("  {} {}s", dim.apply_to("Timeout:"), ctx.timeout.as_secs());
    println!(
        "  {} {}s",
        dim.apply_to("Refresh timeout:"),
        ctx.refresh_timeout.as_secs()
    );
    println!();

    if config.contexts.is_empty() {
        println!("No contexts configured.");
        println!();
        println!("Create one with:");
        println!("  expensa config set-context local --server=http://localhost:8080/api/v1");
        return Ok(());
    }

    let current = config.current_context.as_deref();
    println!("CURRENT   NAME            SERVER");
    for context in &config.contexts {
        let marker = if current == Some(context.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{}         {:<15} {}", marker, context.name, context.server);
    }

    if ctx.verbose {
        println!("\n---\nRaw config:\n");
        println!("{}", config.to_yaml()?);
    }

    Ok(())
}

fn cmd_path() -> Result<()> {
    match expensa_config::client_config_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("Could not determine config directory"),
    }
    Ok(())
}

fn cmd_use_context(name: &str) -> Result<()> {
    let mut config = expensa_config::load_client_config()?;

    config.use_context(name)?;
    expensa_config::save_client_config(&config)?;

    println!("Switched to context \"{}\".", name);

    Ok(())
}

fn cmd_set_context(
    name: &str,
    server: Option<String>,
    timeout: Option<u64>,
    refresh_timeout: Option<u64>,
) -> Result<()> {
    let mut config = expensa_config::load_client_config()?;

    let context = match config.get_context(name).cloned() {
        Some(mut existing) => {
            if let Some(url) = server {
                existing.server = url;
            }
            if let Some(t) = timeout {
                existing.timeout = Some(t);
            }
            if let Some(t) = refresh_timeout {
                existing.refresh_timeout = Some(t);
            }
            println!("Context \"{}\" modified.", name);
            existing
        }
        None => {
            // A new context needs a server
            let server_url = server.ok_or_else(|| {
                anyhow::anyhow!("--server is required when creating a new context")
            })?;

            let mut context = ClientContext::new(name, server_url);
            if let Some(t) = timeout {
                context = context.with_timeout(t);
            }
            if let Some(t) = refresh_timeout {
                context = context.with_refresh_timeout(t);
            }
            println!("Context \"{}\" created.", name);
            context
        }
    };

    config.set_context(context);

    // The first context becomes current
    if config.current_context.is_none() && config.contexts.len() == 1 {
        config.current_context = Some(name.to_string());
        println!("Context \"{}\" set as current context.", name);
    }

    expensa_config::save_client_config(&config)?;

    Ok(())
}

fn cmd_delete_context(name: &str) -> Result<()> {
    let mut config = expensa_config::load_client_config()?;

    match config.remove_context(name) {
        Some(_) => {
            expensa_config::save_client_config(&config)?;
            println!("Context \"{}\" deleted.", name);
            if config.current_context.is_none() {
                println!(
                    "Note: No current context. Use 'expensa config use-context <name>' to set one."
                );
            }
        }
        None => {
            println!("Context \"{}\" not found.", name);
        }
    }

    Ok(())
}
