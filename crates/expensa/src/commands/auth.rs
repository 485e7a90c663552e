//! Auth command - login, registration and session status.

use std::io::{BufRead, IsTerminal};

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use console::{Style, style};
use expensa_client::{LoginRequest, RegisterRequest};
use serde::Serialize;

use super::Context;
use crate::client::Connection;

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Log in with email and password
    Login {
        /// Account email (prompted if omitted)
        #[arg(short, long)]
        email: Option<String>,

        /// Read the password from stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },

    /// Create a new account
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account role
        #[arg(long, default_value = "USER")]
        role: String,

        /// Read the password from stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },

    /// Log out and forget the local session
    Logout,

    /// Show the local session
    Status,
}

/// Session status for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<expensa_client::Session>,
    server_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    let conn = Connection::open(ctx)?;

    let result = match args.command {
        AuthCommand::Login {
            email,
            password_stdin,
        } => cmd_login(&conn, email, password_stdin, ctx).await,
        AuthCommand::Register {
            name,
            email,
            role,
            password_stdin,
        } => cmd_register(&conn, name, email, role, password_stdin, ctx).await,
        AuthCommand::Logout => cmd_logout(&conn, ctx).await,
        AuthCommand::Status => cmd_status(&conn, ctx),
    };

    conn.save()?;
    result
}

async fn cmd_login(
    conn: &Connection,
    email: Option<String>,
    password_stdin: bool,
    ctx: &Context,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt_line("Email: ")?,
    };
    if email.is_empty() {
        anyhow::bail!("Email is required");
    }
    let password = read_password(password_stdin)?;

    let session = conn
        .client()
        .auth()
        .login(&LoginRequest { email, password })
        .await
        .context("Login failed")?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        let green = Style::new().green();
        println!(
            "{} Logged in as {}",
            green.apply_to("✓"),
            style(session.display_name()).bold()
        );
    }

    Ok(())
}

async fn cmd_register(
    conn: &Connection,
    name: String,
    email: String,
    role: String,
    password_stdin: bool,
    ctx: &Context,
) -> Result<()> {
    let password = read_password(password_stdin)?;

    conn.client()
        .auth()
        .register(&RegisterRequest {
            name,
            email: email.clone(),
            password,
            role,
        })
        .await
        .context("Registration failed")?;

    if ctx.json_output {
        println!("{}", serde_json::json!({ "registered": email }));
    } else {
        let green = Style::new().green();
        let dim = Style::new().dim();
        println!("{} Account created for {}", green.apply_to("✓"), email);
        println!("{}", dim.apply_to("Log in with: expensa auth login"));
    }

    Ok(())
}

async fn cmd_logout(conn: &Connection, ctx: &Context) -> Result<()> {
    let was_signed_in = conn.client().is_authenticated();
    conn.client().auth().logout().await;

    if ctx.json_output {
        println!("{}", serde_json::json!({ "logged_out": was_signed_in }));
    } else if was_signed_in {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }

    Ok(())
}

fn cmd_status(conn: &Connection, ctx: &Context) -> Result<()> {
    let snapshot = conn.client().session().snapshot();

    if ctx.json_output {
        let output = StatusOutput {
            authenticated: snapshot.authenticated,
            user: snapshot.session,
            server_url: ctx.server_url.clone(),
            context: ctx.context_name.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Expensa Session").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();

    match &snapshot.session {
        Some(user) => {
            let green = Style::new().green();
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                green.apply_to("● logged in")
            );
            println!("  {} {}", dim.apply_to("User:"), user.display_name());
            println!("  {} {}", dim.apply_to("Email:"), user.email);
        }
        None => {
            let red = Style::new().red();
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                red.apply_to("● not logged in")
            );
        }
    }
    println!("  {} {}", dim.apply_to("Server:"), ctx.server_url);
    if let Some(name) = &ctx.context_name {
        println!("  {} {}", dim.apply_to("Context:"), name);
    }
    println!();

    Ok(())
}

/// Read the password from stdin or an interactive prompt.
fn read_password(from_stdin: bool) -> Result<String> {
    let password = if from_stdin || !std::io::stdin().is_terminal() {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        rpassword::prompt_password("Password: ")?
    };

    if password.is_empty() {
        anyhow::bail!("Password is required");
    }
    Ok(password)
}

fn prompt_line(prompt: &str) -> Result<String> {
    use std::io::Write;
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
