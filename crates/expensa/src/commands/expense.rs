//! Expense command - record and review expenses.

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use console::{Style, style};
use expensa_client::NewExpense;

use super::Context;
use crate::client::Connection;

/// Arguments for the expense command.
#[derive(Args, Debug)]
pub struct ExpenseArgs {
    #[command(subcommand)]
    pub command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    /// Record an expense
    Add {
        /// What the money was spent on
        title: String,

        /// Amount spent
        #[arg(short, long)]
        amount: f64,

        /// Expense category
        #[arg(short, long)]
        category: String,

        /// Date spent, YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,

        /// Free-form description
        #[arg(long, default_value = "")]
        description: String,

        /// Emoji shown next to the expense
        #[arg(long)]
        icon: Option<String>,

        /// Link to a receipt
        #[arg(long)]
        file_url: Option<String>,
    },

    /// List expenses
    List {
        /// Maximum expenses to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show the total spent
    Total,
}

/// Run the expense command.
pub async fn run(args: ExpenseArgs, ctx: &Context) -> Result<()> {
    let conn = Connection::open(ctx)?;
    let session = conn.require_session()?;
    if ctx.verbose {
        let dim = Style::new().dim();
        eprintln!("{}", dim.apply_to(format!("Signed in as {}", session.email)));
    }

    let result = match args.command {
        ExpenseCommand::Add {
            title,
            amount,
            category,
            date,
            description,
            icon,
            file_url,
        } => {
            let expense = NewExpense {
                title,
                category,
                amount,
                date: date.unwrap_or_else(today),
                description,
                file_url,
                icon,
            };
            cmd_add(&conn, expense, ctx).await
        }
        ExpenseCommand::List { limit } => cmd_list(&conn, limit, ctx).await,
        ExpenseCommand::Total => cmd_total(&conn, ctx).await,
    };

    conn.save()?;
    result
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Required-field checks before anything is sent.
fn validate(expense: &NewExpense) -> Result<()> {
    if expense.title.trim().is_empty() {
        anyhow::bail!("Title is required");
    }
    if expense.category.trim().is_empty() {
        anyhow::bail!("Category is required");
    }
    if !(expense.amount.is_finite() && expense.amount > 0.0) {
        anyhow::bail!("Amount must be a positive number");
    }
    chrono::NaiveDate::parse_from_str(&expense.date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", expense.date))?;
    Ok(())
}

async fn cmd_add(conn: &Connection, expense: NewExpense, ctx: &Context) -> Result<()> {
    validate(&expense)?;

    let created = conn
        .client()
        .expenses()
        .create(&expense)
        .await
        .context("Failed to add expense")?;

    if ctx.json_output {
        match &created {
            Some(stored) => println!("{}", serde_json::to_string_pretty(stored)?),
            None => println!("{}", serde_json::json!({ "created": true })),
        }
    } else {
        let green = Style::new().green();
        println!(
            "{} Added {} ({:.2}, {})",
            green.apply_to("✓"),
            style(&expense.title).bold(),
            expense.amount,
            expense.category
        );
    }

    Ok(())
}

async fn cmd_list(conn: &Connection, limit: usize, ctx: &Context) -> Result<()> {
    let expenses = conn
        .client()
        .expenses()
        .list()
        .await
        .context("Failed to list expenses")?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&expenses)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("Expenses").bold());
    println!("{}", dim.apply_to("─".repeat(60)));

    if expenses.is_empty() {
        println!("{}", dim.apply_to("No expenses recorded"));
        return Ok(());
    }

    for expense in expenses.iter().take(limit) {
        println!(
            "{} {} {:<24} {:>10.2}  {}",
            dim.apply_to(&expense.date),
            expense.icon.as_deref().unwrap_or(" "),
            expense.title,
            expense.amount,
            dim.apply_to(&expense.category)
        );
    }
    if expenses.len() > limit {
        println!(
            "{}",
            dim.apply_to(format!("… {} more", expenses.len() - limit))
        );
    }

    Ok(())
}

async fn cmd_total(conn: &Connection, ctx: &Context) -> Result<()> {
    let total = conn
        .client()
        .expenses()
        .total()
        .await
        .context("Failed to fetch total")?;

    if ctx.json_output {
        println!("{}", serde_json::json!({ "total": total }));
    } else {
        println!("{} {:.2}", style("Total spent:").bold(), total);
    }

    Ok(())
}
