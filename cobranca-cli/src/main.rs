//! Cobrança CLI - billing collections in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;
mod output;

use cobranca_core::PaymentMethod;
use commands::{clear, clients, dashboard, dispatch, import, invoices, logs, pay};

/// Cobrança - import receivables, track payments, send reminders
#[derive(Parser)]
#[command(name = "cob", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a carteira spreadsheet (CSV export)
    Import {
        /// Path to CSV file
        file: PathBuf,
        /// Show what would be imported without writing anything
        #[arg(long)]
        preview: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove invoices imported on a day, with the clients left behind
    Clear {
        /// Day to clear (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON (requires --force)
        #[arg(long, requires = "force")]
        json: bool,
    },

    /// List and manage invoices
    Invoices {
        #[command(subcommand)]
        command: invoices::InvoiceCommands,
    },

    /// Record a payment against an invoice
    Pay {
        /// Invoice ID (or a unique prefix)
        id: String,
        /// Amount received
        amount: Decimal,
        /// Payment method (pix, boleto, transfer, cash, other)
        #[arg(long, default_value = "pix")]
        method: PaymentMethod,
        /// Partial payment: keep the invoice open
        #[arg(long)]
        partial: bool,
        /// Payment date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Free-text note
        #[arg(long)]
        note: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List clients
    Clients {
        /// Filter by name
        #[arg(long, short)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Portfolio summary for a creation-date range
    Dashboard {
        /// First day (YYYY-MM-DD, defaults to 30 days ago)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send reminders and review dispatch history
    Dispatch {
        #[command(subcommand)]
        command: dispatch::DispatchCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import { file, preview, json } => import::run(&file, preview, json),
        Commands::Clear { date, force, json } => clear::run(date, force, json),
        Commands::Invoices { command } => invoices::run(command),
        Commands::Pay { id, amount, method, partial, date, note, json } => {
            pay::run(&id, amount, method, partial, date, note, json)
        }
        Commands::Clients { search, json } => clients::run(search.as_deref(), json),
        Commands::Dashboard { from, to, json } => dashboard::run(from, to, json),
        Commands::Dispatch { command } => dispatch::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_json_requires_force() {
        assert!(Cli::try_parse_from(["cob", "clear", "--json"]).is_err());
        assert!(Cli::try_parse_from(["cob", "clear", "--json", "--force"]).is_ok());
        assert!(Cli::try_parse_from(["cob", "clear", "--date", "2026-02-10"]).is_ok());
    }

    #[test]
    fn test_logs_clear_json_requires_force() {
        assert!(Cli::try_parse_from(["cob", "logs", "clear", "--json"]).is_err());
        assert!(Cli::try_parse_from(["cob", "logs", "clear", "--json", "-f"]).is_ok());
    }

    #[test]
    fn test_command_tree_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
