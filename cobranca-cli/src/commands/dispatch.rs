//! Dispatch command - send reminders and list what was sent

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;

use cobranca_core::services::ReminderTemplate;
use cobranca_core::DispatchStatus;

use super::{get_context, get_logger, log_outcome, resolve_invoice_id};
use crate::output;

#[derive(Subcommand)]
pub enum DispatchCommands {
    /// Send a reminder covering the client's open invoices
    Send {
        /// Invoice ID (or a unique prefix)
        invoice_id: String,
        /// Template name
        #[arg(long, short, default_value = "1º Aviso")]
        template: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show dispatch history, newest first
    History {
        /// Only this status (pending, sent, failed)
        #[arg(long)]
        status: Option<DispatchStatus>,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List reminder templates
    Templates,
}

pub fn run(command: DispatchCommands) -> Result<()> {
    match command {
        DispatchCommands::Send { invoice_id, template, json } => send(&invoice_id, &template, json),
        DispatchCommands::History { status, from, to, json } => history(status, from, to, json),
        DispatchCommands::Templates => {
            for template in ReminderTemplate::ALL {
                println!("  • {}", template);
            }
            Ok(())
        }
    }
}

fn send(id: &str, template: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let invoice_id = resolve_invoice_id(&ctx, id)?;

    let logger = get_logger();
    let result = ctx.dispatch_service.send(invoice_id, template);
    log_outcome(&logger, "dispatch", &result);
    let outcome = result?;

    if json {
        return output::print_json(&outcome);
    }

    match outcome.dispatch.status {
        DispatchStatus::Sent => output::success(&format!(
            "Reminder sent covering {} invoices ({})",
            outcome.invoices_notified, outcome.dispatch.response
        )),
        _ => output::error(&format!("Reminder failed: {}", outcome.dispatch.response)),
    }
    println!();
    println!("{}", outcome.message.dimmed());
    Ok(())
}

fn history(
    status: Option<DispatchStatus>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let entries = ctx.dispatch_service.history(status, from, to)?;

    if json {
        return output::print_json(&entries);
    }
    if entries.is_empty() {
        println!("No dispatches found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["When", "Client", "NF", "Template", "Status", "Response"]);
    for entry in &entries {
        let d = &entry.dispatch;
        table.add_row(vec![
            d.created_at.format("%d/%m/%Y %H:%M").to_string(),
            entry.client_name.clone(),
            entry.invoice_number.clone(),
            d.template.clone(),
            output::dispatch_status(d.status).to_string(),
            d.response.clone(),
        ]);
    }
    println!("{}", table);
    Ok(())
}
