//! Invoices command - list, update, export and delete invoices

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;
use rust_decimal::Decimal;

use cobranca_core::domain::AgingBucket;
use cobranca_core::services::{
    export_csv, format_brl, format_date_br, group_by_client, InvoiceFilter, InvoiceListEntry,
};
use cobranca_core::InvoiceStatus;

use super::{get_context, get_logger, log_outcome, resolve_invoice_id};
use crate::output;

#[derive(Args, Clone, Default)]
pub struct FilterArgs {
    /// Only this status (open, overdue, received, negotiated, cancelled)
    #[arg(long)]
    status: Option<InvoiceStatus>,
    /// Only this aging bucket (0-7, 8-15, 16-30, 30+)
    #[arg(long)]
    bucket: Option<AgingBucket>,
    /// Client name, invoice number or título
    #[arg(long, short)]
    search: Option<String>,
    /// Only invoices reminded on this day (YYYY-MM-DD)
    #[arg(long)]
    dispatched_on: Option<NaiveDate>,
}

impl FilterArgs {
    fn to_filter(&self) -> InvoiceFilter {
        InvoiceFilter {
            status: self.status,
            bucket: self.bucket,
            search: self.search.clone(),
            dispatch_date: self.dispatched_on,
            client_id: None,
        }
    }
}

#[derive(Subcommand)]
pub enum InvoiceCommands {
    /// List invoices
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Group invoices by client
        #[arg(long)]
        by_client: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one invoice with its payments
    Show {
        /// Invoice ID (or a unique prefix)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an invoice's status
    Status {
        /// Invoice ID (or a unique prefix)
        id: String,
        /// New status
        status: InvoiceStatus,
    },
    /// Export invoices as a semicolon-separated CSV
    Export {
        /// Output file
        file: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Recompute overdue days against today (or --date)
    Refresh {
        /// Reference date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an invoice with its payments and dispatches
    Delete {
        /// Invoice ID (or a unique prefix)
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(command: InvoiceCommands) -> Result<()> {
    match command {
        InvoiceCommands::List { filter, by_client, json } => list(&filter.to_filter(), by_client, json),
        InvoiceCommands::Show { id, json } => show(&id, json),
        InvoiceCommands::Status { id, status } => set_status(&id, status),
        InvoiceCommands::Export { file, filter } => export(&file, &filter.to_filter()),
        InvoiceCommands::Refresh { date, json } => refresh(date, json),
        InvoiceCommands::Delete { id, force } => delete(&id, force),
    }
}

fn list(filter: &InvoiceFilter, by_client: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let entries = ctx.invoice_service.list(filter)?;

    if by_client {
        let groups = group_by_client(&entries);
        if json {
            return output::print_json(&groups);
        }
        if groups.is_empty() {
            println!("No invoices found.");
            return Ok(());
        }
        let mut table = output::create_table();
        table.set_header(vec!["Client", "Phone", "Invoices", "Total", "Max days", "Last reminder"]);
        for group in &groups {
            table.add_row(vec![
                group.client_name.clone(),
                group.client_phone.clone().unwrap_or_default(),
                group.invoices.len().to_string(),
                format_brl(group.total),
                group.max_overdue_days.to_string(),
                group
                    .last_dispatch
                    .map(|d| d.format("%d/%m/%Y %H:%M").to_string())
                    .unwrap_or_default(),
            ]);
        }
        println!("{}", table);
        return Ok(());
    }

    if json {
        return output::print_json(&entries);
    }
    if entries.is_empty() {
        println!("No invoices found.");
        return Ok(());
    }
    print_entries(&entries);
    Ok(())
}

fn print_entries(entries: &[InvoiceListEntry]) {
    let mut table = output::create_table();
    table.set_header(vec!["ID", "Client", "NF", "Título", "Due", "Total", "Days", "Status"]);
    for entry in entries {
        let inv = &entry.invoice;
        table.add_row(vec![
            output::short_id(&inv.id),
            entry.client_name.clone(),
            inv.invoice_number.clone(),
            inv.note_number.clone().unwrap_or_default(),
            inv.due_date.map(format_date_br).unwrap_or_default(),
            format_brl(inv.total_amount),
            inv.overdue_days.to_string(),
            output::invoice_status(inv.status).to_string(),
        ]);
    }
    println!("{}", table);

    let total: Decimal = entries.iter().map(|e| e.invoice.total_amount).sum();
    println!("{} invoices, {}", entries.len(), format_brl(total).bold());
}

fn show(id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let invoice_id = resolve_invoice_id(&ctx, id)?;
    let invoice = ctx.invoice_service.get(invoice_id)?;
    let receipts = ctx.invoice_service.receipts(invoice_id)?;

    if json {
        return output::print_json(&serde_json::json!({
            "invoice": invoice,
            "receipts": receipts,
        }));
    }

    println!("{}", format!("NF {}", invoice.invoice_number).bold());
    println!("  ID:        {}", invoice.id);
    if let Some(note) = &invoice.note_number {
        println!("  Título:    {}", note);
    }
    if let Some(due) = invoice.due_date {
        println!("  Due:       {}", format_date_br(due));
    }
    println!("  Principal: {}", format_brl(invoice.principal_amount));
    println!("  Interest:  {}", format_brl(invoice.interest_amount));
    println!("  Total:     {}", format_brl(invoice.total_amount));
    println!("  Days late: {}", invoice.overdue_days);
    println!("  Status:    {}", output::invoice_status(invoice.status));

    if !receipts.is_empty() {
        println!();
        let mut table = output::create_table();
        table.set_header(vec!["Date", "Amount", "Method", "Note"]);
        for r in &receipts {
            table.add_row(vec![
                format_date_br(r.date),
                format_brl(r.amount),
                r.method.to_string(),
                r.note.clone().unwrap_or_default(),
            ]);
        }
        println!("{}", table);
    }
    Ok(())
}

fn set_status(id: &str, status: InvoiceStatus) -> Result<()> {
    let ctx = get_context()?;
    let invoice_id = resolve_invoice_id(&ctx, id)?;

    let logger = get_logger();
    let result = ctx.invoice_service.set_status(invoice_id, status);
    log_outcome(&logger, "invoice_status", &result);
    let invoice = result?;

    output::success(&format!(
        "NF {} is now {}",
        invoice.invoice_number,
        invoice.status
    ));
    Ok(())
}

fn export(file: &Path, filter: &InvoiceFilter) -> Result<()> {
    let ctx = get_context()?;
    let entries = ctx.invoice_service.list(filter)?;

    let out = File::create(file).with_context(|| format!("Failed to create {}", file.display()))?;
    export_csv(BufWriter::new(out), &entries)?;

    output::success(&format!("Exported {} invoices to {}", entries.len(), file.display()));
    Ok(())
}

fn refresh(date: Option<NaiveDate>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let today = date.unwrap_or_else(|| ctx.config.today());

    let logger = get_logger();
    let result = ctx.invoice_service.refresh_overdue(today);
    log_outcome(&logger, "refresh", &result);
    let changed = result?;

    if json {
        return output::print_json(&serde_json::json!({"date": today, "updated": changed}));
    }
    output::success(&format!("Updated {} invoices (reference date {})", changed, today));
    Ok(())
}

fn delete(id: &str, force: bool) -> Result<()> {
    let ctx = get_context()?;
    let invoice_id = resolve_invoice_id(&ctx, id)?;
    let invoice = ctx.invoice_service.get(invoice_id)?;

    if !force
        && !Confirm::new()
            .with_prompt(format!(
                "Delete NF {} ({})?",
                invoice.invoice_number,
                format_brl(invoice.total_amount)
            ))
            .default(false)
            .interact()?
    {
        println!("{}\n", "Cancelled".dimmed());
        return Ok(());
    }

    let logger = get_logger();
    let result = ctx.invoice_service.delete(invoice_id);
    log_outcome(&logger, "invoice_delete", &result);
    result?;

    output::success(&format!("Deleted NF {}", invoice.invoice_number));
    Ok(())
}
