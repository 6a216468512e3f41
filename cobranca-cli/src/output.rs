//! Output formatting utilities

use anyhow::Result;
use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;

use cobranca_core::{DispatchStatus, InvoiceStatus};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Pretty-print any serializable value
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn invoice_status(status: InvoiceStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        InvoiceStatus::Open => label.cyan(),
        InvoiceStatus::Overdue => label.red(),
        InvoiceStatus::Received => label.green(),
        InvoiceStatus::Negotiated => label.yellow(),
        InvoiceStatus::Cancelled => label.dimmed(),
    }
}

pub fn dispatch_status(status: DispatchStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        DispatchStatus::Pending => label.yellow(),
        DispatchStatus::Sent => label.green(),
        DispatchStatus::Failed => label.red(),
    }
}

/// Shorten a UUID to its first segment for table display
pub fn short_id(id: &uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}
