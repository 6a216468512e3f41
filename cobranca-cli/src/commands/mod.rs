//! CLI command implementations

pub mod clear;
pub mod clients;
pub mod dashboard;
pub mod dispatch;
pub mod import;
pub mod invoices;
pub mod logs;
pub mod pay;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use cobranca_core::config::DIR_ENV;
use cobranca_core::services::{EntryPoint, LogEvent, LoggingService};
use cobranca_core::CobrancaContext;
use uuid::Uuid;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Log the outcome of a command: `<name>_completed` or `<name>_failed`
pub fn log_outcome<T>(logger: &Option<LoggingService>, command: &str, result: &Result<T>) {
    let event = match result {
        Ok(_) => LogEvent::new(format!("{}_completed", command)).with_command(command),
        Err(e) => LogEvent::new(format!("{}_failed", command))
            .with_command(command)
            .with_error(e.to_string())
            .with_error_details(format!("{:#}", e)),
    };
    log_event(logger, event);
}

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".cobranca"))
        .ok_or_else(|| anyhow!("Could not find home directory; set {}", DIR_ENV))
}

/// Open the data directory
pub fn get_context() -> Result<CobrancaContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    CobrancaContext::new(&data_dir).context("Failed to initialize cobranca context")
}

/// Resolve a full invoice ID or a unique prefix of one, as shown in tables
pub fn resolve_invoice_id(ctx: &CobrancaContext, id: &str) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }
    let prefix = id.trim().to_lowercase();
    if prefix.is_empty() {
        return Err(anyhow!("Invoice ID cannot be empty"));
    }
    let matches: Vec<Uuid> = ctx
        .repository
        .get_invoices()?
        .into_iter()
        .map(|i| i.id)
        .filter(|uuid| uuid.to_string().starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [single] => Ok(*single),
        [] => Err(anyhow!("No invoice matches '{}'", id)),
        _ => Err(anyhow!("'{}' matches {} invoices, use more characters", id, matches.len())),
    }
}
