//! DuckDB repository implementation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, params_from_iter, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::Error;
use crate::domain::{
    Client, Dispatch, DispatchStatus, Invoice, InvoiceStatus, PaymentMethod, Receipt,
};
use crate::services::{DispatchEntry, MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

const INVOICE_COLUMNS: &str = "invoice_id, client_id, invoice_number, note_number, due_date::VARCHAR,
     principal_amount::VARCHAR, interest_amount::VARCHAR, total_amount::VARCHAR,
     overdue_days, status, match_key, batch_id, created_at::VARCHAR, last_dispatch::VARCHAR";

/// Rows removed by a day clear
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearCounts {
    pub invoices: usize,
    pub clients: usize,
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the database file.
    ///
    /// Retries with exponential backoff when the file is locked by another
    /// process, e.g. a second `cob` invocation still running.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = format!("{:#}", e);
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[cobranca] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extensions are linked statically; autoloading would fetch from ~/.duckdb
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;
        Ok(conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Clients ===

    /// Clients ordered by name; `search` matches the name case-insensitively
    pub fn get_clients(&self, search: Option<&str>) -> Result<Vec<Client>> {
        let conn = self.conn()?;
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let (filter, values) = match search {
            Some(s) => ("WHERE lower(name) LIKE ?", vec![format!("%{}%", s.to_lowercase())]),
            None => ("", Vec::new()),
        };

        let sql = format!(
            "SELECT client_id, name, phone, document FROM sys_clients {} ORDER BY lower(name), client_id",
            filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let clients = stmt
            .query_map(params_from_iter(values.iter()), row_to_client)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(clients)
    }

    pub fn get_client(&self, id: Uuid) -> Result<Option<Client>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT client_id, name, phone, document FROM sys_clients WHERE client_id = ?",
        )?;
        let client = stmt.query_row([id.to_string()], row_to_client).ok();
        Ok(client)
    }

    // === Invoices ===

    pub fn get_invoices(&self) -> Result<Vec<Invoice>> {
        self.query_invoices("", &[])
    }

    pub fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        Ok(self
            .query_invoices("WHERE invoice_id = ?", &[id.to_string()])?
            .into_iter()
            .next())
    }

    pub fn get_invoices_by_client(&self, client_id: Uuid) -> Result<Vec<Invoice>> {
        self.query_invoices("WHERE client_id = ?", &[client_id.to_string()])
    }

    /// Invoices whose creation day falls in `[from, to]`
    pub fn get_invoices_created_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Invoice>> {
        self.query_invoices(
            "WHERE CAST(created_at AS DATE) BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)",
            &[from.to_string(), to.to_string()],
        )
    }

    fn query_invoices(&self, filter: &str, values: &[String]) -> Result<Vec<Invoice>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM sys_invoices {} ORDER BY created_at, invoice_number, note_number",
            INVOICE_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let invoices = stmt
            .query_map(params_from_iter(values.iter()), row_to_invoice)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(invoices)
    }

    /// Every match key already stored
    pub fn get_match_keys(&self) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT match_key FROM sys_invoices")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(keys)
    }

    /// Insert new clients and invoices in one transaction.
    /// Nothing is written when any record fails validation.
    pub fn insert_carteira(&self, clients: &[Client], invoices: &[Invoice]) -> Result<()> {
        for client in clients {
            client
                .validate()
                .map_err(|e| Error::validation(format!("client {}: {}", client.id, e)))?;
        }
        for invoice in invoices {
            invoice
                .validate()
                .map_err(|e| Error::validation(format!("invoice {}: {}", invoice.id, e)))?;
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for client in clients {
            tx.execute(
                "INSERT INTO sys_clients (client_id, name, phone, document) VALUES (?, ?, ?, ?)",
                params![
                    client.id.to_string(),
                    client.name,
                    client.phone,
                    client.document,
                ],
            )
            .with_context(|| format!("Failed to insert client {}", client.id))?;
        }

        for invoice in invoices {
            tx.execute(
                "INSERT INTO sys_invoices (invoice_id, client_id, invoice_number, note_number, due_date,
                                           principal_amount, interest_amount, total_amount,
                                           overdue_days, status, match_key, batch_id, created_at, last_dispatch)
                 VALUES (?, ?, ?, ?, CAST(? AS DATE),
                         CAST(? AS DECIMAL(18, 2)), CAST(? AS DECIMAL(18, 2)), CAST(? AS DECIMAL(18, 2)),
                         ?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
                params![
                    invoice.id.to_string(),
                    invoice.client_id.to_string(),
                    invoice.invoice_number,
                    invoice.note_number,
                    invoice.due_date.map(|d| d.to_string()),
                    invoice.principal_amount.to_string(),
                    invoice.interest_amount.to_string(),
                    invoice.total_amount.to_string(),
                    i64::from(invoice.overdue_days),
                    invoice.status.as_str(),
                    invoice.match_key,
                    invoice.batch_id,
                    format_timestamp(&invoice.created_at),
                    invoice.last_dispatch.as_ref().map(format_timestamp),
                ],
            )
            .with_context(|| format!("Failed to insert invoice {}", invoice.invoice_number))?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn update_invoice_status(&self, id: Uuid, status: InvoiceStatus) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE sys_invoices SET status = ? WHERE invoice_id = ?",
            params![status.as_str(), id.to_string()],
        )?;
        Ok(changed > 0)
    }

    pub fn update_invoice_overdue(&self, id: Uuid, overdue_days: u32, status: InvoiceStatus) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE sys_invoices SET overdue_days = ?, status = ? WHERE invoice_id = ?",
            params![i64::from(overdue_days), status.as_str(), id.to_string()],
        )?;
        Ok(())
    }

    pub fn set_last_dispatch(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let at = format_timestamp(&at);
        for id in ids {
            conn.execute(
                "UPDATE sys_invoices SET last_dispatch = CAST(? AS TIMESTAMP) WHERE invoice_id = ?",
                params![at, id.to_string()],
            )?;
        }
        Ok(())
    }

    /// Delete an invoice together with its receipts and dispatches.
    /// Returns false when no such invoice exists.
    pub fn delete_invoice(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let id = id.to_string();
        conn.execute("DELETE FROM sys_receipts WHERE invoice_id = ?", [id.as_str()])?;
        conn.execute("DELETE FROM sys_dispatches WHERE invoice_id = ?", [id.as_str()])?;
        let deleted = conn.execute("DELETE FROM sys_invoices WHERE invoice_id = ?", [id.as_str()])?;
        Ok(deleted > 0)
    }

    /// Delete every invoice created on `day` (UTC), then clients left
    /// without invoices
    pub fn delete_invoices_created_on(&self, day: NaiveDate) -> Result<ClearCounts> {
        let conn = self.conn()?;
        let day = day.to_string();
        let same_day = "SELECT invoice_id FROM sys_invoices WHERE CAST(created_at AS DATE) = CAST(? AS DATE)";

        conn.execute(
            &format!("DELETE FROM sys_receipts WHERE invoice_id IN ({})", same_day),
            [day.as_str()],
        )?;
        conn.execute(
            &format!("DELETE FROM sys_dispatches WHERE invoice_id IN ({})", same_day),
            [day.as_str()],
        )?;
        let invoices = conn.execute(
            "DELETE FROM sys_invoices WHERE CAST(created_at AS DATE) = CAST(? AS DATE)",
            [day.as_str()],
        )?;
        let clients = conn.execute(
            "DELETE FROM sys_clients WHERE client_id NOT IN (SELECT client_id FROM sys_invoices)",
            [],
        )?;

        Ok(ClearCounts { invoices, clients })
    }

    // === Receipts ===

    pub fn insert_receipt(&self, receipt: &Receipt) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_receipts (receipt_id, invoice_id, receipt_date, amount, method, note)
             VALUES (?, ?, CAST(? AS DATE), CAST(? AS DECIMAL(18, 2)), ?, ?)",
            params![
                receipt.id.to_string(),
                receipt.invoice_id.to_string(),
                receipt.date.to_string(),
                receipt.amount.to_string(),
                receipt.method.as_str(),
                receipt.note,
            ],
        )?;
        Ok(())
    }

    pub fn get_receipts(&self, invoice_id: Uuid) -> Result<Vec<Receipt>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT receipt_id, invoice_id, receipt_date::VARCHAR, amount::VARCHAR, method, note
             FROM sys_receipts WHERE invoice_id = ? ORDER BY receipt_date, receipt_id",
        )?;
        let receipts = stmt
            .query_map([invoice_id.to_string()], |row| {
                let date: String = row.get(2)?;
                let amount: String = row.get(3)?;
                let method: String = row.get(4)?;
                Ok(Receipt {
                    id: parse_uuid(&row.get::<_, String>(0)?),
                    invoice_id: parse_uuid(&row.get::<_, String>(1)?),
                    date: parse_date(&date),
                    amount: parse_decimal(&amount),
                    method: method.parse().unwrap_or(PaymentMethod::Other),
                    note: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(receipts)
    }

    // === Dispatches ===

    pub fn insert_dispatch(&self, dispatch: &Dispatch) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_dispatches (dispatch_id, client_id, invoice_id, status, template, response, created_at)
             VALUES (?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            params![
                dispatch.id.to_string(),
                dispatch.client_id.to_string(),
                dispatch.invoice_id.to_string(),
                dispatch.status.as_str(),
                dispatch.template,
                dispatch.response,
                format_timestamp(&dispatch.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn update_dispatch(&self, id: Uuid, status: DispatchStatus, response: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE sys_dispatches SET status = ?, response = ? WHERE dispatch_id = ?",
            params![status.as_str(), response, id.to_string()],
        )?;
        Ok(())
    }

    /// Dispatches newest first, joined with client name and invoice number.
    /// Date bounds apply to the creation day and are inclusive.
    pub fn get_dispatches(
        &self,
        status: Option<DispatchStatus>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DispatchEntry>> {
        let conn = self.conn()?;
        let (filter, values) = dispatch_filter(status, from, to);
        let sql = format!(
            "SELECT d.dispatch_id, d.client_id, d.invoice_id, d.status, d.created_at::VARCHAR,
                    d.template, d.response, c.name, i.invoice_number
             FROM sys_dispatches d
             LEFT JOIN sys_clients c ON c.client_id = d.client_id
             LEFT JOIN sys_invoices i ON i.invoice_id = d.invoice_id
             {}
             ORDER BY d.created_at DESC, d.dispatch_id",
            filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                let status: String = row.get(3)?;
                let created_at: String = row.get(4)?;
                Ok(DispatchEntry {
                    dispatch: Dispatch {
                        id: parse_uuid(&row.get::<_, String>(0)?),
                        client_id: parse_uuid(&row.get::<_, String>(1)?),
                        invoice_id: parse_uuid(&row.get::<_, String>(2)?),
                        status: status.parse().unwrap_or(DispatchStatus::Pending),
                        created_at: parse_timestamp(&created_at),
                        template: row.get(5)?,
                        response: row.get(6)?,
                    },
                    client_name: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                    invoice_number: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    pub fn count_dispatches(
        &self,
        status: Option<DispatchStatus>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<u64> {
        let conn = self.conn()?;
        let (filter, values) = dispatch_filter(status, from, to);
        let sql = format!("SELECT COUNT(*) FROM sys_dispatches d {}", filter);
        let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn dispatch_filter(
    status: Option<DispatchStatus>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(status) = status {
        clauses.push("d.status = ?");
        values.push(status.as_str().to_string());
    }
    if let Some(from) = from {
        clauses.push("CAST(d.created_at AS DATE) >= CAST(? AS DATE)");
        values.push(from.to_string());
    }
    if let Some(to) = to {
        clauses.push("CAST(d.created_at AS DATE) <= CAST(? AS DATE)");
        values.push(to.to_string());
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), values)
    }
}

fn row_to_client(row: &duckdb::Row) -> duckdb::Result<Client> {
    Ok(Client {
        id: parse_uuid(&row.get::<_, String>(0)?),
        name: row.get(1)?,
        phone: row.get(2)?,
        document: row.get(3)?,
    })
}

fn row_to_invoice(row: &duckdb::Row) -> duckdb::Result<Invoice> {
    // Column order follows INVOICE_COLUMNS
    let due_date: Option<String> = row.get(4)?;
    let principal: String = row.get(5)?;
    let interest: String = row.get(6)?;
    let total: String = row.get(7)?;
    let overdue_days: i64 = row.get(8)?;
    let status: String = row.get(9)?;
    let created_at: String = row.get(12)?;
    let last_dispatch: Option<String> = row.get(13)?;

    Ok(Invoice {
        id: parse_uuid(&row.get::<_, String>(0)?),
        client_id: parse_uuid(&row.get::<_, String>(1)?),
        invoice_number: row.get(2)?,
        note_number: row.get(3)?,
        due_date: due_date.map(|d| parse_date(&d)),
        principal_amount: parse_decimal(&principal),
        interest_amount: parse_decimal(&interest),
        total_amount: parse_decimal(&total),
        overdue_days: u32::try_from(overdue_days.max(0)).unwrap_or(u32::MAX),
        status: InvoiceStatus::from_str(&status).unwrap_or(InvoiceStatus::Open),
        match_key: row.get(10)?,
        batch_id: row.get(11)?,
        created_at: parse_timestamp(&created_at),
        last_dispatch: last_dispatch.map(|s| parse_timestamp(&s)),
    })
}

// Helper functions

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_decimal(s: &str) -> Decimal {
    Decimal::from_str_exact(s.trim()).unwrap_or_default()
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    parse_naive_datetime(s).and_utc()
}

fn parse_naive_datetime(s: &str) -> NaiveDateTime {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.naive_utc();
    }
    // Formats DuckDB produces when casting TIMESTAMP to VARCHAR
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .unwrap_or_default()
}
