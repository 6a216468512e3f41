//! Import service - spreadsheet import and reconciliation
//!
//! The pipeline is parse ([`parser`]) then build ([`builder`]), both pure.
//! [`ImportService`] adds the stateful part: reusing clients already in the
//! store and suppressing invoices whose match key was imported before.

pub mod builder;
pub mod parser;
pub mod values;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::{ClearCounts, DuckDbRepository};
use crate::config::Config;
use crate::domain::{Carteira, ClientKey, ParsedRow};

pub use builder::{build_carteira, build_carteira_at};
pub use parser::{parse_csv_text, parse_csv_text_with, ColumnSynonyms};

/// Outcome of an import (or of a preview, when `preview` is set)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub batch_id: String,
    /// Usable rows read from the file
    pub rows: usize,
    pub clients_created: usize,
    pub clients_reused: usize,
    pub invoices_created: usize,
    pub invoices_duplicate: usize,
    pub preview: bool,
}

/// Totals of a parsed carteira, before any reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarteiraSummary {
    pub rows: usize,
    pub clients: usize,
    pub invoices: usize,
    pub total: Decimal,
    pub overdue_total: Decimal,
}

/// A parsed and built file, nothing written
#[derive(Debug, Clone, Serialize)]
pub struct ImportPreview {
    pub carteira: Carteira,
    pub summary: CarteiraSummary,
}

pub struct ImportService {
    repository: Arc<DuckDbRepository>,
    config: Config,
}

impl ImportService {
    pub fn new(repository: Arc<DuckDbRepository>, config: Config) -> Self {
        Self { repository, config }
    }

    /// Read and parse a spreadsheet export
    pub fn parse_file(&self, path: &Path) -> Result<Vec<ParsedRow>> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

        let synonyms = ColumnSynonyms::from_settings(&self.config.import);
        Ok(parse_csv_text_with(text, self.config.today(), &synonyms))
    }

    /// Parse and build without touching the store
    pub fn preview(&self, path: &Path) -> Result<ImportPreview> {
        let rows = self.parse_file(path)?;
        let carteira = build_carteira(&rows);
        let summary = CarteiraSummary {
            rows: rows.len(),
            clients: carteira.clients.len(),
            invoices: carteira.invoices.len(),
            total: carteira.total(),
            overdue_total: carteira.overdue_total(),
        };
        Ok(ImportPreview { carteira, summary })
    }

    /// Import a file. With `preview_only` the counts are computed against
    /// the store but nothing is written.
    pub fn import(&self, path: &Path, preview_only: bool) -> Result<ImportResult> {
        let rows = self.parse_file(path)?;
        let now = Utc::now();
        let carteira = build_carteira_at(&rows, now);
        self.import_carteira(carteira, rows.len(), preview_only, now)
    }

    /// Reconcile a built carteira against the store and persist what is new.
    ///
    /// A client whose key matches a stored client is reused. An invoice is a
    /// duplicate when its match key is already stored, or when the same
    /// match key and note number appeared earlier in this batch. Clients
    /// left without any new invoice are not created.
    pub fn import_carteira(
        &self,
        mut carteira: Carteira,
        rows: usize,
        preview_only: bool,
        now: DateTime<Utc>,
    ) -> Result<ImportResult> {
        let batch_id = format!("import_{}", now.format("%Y%m%d_%H%M%S"));

        let stored_keys = self.repository.get_match_keys()?;
        let stored_clients: HashMap<ClientKey, Uuid> = self
            .repository
            .get_clients(None)?
            .iter()
            .map(|c| (c.key(), c.id))
            .collect();

        // Batch client id -> id the invoices should point at
        let mut client_ids: HashMap<Uuid, Uuid> = HashMap::new();
        let mut clients_reused = 0;
        for client in &carteira.clients {
            match stored_clients.get(&client.key()) {
                Some(stored_id) => {
                    client_ids.insert(client.id, *stored_id);
                    clients_reused += 1;
                }
                None => {
                    client_ids.insert(client.id, client.id);
                }
            }
        }

        let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
        let mut invoices = Vec::new();
        let mut invoices_duplicate = 0;
        for mut invoice in carteira.invoices.drain(..) {
            let batch_key = (invoice.match_key.clone(), invoice.note_number.clone());
            if stored_keys.contains(&invoice.match_key) || !seen.insert(batch_key) {
                invoices_duplicate += 1;
                continue;
            }
            if let Some(id) = client_ids.get(&invoice.client_id) {
                invoice.client_id = *id;
            }
            invoice.batch_id = Some(batch_id.clone());
            invoices.push(invoice);
        }

        let referenced: HashSet<Uuid> = invoices.iter().map(|i| i.client_id).collect();
        let clients: Vec<_> = carteira
            .clients
            .into_iter()
            .filter(|c| !stored_clients.contains_key(&c.key()) && referenced.contains(&c.id))
            .collect();

        if !preview_only {
            self.repository.insert_carteira(&clients, &invoices)?;
        }

        Ok(ImportResult {
            batch_id,
            rows,
            clients_created: clients.len(),
            clients_reused,
            invoices_created: invoices.len(),
            invoices_duplicate,
            preview: preview_only,
        })
    }

    /// Undo a day's imports: delete invoices created that (UTC) day and
    /// the clients they leave behind
    pub fn clear_day(&self, day: NaiveDate) -> Result<ClearCounts> {
        self.repository.delete_invoices_created_on(day)
    }
}
