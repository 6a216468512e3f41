//! Invoice service - listing, status changes, payments

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{AgingBucket, Client, Invoice, InvoiceStatus, PaymentMethod, Receipt};

/// Criteria for [`InvoiceService::list`]; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub bucket: Option<AgingBucket>,
    /// Client name (case-insensitive), invoice number or note number
    pub search: Option<String>,
    /// Only invoices last reminded on this day (UTC)
    pub dispatch_date: Option<NaiveDate>,
    pub client_id: Option<Uuid>,
}

impl InvoiceFilter {
    fn matches(&self, invoice: &Invoice, client_name: &str) -> bool {
        if self.status.is_some_and(|s| s != invoice.status) {
            return false;
        }
        if self.bucket.is_some_and(|b| !b.contains(invoice.overdue_days)) {
            return false;
        }
        if self.client_id.is_some_and(|id| id != invoice.client_id) {
            return false;
        }
        if let Some(day) = self.dispatch_date {
            if invoice.last_dispatch.map(|d| d.date_naive()) != Some(day) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                let term = term.to_lowercase();
                client_name.to_lowercase().contains(&term)
                    || invoice.invoice_number.to_lowercase().contains(&term)
                    || invoice
                        .note_number
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&term))
            }
            None => true,
        }
    }
}

/// An invoice with its client's display fields
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceListEntry {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub client_name: String,
    pub client_phone: Option<String>,
}

/// Invoices of one client with their totals
#[derive(Debug, Clone, Serialize)]
pub struct ClientGroup {
    pub client_id: Uuid,
    pub client_name: String,
    pub client_phone: Option<String>,
    pub invoices: Vec<Invoice>,
    pub principal_total: Decimal,
    pub interest_total: Decimal,
    pub total: Decimal,
    pub last_dispatch: Option<DateTime<Utc>>,
    pub max_overdue_days: u32,
}

/// A payment to record against an invoice
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub date: NaiveDate,
    /// Partial payments never settle the invoice
    pub partial: bool,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub receipt: Receipt,
    pub status: InvoiceStatus,
    /// Whether this payment moved the invoice to RECEIVED
    pub settled: bool,
}

/// Due date ascending with undated invoices last, then invoice number
fn compare_invoices(a: &Invoice, b: &Invoice) -> Ordering {
    let by_due = match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_due
        .then_with(|| a.invoice_number.cmp(&b.invoice_number))
        .then_with(|| a.note_number.cmp(&b.note_number))
}

pub struct InvoiceService {
    repository: Arc<DuckDbRepository>,
}

impl InvoiceService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Invoices matching `filter`, ordered by due date then invoice number
    pub fn list(&self, filter: &InvoiceFilter) -> Result<Vec<InvoiceListEntry>> {
        let clients: HashMap<Uuid, Client> = self
            .repository
            .get_clients(None)?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut invoices: Vec<Invoice> = self
            .repository
            .get_invoices()?
            .into_iter()
            .filter(|inv| {
                let name = clients.get(&inv.client_id).map(|c| c.name.as_str()).unwrap_or("");
                filter.matches(inv, name)
            })
            .collect();
        invoices.sort_by(compare_invoices);

        Ok(invoices
            .into_iter()
            .map(|invoice| {
                let client = clients.get(&invoice.client_id);
                InvoiceListEntry {
                    client_name: client.map(|c| c.name.clone()).unwrap_or_default(),
                    client_phone: client.and_then(|c| c.phone.clone()),
                    invoice,
                }
            })
            .collect())
    }

    pub fn get(&self, id: Uuid) -> Result<Invoice> {
        self.repository
            .get_invoice(id)?
            .ok_or_else(|| Error::not_found(format!("invoice {}", id)).into())
    }

    /// Clients ordered by name, optionally filtered by a name fragment
    pub fn clients(&self, search: Option<&str>) -> Result<Vec<Client>> {
        self.repository.get_clients(search)
    }

    /// Change an invoice's status. RECEIVED and CANCELLED are final.
    pub fn set_status(&self, id: Uuid, status: InvoiceStatus) -> Result<Invoice> {
        let mut invoice = self.get(id)?;
        if invoice.status == status {
            return Ok(invoice);
        }
        if invoice.status.is_final() {
            return Err(Error::invalid_transition(format!(
                "invoice {} is {} and cannot become {}",
                invoice.invoice_number, invoice.status, status
            ))
            .into());
        }

        self.repository.update_invoice_status(id, status)?;
        invoice.status = status;
        Ok(invoice)
    }

    /// Store a receipt. A full payment covering the total settles the invoice.
    pub fn record_payment(&self, id: Uuid, request: &PaymentRequest) -> Result<PaymentOutcome> {
        let invoice = self.get(id)?;
        if invoice.status.is_final() {
            return Err(Error::invalid_transition(format!(
                "invoice {} is already {}",
                invoice.invoice_number, invoice.status
            ))
            .into());
        }

        let mut receipt = Receipt::new(id, request.date, request.amount, request.method);
        receipt.note = request.note.clone();
        receipt.validate().map_err(Error::validation)?;
        self.repository.insert_receipt(&receipt)?;

        let settled = !request.partial && request.amount >= invoice.total_amount;
        let status = if settled {
            self.repository.update_invoice_status(id, InvoiceStatus::Received)?;
            InvoiceStatus::Received
        } else {
            invoice.status
        };

        Ok(PaymentOutcome { receipt, status, settled })
    }

    pub fn receipts(&self, id: Uuid) -> Result<Vec<Receipt>> {
        self.repository.get_receipts(id)
    }

    /// Recompute overdue days of open and overdue invoices against `today`.
    /// Returns how many invoices changed.
    pub fn refresh_overdue(&self, today: NaiveDate) -> Result<usize> {
        let mut changed = 0;
        for mut invoice in self.repository.get_invoices()? {
            if invoice.refresh_overdue(today) {
                self.repository
                    .update_invoice_overdue(invoice.id, invoice.overdue_days, invoice.status)?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Delete an invoice with its receipts and dispatches
    pub fn delete(&self, id: Uuid) -> Result<()> {
        if !self.repository.delete_invoice(id)? {
            return Err(Error::not_found(format!("invoice {}", id)).into());
        }
        Ok(())
    }
}

/// Group listed invoices per client, in first-seen client order
pub fn group_by_client(entries: &[InvoiceListEntry]) -> Vec<ClientGroup> {
    let mut groups: Vec<ClientGroup> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for entry in entries {
        let invoice = &entry.invoice;
        let idx = *index.entry(invoice.client_id).or_insert_with(|| {
            groups.push(ClientGroup {
                client_id: invoice.client_id,
                client_name: entry.client_name.clone(),
                client_phone: entry.client_phone.clone(),
                invoices: Vec::new(),
                principal_total: Decimal::ZERO,
                interest_total: Decimal::ZERO,
                total: Decimal::ZERO,
                last_dispatch: None,
                max_overdue_days: 0,
            });
            groups.len() - 1
        });

        let group = &mut groups[idx];
        group.principal_total += invoice.principal_amount;
        group.interest_total += invoice.interest_amount;
        group.total += invoice.total_amount;
        group.last_dispatch = group.last_dispatch.max(invoice.last_dispatch);
        group.max_overdue_days = group.max_overdue_days.max(invoice.overdue_days);
        group.invoices.push(invoice.clone());
    }

    for group in &mut groups {
        group.invoices.sort_by(compare_invoices);
    }
    groups
}

/// Write invoices as `;`-separated text the importer reads back.
///
/// Cells are never quoted, matching the importer, which treats `"` as
/// plain text. A value that itself contains `;` cannot round-trip.
pub fn export_csv<W: Write>(writer: W, entries: &[InvoiceListEntry]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(b';')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);
    csv.write_record([
        "nome",
        "telefone",
        "numero_nf",
        "numero_titulo",
        "vencimento",
        "valor_principal",
        "juros",
        "total",
        "dias_atraso",
        "status",
    ])?;

    for entry in entries {
        let inv = &entry.invoice;
        csv.write_record([
            entry.client_name.clone(),
            entry.client_phone.clone().unwrap_or_default(),
            inv.invoice_number.clone(),
            inv.note_number.clone().unwrap_or_default(),
            inv.due_date.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default(),
            format!("{:.2}", inv.principal_amount).replace('.', ","),
            format!("{:.2}", inv.interest_amount).replace('.', ","),
            format!("{:.2}", inv.total_amount).replace('.', ","),
            inv.overdue_days.to_string(),
            inv.status.to_string(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}
