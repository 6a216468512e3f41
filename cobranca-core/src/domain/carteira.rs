//! Import batch model: parsed rows and the clients/invoices built from them

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Client, Invoice, InvoiceStatus};

/// One usable spreadsheet line after column resolution and normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRow {
    pub name: String,
    pub phone: Option<String>,
    pub invoice_number: Option<String>,
    /// May hold several sub-invoice identifiers separated by `;`, `,` or `|`
    pub note_number: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub principal_amount: Decimal,
    pub interest_amount: Decimal,
    pub total_amount: Decimal,
    pub overdue_days: u32,
}

impl ParsedRow {
    /// A row that can be matched to something later
    pub fn is_usable(&self) -> bool {
        !self.name.is_empty() && (self.invoice_number.is_some() || self.note_number.is_some())
    }
}

/// Clients and invoices produced by one import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Carteira {
    pub clients: Vec<Client>,
    pub invoices: Vec<Invoice>,
}

impl Carteira {
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty() && self.invoices.is_empty()
    }

    /// Sum of all invoice totals
    pub fn total(&self) -> Decimal {
        self.invoices.iter().map(|i| i.total_amount).sum()
    }

    /// Sum of overdue invoice totals
    pub fn overdue_total(&self) -> Decimal {
        self.invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Overdue)
            .map(|i| i.total_amount)
            .sum()
    }
}
