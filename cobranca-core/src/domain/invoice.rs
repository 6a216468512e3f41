//! Invoice ("título") domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invoice number used when a row only carried note numbers
pub const PLACEHOLDER_INVOICE_NUMBER: &str = "NF-N/D";

/// Lifecycle state of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Open,
    Overdue,
    Received,
    Negotiated,
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 5] = [
        InvoiceStatus::Open,
        InvoiceStatus::Overdue,
        InvoiceStatus::Received,
        InvoiceStatus::Negotiated,
        InvoiceStatus::Cancelled,
    ];

    /// Status assigned when an invoice is first created
    pub fn from_overdue_days(overdue_days: u32) -> Self {
        if overdue_days > 0 {
            InvoiceStatus::Overdue
        } else {
            InvoiceStatus::Open
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Open => "OPEN",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::Received => "RECEIVED",
            InvoiceStatus::Negotiated => "NEGOTIATED",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }

    /// Received and cancelled invoices are settled and never change again
    pub fn is_final(&self) -> bool {
        matches!(self, InvoiceStatus::Received | InvoiceStatus::Cancelled)
    }

    /// Still owed: included in collection reminders
    pub fn is_collectible(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Open | InvoiceStatus::Overdue | InvoiceStatus::Negotiated
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    /// Accepts the English names and the Portuguese ones used by older exports
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OPEN" | "ABERTO" => Ok(InvoiceStatus::Open),
            "OVERDUE" | "VENCIDO" => Ok(InvoiceStatus::Overdue),
            "RECEIVED" | "RECEBIDO" => Ok(InvoiceStatus::Received),
            "NEGOTIATED" | "NEGOCIADO" => Ok(InvoiceStatus::Negotiated),
            "CANCELLED" | "CANCELED" | "CANCELADO" => Ok(InvoiceStatus::Cancelled),
            other => Err(format!("unknown invoice status: {}", other)),
        }
    }
}

/// Overdue-days range used by list filters and the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgingBucket {
    #[serde(rename = "0-7")]
    UpToWeek,
    #[serde(rename = "8-15")]
    UpToFortnight,
    #[serde(rename = "16-30")]
    UpToMonth,
    #[serde(rename = "30+")]
    OverMonth,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 4] = [
        AgingBucket::UpToWeek,
        AgingBucket::UpToFortnight,
        AgingBucket::UpToMonth,
        AgingBucket::OverMonth,
    ];

    /// Bucket for a number of overdue days; `None` when not overdue
    pub fn for_days(days: u32) -> Option<Self> {
        match days {
            0 => None,
            1..=7 => Some(AgingBucket::UpToWeek),
            8..=15 => Some(AgingBucket::UpToFortnight),
            16..=30 => Some(AgingBucket::UpToMonth),
            _ => Some(AgingBucket::OverMonth),
        }
    }

    pub fn contains(&self, days: u32) -> bool {
        Self::for_days(days) == Some(*self)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBucket::UpToWeek => "0-7",
            AgingBucket::UpToFortnight => "8-15",
            AgingBucket::UpToMonth => "16-30",
            AgingBucket::OverMonth => "30+",
        }
    }
}

impl FromStr for AgingBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgingBucket::ALL
            .into_iter()
            .find(|b| b.label() == s.trim())
            .ok_or_else(|| format!("unknown aging bucket: {} (expected 0-7, 8-15, 16-30 or 30+)", s))
    }
}

/// A single billable amount owed by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub client_id: Uuid,
    /// Nota fiscal number
    pub invoice_number: String,
    /// Duplicata / sub-invoice identifier
    pub note_number: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub principal_amount: Decimal,
    pub interest_amount: Decimal,
    pub total_amount: Decimal,
    pub overdue_days: u32,
    pub status: InvoiceStatus,
    /// Heuristic duplicate-detection key, see [`Invoice::match_key_for`]
    pub match_key: String,
    pub created_at: DateTime<Utc>,
    pub last_dispatch: Option<DateTime<Utc>>,
    /// Which import batch created this invoice
    pub batch_id: Option<String>,
}

impl Invoice {
    /// Create a new invoice, deriving status and match key
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        client_id: Uuid,
        invoice_number: impl Into<String>,
        note_number: Option<String>,
        due_date: Option<NaiveDate>,
        principal_amount: Decimal,
        interest_amount: Decimal,
        total_amount: Decimal,
        overdue_days: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        let invoice_number = invoice_number.into();
        let match_key = Self::match_key_for(&invoice_number, principal_amount);
        Self {
            id,
            client_id,
            invoice_number,
            note_number,
            due_date,
            principal_amount,
            interest_amount,
            total_amount,
            overdue_days,
            status: InvoiceStatus::from_overdue_days(overdue_days),
            match_key,
            created_at,
            last_dispatch: None,
            batch_id: None,
        }
    }

    /// `"{invoice_number}__{principal:.2}"`, principal rounded half away
    /// from zero so the key agrees with the stored `DECIMAL(18,2)` value
    pub fn match_key_for(invoice_number: &str, principal_amount: Decimal) -> String {
        let principal =
            principal_amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{}__{:.2}", invoice_number, principal)
    }

    pub fn aging_bucket(&self) -> Option<AgingBucket> {
        AgingBucket::for_days(self.overdue_days)
    }

    /// Recompute overdue days against `today`.
    ///
    /// Only open/overdue invoices with a due date move; an open invoice
    /// that becomes late is flipped to overdue. Returns whether anything changed.
    pub fn refresh_overdue(&mut self, today: NaiveDate) -> bool {
        if !matches!(self.status, InvoiceStatus::Open | InvoiceStatus::Overdue) {
            return false;
        }
        let Some(due) = self.due_date else {
            return false;
        };

        let days = days_overdue(due, today);
        let status = InvoiceStatus::from_overdue_days(days);
        let changed = days != self.overdue_days || status != self.status;
        self.overdue_days = days;
        self.status = status;
        changed
    }

    /// Checked before an invoice is written. Negative amounts (credit
    /// notes) are accepted, as the importer never rejects a row for its values.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.invoice_number.trim().is_empty() {
            return Err("invoice number cannot be empty");
        }
        if self.match_key != Self::match_key_for(&self.invoice_number, self.principal_amount) {
            return Err("match key does not match invoice number and principal");
        }
        Ok(())
    }
}

/// Whole calendar days from `due` to `today`, never negative
pub fn days_overdue(due: NaiveDate, today: NaiveDate) -> u32 {
    let days = (today - due).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(overdue_days: u32) -> Invoice {
        Invoice::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "NF-12401",
            Some("DUP-001".to_string()),
            NaiveDate::from_ymd_opt(2026, 1, 12),
            Decimal::new(1500000, 2),
            Decimal::new(75000, 2),
            Decimal::new(1575000, 2),
            overdue_days,
            Utc::now(),
        )
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(sample(12).status, InvoiceStatus::Overdue);
        assert_eq!(sample(0).status, InvoiceStatus::Open);
    }

    #[test]
    fn test_match_key_uses_two_decimals() {
        assert_eq!(sample(0).match_key, "NF-12401__15000.00");
        assert_eq!(
            Invoice::match_key_for("NF-1", Decimal::new(8200, 0)),
            "NF-1__8200.00"
        );
    }

    #[test]
    fn test_invoice_validation() {
        let mut invoice = sample(0);
        assert!(invoice.validate().is_ok());

        invoice.principal_amount = Decimal::new(-100, 0);
        assert!(invoice.validate().is_err());
        invoice.match_key = Invoice::match_key_for(&invoice.invoice_number, invoice.principal_amount);
        assert!(invoice.validate().is_ok());

        invoice.invoice_number = " ".to_string();
        assert!(invoice.validate().is_err());
    }

    #[test]
    fn test_match_key_rounds_extra_decimals() {
        assert_eq!(Invoice::match_key_for("NF", Decimal::new(1999, 3)), "NF__2.00");
        assert_eq!(Invoice::match_key_for("NF", Decimal::new(125, 3)), "NF__0.13");
        assert_eq!(Invoice::match_key_for("NF", Decimal::new(-125, 3)), "NF__-0.13");
        assert_eq!(Invoice::match_key_for("NF", Decimal::new(124, 3)), "NF__0.12");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("vencido".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Overdue);
        assert_eq!("RECEIVED".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Received);
        assert!("PAID".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_aging_buckets() {
        assert_eq!(AgingBucket::for_days(0), None);
        assert_eq!(AgingBucket::for_days(7), Some(AgingBucket::UpToWeek));
        assert_eq!(AgingBucket::for_days(8), Some(AgingBucket::UpToFortnight));
        assert_eq!(AgingBucket::for_days(30), Some(AgingBucket::UpToMonth));
        assert_eq!(AgingBucket::for_days(31), Some(AgingBucket::OverMonth));
        assert_eq!("16-30".parse::<AgingBucket>().unwrap(), AgingBucket::UpToMonth);
    }

    #[test]
    fn test_refresh_overdue_flips_open_to_overdue() {
        let mut invoice = sample(0);
        let today = NaiveDate::from_ymd_opt(2026, 1, 22).unwrap();

        assert!(invoice.refresh_overdue(today));
        assert_eq!(invoice.overdue_days, 10);
        assert_eq!(invoice.status, InvoiceStatus::Overdue);

        assert!(!invoice.refresh_overdue(today));
    }

    #[test]
    fn test_refresh_overdue_leaves_settled_invoices_alone() {
        let mut invoice = sample(3);
        invoice.status = InvoiceStatus::Received;
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        assert!(!invoice.refresh_overdue(today));
        assert_eq!(invoice.overdue_days, 3);
    }
}
