//! Dashboard service - portfolio summary over a creation-date range

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::{AgingBucket, DispatchStatus, Invoice, InvoiceStatus};

const TOP_OVERDUE: usize = 5;

/// Overdue amount within one aging bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgingSlice {
    pub bucket: AgingBucket,
    pub count: usize,
    pub total: Decimal,
}

/// Totals for one creation day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub received: Decimal,
    /// Open plus overdue
    pub outstanding: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopOverdue {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub client_name: String,
    pub overdue_days: u32,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub invoice_count: usize,
    pub open_total: Decimal,
    pub overdue_total: Decimal,
    pub received_total: Decimal,
    pub negotiated_total: Decimal,
    pub total: Decimal,
    /// `received / total * 100`, one decimal place
    pub recovery_rate: Decimal,
    pub dispatches_sent: u64,
    pub top_overdue: Vec<TopOverdue>,
    pub aging: Vec<AgingSlice>,
    pub daily: Vec<DailyPoint>,
}

pub struct DashboardService {
    repository: Arc<DuckDbRepository>,
}

impl DashboardService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Summary of invoices created in `[from, to]`
    pub fn summary(&self, from: NaiveDate, to: NaiveDate) -> Result<DashboardSummary> {
        let invoices = self.repository.get_invoices_created_between(from, to)?;
        let names: HashMap<Uuid, String> = self
            .repository
            .get_clients(None)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let dispatches_sent =
            self.repository
                .count_dispatches(Some(DispatchStatus::Sent), Some(from), Some(to))?;

        Ok(summarize(&invoices, &names, from, to, dispatches_sent))
    }
}

fn sum_status(invoices: &[Invoice], status: InvoiceStatus) -> Decimal {
    invoices
        .iter()
        .filter(|i| i.status == status)
        .map(|i| i.total_amount)
        .sum()
}

/// Pure aggregation behind [`DashboardService::summary`]
pub fn summarize(
    invoices: &[Invoice],
    client_names: &HashMap<Uuid, String>,
    from: NaiveDate,
    to: NaiveDate,
    dispatches_sent: u64,
) -> DashboardSummary {
    let received_total = sum_status(invoices, InvoiceStatus::Received);
    let total: Decimal = invoices.iter().map(|i| i.total_amount).sum();
    let recovery_rate = if total.is_zero() {
        Decimal::ZERO
    } else {
        (received_total / total * Decimal::ONE_HUNDRED).round_dp(1)
    };

    let mut overdue: Vec<&Invoice> = invoices.iter().filter(|i| i.overdue_days > 0).collect();
    overdue.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    let top_overdue = overdue
        .iter()
        .take(TOP_OVERDUE)
        .map(|i| TopOverdue {
            invoice_id: i.id,
            invoice_number: i.invoice_number.clone(),
            client_name: client_names.get(&i.client_id).cloned().unwrap_or_default(),
            overdue_days: i.overdue_days,
            total: i.total_amount,
        })
        .collect();

    let aging = AgingBucket::ALL
        .iter()
        .map(|bucket| {
            let in_bucket: Vec<&Invoice> =
                invoices.iter().filter(|i| bucket.contains(i.overdue_days)).collect();
            AgingSlice {
                bucket: *bucket,
                count: in_bucket.len(),
                total: in_bucket.iter().map(|i| i.total_amount).sum(),
            }
        })
        .collect();

    let daily = from
        .iter_days()
        .take_while(|day| *day <= to)
        .map(|day| {
            let same_day = invoices.iter().filter(|i| i.created_at.date_naive() == day);
            let (received, outstanding) =
                same_day.fold((Decimal::ZERO, Decimal::ZERO), |(r, o), i| match i.status {
                    InvoiceStatus::Received => (r + i.total_amount, o),
                    InvoiceStatus::Open | InvoiceStatus::Overdue => (r, o + i.total_amount),
                    _ => (r, o),
                });
            DailyPoint { date: day, received, outstanding }
        })
        .collect();

    DashboardSummary {
        from,
        to,
        invoice_count: invoices.len(),
        open_total: sum_status(invoices, InvoiceStatus::Open),
        overdue_total: sum_status(invoices, InvoiceStatus::Overdue),
        received_total,
        negotiated_total: sum_status(invoices, InvoiceStatus::Negotiated),
        total,
        recovery_rate,
        dispatches_sent,
        top_overdue,
        aging,
        daily,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn invoice(total: i64, overdue_days: u32, status: InvoiceStatus, day: u32) -> Invoice {
        let mut inv = Invoice::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            format!("NF-{}", total),
            None,
            None,
            Decimal::new(total, 0),
            Decimal::ZERO,
            Decimal::new(total, 0),
            overdue_days,
            Utc.with_ymd_and_hms(2026, 2, day, 10, 0, 0).unwrap(),
        );
        inv.status = status;
        inv
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    #[test]
    fn test_status_sums_and_recovery_rate() {
        let invoices = vec![
            invoice(100, 0, InvoiceStatus::Open, 1),
            invoice(300, 10, InvoiceStatus::Overdue, 1),
            invoice(600, 0, InvoiceStatus::Received, 2),
        ];
        let s = summarize(&invoices, &HashMap::new(), day(1), day(3), 4);

        assert_eq!(s.open_total, Decimal::new(100, 0));
        assert_eq!(s.overdue_total, Decimal::new(300, 0));
        assert_eq!(s.received_total, Decimal::new(600, 0));
        assert_eq!(s.total, Decimal::new(1000, 0));
        assert_eq!(s.recovery_rate, Decimal::new(600, 1));
        assert_eq!(s.dispatches_sent, 4);
    }

    #[test]
    fn test_empty_range_has_zero_rate() {
        let s = summarize(&[], &HashMap::new(), day(1), day(1), 0);
        assert_eq!(s.recovery_rate, Decimal::ZERO);
        assert_eq!(s.daily.len(), 1);
        assert!(s.top_overdue.is_empty());
    }

    #[test]
    fn test_aging_buckets_partition_overdue() {
        let invoices = vec![
            invoice(1, 0, InvoiceStatus::Open, 1),
            invoice(10, 7, InvoiceStatus::Overdue, 1),
            invoice(20, 8, InvoiceStatus::Overdue, 1),
            invoice(30, 15, InvoiceStatus::Overdue, 1),
            invoice(40, 16, InvoiceStatus::Overdue, 1),
            invoice(50, 30, InvoiceStatus::Overdue, 1),
            invoice(60, 31, InvoiceStatus::Overdue, 1),
        ];
        let s = summarize(&invoices, &HashMap::new(), day(1), day(1), 0);

        let totals: Vec<Decimal> = s.aging.iter().map(|a| a.total).collect();
        assert_eq!(
            totals,
            vec![Decimal::new(10, 0), Decimal::new(50, 0), Decimal::new(90, 0), Decimal::new(60, 0)]
        );
        let counted: usize = s.aging.iter().map(|a| a.count).sum();
        assert_eq!(counted, 6);
    }

    #[test]
    fn test_top_overdue_and_daily_series() {
        let mut invoices: Vec<Invoice> = (1..=7).map(|n| invoice(n * 100, 3, InvoiceStatus::Overdue, 1)).collect();
        invoices.push(invoice(5000, 0, InvoiceStatus::Received, 2));
        let names: HashMap<Uuid, String> =
            invoices.iter().map(|i| (i.client_id, "Agro Sul".to_string())).collect();

        let s = summarize(&invoices, &names, day(1), day(3), 0);

        assert_eq!(s.top_overdue.len(), 5);
        assert_eq!(s.top_overdue[0].total, Decimal::new(700, 0));
        assert_eq!(s.top_overdue[0].client_name, "Agro Sul");

        assert_eq!(s.daily.len(), 3);
        assert_eq!(s.daily[0].outstanding, Decimal::new(2800, 0));
        assert_eq!(s.daily[1].received, Decimal::new(5000, 0));
        assert_eq!(s.daily[2].received, Decimal::ZERO);
    }
}
