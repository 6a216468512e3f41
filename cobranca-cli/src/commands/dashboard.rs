//! Dashboard command - portfolio summary

use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate, Utc};
use colored::Colorize;

use cobranca_core::services::{format_brl, format_date_br, DashboardSummary};

use super::get_context;
use crate::output;

const DEFAULT_RANGE_DAYS: i64 = 30;

pub fn run(from: Option<NaiveDate>, to: Option<NaiveDate>, json: bool) -> Result<()> {
    let to = to.unwrap_or_else(|| Utc::now().date_naive());
    let from = from.unwrap_or(to - Duration::days(DEFAULT_RANGE_DAYS));
    if from > to {
        bail!("--from ({}) is after --to ({})", from, to);
    }

    let ctx = get_context()?;
    let summary = ctx.dashboard_service.summary(from, to)?;

    if json {
        return output::print_json(&summary);
    }
    print_summary(&summary);
    Ok(())
}

fn print_summary(s: &DashboardSummary) {
    println!(
        "{}",
        format!("Carteira {} to {}", format_date_br(s.from), format_date_br(s.to)).bold()
    );
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Invoices".to_string(), s.invoice_count.to_string()]);
    table.add_row(vec!["Open".to_string(), format_brl(s.open_total)]);
    table.add_row(vec!["Overdue".to_string(), format_brl(s.overdue_total)]);
    table.add_row(vec!["Received".to_string(), format_brl(s.received_total)]);
    table.add_row(vec!["Negotiated".to_string(), format_brl(s.negotiated_total)]);
    table.add_row(vec!["Total".to_string(), format_brl(s.total)]);
    table.add_row(vec!["Recovery rate".to_string(), format!("{}%", s.recovery_rate)]);
    table.add_row(vec!["Reminders sent".to_string(), s.dispatches_sent.to_string()]);
    println!("{}", table);

    println!();
    println!("{}", "Aging".bold());
    let mut aging = output::create_table();
    aging.set_header(vec!["Days", "Invoices", "Total"]);
    for slice in &s.aging {
        aging.add_row(vec![
            slice.bucket.label().to_string(),
            slice.count.to_string(),
            format_brl(slice.total),
        ]);
    }
    println!("{}", aging);

    if !s.top_overdue.is_empty() {
        println!();
        println!("{}", "Largest overdue".bold());
        let mut top = output::create_table();
        top.set_header(vec!["Client", "NF", "Days", "Total"]);
        for t in &s.top_overdue {
            top.add_row(vec![
                t.client_name.clone(),
                t.invoice_number.clone(),
                t.overdue_days.to_string(),
                format_brl(t.total),
            ]);
        }
        println!("{}", top);
    }

    let active: Vec<_> = s
        .daily
        .iter()
        .filter(|d| !d.received.is_zero() || !d.outstanding.is_zero())
        .collect();
    if !active.is_empty() {
        println!();
        println!("{}", "By import day".bold());
        let mut daily = output::create_table();
        daily.set_header(vec!["Day", "Received", "Outstanding"]);
        for d in active {
            daily.add_row(vec![
                format_date_br(d.date),
                format_brl(d.received),
                format_brl(d.outstanding),
            ]);
        }
        println!("{}", daily);
    }
}
