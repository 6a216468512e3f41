//! Pay command - record a payment

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use cobranca_core::services::{format_brl, PaymentRequest};
use cobranca_core::PaymentMethod;

use super::{get_context, get_logger, log_outcome, resolve_invoice_id};
use crate::output;

pub fn run(
    id: &str,
    amount: Decimal,
    method: PaymentMethod,
    partial: bool,
    date: Option<NaiveDate>,
    note: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let invoice_id = resolve_invoice_id(&ctx, id)?;

    let request = PaymentRequest {
        amount,
        method,
        date: date.unwrap_or_else(|| ctx.config.today()),
        partial,
        note,
    };

    let logger = get_logger();
    let result = ctx.invoice_service.record_payment(invoice_id, &request);
    log_outcome(&logger, "pay", &result);
    let outcome = result?;

    if json {
        return output::print_json(&outcome);
    }

    let invoice = ctx.invoice_service.get(invoice_id)?;
    output::success(&format!(
        "Recorded {} ({}) for NF {}",
        format_brl(outcome.receipt.amount),
        outcome.receipt.method,
        invoice.invoice_number
    ));
    if outcome.settled {
        println!("Invoice is now {}", output::invoice_status(outcome.status));
    } else {
        let paid: Decimal = ctx
            .invoice_service
            .receipts(invoice_id)?
            .iter()
            .map(|r| r.amount)
            .sum();
        println!(
            "Paid so far {} of {}; status stays {}",
            format_brl(paid),
            format_brl(invoice.total_amount),
            output::invoice_status(outcome.status)
        );
    }
    Ok(())
}
