//! Dispatch service - collection reminders through a messaging gateway

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{Dispatch, DispatchStatus, Invoice};
use crate::ports::MessageGateway;

/// Named reminder templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderTemplate {
    #[serde(rename = "1º Aviso")]
    FirstNotice,
    #[serde(rename = "Vencido")]
    Overdue,
    #[serde(rename = "2º Aviso")]
    SecondNotice,
    #[serde(rename = "Pós-vencimento")]
    PostDue,
}

impl ReminderTemplate {
    pub const ALL: [ReminderTemplate; 4] = [
        ReminderTemplate::FirstNotice,
        ReminderTemplate::Overdue,
        ReminderTemplate::SecondNotice,
        ReminderTemplate::PostDue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReminderTemplate::FirstNotice => "1º Aviso",
            ReminderTemplate::Overdue => "Vencido",
            ReminderTemplate::SecondNotice => "2º Aviso",
            ReminderTemplate::PostDue => "Pós-vencimento",
        }
    }

    fn opening(&self, client_name: &str, company: &str) -> String {
        match self {
            ReminderTemplate::FirstNotice => format!(
                "Olá, {}! Passando para lembrar dos títulos em aberto com a {}:",
                client_name, company
            ),
            ReminderTemplate::Overdue => format!(
                "Olá, {}. Identificamos títulos vencidos junto à {}:",
                client_name, company
            ),
            ReminderTemplate::SecondNotice => format!(
                "Olá, {}. Este é o segundo aviso sobre os títulos abaixo, ainda pendentes com a {}:",
                client_name, company
            ),
            ReminderTemplate::PostDue => format!(
                "Olá, {}. Os títulos abaixo seguem em aberto após o vencimento. \
                 Fale com a {} para regularizar:",
                client_name, company
            ),
        }
    }
}

impl fmt::Display for ReminderTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReminderTemplate {
    type Err = Error;

    /// Template names, case-insensitive, with ASCII spellings accepted
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        match key.as_str() {
            "1º aviso" | "1o aviso" | "primeiro aviso" => Ok(ReminderTemplate::FirstNotice),
            "vencido" => Ok(ReminderTemplate::Overdue),
            "2º aviso" | "2o aviso" | "segundo aviso" => Ok(ReminderTemplate::SecondNotice),
            "pós-vencimento" | "pos-vencimento" | "pós vencimento" | "pos vencimento" => {
                Ok(ReminderTemplate::PostDue)
            }
            _ => Err(Error::validation(format!(
                "unknown template '{}' (expected one of: {})",
                s,
                ReminderTemplate::ALL.map(|t| t.name()).join(", ")
            ))),
        }
    }
}

/// A dispatch joined with display fields, as listed in the history
#[derive(Debug, Clone, Serialize)]
pub struct DispatchEntry {
    #[serde(flatten)]
    pub dispatch: Dispatch,
    pub client_name: String,
    pub invoice_number: String,
}

/// Result of one send attempt; a gateway failure is recorded, not raised
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub dispatch: Dispatch,
    pub invoices_notified: usize,
    pub message: String,
}

/// `R$ 1.234,56`
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::new();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}R$ {},{}", sign, grouped, frac_part)
}

/// `dd/mm/yyyy`
pub fn format_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Render a reminder listing `invoices` for one client
pub fn build_message(
    client_name: &str,
    invoices: &[Invoice],
    template: ReminderTemplate,
    company: &str,
) -> String {
    let mut lines = vec![template.opening(client_name, company), String::new()];

    for inv in invoices {
        let mut line = format!("• NF {}", inv.invoice_number);
        if let Some(note) = &inv.note_number {
            line.push_str(&format!(" / {}", note));
        }
        line.push_str(&format!(": {}", format_brl(inv.total_amount)));
        if let Some(due) = inv.due_date {
            line.push_str(&format!(", venc. {}", format_date_br(due)));
        }
        if inv.overdue_days > 0 {
            line.push_str(&format!(" ({} dias em atraso)", inv.overdue_days));
        }
        lines.push(line);
    }

    let total: Decimal = invoices.iter().map(|i| i.total_amount).sum();
    lines.push(String::new());
    lines.push(format!("Total: {}", format_brl(total)));
    lines.push("Caso o pagamento já tenha sido feito, por favor desconsidere esta mensagem.".to_string());
    lines.join("\n")
}

pub struct DispatchService {
    repository: Arc<DuckDbRepository>,
    gateway: Arc<dyn MessageGateway>,
    company_name: String,
}

impl DispatchService {
    pub fn new(
        repository: Arc<DuckDbRepository>,
        gateway: Arc<dyn MessageGateway>,
        company_name: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            gateway,
            company_name: company_name.into(),
        }
    }

    /// Send a reminder about `invoice_id` and everything else the client
    /// still owes.
    ///
    /// The dispatch is stored as PENDING before the gateway call and updated
    /// to SENT or FAILED afterwards. Only a successful send stamps
    /// `last_dispatch` on the invoices in the message.
    pub fn send(&self, invoice_id: Uuid, template: &str) -> Result<DispatchOutcome> {
        let template: ReminderTemplate = template.parse()?;

        let invoice = self
            .repository
            .get_invoice(invoice_id)?
            .ok_or_else(|| Error::not_found(format!("invoice {}", invoice_id)))?;
        let client = self
            .repository
            .get_client(invoice.client_id)?
            .ok_or_else(|| Error::not_found(format!("client of invoice {}", invoice.invoice_number)))?;
        let phone = client
            .phone_digits()
            .ok_or_else(|| Error::validation(format!("client '{}' has no phone", client.name)))?;

        let mut invoices: Vec<Invoice> = self
            .repository
            .get_invoices_by_client(client.id)?
            .into_iter()
            .filter(|i| i.status.is_collectible())
            .collect();
        invoices.sort_by(|a, b| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.invoice_number.cmp(&b.invoice_number),
        });
        if invoices.is_empty() {
            invoices.push(invoice.clone());
        }

        let message = build_message(&client.name, &invoices, template, &self.company_name);

        let mut dispatch = Dispatch::pending(client.id, invoice.id, template.name());
        self.repository.insert_dispatch(&dispatch)?;

        match self.gateway.send(&phone, &message) {
            Ok(receipt) => {
                dispatch.status = DispatchStatus::Sent;
                dispatch.response = receipt.message_id;
                let ids: Vec<Uuid> = invoices.iter().map(|i| i.id).collect();
                self.repository.set_last_dispatch(&ids, Utc::now())?;
            }
            Err(e) => {
                dispatch.status = DispatchStatus::Failed;
                dispatch.response = format!("{:#}", e);
            }
        }
        self.repository
            .update_dispatch(dispatch.id, dispatch.status, &dispatch.response)?;

        Ok(DispatchOutcome {
            dispatch,
            invoices_notified: invoices.len(),
            message,
        })
    }

    /// Dispatch history, newest first
    pub fn history(
        &self,
        status: Option<DispatchStatus>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DispatchEntry>> {
        self.repository.get_dispatches(status, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(Decimal::new(123456, 2)), "R$ 1.234,56");
        assert_eq!(format_brl(Decimal::new(15750, 0)), "R$ 15.750,00");
        assert_eq!(format_brl(Decimal::new(5, 1)), "R$ 0,50");
        assert_eq!(format_brl(Decimal::new(123456789, 0)), "R$ 123.456.789,00");
        assert_eq!(format_brl(Decimal::new(-1000, 0)), "-R$ 1.000,00");
    }

    #[test]
    fn test_template_names() {
        assert_eq!("vencido".parse::<ReminderTemplate>().unwrap(), ReminderTemplate::Overdue);
        assert_eq!("1o Aviso".parse::<ReminderTemplate>().unwrap(), ReminderTemplate::FirstNotice);
        assert_eq!("Pós-vencimento".parse::<ReminderTemplate>().unwrap(), ReminderTemplate::PostDue);
        assert!(matches!("urgente".parse::<ReminderTemplate>(), Err(Error::Validation(_))));
        for template in ReminderTemplate::ALL {
            assert_eq!(template.name().parse::<ReminderTemplate>().unwrap(), template);
        }
    }

    #[test]
    fn test_build_message() {
        let invoice = Invoice::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "NF-12401",
            Some("DUP-001".to_string()),
            NaiveDate::from_ymd_opt(2026, 1, 29),
            Decimal::new(15000, 0),
            Decimal::new(750, 0),
            Decimal::new(15750, 0),
            12,
            Utc::now(),
        );
        let message = build_message("Fazenda São João", &[invoice], ReminderTemplate::Overdue, "Agro Cobranças");

        assert!(message.starts_with("Olá, Fazenda São João."));
        assert!(message.contains("Agro Cobranças"));
        assert!(message.contains("• NF NF-12401 / DUP-001: R$ 15.750,00, venc. 29/01/2026 (12 dias em atraso)"));
        assert!(message.contains("Total: R$ 15.750,00"));
    }
}
