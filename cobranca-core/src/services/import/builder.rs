//! Carteira builder: parsed rows to deduplicated clients and invoices

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::values::split_note_numbers;
use crate::domain::{Carteira, Client, ClientKey, Invoice, ParsedRow, PLACEHOLDER_INVOICE_NUMBER};

/// Build a carteira stamped with the current time
pub fn build_carteira(rows: &[ParsedRow]) -> Carteira {
    build_carteira_at(rows, Utc::now())
}

/// Build a carteira from parsed rows.
///
/// Rows sharing a client key collapse into the first-seen client. A note
/// number listing several duplicatas fans out into one invoice each.
pub fn build_carteira_at(rows: &[ParsedRow], now: DateTime<Utc>) -> Carteira {
    let mut clients: Vec<Client> = Vec::new();
    let mut by_key: HashMap<ClientKey, usize> = HashMap::new();
    let mut invoices = Vec::new();

    for row in rows {
        let key = ClientKey::new(&row.name, row.phone.as_deref());
        let idx = *by_key.entry(key).or_insert_with(|| {
            clients.push(Client::new(Uuid::new_v4(), row.name.trim(), row.phone.clone()));
            clients.len() - 1
        });
        let client_id = clients[idx].id;

        let invoice_number = row
            .invoice_number
            .clone()
            .unwrap_or_else(|| PLACEHOLDER_INVOICE_NUMBER.to_string());

        let notes = row
            .note_number
            .as_deref()
            .map(split_note_numbers)
            .unwrap_or_default();
        let notes: Vec<Option<String>> = if notes.is_empty() {
            vec![None]
        } else {
            notes.into_iter().map(Some).collect()
        };

        for note_number in notes {
            invoices.push(Invoice::new(
                Uuid::new_v4(),
                client_id,
                invoice_number.clone(),
                note_number,
                row.due_date,
                row.principal_amount,
                row.interest_amount,
                row.total_amount,
                row.overdue_days,
                now,
            ));
        }
    }

    Carteira { clients, invoices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InvoiceStatus;
    use crate::services::import::parser::parse_csv_text;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;

    fn row(name: &str, phone: Option<&str>, nf: Option<&str>, note: Option<&str>) -> ParsedRow {
        ParsedRow {
            name: name.to_string(),
            phone: phone.map(str::to_string),
            invoice_number: nf.map(str::to_string),
            note_number: note.map(str::to_string),
            due_date: None,
            principal_amount: Decimal::new(1000, 0),
            interest_amount: Decimal::ZERO,
            total_amount: Decimal::new(1000, 0),
            overdue_days: 0,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_same_key_collapses_to_first_client() {
        let rows = vec![
            row("Agro Sul", Some("(65) 99999-0001"), Some("NF-1"), None),
            row("  AGRO   sul ", Some("65999990001"), Some("NF-2"), None),
        ];
        let carteira = build_carteira_at(&rows, now());

        assert_eq!(carteira.clients.len(), 1);
        assert_eq!(carteira.clients[0].name, "Agro Sul");
        assert_eq!(carteira.invoices.len(), 2);
        assert!(carteira.invoices.iter().all(|i| i.client_id == carteira.clients[0].id));
    }

    #[test]
    fn test_different_phone_gives_different_clients() {
        let rows = vec![
            row("Agro Sul", Some("65999990001"), Some("NF-1"), None),
            row("Agro Sul", Some("65999990002"), Some("NF-2"), None),
            row("Agro Sul", None, Some("NF-3"), None),
        ];
        let carteira = build_carteira_at(&rows, now());
        assert_eq!(carteira.clients.len(), 3);
    }

    #[test]
    fn test_note_numbers_fan_out() {
        let text = "nome,telefone,numero_nf,duplicata,valor\n\
                    Agro Sul,65999990001,NF-500,DUP-001;DUP-002,2000";
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let rows = parse_csv_text(text, today);
        let carteira = build_carteira_at(&rows, now());

        assert_eq!(carteira.clients.len(), 1);
        assert_eq!(carteira.invoices.len(), 2);
        let notes: Vec<_> = carteira.invoices.iter().map(|i| i.note_number.as_deref()).collect();
        assert_eq!(notes, vec![Some("DUP-001"), Some("DUP-002")]);
        assert!(carteira.invoices.iter().all(|i| i.invoice_number == "NF-500"));
        assert!(carteira.invoices.iter().all(|i| i.match_key == "NF-500__2000.00"));
        assert_ne!(carteira.invoices[0].id, carteira.invoices[1].id);
    }

    #[test]
    fn test_placeholder_invoice_number_and_blank_notes() {
        let rows = vec![
            row("Agro Sul", None, None, Some("DUP-9")),
            row("Agro Sul", None, Some("NF-7"), Some(" ; , |")),
        ];
        let carteira = build_carteira_at(&rows, now());

        assert_eq!(carteira.invoices.len(), 2);
        assert_eq!(carteira.invoices[0].invoice_number, PLACEHOLDER_INVOICE_NUMBER);
        assert_eq!(carteira.invoices[1].note_number, None);
    }

    #[test]
    fn test_end_to_end_fazenda() {
        let text = "nome;telefone;numero_nf;numero_titulo;valor_principal;juros;total;dias_atraso\n\
                    Fazenda São João;+5565999990001;NF-12401;DUP-001;15000;750;15750;12";
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let carteira = build_carteira_at(&parse_csv_text(text, today), now());

        assert_eq!(carteira.clients.len(), 1);
        assert_eq!(carteira.clients[0].name, "Fazenda São João");
        assert_eq!(carteira.clients[0].phone.as_deref(), Some("+5565999990001"));

        assert_eq!(carteira.invoices.len(), 1);
        let invoice = &carteira.invoices[0];
        assert_eq!(invoice.status, InvoiceStatus::Overdue);
        assert_eq!(invoice.match_key, "NF-12401__15000.00");
        assert_eq!(invoice.total_amount, Decimal::new(15750, 0));
        assert_eq!(invoice.overdue_days, 12);
        assert_eq!(invoice.created_at, now());
        assert_eq!(carteira.total(), Decimal::new(15750, 0));
        assert_eq!(carteira.overdue_total(), Decimal::new(15750, 0));
    }

    #[test]
    fn test_rebuild_differs_only_in_ids() {
        let rows = vec![
            row("Agro Sul", Some("65999990001"), Some("NF-1"), Some("A|B")),
            row("Fazenda Boa Vista", None, Some("NF-2"), None),
        ];
        let first = build_carteira_at(&rows, now());
        let second = build_carteira_at(&rows, now());

        let strip_ids = |c: &Carteira| {
            let clients: Vec<_> = c.clients.iter().map(|c| (c.name.clone(), c.phone.clone())).collect();
            let invoices: Vec<_> = c
                .invoices
                .iter()
                .map(|i| (i.match_key.clone(), i.note_number.clone(), i.status, i.total_amount))
                .collect();
            (clients, invoices)
        };
        assert_eq!(strip_ids(&first), strip_ids(&second));
        assert_ne!(first.clients[0].id, second.clients[0].id);
    }

    #[test]
    fn test_empty_rows() {
        assert!(build_carteira_at(&[], now()).is_empty());
    }
}
