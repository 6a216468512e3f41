//! Receipt (payment) domain model

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a payment arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Pix,
    Cash,
    Boleto,
    Transfer,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "PIX",
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Boleto => "BOLETO",
            PaymentMethod::Transfer => "TRANSFER",
            PaymentMethod::Other => "OTHER",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PIX" => Ok(PaymentMethod::Pix),
            "CASH" | "DINHEIRO" => Ok(PaymentMethod::Cash),
            "BOLETO" => Ok(PaymentMethod::Boleto),
            "TRANSFER" | "TRANSFERENCIA" | "TRANSFERÊNCIA" => Ok(PaymentMethod::Transfer),
            "OTHER" | "OUTRO" => Ok(PaymentMethod::Other),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// A payment recorded against an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub note: Option<String>,
}

impl Receipt {
    pub fn new(invoice_id: Uuid, date: NaiveDate, amount: Decimal, method: PaymentMethod) -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_id,
            date,
            amount,
            method,
            note: None,
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.amount <= Decimal::ZERO {
            return Err("payment amount must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("pix".parse::<PaymentMethod>().unwrap(), PaymentMethod::Pix);
        assert_eq!("Dinheiro".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_receipt_validation() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let receipt = Receipt::new(Uuid::new_v4(), date, Decimal::ZERO, PaymentMethod::Pix);
        assert!(receipt.validate().is_err());

        let receipt = Receipt::new(Uuid::new_v4(), date, Decimal::new(10, 0), PaymentMethod::Pix);
        assert!(receipt.validate().is_ok());
    }
}
