//! Client (debtor) domain model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The debtor entity associated with one or more invoices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    /// CPF/CNPJ, only set through manual edits
    pub document: Option<String>,
}

impl Client {
    /// Create a new client with required fields
    pub fn new(id: Uuid, name: impl Into<String>, phone: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            phone,
            document: None,
        }
    }

    /// Dedup identity of this client
    pub fn key(&self) -> ClientKey {
        ClientKey::new(&self.name, self.phone.as_deref())
    }

    /// Phone reduced to its digits, as the messaging gateway expects it
    pub fn phone_digits(&self) -> Option<String> {
        self.phone
            .as_deref()
            .map(digits_only)
            .filter(|d| !d.is_empty())
    }

    /// Validate client data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("client name cannot be empty");
        }
        Ok(())
    }
}

/// Composite dedup key: normalized name plus digits-only phone.
///
/// Two clients with the same key are the same debtor, regardless of
/// how the name was capitalized or how the phone was punctuated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey {
    name: String,
    phone: String,
}

impl ClientKey {
    pub fn new(name: &str, phone: Option<&str>) -> Self {
        Self {
            name: normalize_key(name),
            phone: phone.map(digits_only).unwrap_or_default(),
        }
    }
}

/// Trim, lowercase and collapse inner whitespace runs to a single space
pub fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keep only ASCII digits
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_case_and_phone_punctuation() {
        let a = ClientKey::new("Fazenda  São João", Some("+55 (65) 99999-0001"));
        let b = ClientKey::new(" fazenda são joão ", Some("5565999990001"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_distinguishes_phones() {
        let a = ClientKey::new("Agro Sul", Some("65 1111-1111"));
        let b = ClientKey::new("Agro Sul", Some("65 2222-2222"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_phone_matches_empty_phone() {
        assert_eq!(ClientKey::new("X", None), ClientKey::new("x", Some("")));
    }

    #[test]
    fn test_client_validation() {
        let mut client = Client::new(Uuid::new_v4(), "Agro Sul", None);
        assert!(client.validate().is_ok());

        client.name = "  ".to_string();
        assert!(client.validate().is_err());
    }

    #[test]
    fn test_phone_digits() {
        let client = Client::new(Uuid::new_v4(), "A", Some("+55 65 9999-0001".to_string()));
        assert_eq!(client.phone_digits().as_deref(), Some("556599990001"));

        let client = Client::new(Uuid::new_v4(), "A", Some("n/d".to_string()));
        assert_eq!(client.phone_digits(), None);
    }
}
