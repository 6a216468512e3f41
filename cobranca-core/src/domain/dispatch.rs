//! Dispatch (collection reminder) domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    Pending,
    Sent,
    Failed,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Pending => "PENDING",
            DispatchStatus::Sent => "SENT",
            DispatchStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" | "PENDENTE" => Ok(DispatchStatus::Pending),
            "SENT" | "ENVIADO" => Ok(DispatchStatus::Sent),
            "FAILED" | "FALHOU" => Ok(DispatchStatus::Failed),
            other => Err(format!("unknown dispatch status: {}", other)),
        }
    }
}

/// One outbound reminder message event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub id: Uuid,
    pub client_id: Uuid,
    /// Invoice the reminder was triggered from
    pub invoice_id: Uuid,
    pub status: DispatchStatus,
    pub created_at: DateTime<Utc>,
    /// Template name
    pub template: String,
    /// Gateway message id on success, error text on failure
    pub response: String,
}

impl Dispatch {
    /// A pending dispatch, before the gateway has been called
    pub fn pending(client_id: Uuid, invoice_id: Uuid, template: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            invoice_id,
            status: DispatchStatus::Pending,
            created_at: Utc::now(),
            template: template.into(),
            response: String::new(),
        }
    }
}
