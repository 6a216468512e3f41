//! Outbox gateway - writes reminders to a JSON Lines file
//!
//! Each message becomes one line in the outbox; a separate sender (or a
//! human) drains it. Nothing here speaks to a messaging vendor.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ports::{GatewayReceipt, MessageGateway};

/// One queued message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: String,
    pub phone: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

pub struct OutboxGateway {
    path: PathBuf,
}

impl OutboxGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every queued message, skipping malformed lines
    pub fn read_all(&self) -> Result<Vec<OutboxMessage>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

impl MessageGateway for OutboxGateway {
    fn name(&self) -> &str {
        "outbox"
    }

    fn send(&self, phone: &str, message: &str) -> Result<GatewayReceipt> {
        let entry = OutboxMessage {
            id: format!("outbox-{}", Uuid::new_v4()),
            phone: phone.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open outbox {}", self.path.display()))?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;

        Ok(GatewayReceipt { message_id: entry.id })
    }
}
