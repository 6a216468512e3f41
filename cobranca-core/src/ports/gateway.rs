//! Messaging gateway port
//!
//! Defines the interface for delivering collection reminders to a client's
//! phone. The DispatchService only knows this trait; the shipped adapter
//! writes an outbox file and tests use a recording mock.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Acknowledgement from the gateway for one delivered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayReceipt {
    /// Gateway-side identifier, stored as the dispatch response
    pub message_id: String,
}

/// Messaging gateway trait
pub trait MessageGateway: Send + Sync {
    /// Gateway name (e.g., "outbox")
    fn name(&self) -> &str;

    /// Deliver a text message
    ///
    /// # Arguments
    /// * `phone` - Destination phone, digits only
    /// * `message` - Rendered reminder text
    fn send(&self, phone: &str, message: &str) -> Result<GatewayReceipt>;
}
