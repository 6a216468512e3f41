//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Services depend
//! only on these traits, not on concrete implementations.

mod gateway;

pub use gateway::{GatewayReceipt, MessageGateway};
