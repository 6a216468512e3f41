//! Adapter implementations
//!
//! Adapters implement the ports with concrete technologies:
//! - DuckDB for persistence
//! - A JSON Lines outbox file for the MessageGateway port

pub mod duckdb;
pub mod outbox;
