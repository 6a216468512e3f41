//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod carteira;
mod client;
mod dispatch;
mod invoice;
mod receipt;
pub mod result;

pub use carteira::{Carteira, ParsedRow};
pub use client::{digits_only, normalize_key, Client, ClientKey};
pub use dispatch::{Dispatch, DispatchStatus};
pub use invoice::{days_overdue, AgingBucket, Invoice, InvoiceStatus, PLACEHOLDER_INVOICE_NUMBER};
pub use receipt::{PaymentMethod, Receipt};
