//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod dashboard;
mod dispatch;
pub mod import;
mod invoice;
pub mod logging;
pub mod migration;

pub use dashboard::{summarize, AgingSlice, DailyPoint, DashboardService, DashboardSummary, TopOverdue};
pub use dispatch::{
    build_message, format_brl, format_date_br, DispatchEntry, DispatchOutcome, DispatchService,
    ReminderTemplate,
};
pub use import::{CarteiraSummary, ImportPreview, ImportResult, ImportService};
pub use invoice::{
    export_csv, group_by_client, ClientGroup, InvoiceFilter, InvoiceListEntry, InvoiceService,
    PaymentOutcome, PaymentRequest,
};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
