//! Cobrança Core - billing collections: invoice import, tracking and reminders
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Client, Invoice, Receipt, Dispatch)
//! - **ports**: Trait definitions for external dependencies (MessageGateway)
//! - **services**: Business logic orchestration (import, invoices, dashboard, dispatch)
//! - **adapters**: Concrete implementations (DuckDB, outbox file)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use adapters::outbox::OutboxGateway;
use config::Config;
use ports::MessageGateway;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    Carteira, Client, Dispatch, DispatchStatus, Invoice, InvoiceStatus, ParsedRow, PaymentMethod,
    Receipt,
};

const DB_FILE: &str = "cobranca.duckdb";

/// Main context for Cobrança operations
///
/// Holds the database, configuration and every service. The CLI builds
/// one per invocation.
pub struct CobrancaContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub import_service: ImportService,
    pub invoice_service: InvoiceService,
    pub dashboard_service: DashboardService,
    pub dispatch_service: DispatchService,
}

impl CobrancaContext {
    /// Open the data directory with the configured outbox gateway
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let gateway = Arc::new(OutboxGateway::new(config.outbox_path(data_dir)));
        Self::with_gateway(data_dir, config, gateway)
    }

    /// Open the data directory with an explicit gateway
    pub fn with_gateway(
        data_dir: &Path,
        config: Config,
        gateway: Arc<dyn MessageGateway>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(DB_FILE))?);
        repository.ensure_schema()?;

        let import_service = ImportService::new(Arc::clone(&repository), config.clone());
        let invoice_service = InvoiceService::new(Arc::clone(&repository));
        let dashboard_service = DashboardService::new(Arc::clone(&repository));
        let dispatch_service = DispatchService::new(
            Arc::clone(&repository),
            gateway,
            config.dispatch.company_name.clone(),
        );

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
            import_service,
            invoice_service,
            dashboard_service,
            dispatch_service,
        })
    }
}
