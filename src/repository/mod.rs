//! Storage layer for financial records
//!
//! Responsible for persisting and reading expenses, savings and investments.
//! Postgres in production; an in-memory store for development and tests.

use crate::config::{Settings, StorageBackend};
use crate::error::{StorageError, ValidationError};
use crate::models::{FinancialRecord, TableName};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

pub const DEFAULT_QUERY_LIMIT: i64 = 100;

/// Trait for record persistence
#[async_trait::async_trait]
pub trait FinancialRepository: Send + Sync {
    /// Insert a record built from `fields`, returning it with the
    /// storage-assigned `id` and `created_at`.
    async fn insert(&self, table: TableName, fields: Map<String, Value>) -> Result<FinancialRecord, StorageError>;

    /// Most-recent-first records of `table`, at most `limit` of them.
    async fn query(
        &self,
        table: TableName,
        filters: Option<Map<String, Value>>,
        limit: i64,
    ) -> Result<Vec<FinancialRecord>, StorageError>;

    /// Liveness check
    async fn ping(&self) -> Result<(), StorageError>;

    async fn initialize_schema(&self) -> Result<(), StorageError>;
}

/// Open the backend selected by `STORAGE_BACKEND`
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn FinancialRepository>, StorageError> {
    match settings.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Ok(Arc::new(InMemoryRepository::new()))
        }
        StorageBackend::Postgres => {
            info!(
                host = %settings.database_host,
                database = %settings.database_name,
                "Using Postgres storage"
            );
            Ok(Arc::new(PgRepository::connect_lazy(&settings.database_url())?))
        }
    }
}

/// The filter value that applies to `table`.
///
/// Only the table's category-specific column is filterable; filters naming
/// another table's column are ignored.
pub(crate) fn label_filter(table: TableName, filters: Option<&Map<String, Value>>) -> Option<String> {
    filters?
        .get(table.label_column())
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub(crate) fn check_limit(limit: i64) -> Result<(), StorageError> {
    if limit < 1 {
        return Err(ValidationError::OutOfRange {
            field: "limit",
            value: limit,
        }
        .into());
    }
    Ok(())
}
