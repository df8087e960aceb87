//! Postgres record store
//!
//! Table and column names come from [`TableName`], never from caller text,
//! so they are safe to interpolate; values are always bound.

use super::{check_limit, label_filter, FinancialRepository};
use crate::error::StorageError;
use crate::models::{FinancialRecord, NewRecord, RecordDetail, TableName};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA_SQL: &str = include_str!("../../migrations/001_financial_tables.sql");

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    /// Build a pool that connects on first use, so the process can start
    /// (and report an unhealthy database) while Postgres is down.
    pub fn connect_lazy(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn returning_columns(table: TableName) -> String {
        format!(
            "id, amount::float8 AS amount, {} AS label, description, created_at",
            table.label_column()
        )
    }

    fn record_from_row(table: TableName, row: &PgRow) -> Result<FinancialRecord, StorageError> {
        Ok(FinancialRecord {
            id: row.try_get("id")?,
            amount: row.try_get("amount")?,
            detail: RecordDetail::new(table, row.try_get("label")?),
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait::async_trait]
impl FinancialRepository for PgRepository {
    async fn insert(&self, table: TableName, fields: Map<String, Value>) -> Result<FinancialRecord, StorageError> {
        let record = NewRecord::from_fields(table, &fields)?;

        let sql = format!(
            "INSERT INTO {} (amount, {}, description) VALUES ($1, $2, $3) RETURNING {}",
            table.as_str(),
            table.label_column(),
            Self::returning_columns(table)
        );

        debug!(table = %table, amount = record.amount, "Inserting record");

        let row = sqlx::query(&sql)
            .bind(record.amount)
            .bind(&record.label)
            .bind(&record.description)
            .fetch_one(&self.pool)
            .await?;

        Self::record_from_row(table, &row)
    }

    async fn query(
        &self,
        table: TableName,
        filters: Option<Map<String, Value>>,
        limit: i64,
    ) -> Result<Vec<FinancialRecord>, StorageError> {
        check_limit(limit)?;
        let label = label_filter(table, filters.as_ref());

        let sql = format!(
            "SELECT {} FROM {} WHERE ($1::text IS NULL OR {} = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2",
            Self::returning_columns(table),
            table.as_str(),
            table.label_column()
        );

        let rows = sqlx::query(&sql)
            .bind(label)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Self::record_from_row(table, row))
            .collect()
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn initialize_schema(&self) -> Result<(), StorageError> {
        for statement in SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("Financial schema initialized");
        Ok(())
    }
}
