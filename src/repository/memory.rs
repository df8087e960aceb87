//! In-memory record store for development

use super::{check_limit, label_filter, FinancialRepository};
use crate::error::StorageError;
use crate::models::{FinancialRecord, NewRecord, RecordDetail, TableName};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct InMemoryRepository {
    tables: Arc<RwLock<HashMap<TableName, Vec<FinancialRecord>>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored rows in `table`
    pub async fn len(&self, table: TableName) -> usize {
        self.tables
            .read()
            .await
            .get(&table)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FinancialRepository for InMemoryRepository {
    async fn insert(&self, table: TableName, fields: Map<String, Value>) -> Result<FinancialRecord, StorageError> {
        let new_record = NewRecord::from_fields(table, &fields)?;

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_insert_with(Vec::new);

        let record = FinancialRecord {
            id: rows.len() as i32 + 1,
            amount: new_record.amount,
            detail: RecordDetail::new(table, new_record.label),
            description: new_record.description,
            created_at: Utc::now(),
        };
        rows.push(record.clone());

        Ok(record)
    }

    async fn query(
        &self,
        table: TableName,
        filters: Option<Map<String, Value>>,
        limit: i64,
    ) -> Result<Vec<FinancialRecord>, StorageError> {
        check_limit(limit)?;
        let label = label_filter(table, filters.as_ref());

        let tables = self.tables.read().await;
        let mut records: Vec<FinancialRecord> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| label.as_deref().map_or(true, |l| r.detail.label() == l))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.truncate(limit as usize);

        Ok(records)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn initialize_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
