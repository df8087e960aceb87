//! Record tools: `insert_record` and `query_records`

use super::catalog::{self, ToolDefinition};
use super::{decode_args, into_envelope, Tool};
use crate::error::ToolError;
use crate::models::{validate_amount, TableName, ToolResult};
use crate::repository::{FinancialRepository, DEFAULT_QUERY_LIMIT};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct InsertRecordArgs {
    table: String,
    amount: f64,
    category: Option<String>,
    goal: Option<String>,
    asset_type: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryRecordsArgs {
    table: String,
    category: Option<String>,
    goal: Option<String>,
    asset_type: Option<String>,
    limit: Option<i64>,
}

/// Collect the present optionals into a field map, dropping absent ones.
fn present(pairs: [(&str, Option<String>); 3]) -> Map<String, Value> {
    pairs
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::String(v))))
        .collect()
}

pub struct InsertRecordTool {
    repository: Arc<dyn FinancialRepository>,
}

impl InsertRecordTool {
    pub fn new(repository: Arc<dyn FinancialRepository>) -> Self {
        Self { repository }
    }

    async fn run(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let args: InsertRecordArgs = decode_args(arguments)?;
        let table: TableName = args.table.parse()?;
        validate_amount(args.amount)?;

        let mut fields = present([
            ("category", args.category),
            ("goal", args.goal),
            ("asset_type", args.asset_type),
        ]);
        fields.insert("amount".to_string(), json!(args.amount));
        if let Some(description) = args.description {
            fields.insert("description".to_string(), Value::String(description));
        }

        let record = self.repository.insert(table, fields).await?;

        Ok(json!({
            "message": format!("Record inserted into {}", table),
            "record": record,
        }))
    }
}

#[async_trait::async_trait]
impl Tool for InsertRecordTool {
    fn name(&self) -> &'static str {
        catalog::INSERT_RECORD
    }

    fn definition(&self) -> ToolDefinition {
        catalog::insert_record()
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> ToolResult {
        into_envelope(self.name(), self.run(arguments).await)
    }
}

pub struct QueryRecordsTool {
    repository: Arc<dyn FinancialRepository>,
}

impl QueryRecordsTool {
    pub fn new(repository: Arc<dyn FinancialRepository>) -> Self {
        Self { repository }
    }

    async fn run(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let args: QueryRecordsArgs = decode_args(arguments)?;
        let table: TableName = args.table.parse()?;

        let filters = present([
            ("category", args.category),
            ("goal", args.goal),
            ("asset_type", args.asset_type),
        ]);
        let filters = if filters.is_empty() { None } else { Some(filters) };
        let limit = args.limit.unwrap_or(DEFAULT_QUERY_LIMIT);

        let records = self.repository.query(table, filters, limit).await?;

        Ok(json!({
            "count": records.len(),
            "records": records,
        }))
    }
}

#[async_trait::async_trait]
impl Tool for QueryRecordsTool {
    fn name(&self) -> &'static str {
        catalog::QUERY_RECORDS
    }

    fn definition(&self) -> ToolDefinition {
        catalog::query_records()
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> ToolResult {
        into_envelope(self.name(), self.run(arguments).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn tools() -> (Arc<InMemoryRepository>, InsertRecordTool, QueryRecordsTool) {
        let repo = Arc::new(InMemoryRepository::new());
        let insert = InsertRecordTool::new(repo.clone());
        let query = QueryRecordsTool::new(repo.clone());
        (repo, insert, query)
    }

    #[tokio::test]
    async fn test_insert_expense() {
        let (repo, insert, _) = tools();
        let result = insert
            .execute(&args(json!({"table": "expenses", "amount": 50, "category": "comida"})))
            .await;

        assert!(result.is_success());
        assert_eq!(result.get("message"), Some(&json!("Record inserted into expenses")));
        let record = result.get("record").unwrap();
        assert_eq!(record["id"], json!(1));
        assert_eq!(record["category"], json!("comida"));
        assert_eq!(record["amount"], json!(50.0));
        assert_eq!(repo.len(TableName::Expenses).await, 1);
    }

    #[tokio::test]
    async fn test_insert_ignores_null_optionals() {
        let (_, insert, _) = tools();
        let result = insert
            .execute(&args(json!({
                "table": "savings",
                "amount": 200.5,
                "goal": "vacaciones",
                "category": null,
                "description": null
            })))
            .await;

        assert!(result.is_success());
        assert_eq!(result.get("record").unwrap()["description"], Value::Null);
    }

    #[tokio::test]
    async fn test_insert_rejects_non_positive_amount() {
        let (repo, insert, _) = tools();
        for amount in [json!(0), json!(-10)] {
            let result = insert
                .execute(&args(json!({"table": "expenses", "amount": amount, "category": "ocio"})))
                .await;
            assert!(!result.is_success());
        }
        assert_eq!(repo.len(TableName::Expenses).await, 0);
    }

    #[tokio::test]
    async fn test_insert_rejects_sub_cent_amount() {
        let (repo, insert, _) = tools();
        let result = insert
            .execute(&args(json!({"table": "expenses", "amount": 10.005, "category": "ocio"})))
            .await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("2 decimal places"));
        assert_eq!(repo.len(TableName::Expenses).await, 0);

        let result = insert
            .execute(&args(json!({"table": "expenses", "amount": 10.25, "category": "ocio"})))
            .await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_insert_invalid_table() {
        let (_, insert, _) = tools();
        let result = insert
            .execute(&args(json!({"table": "loans", "amount": 10, "category": "x"})))
            .await;

        assert_eq!(result.to_value(), json!({"success": false, "error": "Invalid table: loans"}));
    }

    #[tokio::test]
    async fn test_insert_missing_label_column() {
        let (_, insert, _) = tools();
        let result = insert
            .execute(&args(json!({"table": "investments", "amount": 10, "category": "crypto"})))
            .await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("asset_type"));
    }

    #[tokio::test]
    async fn test_insert_malformed_arguments() {
        let (_, insert, _) = tools();
        let result = insert.execute(&args(json!({"table": "expenses"}))).await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().starts_with("invalid arguments"));
    }

    #[tokio::test]
    async fn test_query_with_filter_and_limit() {
        let (_, insert, query) = tools();
        for (amount, category) in [(10, "comida"), (20, "ocio"), (30, "comida"), (40, "comida")] {
            insert
                .execute(&args(json!({"table": "expenses", "amount": amount, "category": category})))
                .await;
        }

        let result = query
            .execute(&args(json!({"table": "expenses", "category": "comida", "limit": 2})))
            .await;

        assert!(result.is_success());
        assert_eq!(result.get("count"), Some(&json!(2)));
        let records = result.get("records").unwrap().as_array().unwrap();
        assert_eq!(records[0]["amount"], json!(40.0));
        assert_eq!(records[1]["amount"], json!(30.0));
    }

    #[tokio::test]
    async fn test_query_empty_table() {
        let (_, _, query) = tools();
        let result = query.execute(&args(json!({"table": "investments"}))).await;

        assert_eq!(
            result.to_value(),
            json!({"success": true, "count": 0, "records": []})
        );
    }

    #[tokio::test]
    async fn test_query_invalid_table() {
        let (_, _, query) = tools();
        let result = query.execute(&args(json!({"table": "loans"}))).await;

        assert_eq!(result.to_value(), json!({"success": false, "error": "Invalid table: loans"}));
    }

    #[tokio::test]
    async fn test_query_default_limit_caps_at_100() {
        let (_, insert, query) = tools();
        for i in 1..=105 {
            let result = insert
                .execute(&args(json!({"table": "expenses", "amount": i, "category": "comida"})))
                .await;
            assert!(result.is_success());
        }

        let result = query.execute(&args(json!({"table": "expenses"}))).await;

        assert_eq!(result.get("count"), Some(&json!(100)));
        let records = result.get("records").unwrap().as_array().unwrap();
        assert_eq!(records[0]["id"], json!(105));
    }

    #[tokio::test]
    async fn test_query_rejects_zero_limit() {
        let (_, _, query) = tools();
        let result = query
            .execute(&args(json!({"table": "savings", "limit": 0})))
            .await;

        assert!(!result.is_success());
    }
}
