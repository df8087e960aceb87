//! Core data models for the financial agent

use crate::error::{StorageError, ValidationError};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub const MAX_LABEL_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
const CENT_TOLERANCE: f64 = 1e-3;

//
// ================= Tables =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TableName {
    Expenses,
    Savings,
    Investments,
}

impl TableName {
    pub const ALL: [TableName; 3] = [TableName::Expenses, TableName::Savings, TableName::Investments];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Expenses => "expenses",
            TableName::Savings => "savings",
            TableName::Investments => "investments",
        }
    }

    /// The category-specific required column of this table
    pub fn label_column(&self) -> &'static str {
        match self {
            TableName::Expenses => "category",
            TableName::Savings => "goal",
            TableName::Investments => "asset_type",
        }
    }

    /// Writable columns (storage assigns `id` and `created_at`)
    pub fn columns(&self) -> [&'static str; 3] {
        ["amount", self.label_column(), "description"]
    }
}

impl FromStr for TableName {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expenses" => Ok(TableName::Expenses),
            "savings" => Ok(TableName::Savings),
            "investments" => Ok(TableName::Investments),
            other => Err(StorageError::InvalidTable(other.to_string())),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ================= Records =================
//

/// A persisted expense, saving or investment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialRecord {
    pub id: i32,
    pub amount: f64,
    #[serde(flatten)]
    pub detail: RecordDetail,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RecordDetail {
    Expense { category: String },
    Saving { goal: String },
    Investment { asset_type: String },
}

impl RecordDetail {
    pub fn new(table: TableName, label: String) -> Self {
        match table {
            TableName::Expenses => RecordDetail::Expense { category: label },
            TableName::Savings => RecordDetail::Saving { goal: label },
            TableName::Investments => RecordDetail::Investment { asset_type: label },
        }
    }

    pub fn table(&self) -> TableName {
        match self {
            RecordDetail::Expense { .. } => TableName::Expenses,
            RecordDetail::Saving { .. } => TableName::Savings,
            RecordDetail::Investment { .. } => TableName::Investments,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RecordDetail::Expense { category } => category,
            RecordDetail::Saving { goal } => goal,
            RecordDetail::Investment { asset_type } => asset_type,
        }
    }
}

/// A validated record ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub table: TableName,
    pub amount: f64,
    pub label: String,
    pub description: Option<String>,
}

impl NewRecord {
    /// Build a record from a loose field mapping.
    ///
    /// Keys that are not writable columns of `table` and null values are
    /// ignored. Fails with `NoValidFields` when nothing usable remains.
    pub fn from_fields(table: TableName, fields: &Map<String, Value>) -> Result<Self, StorageError> {
        let columns = table.columns();
        let usable: Map<String, Value> = fields
            .iter()
            .filter(|(k, v)| columns.contains(&k.as_str()) && !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if usable.is_empty() {
            return Err(StorageError::NoValidFields);
        }

        let amount = match usable.get("amount") {
            Some(value) => value.as_f64().ok_or(ValidationError::InvalidAmount)?,
            None => {
                return Err(ValidationError::MissingField {
                    table: table.as_str(),
                    field: "amount",
                }
                .into())
            }
        };
        validate_amount(amount)?;

        let label_column = table.label_column();
        let label = usable
            .get(label_column)
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingField {
                table: table.as_str(),
                field: label_column,
            })?;
        let label = validate_text(label_column, label, MAX_LABEL_LEN)?;

        let description = match usable.get("description").and_then(Value::as_str) {
            Some(text) if text.chars().count() > MAX_DESCRIPTION_LEN => {
                return Err(ValidationError::FieldTooLong {
                    field: "description",
                    max: MAX_DESCRIPTION_LEN,
                }
                .into())
            }
            Some(text) => Some(text.to_string()),
            None => None,
        };

        Ok(Self {
            table,
            amount,
            label,
            description,
        })
    }
}

pub fn validate_amount(amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::InvalidAmount);
    }
    if amount <= 0.0 {
        return Err(ValidationError::NonPositiveAmount(amount));
    }
    // Columns are DECIMAL(12,2)
    let cents = amount * 100.0;
    if (cents - cents.round()).abs() > CENT_TOLERANCE {
        return Err(ValidationError::TooPrecise(amount));
    }
    Ok(())
}

fn validate_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(trimmed.to_string())
}

//
// ================= Tool I/O =================
//

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// Uniform envelope returned by every tool.
///
/// Serializes flat: `{"success": true, ...payload}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(Map<String, Value>),
    Failure(String),
}

impl ToolResult {
    pub fn success(payload: Value) -> Self {
        match payload {
            Value::Object(map) => ToolResult::Success(map),
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                ToolResult::Success(map)
            }
        }
    }

    pub fn failure(error: impl fmt::Display) -> Self {
        ToolResult::Failure(error.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ToolResult::Failure(error) => Some(error),
            ToolResult::Success(_) => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            ToolResult::Success(payload) => payload.get(key),
            ToolResult::Failure(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for ToolResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ToolResult::Success(payload) => {
                let mut map = serializer.serialize_map(Some(payload.len() + 1))?;
                map.serialize_entry("success", &true)?;
                for (key, value) in payload {
                    if key != "success" {
                        map.serialize_entry(key, value)?;
                    }
                }
                map.end()
            }
            ToolResult::Failure(error) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}
