//! Tool catalog
//!
//! The single source of truth for which tools the model may call and the
//! JSON Schema of their parameters.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const INSERT_RECORD: &str = "insert_record";
pub const QUERY_RECORDS: &str = "query_records";
pub const WEB_SEARCH: &str = "web_search";

/// Function declaration handed to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

pub fn insert_record() -> ToolDefinition {
    ToolDefinition {
        name: INSERT_RECORD.to_string(),
        description: "Insert a new financial record into the database. \
            Use it to add expenses, savings or investments."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "table": {
                    "type": "string",
                    "enum": ["expenses", "savings", "investments"],
                    "description": "Target table: expenses, savings or investments."
                },
                "amount": {
                    "type": "number",
                    "description": "Monetary amount (must be positive, at most 2 decimal places)."
                },
                "category": {
                    "type": "string",
                    "description": "For expenses: the category (e.g. 'comida', 'transporte', 'ocio')."
                },
                "goal": {
                    "type": "string",
                    "description": "For savings: the goal (e.g. 'vacaciones', 'emergencias')."
                },
                "asset_type": {
                    "type": "string",
                    "description": "For investments: the asset type (e.g. 'acciones', 'crypto', 'bonos')."
                },
                "description": {
                    "type": "string",
                    "description": "Optional free-text description (max 500 characters)."
                }
            },
            "required": ["table", "amount"]
        }),
    }
}

pub fn query_records() -> ToolDefinition {
    ToolDefinition {
        name: QUERY_RECORDS.to_string(),
        description: "Query stored financial records. \
            Use it to list expenses, savings or investments, most recent first."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "table": {
                    "type": "string",
                    "enum": ["expenses", "savings", "investments"],
                    "description": "Table to query."
                },
                "category": {
                    "type": "string",
                    "description": "Filter expenses by category."
                },
                "goal": {
                    "type": "string",
                    "description": "Filter savings by goal."
                },
                "asset_type": {
                    "type": "string",
                    "description": "Filter investments by asset type."
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of records to return (default 100)."
                }
            },
            "required": ["table"]
        }),
    }
}

pub fn web_search() -> ToolDefinition {
    ToolDefinition {
        name: WEB_SEARCH.to_string(),
        description: "Search the internet in real time. Use it for financial news, quotes, \
            investment advice, and information about markets, cryptocurrencies or stocks."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query (e.g. 'precio bitcoin hoy')."
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results (default 5)."
                }
            },
            "required": ["query"]
        }),
    }
}

/// All declared tools, in the order they are offered to the model
pub fn definitions() -> Vec<ToolDefinition> {
    vec![insert_record(), query_records(), web_search()]
}
