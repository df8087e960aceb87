//! `web_search` tool

use super::catalog::{self, ToolDefinition};
use super::{decode_args, into_envelope, Tool};
use crate::error::{ToolError, ValidationError};
use crate::models::ToolResult;
use crate::search::SearchProvider;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const DEFAULT_MAX_RESULTS: i64 = 5;

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    query: String,
    max_results: Option<i64>,
}

pub struct WebSearchTool {
    search: Arc<dyn SearchProvider>,
}

impl WebSearchTool {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self { search }
    }

    async fn run(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let args: WebSearchArgs = decode_args(arguments)?;

        let query = args.query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyField("query").into());
        }

        let max_results = args.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        if max_results < 1 {
            return Err(ValidationError::OutOfRange {
                field: "max_results",
                value: max_results,
            }
            .into());
        }

        let raw = self.search.search(query, max_results as usize).await?;
        let results: Vec<Value> = raw
            .into_iter()
            .map(|r| {
                json!({
                    "title": r.title.unwrap_or_default(),
                    "url": r.href.unwrap_or_default(),
                    "snippet": r.body.unwrap_or_default(),
                })
            })
            .collect();

        Ok(json!({
            "query": query,
            "count": results.len(),
            "results": results,
        }))
    }
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        catalog::WEB_SEARCH
    }

    fn definition(&self) -> ToolDefinition {
        catalog::web_search()
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> ToolResult {
        into_envelope(self.name(), self.run(arguments).await)
    }
}
