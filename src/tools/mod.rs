//! Tool trait and registry
//!
//! Every tool result reaches the model as a `{success, ...}` envelope.
//! Faults inside a known tool never escape as errors; only an unknown tool
//! name is reported to the caller.

use crate::error::{AgentError, ToolError};
use crate::models::ToolResult;
use crate::repository::FinancialRepository;
use crate::search::SearchProvider;
use crate::Result;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod catalog;
pub mod records;
pub mod web_search;

pub use catalog::ToolDefinition;
pub use records::{InsertRecordTool, QueryRecordsTool};
pub use web_search::WebSearchTool;

/// Trait for a single model-callable tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn definition(&self) -> ToolDefinition;
    async fn execute(&self, arguments: &Map<String, Value>) -> ToolResult;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in registration order
    pub fn list(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Declarations handed to the model, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Dispatch `name` with `arguments`.
    ///
    /// Unknown names are the only error; anything that goes wrong inside a
    /// known tool comes back as a failure envelope.
    pub async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

        debug!(tool = name, "Executing tool");
        Ok(tool.execute(arguments).await)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode raw call arguments into a tool's typed argument struct.
pub(crate) fn decode_args<T: DeserializeOwned>(arguments: &Map<String, Value>) -> std::result::Result<T, ToolError> {
    Ok(serde_json::from_value(Value::Object(arguments.clone()))?)
}

/// Fold a tool's outcome into the envelope the model sees.
pub(crate) fn into_envelope(tool: &str, outcome: std::result::Result<Value, ToolError>) -> ToolResult {
    match outcome {
        Ok(payload) => ToolResult::success(payload),
        Err(e) => {
            warn!(tool, error = %e, "Tool failed");
            ToolResult::failure(e)
        }
    }
}

/// Create the registry backing the catalog's three tools.
pub fn create_default_registry(
    repository: Arc<dyn FinancialRepository>,
    search: Arc<dyn SearchProvider>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(InsertRecordTool::new(repository.clone())));
    registry.register(Arc::new(QueryRecordsTool::new(repository)));
    registry.register(Arc::new(WebSearchTool::new(search)));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use crate::search::StaticSearch;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        create_default_registry(
            Arc::new(InMemoryRepository::new()),
            Arc::new(StaticSearch::default()),
        )
    }

    #[test]
    fn test_default_registry_matches_catalog() {
        let registry = registry();
        assert_eq!(registry.definitions(), catalog::definitions());
        assert_eq!(registry.list(), vec!["insert_record", "query_records", "web_search"]);
        assert!(registry.contains("web_search"));
        assert!(!registry.contains("delete_record"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let registry = registry();
        let result = registry.execute("delete_record", &Map::new()).await;
        assert!(matches!(result, Err(AgentError::UnknownTool(name)) if name == "delete_record"));
    }

    #[tokio::test]
    async fn test_known_tool_failures_become_envelopes() {
        let registry = registry();
        let args = json!({"table": "loans", "amount": 10}).as_object().cloned().unwrap();

        let result = registry.execute("insert_record", &args).await.unwrap();
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("Invalid table: loans"));
    }

    #[test]
    fn test_register_replaces_without_duplicating_order() {
        let mut registry = registry();
        registry.register(Arc::new(WebSearchTool::new(Arc::new(StaticSearch::default()))));
        assert_eq!(registry.list().len(), 3);
    }
}
