//! Completion gateway
//!
//! Builds chat-completion requests from the conversation and the tool
//! catalog, sends them through an [`LlmProvider`], and normalizes the reply
//! into a [`Completion`] the agent loop can act on.

use crate::conversation::Message;
use crate::error::ProviderError;
use crate::models::ToolCallRequest;
use crate::tools::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub mod openai;
pub mod scripted;

pub use openai::OpenAiCompatProvider;
pub use scripted::ScriptedProvider;

//
// ================= Reasoning hint =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    None,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    /// Reasoning-token budget sent to the provider, `None` disables the hint
    pub fn budget_tokens(&self) -> Option<u32> {
        match self {
            ReasoningEffort::None => None,
            ReasoningEffort::Low => Some(1024),
            ReasoningEffort::Medium => Some(4096),
            ReasoningEffort::High => Some(8192),
        }
    }
}

impl FromStr for ReasoningEffort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(ReasoningEffort::None),
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            other => Err(format!("unknown reasoning effort '{}'", other)),
        }
    }
}

/// How the reasoning budget is spelled on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningDialect {
    /// `extra_body.google.thinking_config.thinking_budget` (Gemini's OpenAI endpoint)
    Gemini,
    /// Top-level `thinking: {type, budget_tokens}` (Anthropic-style gateways)
    Thinking,
}

impl ReasoningDialect {
    pub fn for_base_url(base_url: &str) -> Self {
        if base_url.contains("generativelanguage.googleapis.com") {
            ReasoningDialect::Gemini
        } else {
            ReasoningDialect::Thinking
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasoningEffort::None => "none",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Wire format =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_body: Option<ExtraBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireToolCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireFunction {
    pub name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThinkingConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub budget_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtraBody {
    pub google: GoogleOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleOptions {
    pub thinking_config: GoogleThinkingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleThinkingConfig {
    pub thinking_budget: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

fn function_type() -> String {
    "function".to_string()
}

impl WireMessage {
    fn from_message(message: &Message) -> Self {
        match message {
            Message::System { content } => Self::text("system", content),
            Message::User { content } => Self::text("user", content),
            Message::Assistant { content, tool_calls } => Self {
                role: "assistant".to_string(),
                content: content.clone(),
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls.iter().map(WireToolCall::from_request).collect())
                },
                tool_call_id: None,
            },
            Message::Tool {
                tool_call_id,
                content,
            } => Self {
                role: "tool".to_string(),
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: Some(tool_call_id.clone()),
            },
        }
    }

    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

impl WireToolCall {
    fn from_request(call: &ToolCallRequest) -> Self {
        Self {
            id: Some(call.id.clone()),
            kind: function_type(),
            function: WireFunction {
                name: call.name.clone(),
                arguments: Value::Object(call.arguments.clone()).to_string(),
            },
        }
    }
}

//
// ================= Provider seam =================
//

/// One request/response round-trip against an LLM service
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError>;
}

/// Normalized model reply
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: String,
    pub reasoning: Option<String>,
}

//
// ================= Gateway =================
//

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub model: String,
    pub temperature: f32,
    pub reasoning_effort: ReasoningEffort,
    pub reasoning_dialect: ReasoningDialect,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.7,
            reasoning_effort: ReasoningEffort::Low,
            reasoning_dialect: ReasoningDialect::Gemini,
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct CompletionGateway {
    provider: Arc<dyn LlmProvider>,
    config: GatewayConfig,
}

impl CompletionGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, config: GatewayConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn build_request(&self, messages: &[Message], tools: &[ToolDefinition]) -> ChatCompletionRequest {
        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            let wire = tools
                .iter()
                .map(|definition| WireTool {
                    kind: function_type(),
                    function: definition.clone(),
                })
                .collect();
            (Some(wire), Some("auto".to_string()))
        };

        let budget = self.config.reasoning_effort.budget_tokens();
        let (thinking, extra_body) = match (budget, self.config.reasoning_dialect) {
            (None, _) => (None, None),
            (Some(budget_tokens), ReasoningDialect::Thinking) => (
                Some(ThinkingConfig {
                    kind: "enabled".to_string(),
                    budget_tokens,
                }),
                None,
            ),
            (Some(thinking_budget), ReasoningDialect::Gemini) => (
                None,
                Some(ExtraBody {
                    google: GoogleOptions {
                        thinking_config: GoogleThinkingConfig { thinking_budget },
                    },
                }),
            ),
        };

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(WireMessage::from_message).collect(),
            temperature: self.config.temperature,
            tools,
            tool_choice,
            thinking,
            extra_body,
        }
    }

    /// Send the conversation to the model and normalize its reply
    pub async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Completion, ProviderError> {
        let request = self.build_request(messages, tools);

        debug!(
            model = %request.model,
            message_count = request.messages.len(),
            tool_count = tools.len(),
            "Sending completion request"
        );

        let response = tokio::time::timeout(self.config.timeout, self.provider.complete(request))
            .await
            .map_err(|_| {
                warn!(timeout = ?self.config.timeout, "Completion request timed out");
                ProviderError::Timeout(self.config.timeout)
            })??;

        normalize(response)
    }
}

/// Flatten the first choice of a provider reply into a [`Completion`]
pub fn normalize(response: ChatCompletionResponse) -> Result<Completion, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".to_string()))?;

    let message = choice.message;

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let arguments = parse_arguments(&call.function.name, &call.function.arguments)?;
            Ok(ToolCallRequest {
                id: call
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: call.function.name,
                arguments,
            })
        })
        .collect::<Result<Vec<_>, ProviderError>>()?;

    Ok(Completion {
        content: message.content.filter(|c| !c.trim().is_empty()),
        tool_calls,
        finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".to_string()),
        reasoning: message
            .reasoning_content
            .or(message.reasoning)
            .filter(|r| !r.trim().is_empty()),
    })
}

fn parse_arguments(tool_name: &str, raw: &str) -> Result<Map<String, Value>, ProviderError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ProviderError::MalformedResponse(format!(
            "arguments for {} are not an object: {}",
            tool_name, other
        ))),
        Err(e) => Err(ProviderError::MalformedResponse(format!(
            "arguments for {} are not valid JSON: {}",
            tool_name, e
        ))),
    }
}
