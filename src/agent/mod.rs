//! Conversational agent - implements the tool-calling loop
//!
//! USER → MODEL → (TOOL CALLS → TOOL RESULTS → MODEL)* → RESPONSE

use crate::config::Settings;
use crate::conversation::{Conversation, Message};
use crate::error::AgentError;
use crate::llm::{CompletionGateway, GatewayConfig, OpenAiCompatProvider, ReasoningDialect};
use crate::repository::FinancialRepository;
use crate::search::DuckDuckGoSearch;
use crate::tools::{create_default_registry, ToolRegistry};
use crate::trace::{AgentTracer, TraceEntry, TraceKind};
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Returned when the model answers with neither text nor tool calls
pub const NO_ANSWER_FALLBACK: &str = "I'm not sure how to help with that.";

/// Returned when the model is still requesting tools after the last iteration
pub const ITERATION_LIMIT_FALLBACK: &str =
    "I reached the maximum number of operations. Please try again.";

/// Owns one conversation thread and drives it through the model and tools.
///
/// Not internally synchronized: callers sharing an agent must serialize
/// `chat` calls (the HTTP layer wraps it in a mutex).
pub struct FinancialAgent {
    gateway: CompletionGateway,
    registry: ToolRegistry,
    tracer: Arc<AgentTracer>,
    system_prompt: String,
    max_iterations: usize,
    conversation: Conversation,
}

impl FinancialAgent {
    pub fn new(
        gateway: CompletionGateway,
        registry: ToolRegistry,
        tracer: Arc<AgentTracer>,
        system_prompt: impl Into<String>,
        max_iterations: usize,
    ) -> Self {
        let system_prompt = system_prompt.into();
        let conversation = Conversation::new(&system_prompt);

        Self {
            gateway,
            registry,
            tracer,
            system_prompt,
            max_iterations: max_iterations.max(1),
            conversation,
        }
    }

    /// Wire the production collaborators described by `settings`
    pub fn from_settings(
        settings: &Settings,
        repository: Arc<dyn FinancialRepository>,
        tracer: Arc<AgentTracer>,
    ) -> Result<Self> {
        let provider = OpenAiCompatProvider::new(
            settings.llm_base_url.clone(),
            settings.llm_api_key.clone(),
            settings.llm_timeout,
        )?;
        let search = DuckDuckGoSearch::new(settings.search_base_url.clone())?;

        let gateway = CompletionGateway::new(
            Arc::new(provider),
            GatewayConfig {
                model: settings.model_name.clone(),
                temperature: settings.temperature,
                reasoning_effort: settings.reasoning_effort,
                reasoning_dialect: ReasoningDialect::for_base_url(&settings.llm_base_url),
                timeout: settings.llm_timeout,
            },
        );
        let registry = create_default_registry(repository, Arc::new(search));

        Ok(Self::new(
            gateway,
            registry,
            tracer,
            settings.load_system_prompt(),
            settings.max_iterations as usize,
        ))
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn tracer(&self) -> Arc<AgentTracer> {
        self.tracer.clone()
    }

    pub async fn traces(&self) -> Vec<TraceEntry> {
        self.tracer.entries().await
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run one user turn to completion and return the reply text.
    ///
    /// Provider failures and unknown tool names propagate; everything that
    /// happens inside a tool is reported to the model instead.
    pub async fn chat(&mut self, user_message: &str) -> Result<String> {
        info!(
            history = self.conversation.len(),
            "Agent: processing user message"
        );

        self.conversation.push(Message::user(user_message));
        self.tracer
            .record(
                TraceKind::Thinking,
                "Processing user message",
                Some(json!({ "message": user_message })),
            )
            .await;

        let definitions = self.registry.definitions();

        for iteration in 1..=self.max_iterations {
            self.tracer
                .record(
                    TraceKind::Thinking,
                    format!("Consulting model (iteration {}/{})", iteration, self.max_iterations),
                    None,
                )
                .await;

            let completion = match self
                .gateway
                .complete(self.conversation.messages(), &definitions)
                .await
            {
                Ok(completion) => completion,
                Err(e) => {
                    self.tracer
                        .record(TraceKind::Error, format!("Model call failed: {}", e), None)
                        .await;
                    return Err(e.into());
                }
            };

            debug!(
                iteration,
                finish_reason = %completion.finish_reason,
                tool_calls = completion.tool_calls.len(),
                "Model replied"
            );

            if let Some(reasoning) = &completion.reasoning {
                self.tracer
                    .record(
                        TraceKind::Thinking,
                        "Model reasoning",
                        Some(Value::String(reasoning.clone())),
                    )
                    .await;
            }

            // === RESPOND ===
            if completion.tool_calls.is_empty() {
                return match completion.content {
                    Some(content) => {
                        self.conversation.push(Message::assistant(content.clone()));
                        self.tracer
                            .record(TraceKind::Response, content.clone(), None)
                            .await;
                        info!(iteration, "Agent: turn complete");
                        Ok(content)
                    }
                    None => {
                        warn!(iteration, "Model returned neither content nor tool calls");
                        Ok(NO_ANSWER_FALLBACK.to_string())
                    }
                };
            }

            if let Some(content) = &completion.content {
                self.tracer
                    .record(TraceKind::Thinking, content.clone(), None)
                    .await;
            }

            // Reject the whole turn before recording it, so the history never
            // holds a tool call without its answer.
            if let Some(unknown) = completion
                .tool_calls
                .iter()
                .find(|call| !self.registry.contains(&call.name))
            {
                let name = unknown.name.clone();
                self.tracer
                    .record(
                        TraceKind::Error,
                        format!("Model requested unknown tool: {}", name),
                        None,
                    )
                    .await;
                return Err(AgentError::UnknownTool(name));
            }

            // === EXECUTE ===
            let names: Vec<&str> = completion
                .tool_calls
                .iter()
                .map(|call| call.name.as_str())
                .collect();
            self.tracer
                .record(
                    TraceKind::Thinking,
                    format!("Model requested tools: {}", names.join(", ")),
                    None,
                )
                .await;

            let tool_calls = completion.tool_calls.clone();
            self.conversation
                .push(Message::assistant_tool_calls(completion.content, completion.tool_calls));

            for call in tool_calls {
                self.tracer
                    .record(
                        TraceKind::ToolCall,
                        format!("Calling {}", call.name),
                        Some(Value::Object(call.arguments.clone())),
                    )
                    .await;

                let result = self.registry.execute(&call.name, &call.arguments).await?;
                let payload = result.to_value();

                let outcome = if result.is_success() { "success" } else { "error" };
                self.tracer
                    .record(
                        TraceKind::ToolResult,
                        format!("{} -> {}", call.name, outcome),
                        Some(payload.clone()),
                    )
                    .await;

                self.conversation
                    .push(Message::tool(call.id, payload.to_string()));
            }
        }

        warn!(max_iterations = self.max_iterations, "Agent: iteration limit reached");
        self.tracer
            .record(
                TraceKind::Error,
                format!("Iteration limit reached ({})", self.max_iterations),
                None,
            )
            .await;

        Ok(ITERATION_LIMIT_FALLBACK.to_string())
    }

    /// Drop all history except the system prompt and clear the traces
    pub async fn reset_conversation(&mut self) {
        self.conversation.reset(&self.system_prompt);
        self.tracer.clear().await;
        info!("Agent: conversation reset");
    }
}
