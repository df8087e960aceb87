//! Scripted provider for development & testing
//!
//! Replays queued replies in order and records every request it was sent.
//! Keeps the agent functional without an LLM dependency.

use super::{
    ChatCompletionRequest, ChatCompletionResponse, Choice, LlmProvider, ResponseMessage, WireFunction,
    WireToolCall,
};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<ChatCompletionResponse, ProviderError>>>,
    repeat: Option<ChatCompletionResponse>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer with `response` forever once the queue runs dry
    pub fn repeating(response: ChatCompletionResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, response: ChatCompletionResponse) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Ok(response));
        }
    }

    pub fn push_error(&self, error: ProviderError) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(error));
        }
    }

    pub fn push_text(&self, content: &str) {
        self.push(text_response(content));
    }

    pub fn push_tool_calls(&self, content: Option<&str>, calls: &[(&str, &str, Value)]) {
        self.push(tool_call_response(content, calls));
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.replies.lock().ok().and_then(|mut replies| replies.pop_front());
        match (next, &self.repeat) {
            (Some(reply), _) => reply,
            (None, Some(response)) => Ok(response.clone()),
            (None, None) => Err(ProviderError::MalformedResponse(
                "scripted provider has no reply left".to_string(),
            )),
        }
    }
}

pub fn text_response(content: &str) -> ChatCompletionResponse {
    ChatCompletionResponse {
        choices: vec![Choice {
            message: ResponseMessage {
                content: Some(content.to_string()),
                ..ResponseMessage::default()
            },
            finish_reason: Some("stop".to_string()),
        }],
    }
}

/// Reply requesting `(id, tool name, arguments)` calls
pub fn tool_call_response(content: Option<&str>, calls: &[(&str, &str, Value)]) -> ChatCompletionResponse {
    let tool_calls = calls
        .iter()
        .map(|(id, name, arguments)| WireToolCall {
            id: Some(id.to_string()),
            kind: "function".to_string(),
            function: WireFunction {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        })
        .collect();

    ChatCompletionResponse {
        choices: vec![Choice {
            message: ResponseMessage {
                content: content.map(str::to_string),
                tool_calls: Some(tool_calls),
                ..ResponseMessage::default()
            },
            finish_reason: Some("tool_calls".to_string()),
        }],
    }
}
