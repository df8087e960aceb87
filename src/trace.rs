//! Agent trace recorder
//!
//! Append-only, timestamped log of what the agent thought and did during a
//! chat turn. Purely observational: nothing here feeds back into control flow.

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

const STRING_PREVIEW_LEN: usize = 200;
const OBJECT_PREVIEW_LEN: usize = 300;
const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Thinking,
    ToolCall,
    ToolResult,
    Response,
    Error,
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TraceKind::Thinking => "THINKING",
            TraceKind::ToolCall => "TOOL_CALL",
            TraceKind::ToolResult => "TOOL_RESULT",
            TraceKind::Response => "RESPONSE",
            TraceKind::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TraceKind,
    pub message: String,
    pub data: Option<Value>,
}

/// Trace storage, shareable between the agent and the HTTP layer
pub struct AgentTracer {
    entries: Arc<RwLock<Vec<TraceEntry>>>,
    console: bool,
}

impl AgentTracer {
    /// `console` turns on coloured rendering to stdout
    pub fn new(console: bool) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            console,
        }
    }

    pub async fn record(&self, kind: TraceKind, message: impl Into<String>, data: Option<Value>) {
        let entry = TraceEntry {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            data,
        };

        debug!(kind = %entry.kind, message = %entry.message, "agent trace");

        if self.console {
            render(&entry);
        }

        self.entries.write().await.push(entry);
    }

    /// Snapshot of every entry recorded so far
    pub async fn entries(&self) -> Vec<TraceEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for AgentTracer {
    fn default() -> Self {
        Self::new(false)
    }
}

fn render(entry: &TraceEntry) {
    let rule = "─".repeat(RULE_WIDTH);
    let header = format!("[{}]", entry.kind);

    let mut lines = vec![
        String::new(),
        rule.clone(),
        format!("{} {}", header.bold(), entry.message),
    ];

    match &entry.data {
        Some(Value::Object(fields)) => {
            for (key, value) in fields {
                lines.push(format!("  └─ {}: {}", key, format_value(value)));
            }
        }
        Some(other) => lines.push(format!("  └─ {}", format_value(other))),
        None => {}
    }
    lines.push(rule);

    let text = lines.join("\n");
    match entry.kind {
        TraceKind::Thinking => println!("{}", text.blue()),
        TraceKind::ToolCall => println!("{}", text.yellow()),
        TraceKind::ToolResult => println!("{}", text.green()),
        TraceKind::Response => println!("{}", text.magenta()),
        TraceKind::Error => println!("{}", text.red()),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Object(_) => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            let pretty = truncate(&pretty, OBJECT_PREVIEW_LEN);
            if pretty.contains('\n') {
                let indented: Vec<&str> = pretty.lines().collect();
                format!("\n      {}", indented.join("\n      "))
            } else {
                pretty
            }
        }
        Value::String(s) => truncate(s, STRING_PREVIEW_LEN),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
