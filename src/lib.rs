//! Financial Agent
//!
//! A conversational assistant that records expenses, savings and investments
//! and answers market questions:
//! - Drives an LLM through a bounded tool-calling loop
//! - Exposes three tools: insert_record, query_records, web_search
//! - Persists records in Postgres (or memory for development)
//! - Records an observable trace of every decision
//!
//! LOOP:
//! USER → MODEL → (TOOL CALLS → TOOL RESULTS → MODEL)* → RESPONSE

pub mod agent;
pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod models;
pub mod repository;
pub mod search;
pub mod tools;
pub mod trace;

pub use error::{AgentError, Result};

// Re-export common types
pub use agent::FinancialAgent;
pub use config::Settings;
pub use conversation::{Conversation, Message, MessageRole};
pub use models::*;
pub use trace::{AgentTracer, TraceEntry, TraceKind};
