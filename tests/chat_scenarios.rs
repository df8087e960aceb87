//! End-to-end chat turns against scripted model replies

use financial_agent::agent::{FinancialAgent, ITERATION_LIMIT_FALLBACK};
use financial_agent::llm::{scripted, CompletionGateway, GatewayConfig, ReasoningEffort, ScriptedProvider};
use financial_agent::repository::{FinancialRepository, InMemoryRepository};
use financial_agent::search::{RawSearchResult, StaticSearch};
use financial_agent::tools::create_default_registry;
use financial_agent::{AgentTracer, Message, MessageRole, TableName, TraceKind};
use serde_json::{json, Value};
use std::sync::Arc;

struct Harness {
    agent: FinancialAgent,
    provider: Arc<ScriptedProvider>,
    repository: Arc<InMemoryRepository>,
}

fn harness_with(provider: ScriptedProvider, max_iterations: usize, effort: ReasoningEffort) -> Harness {
    let provider = Arc::new(provider);
    let repository = Arc::new(InMemoryRepository::new());
    let search = StaticSearch::new(vec![RawSearchResult {
        title: Some("Bitcoin price today".to_string()),
        href: Some("https://example.com/btc".to_string()),
        body: Some("BTC trades at 60,000 USD".to_string()),
    }]);

    let gateway = CompletionGateway::new(
        provider.clone(),
        GatewayConfig {
            reasoning_effort: effort,
            ..GatewayConfig::default()
        },
    );
    let agent = FinancialAgent::new(
        gateway,
        create_default_registry(repository.clone(), Arc::new(search)),
        Arc::new(AgentTracer::default()),
        "You are a financial assistant.",
        max_iterations,
    );

    Harness {
        agent,
        provider,
        repository,
    }
}

fn harness(provider: ScriptedProvider) -> Harness {
    harness_with(provider, 10, ReasoningEffort::Low)
}

fn tool_payload(message: &Message) -> Value {
    match message {
        Message::Tool { content, .. } => serde_json::from_str(content).unwrap(),
        other => panic!("expected a tool message, got {:?}", other),
    }
}

#[tokio::test]
async fn records_an_expense_and_confirms() {
    let provider = ScriptedProvider::new();
    provider.push_tool_calls(
        None,
        &[(
            "call_1",
            "insert_record",
            json!({"table": "expenses", "amount": 50, "category": "comida"}),
        )],
    );
    provider.push_text("Listo, he registrado un gasto de 50 en comida.");
    let mut h = harness(provider);

    let reply = h.agent.chat("Añade un gasto de 50 en comida").await.unwrap();

    assert_eq!(reply, "Listo, he registrado un gasto de 50 en comida.");
    assert_eq!(h.agent.conversation().len(), 5);

    let stored = h.repository.query(TableName::Expenses, None, 100).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].amount, 50.0);
    assert_eq!(stored[0].detail.label(), "comida");

    let payload = tool_payload(&h.agent.conversation().messages()[3]);
    assert_eq!(payload["success"], json!(true));
    assert_eq!(payload["record"]["amount"], json!(50.0));
}

#[tokio::test]
async fn rejected_amount_is_reported_and_nothing_is_stored() {
    let provider = ScriptedProvider::new();
    provider.push_tool_calls(
        None,
        &[(
            "call_1",
            "insert_record",
            json!({"table": "savings", "amount": -20, "goal": "vacaciones"}),
        )],
    );
    provider.push_text("El importe debe ser positivo.");
    let mut h = harness(provider);

    h.agent.chat("Ahorra -20 para vacaciones").await.unwrap();

    assert_eq!(h.repository.len(TableName::Savings).await, 0);
    let payload = tool_payload(&h.agent.conversation().messages()[3]);
    assert_eq!(payload["success"], json!(false));
    assert!(payload["error"].as_str().unwrap().contains("greater than zero"));
}

#[tokio::test]
async fn model_can_correct_itself_after_a_tool_error() {
    let provider = ScriptedProvider::new();
    provider.push_tool_calls(
        None,
        &[("call_1", "query_records", json!({"table": "gastos"}))],
    );
    provider.push_tool_calls(
        None,
        &[("call_2", "query_records", json!({"table": "expenses"}))],
    );
    provider.push_text("No tienes gastos registrados.");
    let mut h = harness(provider);

    let reply = h.agent.chat("¿Cuánto he gastado?").await.unwrap();

    assert_eq!(reply, "No tienes gastos registrados.");
    let messages = h.agent.conversation().messages();
    assert_eq!(tool_payload(&messages[3])["error"], json!("Invalid table: gastos"));
    assert_eq!(tool_payload(&messages[5])["count"], json!(0));
    assert_eq!(h.provider.call_count(), 3);
}

#[tokio::test]
async fn web_search_results_reach_the_model() {
    let provider = ScriptedProvider::new();
    provider.push_tool_calls(
        Some("Voy a buscarlo."),
        &[("call_1", "web_search", json!({"query": "precio bitcoin hoy"}))],
    );
    provider.push_text("El bitcoin cotiza a 60.000 USD.");
    let mut h = harness(provider);

    h.agent.chat("¿Cuál es el precio del bitcoin hoy?").await.unwrap();

    let requests = h.provider.requests();
    let tool_message = requests[1].messages.last().unwrap();
    assert_eq!(tool_message.role, "tool");
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));

    let payload: Value = serde_json::from_str(tool_message.content.as_deref().unwrap()).unwrap();
    assert_eq!(payload["results"][0]["url"], json!("https://example.com/btc"));
    assert_eq!(payload["results"][0]["snippet"], json!("BTC trades at 60,000 USD"));
}

#[tokio::test]
async fn endless_tool_requests_stop_at_the_iteration_bound() {
    let provider = ScriptedProvider::repeating(scripted::tool_call_response(
        None,
        &[("call_loop", "query_records", json!({"table": "investments"}))],
    ));
    let mut h = harness_with(provider, 4, ReasoningEffort::Low);

    let reply = h.agent.chat("Sigue consultando").await.unwrap();

    assert_eq!(reply, ITERATION_LIMIT_FALLBACK);
    assert_eq!(h.provider.call_count(), 4);
    // system, user, then one assistant/tool pair per iteration
    assert_eq!(h.agent.conversation().len(), 2 + 4 * 2);
    assert_eq!(h.agent.traces().await.last().unwrap().kind, TraceKind::Error);
}

#[tokio::test]
async fn reset_starts_a_fresh_thread() {
    let provider = ScriptedProvider::new();
    provider.push_text("Uno");
    provider.push_text("Dos");
    provider.push_text("Tres");
    let mut h = harness(provider);

    h.agent.chat("primero").await.unwrap();
    h.agent.chat("segundo").await.unwrap();
    h.agent.reset_conversation().await;
    h.agent.chat("tercero").await.unwrap();

    let requests = h.provider.requests();
    assert_eq!(requests[1].messages.len(), 4);

    let after_reset = &requests[2];
    assert_eq!(after_reset.messages.len(), 2);
    assert_eq!(after_reset.messages[0].role, "system");
    assert_eq!(after_reset.messages[1].content.as_deref(), Some("tercero"));

    let roles: Vec<MessageRole> = h.agent.conversation().messages().iter().map(Message::role).collect();
    assert_eq!(roles, vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]);
}

#[tokio::test]
async fn requests_carry_tools_and_reasoning_hint() {
    let provider = ScriptedProvider::new();
    provider.push_text("Hola");
    let mut h = harness_with(provider, 10, ReasoningEffort::High);

    h.agent.chat("Hola").await.unwrap();

    let request = &h.provider.requests()[0];
    let tools = request.tools.as_ref().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.function.name.as_str()).collect();
    assert_eq!(names, vec!["insert_record", "query_records", "web_search"]);
    assert_eq!(request.tool_choice.as_deref(), Some("auto"));
    let budget = &request.extra_body.as_ref().unwrap().google.thinking_config;
    assert_eq!(budget.thinking_budget, 8192);
    assert!(request.thinking.is_none());
}

#[tokio::test]
async fn no_reasoning_hint_when_disabled() {
    let provider = ScriptedProvider::new();
    provider.push_text("Hola");
    let mut h = harness_with(provider, 10, ReasoningEffort::None);

    h.agent.chat("Hola").await.unwrap();

    let body = serde_json::to_value(&h.provider.requests()[0]).unwrap();
    assert!(body.get("thinking").is_none());
    assert!(body.get("extra_body").is_none());
}
