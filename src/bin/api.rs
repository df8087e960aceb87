use financial_agent::{
    api::{start_server, ApiState},
    repository,
    AgentTracer, FinancialAgent, Settings,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;

    if settings.llm_api_key.is_empty() {
        warn!("LLM_API_KEY (or GEMINI_API_KEY) not set; model calls will be rejected");
    }

    info!("Financial Agent - API Server");
    info!("Port: {}", settings.api_port);
    info!("Model: {}", settings.model_name);

    // Create components
    let repository = repository::from_settings(&settings)?;
    if let Err(e) = repository.initialize_schema().await {
        // Health reports the database state; the server still starts
        warn!(error = %e, "Schema initialization failed");
    }

    let tracer = Arc::new(AgentTracer::new(settings.trace_console.unwrap_or(false)));
    let agent = FinancialAgent::from_settings(&settings, repository.clone(), tracer)?;

    info!("Agent initialized");
    info!("Starting API server...");

    start_server(ApiState::new(agent, repository), settings.api_port).await?;

    info!("API server stopped");
    Ok(())
}
