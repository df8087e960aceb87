use financial_agent::repository;
use financial_agent::{AgentTracer, FinancialAgent, Settings};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(settings: &Settings) {
    println!("\n{}", "=".repeat(60));
    println!("  FINANCIAL AGENT - Intelligent financial assistant");
    println!("{}", "=".repeat(60));
    println!("  Model: {}", settings.model_name);
    println!("  Reasoning effort: {}", settings.reasoning_effort);
    println!();
    println!("  Try:");
    println!("    - Añade un gasto de 50 en comida");
    println!("    - Muéstrame mis ahorros");
    println!("    - ¿Cuál es el precio del bitcoin hoy?");
    println!();
    println!("  Commands: 'reset' clears the conversation, 'help' shows this,");
    println!("            'exit' / 'quit' / 'salir' leave");
    println!("{}\n", "=".repeat(60));
}

fn prompt() -> std::io::Result<()> {
    print!("\n - You: ");
    std::io::stdout().flush()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;
    print_banner(&settings);

    let repository = repository::from_settings(&settings)?;
    if let Err(e) = repository.initialize_schema().await {
        eprintln!("Error initializing the agent: {}", e);
        std::process::exit(1);
    }

    let tracer = Arc::new(AgentTracer::new(settings.trace_console.unwrap_or(true)));
    let mut agent = FinancialAgent::from_settings(&settings, repository, tracer)?;
    info!("Agent initialized");
    println!("Agent initialized\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };

        // EOF or Ctrl-C
        let Some(line) = line else {
            println!("\n\nGoodbye!");
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "exit" | "quit" | "salir" => {
                println!("\nGoodbye!");
                break;
            }
            "reset" => {
                agent.reset_conversation().await;
                println!("Conversation reset.");
                continue;
            }
            "help" => {
                print_banner(&settings);
                continue;
            }
            _ => {}
        }

        println!();
        match agent.chat(input).await {
            Ok(response) => println!("\nAssistant: {}", response),
            Err(e) => {
                error!(error = %e, "Chat turn failed");
                println!("\nError: {}", e);
            }
        }
    }

    Ok(())
}
