//! Create the database if it is missing, then create the financial tables.

use financial_agent::repository::{FinancialRepository, PgRepository};
use financial_agent::Settings;
use sqlx::postgres::PgPoolOptions;
use sqlx::Row;
use tracing::info;
use tracing_subscriber::EnvFilter;

async fn ensure_database(settings: &Settings) -> Result<(), sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&settings.maintenance_database_url())
        .await?;

    let exists = sqlx::query("SELECT 1 AS found FROM pg_database WHERE datname = $1")
        .bind(&settings.database_name)
        .fetch_optional(&pool)
        .await?
        .map(|row| row.try_get::<i32, _>("found").is_ok())
        .unwrap_or(false);

    if exists {
        info!(database = %settings.database_name, "Database already exists");
    } else {
        // Identifiers cannot be bound; quote and escape instead
        let name = settings.database_name.replace('"', "\"\"");
        sqlx::query(&format!("CREATE DATABASE \"{}\"", name))
            .execute(&pool)
            .await?;
        info!(database = %settings.database_name, "Database created");
    }

    pool.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;

    println!("Initializing database '{}'...", settings.database_name);
    ensure_database(&settings).await?;

    let repository = PgRepository::connect_lazy(&settings.database_url())?;
    repository.initialize_schema().await?;

    println!("Tables created: expenses, savings, investments");
    Ok(())
}
