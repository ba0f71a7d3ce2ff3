use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use todo_api::{
    config::AppConfig,
    repository::{PgTodoRepository, TodoRepository},
};

/// Applies the schema the server would apply on startup, without serving.
#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("failed to read configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    PgTodoRepository::new(pool)
        .init()
        .await
        .context("failed to run migrations")?;

    println!("Migrations applied successfully");
    Ok(())
}
