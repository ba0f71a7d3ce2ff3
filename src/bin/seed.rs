use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use todo_api::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("failed to read configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO todo_items (title, description, is_done)
        VALUES
            ('Ship v1 API', 'Finalize docs and endpoint tests', FALSE),
            ('Prepare release notes', 'Collect changes from main branch', FALSE),
            ('Clean obsolete tasks', 'Remove finished items from the board', TRUE)
        ON CONFLICT (title) DO NOTHING
        "#,
    )
    .execute(&pool)
    .await
    .context("failed to insert seed records")?
    .rows_affected();

    println!("Seed data inserted successfully ({inserted} new rows)");
    Ok(())
}
