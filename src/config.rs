use anyhow::{Context, Result};
use std::env;

use crate::{state::ApiSettings, validation::PaginationParsing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    Memory,
}

impl DatabaseBackend {
    fn from_env(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "in-memory" | "inmemory" => Ok(Self::Memory),
            _ => Err(anyhow::anyhow!(
                "DATABASE_BACKEND must be one of: postgres, memory"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_backend: DatabaseBackend,
    pub database_url: String,
    pub db_max_connections: u32,
    pub strict_pagination: bool,
    pub decrement_gauge_on_delete: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("APP_PORT must be a valid u16")?;

        let database_backend = DatabaseBackend::from_env(
            &env::var("DATABASE_BACKEND").unwrap_or_else(|_| "postgres".to_string()),
        )?;

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => postgres_url(
                &env_or("DB_HOST", "localhost"),
                &env_or("DB_PORT", "5432"),
                &env_or("DB_USER", "postgres"),
                &env_or("DB_PASS", "postgres"),
                &env_or("DB_NAME", "todo_db"),
            ),
        };

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid u32")?;

        let strict_pagination = parse_flag(&env_or("STRICT_PAGINATION", "false"))
            .context("STRICT_PAGINATION must be a boolean")?;

        let decrement_gauge_on_delete = parse_flag(&env_or("DECREMENT_GAUGE_ON_DELETE", "false"))
            .context("DECREMENT_GAUGE_ON_DELETE must be a boolean")?;

        Ok(Self {
            host,
            port,
            database_backend,
            database_url,
            db_max_connections,
            strict_pagination,
            decrement_gauge_on_delete,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            pagination: if self.strict_pagination {
                PaginationParsing::Strict
            } else {
                PaginationParsing::Lenient
            },
            decrement_gauge_on_delete: self.decrement_gauge_on_delete,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn postgres_url(host: &str, port: &str, user: &str, password: &str, database: &str) -> String {
    format!("postgres://{user}:{password}@{host}:{port}/{database}")
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow::anyhow!("unrecognized flag value `{other}`")),
    }
}
