use anyhow::{bail, Context, Result};

pub const DEFAULT_OWNER_EMAIL: &str = "anonymous@example.com";
pub const DEFAULT_AI_CALLS_LIMIT: i32 = 50;

/// Which persistence backend the process runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Volatile, process-local store. Handy for local UI work without a database.
    Memory,
}

impl StorageBackend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => bail!("STORAGE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if a required variable is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub openai_api_key: Option<String>,
    /// The single fixed owner every document belongs to.
    pub owner_email: String,
    pub ai_calls_limit: i32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let storage = StorageBackend::parse(
            &std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "postgres".to_string()),
        )?;
        let database_url = match storage {
            StorageBackend::Postgres => Some(require_env("DATABASE_URL")?),
            StorageBackend::Memory => optional_env("DATABASE_URL"),
        };

        Ok(Config {
            storage,
            database_url,
            openai_api_key: optional_env("OPENAI_API_KEY"),
            owner_email: optional_env("ANONYMOUS_OWNER_EMAIL")
                .unwrap_or_else(|| DEFAULT_OWNER_EMAIL.to_string()),
            ai_calls_limit: match optional_env("AI_CALLS_LIMIT") {
                Some(raw) => raw
                    .parse::<i32>()
                    .context("AI_CALLS_LIMIT must be an integer")?,
                None => DEFAULT_AI_CALLS_LIMIT,
            },
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Cheap sanity check on the key shape; catches pasted placeholders early.
    pub fn openai_key_looks_valid(&self) -> bool {
        self.openai_api_key
            .as_deref()
            .map(|k| k.starts_with("sk-") && k.len() >= 20)
            .unwrap_or(false)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            storage: StorageBackend::Memory,
            database_url: None,
            openai_api_key: Some("sk-test-0000000000000000000000".to_string()),
            owner_email: DEFAULT_OWNER_EMAIL.to_string(),
            ai_calls_limit: DEFAULT_AI_CALLS_LIMIT,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
