mod account;
mod config;
mod db;
mod errors;
mod extract;
mod job_applications;
mod llm_client;
mod models;
mod refinement;
mod resume;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StorageBackend};
use crate::db::create_pool;
use crate::llm_client::{ChatCompletion, LlmClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Postgres => {
            let url = config.database_url.as_deref().unwrap_or_default();
            Arc::new(PgStore::new(create_pool(url).await?))
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; nothing will survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let owner = store
        .ensure_owner(&config.owner_email, config.ai_calls_limit)
        .await?;
    info!(
        "Owner {} ({}) has {} AI calls left",
        owner.email, owner.id, owner.ai_calls_limit
    );

    // Initialize LLM client
    let llm: Option<Arc<dyn ChatCompletion>> = match &config.openai_api_key {
        Some(key) => {
            if !config.openai_key_looks_valid() {
                warn!("OPENAI_API_KEY does not look like an OpenAI key; refinement calls may fail");
            }
            let client = LlmClient::new(key.clone())?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(client))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; AI refinement is disabled");
            None
        }
    };

    let state = AppState {
        store,
        llm,
        config: config.clone(),
        owner_id: owner.id,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
