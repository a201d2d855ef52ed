use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::llm_client::ChatCompletion;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// `None` when no OpenAI key is configured; refinement then answers with an upstream error.
    pub llm: Option<Arc<dyn ChatCompletion>>,
    pub config: Config,
    /// The single owner every resume belongs to, resolved once at startup.
    pub owner_id: Uuid,
}
