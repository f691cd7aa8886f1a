use std::sync::Arc;

use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::assistant::session::SessionStore;
use crate::billing::BillingClient;
use crate::config::Config;
use crate::import::linkedin::LinkedInFetcher;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Redis backs the free-tier AI usage window.
    pub redis: RedisClient,
    pub llm: LlmClient,
    /// Pluggable LinkedIn profile source. Default: RapidApiFetcher.
    pub linkedin: Arc<dyn LinkedInFetcher>,
    pub billing: BillingClient,
    /// Assistant edit sessions. In-memory and per process.
    pub sessions: SessionStore,
    pub config: Config,
}
