mod assistant;
mod billing;
mod config;
mod db;
mod errors;
mod import;
mod llm_client;
mod models;
mod plan;
mod profile;
mod resumes;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assistant::session::SessionStore;
use crate::billing::BillingClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::import::linkedin::RapidApiFetcher;
use crate::llm_client::{EnvKeys, LlmClient};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ResumeForge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config).await?;

    // Initialize Redis (free-tier AI usage window)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(EnvKeys::from_config(&config));
    info!(
        "LLM client initialized (default model: {})",
        llm_client::DEFAULT_MODEL
    );

    // Initialize LinkedIn fetcher
    let linkedin = Arc::new(RapidApiFetcher::new(config.rapidapi_key.clone()));

    // Initialize billing client
    let billing = BillingClient::new(config.stripe_secret_key.clone());

    // Build app state
    let state = AppState {
        db,
        redis,
        llm,
        linkedin,
        billing,
        sessions: SessionStore::default(),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
