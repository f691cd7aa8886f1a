use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Only DATABASE_URL and REDIS_URL are required at startup. Provider keys
/// are optional; which ones must be present depends on the caller's plan
/// tier and chosen model, so absence is reported at call time instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub rust_log: String,
    /// Frontend origin used for billing redirect URLs.
    pub app_base_url: String,

    // Model provider keys (hosted tier)
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub groq_api_key: Option<String>,

    // LinkedIn profile API
    pub rapidapi_key: Option<String>,

    // Billing provider
    pub stripe_secret_key: Option<String>,
    pub stripe_pro_price_id: Option<String>,

    // Free-tier AI usage window
    pub ai_free_calls_per_window: u32,
    pub ai_free_window_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            db_max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u32>()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            deepseek_api_key: optional_env("DEEPSEEK_API_KEY"),
            groq_api_key: optional_env("GROQ_API_KEY"),
            rapidapi_key: optional_env("RAPIDAPI_KEY"),
            stripe_secret_key: optional_env("STRIPE_SECRET_KEY"),
            stripe_pro_price_id: optional_env("STRIPE_PRO_PRICE_ID"),
            ai_free_calls_per_window: std::env::var("AI_FREE_CALLS_PER_WINDOW")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<u32>()
                .context("AI_FREE_CALLS_PER_WINDOW must be a number")?,
            // 5 hours
            ai_free_window_secs: std::env::var("AI_FREE_WINDOW_SECS")
                .unwrap_or_else(|_| "18000".to_string())
                .parse::<i64>()
                .context("AI_FREE_WINDOW_SECS must be a number of seconds")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and empty are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
