//! LinkedIn profile acquisition through the RapidAPI scraping endpoint.
//!
//! The fetched JSON is never parsed field-by-field; it is framed as text and
//! handed to the same model extraction used for pasted resumes.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::errors::AppError;
use crate::llm_client::has_credential_marker;

const LINKEDIN_API_HOST: &str = "linkedin-api8.p.rapidapi.com";

/// Fetches raw LinkedIn profile JSON by public profile URL.
///
/// A trait so handlers and tests can swap out the network implementation.
#[async_trait]
pub trait LinkedInFetcher: Send + Sync {
    async fn fetch_profile(&self, url: &str) -> Result<Value, AppError>;
}

pub struct RapidApiFetcher {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl RapidApiFetcher {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl LinkedInFetcher for RapidApiFetcher {
    async fn fetch_profile(&self, url: &str) -> Result<Value, AppError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::AiCredentials("RAPIDAPI_KEY is not configured".to_string())
        })?;

        let response = self
            .client
            .get(format!("https://{LINKEDIN_API_HOST}/get-profile-data-by-url"))
            .query(&[("url", url)])
            .header("x-rapidapi-key", api_key)
            .header("x-rapidapi-host", LINKEDIN_API_HOST)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("LinkedIn request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LinkedIn API returned {status}: {body}");
            if status.as_u16() == 429 {
                return Err(AppError::RateLimited {
                    message: "Rate limit exceeded. Try again later.".to_string(),
                    retry_after_secs: None,
                });
            }
            if status.as_u16() == 401 || status.as_u16() == 403 || has_credential_marker(&body) {
                return Err(AppError::AiCredentials(
                    "LinkedIn API rejected the configured key".to_string(),
                ));
            }
            return Err(AppError::Internal(anyhow::anyhow!(
                "LinkedIn API request failed with status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid LinkedIn response: {e}")))
    }
}

/// Frames fetched profile JSON with its source URL for the extraction model.
pub fn linkedin_import_text(url: &str, profile: &Value) -> String {
    format!(
        "LinkedIn Profile URL: {url}\n\nLinkedIn Profile Data:\n{}",
        serde_json::to_string_pretty(profile).unwrap_or_default()
    )
}
