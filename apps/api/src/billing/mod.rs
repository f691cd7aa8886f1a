//! Subscription reads and hosted billing flows.
//!
//! The `subscriptions` table is written by the billing provider's webhook
//! processor, which runs outside this service. Here we only read the mirrored
//! plan and status, and create hosted checkout/portal sessions that redirect
//! the user to Stripe.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::subscription::SubscriptionRow;

pub mod handlers;

const STRIPE_API_URL: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct BillingClient {
    client: reqwest::Client,
    secret_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    url: Option<String>,
}

impl BillingClient {
    pub fn new(secret_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            secret_key,
        }
    }

    fn secret_key(&self) -> Result<&str, AppError> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| AppError::Billing("STRIPE_SECRET_KEY is not configured".to_string()))
    }

    /// Creates a subscription checkout session and returns its redirect URL.
    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        price_id: &str,
        base_url: &str,
    ) -> Result<String, AppError> {
        let params: Vec<(&str, String)> = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("client_reference_id", user_id.to_string()),
            (
                "success_url",
                format!("{base_url}/subscription/checkout/success"),
            ),
            ("cancel_url", format!("{base_url}/subscription")),
        ];
        self.create_session("/checkout/sessions", &params, "Checkout")
            .await
    }

    /// Creates a customer portal session for managing an existing
    /// subscription.
    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        base_url: &str,
    ) -> Result<String, AppError> {
        let params: Vec<(&str, String)> = vec![
            ("customer", customer_id.to_string()),
            ("return_url", format!("{base_url}/settings")),
        ];
        self.create_session("/billing_portal/sessions", &params, "Portal")
            .await
    }

    async fn create_session(
        &self,
        path: &str,
        params: &[(&str, String)],
        label: &str,
    ) -> Result<String, AppError> {
        let key = self.secret_key()?;
        let response = self
            .client
            .post(format!("{STRIPE_API_URL}{path}"))
            .bearer_auth(key)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Billing(format!("{label} session request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Stripe returned {status}: {body}");
            return Err(AppError::Billing(format!(
                "{label} session creation failed (status {status})"
            )));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Billing(format!("{label} session response unreadable: {e}")))?;
        session.url.ok_or_else(|| {
            AppError::Billing(format!("{label} session response missing redirect URL"))
        })
    }
}

/// Reads the mirrored subscription row, if the user has ever had one.
pub async fn get_subscription(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<SubscriptionRow>, AppError> {
    let row = sqlx::query_as::<_, SubscriptionRow>(
        "SELECT * FROM subscriptions WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
