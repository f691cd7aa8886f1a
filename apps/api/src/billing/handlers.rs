//! Axum route handlers for subscription and plan reads.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::get_subscription;
use crate::errors::AppError;
use crate::models::resume::ResumeKind;
use crate::models::subscription::SubscriptionRow;
use crate::plan::{allows_creation, get_plan, PlanTier};
use crate::resumes::handlers::UserIdQuery;
use crate::resumes::store::count_resumes;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription_plan: String,
    pub subscription_status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

impl SubscriptionResponse {
    /// Users without a subscription row read as free and active.
    fn from_row(row: Option<SubscriptionRow>) -> Self {
        match row {
            Some(row) => Self {
                subscription_plan: row.subscription_plan,
                subscription_status: row.subscription_status,
                current_period_end: row.current_period_end,
                trial_end: row.trial_end,
                stripe_customer_id: row.stripe_customer_id,
                stripe_subscription_id: row.stripe_subscription_id,
            },
            None => Self {
                subscription_plan: "free".to_string(),
                subscription_status: "active".to_string(),
                current_period_end: None,
                trial_end: None,
                stripe_customer_id: None,
                stripe_subscription_id: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub tier: PlanTier,
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub can_create_base: bool,
    pub can_create_tailored: bool,
    pub base_count: i64,
    pub tailored_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub price_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PortalRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RedirectResponse {
    pub url: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/subscription
pub async fn handle_get_subscription(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let row = get_subscription(&state.db, query.user_id).await?;
    Ok(Json(SubscriptionResponse::from_row(row)))
}

/// GET /api/v1/plan
///
/// Plan tier plus the creation headroom the client needs to gate its UI. The
/// server re-checks limits on every create regardless.
pub async fn handle_get_plan(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<PlanResponse>, AppError> {
    let plan = get_plan(&state.db, query.user_id).await?;
    let base_count = count_resumes(&state.db, query.user_id, ResumeKind::Base).await?;
    let tailored_count = count_resumes(&state.db, query.user_id, ResumeKind::Tailored).await?;

    Ok(Json(PlanResponse {
        tier: plan.tier,
        status: plan.status,
        current_period_end: plan.current_period_end,
        can_create_base: allows_creation(plan.tier, ResumeKind::Base, base_count),
        can_create_tailored: allows_creation(plan.tier, ResumeKind::Tailored, tailored_count),
        base_count,
        tailored_count,
    }))
}

/// POST /api/v1/subscription/checkout
pub async fn handle_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<RedirectResponse>, AppError> {
    let price_id = request
        .price_id
        .or_else(|| state.config.stripe_pro_price_id.clone())
        .ok_or_else(|| AppError::Validation("price_id is required".to_string()))?;

    let url = state
        .billing
        .create_checkout_session(request.user_id, &price_id, &state.config.app_base_url)
        .await?;

    tracing::info!(user_id = %request.user_id, "Created checkout session");
    Ok(Json(RedirectResponse { url }))
}

/// POST /api/v1/subscription/portal
pub async fn handle_portal(
    State(state): State<AppState>,
    Json(request): Json<PortalRequest>,
) -> Result<Json<RedirectResponse>, AppError> {
    let customer_id = get_subscription(&state.db, request.user_id)
        .await?
        .and_then(|row| row.stripe_customer_id)
        .ok_or_else(|| AppError::Validation("No billing customer on file".to_string()))?;

    let url = state
        .billing
        .create_portal_session(&customer_id, &state.config.app_base_url)
        .await?;
    Ok(Json(RedirectResponse { url }))
}
