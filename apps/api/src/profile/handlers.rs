//! Axum route handlers for the Profile API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::import::normalize::convert_text_to_resume;
use crate::import::rate_limit::consume_ai_call;
use crate::llm_client::AiConfig;
use crate::models::profile::ProfileRow;
use crate::plan;
use crate::profile::store::{
    ensure_profile, import_into_profile, reset_profile, update_profile, ProfileSeed, ProfileUpdate,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub seed: ProfileSeed,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub profile: ProfileUpdate,
}

#[derive(Debug, Deserialize)]
pub struct ResetProfileRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ImportProfileRequest {
    pub user_id: Uuid,
    pub raw_text: String,
    #[serde(default)]
    pub ai: AiConfig,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/profile
///
/// Fetches the caller's profile, creating an empty one on first sight.
/// Optional first_name / last_name / email query params seed the new row
/// from auth metadata.
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Query(params): Query<ProfileQuery>,
) -> Result<Json<ProfileRow>, AppError> {
    let profile = ensure_profile(&state.db, params.user_id, &params.seed).await?;
    Ok(Json(profile))
}

/// PUT /api/v1/profile
///
/// Full-document save. Collections must be submitted complete; duplicate
/// identity keys collapse server-side.
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileRow>, AppError> {
    let profile = update_profile(&state.db, request.user_id, request.profile).await?;
    Ok(Json(profile))
}

/// POST /api/v1/profile/reset
///
/// Clears every field and collection but keeps the row.
pub async fn handle_reset_profile(
    State(state): State<AppState>,
    Json(request): Json<ResetProfileRequest>,
) -> Result<Json<ProfileRow>, AppError> {
    let profile = reset_profile(&state.db, request.user_id).await?;
    Ok(Json(profile))
}

/// POST /api/v1/profile/import
///
/// Normalizes pasted resume text with the configured model and merges the
/// result into the profile. Free-tier calls consume the AI usage window.
pub async fn handle_import_profile(
    State(state): State<AppState>,
    Json(request): Json<ImportProfileRequest>,
) -> Result<Json<ProfileRow>, AppError> {
    if request.raw_text.trim().is_empty() {
        return Err(AppError::Validation("raw_text cannot be empty".to_string()));
    }

    let user_plan = plan::get_plan(&state.db, request.user_id).await?;
    let is_pro = user_plan.tier.is_pro();
    if !is_pro {
        consume_ai_call(&state.redis, &state.config, request.user_id).await?;
    }

    let content =
        convert_text_to_resume(&state.llm, &request.ai, is_pro, &request.raw_text, None).await?;
    let profile = import_into_profile(&state.db, request.user_id, content).await?;
    Ok(Json(profile))
}
