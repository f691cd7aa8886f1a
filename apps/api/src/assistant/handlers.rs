//! Axum route handlers for assistant edit sessions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assistant::session::{
    accept_suggestion, apply_tool, reject_suggestion, undo_modification, ToolOutcome,
};
use crate::assistant::tools::{parse_tool_call, RawToolCall};
use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::resumes::handlers::UserIdQuery;
use crate::resumes::store::{fetch_resume, update_resume, ResumeUpdate};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OpenSessionResponse {
    pub session_id: Uuid,
    pub resume: ResumeRow,
}

#[derive(Debug, Deserialize)]
pub struct ToolRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub call: RawToolCall,
}

#[derive(Debug, Deserialize)]
pub struct SessionActionRequest {
    pub user_id: Uuid,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes/:id/assistant
pub async fn handle_open_session(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<Json<OpenSessionResponse>, AppError> {
    let resume = fetch_resume(&state.db, resume_id, request.user_id).await?;
    let session_id = state.sessions.open(resume.clone()).await;

    tracing::info!(%session_id, %resume_id, "Opened assistant session");
    Ok(Json(OpenSessionResponse { session_id, resume }))
}

/// POST /api/v1/assistant/:session_id/tool
pub async fn handle_tool_call(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ToolRequest>,
) -> Result<Json<ToolOutcome>, AppError> {
    let outcome = state
        .sessions
        .with_session(session_id, request.user_id, |session| {
            let call = parse_tool_call(&request.call, &session.resume)?;
            Ok(apply_tool(session, call))
        })
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/assistant/:session_id/suggestions/:suggestion_id/accept
pub async fn handle_accept_suggestion(
    State(state): State<AppState>,
    Path((session_id, suggestion_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SessionActionRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = state
        .sessions
        .with_session(session_id, request.user_id, |session| {
            accept_suggestion(session, suggestion_id)?;
            Ok(session.resume.clone())
        })
        .await?;
    Ok(Json(resume))
}

/// POST /api/v1/assistant/:session_id/suggestions/:suggestion_id/reject
pub async fn handle_reject_suggestion(
    State(state): State<AppState>,
    Path((session_id, suggestion_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SessionActionRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = state
        .sessions
        .with_session(session_id, request.user_id, |session| {
            reject_suggestion(session, suggestion_id)?;
            Ok(session.resume.clone())
        })
        .await?;
    Ok(Json(resume))
}

/// POST /api/v1/assistant/:session_id/undo
pub async fn handle_undo(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SessionActionRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = state
        .sessions
        .with_session(session_id, request.user_id, |session| {
            undo_modification(session)?;
            Ok(session.resume.clone())
        })
        .await?;
    Ok(Json(resume))
}

/// POST /api/v1/assistant/:session_id/save
///
/// Persists the working document, then resets the session's undo stack and
/// pending suggestions. The database write happens between the two session
/// accesses so the store lock is never held across an await.
pub async fn handle_save(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SessionActionRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    let working = state
        .sessions
        .with_session(session_id, request.user_id, |session| {
            Ok(session.resume.clone())
        })
        .await?;

    let saved = update_resume(
        &state.db,
        working.id,
        request.user_id,
        ResumeUpdate::from_row(&working),
    )
    .await?;

    let response = saved.clone();
    state
        .sessions
        .with_session(session_id, request.user_id, move |session| {
            session.resume = saved;
            session.snapshots.clear();
            session.pending.clear();
            Ok(())
        })
        .await?;

    tracing::info!(%session_id, resume_id = %response.id, "Saved assistant session");
    Ok(Json(response))
}

/// DELETE /api/v1/assistant/:session_id
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    state.sessions.close(session_id, query.user_id).await?;
    tracing::info!(%session_id, "Closed assistant session");
    Ok(StatusCode::NO_CONTENT)
}
