//! Axum route handlers for the Resume API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{ResumeKind, ResumeRow};
use crate::resumes::listing::{paginate, sort_resumes, Page, SortDirection, SortKey, PAGE_SIZE};
use crate::resumes::store::{
    copy_resume, create_resume, delete_resume, fetch_resume, list_resumes, update_resume,
    CreateResumeRequest, ResumeUpdate,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListResumesQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub kind: ResumeKind,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateResumeRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub resume: ResumeUpdate,
}

#[derive(Debug, Deserialize)]
pub struct CopyResumeRequest {
    pub user_id: Uuid,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/resumes
///
/// Lists one kind of resume (base by default), sorted and paginated for the
/// dashboard. Pages are 1-based, 8 items each; out-of-range pages clamp.
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<ListResumesQuery>,
) -> Result<Json<Page<ResumeRow>>, AppError> {
    let resumes = list_resumes(&state.db, params.user_id, params.kind).await?;
    let sorted = sort_resumes(resumes, params.sort, params.direction);
    Ok(Json(paginate(&sorted, params.page, PAGE_SIZE)))
}

/// POST /api/v1/resumes
///
/// Creates a resume through any of the creation paths. Plan limits are
/// enforced inside the store before the insert.
pub async fn handle_create_resume(
    State(state): State<AppState>,
    Json(request): Json<CreateResumeRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = create_resume(&state.db, request).await?;
    Ok(Json(resume))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = fetch_resume(&state.db, id, params.user_id).await?;
    Ok(Json(resume))
}

/// PUT /api/v1/resumes/:id
///
/// Full-document save. The resume kind cannot be changed.
pub async fn handle_update_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateResumeRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = update_resume(&state.db, id, request.user_id, request.resume).await?;
    Ok(Json(resume))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    delete_resume(&state.db, id, params.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/resumes/:id/copy
///
/// Duplicates a resume under the same plan limits as creating one.
pub async fn handle_copy_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CopyResumeRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = copy_resume(&state.db, id, request.user_id).await?;
    Ok(Json(resume))
}
