//! Axum route handlers for the import pipeline.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::import::linkedin::linkedin_import_text;
use crate::import::normalize::convert_text_to_resume;
use crate::import::pdf::extract_pdf_text;
use crate::import::rate_limit::consume_ai_call;
use crate::llm_client::AiConfig;
use crate::models::resume::{ResumeKind, ResumeRow};
use crate::plan;
use crate::resumes::store::{create_resume, CreateResumeRequest, CreationMode};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ImportTextRequest {
    pub user_id: Uuid,
    pub raw_text: String,
    pub target_role: String,
    pub name: Option<String>,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Deserialize)]
pub struct ImportLinkedInRequest {
    pub user_id: Uuid,
    pub linkedin_url: String,
    pub target_role: String,
    pub name: Option<String>,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Serialize)]
pub struct PdfImportResponse {
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes/import-text
///
/// Converts pasted or PDF-extracted text into a new base resume. Free-tier
/// calls consume the AI usage window before the model is contacted.
pub async fn handle_import_text(
    State(state): State<AppState>,
    Json(request): Json<ImportTextRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    if request.raw_text.trim().is_empty() {
        return Err(AppError::Validation("raw_text cannot be empty".to_string()));
    }

    let user_plan = plan::get_plan(&state.db, request.user_id).await?;
    let is_pro = user_plan.tier.is_pro();
    if !is_pro {
        consume_ai_call(&state.redis, &state.config, request.user_id).await?;
    }

    let content = convert_text_to_resume(
        &state.llm,
        &request.ai,
        is_pro,
        &request.raw_text,
        Some(&request.target_role),
    )
    .await?;

    let resume = create_resume(
        &state.db,
        CreateResumeRequest {
            user_id: request.user_id,
            name: request.name,
            target_role: request.target_role,
            kind: ResumeKind::Base,
            mode: CreationMode::Fresh,
            selected_items: None,
            base_resume_id: None,
            job_id: None,
            content: Some(content),
        },
    )
    .await?;

    info!(
        "Imported resume {} from pasted text for user {}",
        resume.id, request.user_id
    );
    Ok(Json(resume))
}

/// POST /api/v1/resumes/import-linkedin
///
/// Fetches a public LinkedIn profile, frames the JSON as text, and runs the
/// same extraction as the text import.
pub async fn handle_import_linkedin(
    State(state): State<AppState>,
    Json(request): Json<ImportLinkedInRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    let url = request.linkedin_url.trim();
    if !url.contains("linkedin.com/") {
        return Err(AppError::Validation(
            "A valid LinkedIn profile URL is required".to_string(),
        ));
    }

    let user_plan = plan::get_plan(&state.db, request.user_id).await?;
    let is_pro = user_plan.tier.is_pro();
    if !is_pro {
        consume_ai_call(&state.redis, &state.config, request.user_id).await?;
    }

    let profile_json = state.linkedin.fetch_profile(url).await?;
    let text = linkedin_import_text(url, &profile_json);

    let mut content = convert_text_to_resume(
        &state.llm,
        &request.ai,
        is_pro,
        &text,
        Some(&request.target_role),
    )
    .await?;

    // The extraction may or may not carry the profile URL through; the source
    // URL is authoritative either way.
    if content.linkedin_url.is_none() {
        content.linkedin_url = Some(url.to_string());
    }

    let resume = create_resume(
        &state.db,
        CreateResumeRequest {
            user_id: request.user_id,
            name: request.name,
            target_role: request.target_role,
            kind: ResumeKind::Base,
            mode: CreationMode::Fresh,
            selected_items: None,
            base_resume_id: None,
            job_id: None,
            content: Some(content),
        },
    )
    .await?;

    info!(
        "Imported resume {} from LinkedIn for user {}",
        resume.id, request.user_id
    );
    Ok(Json(resume))
}

/// POST /api/v1/import/pdf
///
/// Accepts a multipart upload with a `file` part and returns the extracted
/// text. The client reviews the text and feeds it to the text import.
pub async fn handle_pdf_import(
    mut multipart: Multipart,
) -> Result<Json<PdfImportResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            let text = extract_pdf_text(data).await?;
            return Ok(Json(PdfImportResponse { text }));
        }
    }

    Err(AppError::Validation(
        "Missing 'file' field in multipart payload".to_string(),
    ))
}
