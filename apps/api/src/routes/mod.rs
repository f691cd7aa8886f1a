pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::assistant::handlers as assistant;
use crate::billing::handlers as billing;
use crate::import::handlers as import;
use crate::profile::handlers as profile;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Profile API
        .route(
            "/api/v1/profile",
            get(profile::handle_get_profile).put(profile::handle_update_profile),
        )
        .route(
            "/api/v1/profile/reset",
            post(profile::handle_reset_profile),
        )
        .route(
            "/api/v1/profile/import",
            post(profile::handle_import_profile),
        )
        // Resume API
        .route(
            "/api/v1/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_create_resume),
        )
        .route(
            "/api/v1/resumes/import-text",
            post(import::handle_import_text),
        )
        .route(
            "/api/v1/resumes/import-linkedin",
            post(import::handle_import_linkedin),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resumes::handle_get_resume)
                .put(resumes::handle_update_resume)
                .delete(resumes::handle_delete_resume),
        )
        .route("/api/v1/resumes/:id/copy", post(resumes::handle_copy_resume))
        // Assistant API
        .route(
            "/api/v1/resumes/:id/assistant",
            post(assistant::handle_open_session),
        )
        .route(
            "/api/v1/assistant/:session_id",
            delete(assistant::handle_close_session),
        )
        .route(
            "/api/v1/assistant/:session_id/tool",
            post(assistant::handle_tool_call),
        )
        .route(
            "/api/v1/assistant/:session_id/suggestions/:suggestion_id/accept",
            post(assistant::handle_accept_suggestion),
        )
        .route(
            "/api/v1/assistant/:session_id/suggestions/:suggestion_id/reject",
            post(assistant::handle_reject_suggestion),
        )
        .route(
            "/api/v1/assistant/:session_id/undo",
            post(assistant::handle_undo),
        )
        .route(
            "/api/v1/assistant/:session_id/save",
            post(assistant::handle_save),
        )
        // Import API
        .route("/api/v1/import/pdf", post(import::handle_pdf_import))
        // Billing API
        .route("/api/v1/plan", get(billing::handle_get_plan))
        .route("/api/v1/subscription", get(billing::handle_get_subscription))
        .route(
            "/api/v1/subscription/checkout",
            post(billing::handle_checkout),
        )
        .route(
            "/api/v1/subscription/portal",
            post(billing::handle_portal),
        )
        .with_state(state)
}
