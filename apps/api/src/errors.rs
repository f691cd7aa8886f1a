use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Free-tier creation ceiling hit. Carries the user-facing limit message.
    #[error("Plan limit reached: {0}")]
    PlanLimit(String),

    /// Missing or rejected credentials for a model or data provider. Clients
    /// route this to the "add an API key or upgrade" flow, so it must stay
    /// distinct from generic provider failures.
    #[error("Credential error: {0}")]
    AiCredentials(String),

    /// Rate limit hit, either a provider 429 or the free-tier usage window.
    /// The message is shown to the user as-is; `retry_after_secs` carries
    /// the window reset when it is known.
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<i64>,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Billing error: {0}")]
    Billing(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after_secs = match &self {
            AppError::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        };

        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PlanLimit(msg) => (
                StatusCode::PAYMENT_REQUIRED,
                "PLAN_LIMIT_REACHED",
                msg.clone(),
            ),
            AppError::AiCredentials(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "AI_CREDENTIALS",
                msg.clone(),
            ),
            AppError::RateLimited { message, .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", message.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Billing(msg) => {
                tracing::error!("Billing error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "BILLING_ERROR",
                    "A billing provider error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(secs) = retry_after_secs {
            error["retry_after_secs"] = json!(secs);
        }

        let mut response = (status, Json(json!({ "error": error }))).into_response();
        if let Some(secs) = retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Provider errors carry their own classification; map it onto the HTTP
/// taxonomy. Credential problems must never surface as generic LLM errors.
impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingKey(_) | LlmError::Unauthorized(_) => {
                AppError::AiCredentials(err.to_string())
            }
            LlmError::RateLimited => AppError::RateLimited {
                message: "Rate limit exceeded. Try again later.".to_string(),
                retry_after_secs: None,
            },
            other => AppError::Llm(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_maps_to_credentials() {
        let err: AppError = LlmError::MissingKey("Anthropic").into();
        assert!(matches!(err, AppError::AiCredentials(_)));
        assert!(err.to_string().contains("Anthropic API key not found"));
    }

    #[test]
    fn test_rejected_key_maps_to_credentials() {
        let err: AppError = LlmError::Unauthorized("invalid x-api-key".to_string()).into();
        assert!(matches!(err, AppError::AiCredentials(_)));
    }

    #[test]
    fn test_rate_limit_maps_to_fixed_message() {
        let err: AppError = LlmError::RateLimited.into();
        match err {
            AppError::RateLimited {
                message,
                retry_after_secs,
            } => {
                assert_eq!(message, "Rate limit exceeded. Try again later.");
                assert!(retry_after_secs.is_none());
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limited_response_carries_reset_seconds() {
        let response = AppError::RateLimited {
            message: "Rate limit exceeded. Try again later.".to_string(),
            retry_after_secs: Some(900),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok());
        assert_eq!(retry_after, Some("900"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "RATE_LIMITED");
        assert_eq!(
            body["error"]["message"],
            "Rate limit exceeded. Try again later."
        );
        assert_eq!(body["error"]["retry_after_secs"], 900);
    }

    #[tokio::test]
    async fn test_rate_limited_without_known_reset_omits_retry_after() {
        let response = AppError::RateLimited {
            message: "Rate limit exceeded. Try again later.".to_string(),
            retry_after_secs: None,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].get("retry_after_secs").is_none());
    }

    #[test]
    fn test_provider_failure_maps_to_llm() {
        let err: AppError = LlmError::Api {
            status: 500,
            message: "model overloaded".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Llm(_)));
    }
}
