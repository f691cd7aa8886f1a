//! Free-tier AI usage window.
//!
//! AI-backed calls are counted per user in Redis with INCR + EXPIRE: the
//! first call in a window sets the TTL, and the count resets when the key
//! expires. Pro users are exempt; callers check the plan before consuming.
//! Exceeding the window fails before any provider is contacted and reports
//! how long until the window resets.

use redis::AsyncCommands;
use tracing::warn;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;

const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Try again later.";

fn usage_key(user_id: Uuid) -> String {
    format!("ai_usage:{user_id}")
}

/// Clients string-match the fixed message; the reset time is carried in
/// `retry_after_secs`. Redis TTL sentinels (negative values) mean the reset
/// is unknown.
fn window_exhausted(ttl_secs: i64) -> AppError {
    AppError::RateLimited {
        message: RATE_LIMIT_MESSAGE.to_string(),
        retry_after_secs: (ttl_secs > 0).then_some(ttl_secs),
    }
}

/// Consumes one AI call from the user's window, failing when the window is
/// exhausted. A rejected attempt still increments the count.
pub async fn consume_ai_call(
    redis: &redis::Client,
    config: &Config,
    user_id: Uuid,
) -> Result<(), AppError> {
    let mut conn = redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis connection failed: {e}")))?;

    let key = usage_key(user_id);
    let count: u32 = conn
        .incr(&key, 1)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis INCR failed: {e}")))?;

    if count == 1 {
        let _: bool = conn
            .expire(&key, config.ai_free_window_secs)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis EXPIRE failed: {e}")))?;
    }

    if count > config.ai_free_calls_per_window {
        let ttl: i64 = conn
            .ttl(&key)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis TTL failed: {e}")))?;
        warn!("AI usage window exhausted for user {user_id} (count {count}, resets in {ttl}s)");
        return Err(window_exhausted(ttl));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_key_is_scoped_per_user() {
        let user_id = Uuid::parse_str("7a1e9d0c-31f4-4a8e-9a34-5c2b9f3d7e11").unwrap();
        assert_eq!(
            usage_key(user_id),
            "ai_usage:7a1e9d0c-31f4-4a8e-9a34-5c2b9f3d7e11"
        );
    }

    #[test]
    fn test_exhausted_window_reports_reset_seconds() {
        match window_exhausted(754) {
            AppError::RateLimited {
                message,
                retry_after_secs,
            } => {
                assert_eq!(message, "Rate limit exceeded. Try again later.");
                assert_eq!(retry_after_secs, Some(754));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_exhausted_window_with_ttl_sentinel_omits_reset() {
        match window_exhausted(-1) {
            AppError::RateLimited {
                retry_after_secs, ..
            } => assert!(retry_after_secs.is_none()),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }
}
