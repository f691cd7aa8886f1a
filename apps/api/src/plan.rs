//! Plan tiers and creation limits.
//!
//! Free accounts may hold 2 base resumes and 4 tailored resumes; Pro is
//! unlimited. Limits are enforced here on the server against a fresh count,
//! never against client-reported state, and always before any row is
//! inserted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::ResumeKind;
use crate::models::subscription::SubscriptionRow;
use crate::resumes::store::count_resumes;

const FREE_BASE_LIMIT: i64 = 2;
const FREE_TAILORED_LIMIT: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
}

impl PlanTier {
    /// Anything that is not exactly "pro" (case-insensitive) is free.
    pub fn from_plan_str(plan: &str) -> PlanTier {
        if plan.eq_ignore_ascii_case("pro") {
            PlanTier::Pro
        } else {
            PlanTier::Free
        }
    }

    pub fn is_pro(self) -> bool {
        matches!(self, PlanTier::Pro)
    }
}

/// Resolved plan state for a user.
#[derive(Debug, Clone, Serialize)]
pub struct PlanInfo {
    pub tier: PlanTier,
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
}

pub fn free_limit(kind: ResumeKind) -> i64 {
    match kind {
        ResumeKind::Base => FREE_BASE_LIMIT,
        ResumeKind::Tailored => FREE_TAILORED_LIMIT,
    }
}

/// Whether a user on `tier` who already owns `owned` resumes of `kind` may
/// create one more.
pub fn allows_creation(tier: PlanTier, kind: ResumeKind, owned: i64) -> bool {
    tier.is_pro() || owned < free_limit(kind)
}

/// Resolves the user's plan. A user with no subscription row is on the free
/// tier with an active status.
pub async fn get_plan(pool: &PgPool, user_id: Uuid) -> Result<PlanInfo, AppError> {
    let row: Option<SubscriptionRow> =
        sqlx::query_as("SELECT * FROM subscriptions WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(match row {
        Some(row) => PlanInfo {
            tier: PlanTier::from_plan_str(&row.subscription_plan),
            status: row.subscription_status,
            current_period_end: row.current_period_end,
        },
        None => PlanInfo {
            tier: PlanTier::Free,
            status: "active".to_string(),
            current_period_end: None,
        },
    })
}

pub async fn can_create(pool: &PgPool, user_id: Uuid, kind: ResumeKind) -> Result<bool, AppError> {
    let plan = get_plan(pool, user_id).await?;
    let owned = count_resumes(pool, user_id, kind).await?;
    Ok(allows_creation(plan.tier, kind, owned))
}

/// Fails with a plan-limit error when the user may not create another resume
/// of `kind`. Called inside every creation path, before the insert.
pub async fn ensure_can_create(
    pool: &PgPool,
    user_id: Uuid,
    kind: ResumeKind,
) -> Result<(), AppError> {
    if can_create(pool, user_id, kind).await? {
        return Ok(());
    }
    let limit = free_limit(kind);
    Err(AppError::PlanLimit(format!(
        "Free plan allows up to {limit} {} resumes. Upgrade to Pro to create more.",
        kind.label()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_plan_str() {
        assert_eq!(PlanTier::from_plan_str("pro"), PlanTier::Pro);
        assert_eq!(PlanTier::from_plan_str("Pro"), PlanTier::Pro);
        assert_eq!(PlanTier::from_plan_str("PRO"), PlanTier::Pro);
        assert_eq!(PlanTier::from_plan_str("free"), PlanTier::Free);
        assert_eq!(PlanTier::from_plan_str(""), PlanTier::Free);
        assert_eq!(PlanTier::from_plan_str("enterprise"), PlanTier::Free);
    }

    #[test]
    fn test_free_limits() {
        assert_eq!(free_limit(ResumeKind::Base), 2);
        assert_eq!(free_limit(ResumeKind::Tailored), 4);
    }

    #[test]
    fn test_free_tier_base_boundary() {
        assert!(allows_creation(PlanTier::Free, ResumeKind::Base, 0));
        assert!(allows_creation(PlanTier::Free, ResumeKind::Base, 1));
        assert!(!allows_creation(PlanTier::Free, ResumeKind::Base, 2));
        assert!(!allows_creation(PlanTier::Free, ResumeKind::Base, 3));
    }

    #[test]
    fn test_free_tier_tailored_boundary() {
        assert!(allows_creation(PlanTier::Free, ResumeKind::Tailored, 3));
        assert!(!allows_creation(PlanTier::Free, ResumeKind::Tailored, 4));
    }

    #[test]
    fn test_pro_tier_is_unlimited() {
        assert!(allows_creation(PlanTier::Pro, ResumeKind::Base, 2));
        assert!(allows_creation(PlanTier::Pro, ResumeKind::Base, 500));
        assert!(allows_creation(PlanTier::Pro, ResumeKind::Tailored, 4));
        assert!(allows_creation(PlanTier::Pro, ResumeKind::Tailored, 500));
    }
}
