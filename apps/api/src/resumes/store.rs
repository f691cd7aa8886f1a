//! Resume persistence and the four creation paths: fresh, import-profile,
//! import from normalized content, and tailored-from-base.
//!
//! Every query is scoped by owner, so a resume owned by another user surfaces
//! as not-found rather than forbidden. Plan limits are checked here, before
//! any insert.

use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{Education, ProfileRow, Project, Skill, WorkExperience};
use crate::models::resume::{ResumeContent, ResumeKind, ResumeRow};
use crate::plan;
use crate::profile::merge::{dedup_items, Mergeable};
use crate::profile::store::fetch_profile;

/// How a new base resume is seeded when no pre-normalized content is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreationMode {
    /// Start empty.
    #[default]
    Fresh,
    /// Copy selected profile items.
    ImportProfile,
}

/// Identity keys of the profile items to copy for `ImportProfile` mode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectedItems {
    #[serde(default)]
    pub work_experience: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateResumeRequest {
    pub user_id: Uuid,
    /// Defaults to the target role when absent.
    pub name: Option<String>,
    pub target_role: String,
    #[serde(default)]
    pub kind: ResumeKind,
    #[serde(default)]
    pub mode: CreationMode,
    /// Absent means "copy everything" in `ImportProfile` mode.
    pub selected_items: Option<SelectedItems>,
    /// Base resume whose content seeds a tailored resume. Required for
    /// `kind: tailored`.
    pub base_resume_id: Option<Uuid>,
    /// Opaque link to the job posting a tailored resume targets.
    pub job_id: Option<Uuid>,
    /// Pre-normalized content from an import flow.
    pub content: Option<ResumeContent>,
}

/// Full-document resume save. `is_base_resume` is absent by construction:
/// the kind is fixed at creation and no update can change it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResumeUpdate {
    pub name: String,
    pub target_role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub has_cover_letter: bool,
}

impl ResumeUpdate {
    /// Everything a save may change, lifted from a row. Used by the assistant
    /// session when persisting its working document.
    pub fn from_row(row: &ResumeRow) -> Self {
        Self {
            name: row.name.clone(),
            target_role: row.target_role.clone(),
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            email: row.email.clone(),
            phone_number: row.phone_number.clone(),
            location: row.location.clone(),
            website: row.website.clone(),
            linkedin_url: row.linkedin_url.clone(),
            github_url: row.github_url.clone(),
            work_experience: row.work_experience.0.clone(),
            education: row.education.0.clone(),
            skills: row.skills.0.clone(),
            projects: row.projects.0.clone(),
            has_cover_letter: row.has_cover_letter,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Queries
// ────────────────────────────────────────────────────────────────────────────

pub async fn fetch_resume(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<ResumeRow, AppError> {
    sqlx::query_as("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

pub async fn list_resumes(
    pool: &PgPool,
    user_id: Uuid,
    kind: ResumeKind,
) -> Result<Vec<ResumeRow>, AppError> {
    Ok(sqlx::query_as(
        "SELECT * FROM resumes WHERE user_id = $1 AND is_base_resume = $2 ORDER BY created_at",
    )
    .bind(user_id)
    .bind(kind.is_base())
    .fetch_all(pool)
    .await?)
}

pub async fn count_resumes(pool: &PgPool, user_id: Uuid, kind: ResumeKind) -> Result<i64, AppError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM resumes WHERE user_id = $1 AND is_base_resume = $2")
            .bind(user_id)
            .bind(kind.is_base())
            .fetch_one(pool)
            .await?;
    Ok(count)
}

// ────────────────────────────────────────────────────────────────────────────
// Creation
// ────────────────────────────────────────────────────────────────────────────

pub async fn create_resume(
    pool: &PgPool,
    request: CreateResumeRequest,
) -> Result<ResumeRow, AppError> {
    let target_role = request.target_role.trim();
    if target_role.is_empty() {
        return Err(AppError::Validation("target_role is required".to_string()));
    }

    // Authoritative limit check; client-side gating is a courtesy only.
    plan::ensure_can_create(pool, request.user_id, request.kind).await?;

    let profile = fetch_profile(pool, request.user_id).await?;

    let mut content = match (request.kind, request.content) {
        (ResumeKind::Tailored, _) => {
            let base_id = request.base_resume_id.ok_or_else(|| {
                AppError::Validation("base_resume_id is required for tailored resumes".to_string())
            })?;
            fetch_resume(pool, base_id, request.user_id).await?.content()
        }
        (ResumeKind::Base, Some(content)) => content,
        (ResumeKind::Base, None) => match request.mode {
            CreationMode::ImportProfile => {
                content_from_profile(profile.as_ref(), request.selected_items.as_ref())
            }
            CreationMode::Fresh => ResumeContent::default(),
        },
    };

    if let Some(profile) = &profile {
        fill_personal_info(&mut content, profile);
    }

    let name = request
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| target_role.to_string());

    let resume = insert_resume(
        pool,
        request.user_id,
        &name,
        Some(target_role.to_string()),
        request.kind,
        request.job_id,
        content,
    )
    .await?;

    info!(
        "Created {} resume {} for user {}",
        request.kind.label(),
        resume.id,
        request.user_id
    );
    Ok(resume)
}

/// Duplicates a resume the caller owns, appending " (Copy)" to the name. The
/// copy keeps the source kind and counts against the same creation limit.
pub async fn copy_resume(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<ResumeRow, AppError> {
    let source = fetch_resume(pool, id, user_id).await?;
    let kind = source.kind();
    plan::ensure_can_create(pool, user_id, kind).await?;

    let name = format!("{} (Copy)", source.name);
    let copy = insert_resume(
        pool,
        user_id,
        &name,
        source.target_role.clone(),
        kind,
        source.job_id,
        source.content(),
    )
    .await?;

    info!("Copied resume {id} to {} for user {user_id}", copy.id);
    Ok(copy)
}

async fn insert_resume(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
    target_role: Option<String>,
    kind: ResumeKind,
    job_id: Option<Uuid>,
    content: ResumeContent,
) -> Result<ResumeRow, AppError> {
    // Collections collapse duplicate identity keys before the write.
    let work_experience = dedup_items(content.work_experience);
    let education = dedup_items(content.education);
    let skills = dedup_items(content.skills);
    let projects = dedup_items(content.projects);

    Ok(sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes
            (id, user_id, name, target_role, is_base_resume,
             first_name, last_name, email, phone_number, location,
             website, linkedin_url, github_url,
             work_experience, education, skills, projects, job_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(name)
    .bind(target_role)
    .bind(kind.is_base())
    .bind(&content.first_name)
    .bind(&content.last_name)
    .bind(&content.email)
    .bind(&content.phone_number)
    .bind(&content.location)
    .bind(&content.website)
    .bind(&content.linkedin_url)
    .bind(&content.github_url)
    .bind(Json(work_experience))
    .bind(Json(education))
    .bind(Json(skills))
    .bind(Json(projects))
    .bind(job_id)
    .fetch_one(pool)
    .await?)
}

// ────────────────────────────────────────────────────────────────────────────
// Update / delete
// ────────────────────────────────────────────────────────────────────────────

/// Replaces the whole resume document and stamps `updated_at`. The stored
/// kind is untouched.
pub async fn update_resume(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    update: ResumeUpdate,
) -> Result<ResumeRow, AppError> {
    sqlx::query_as::<_, ResumeRow>(
        r#"
        UPDATE resumes
        SET name = $3, target_role = $4,
            first_name = $5, last_name = $6, email = $7, phone_number = $8,
            location = $9, website = $10, linkedin_url = $11, github_url = $12,
            work_experience = $13, education = $14, skills = $15, projects = $16,
            has_cover_letter = $17, updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&update.name)
    .bind(&update.target_role)
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.email)
    .bind(&update.phone_number)
    .bind(&update.location)
    .bind(&update.website)
    .bind(&update.linkedin_url)
    .bind(&update.github_url)
    .bind(Json(&update.work_experience))
    .bind(Json(&update.education))
    .bind(Json(&update.skills))
    .bind(Json(&update.projects))
    .bind(update.has_cover_letter)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

pub async fn delete_resume(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Resume {id} not found")));
    }

    info!("Deleted resume {id} for user {user_id}");
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Content assembly
// ────────────────────────────────────────────────────────────────────────────

/// Copies profile items into new resume content. With a selection, only items
/// whose identity keys are listed come over; without one, everything does.
fn content_from_profile(
    profile: Option<&ProfileRow>,
    selected: Option<&SelectedItems>,
) -> ResumeContent {
    let Some(profile) = profile else {
        return ResumeContent::default();
    };

    match selected {
        Some(selected) => ResumeContent {
            work_experience: filter_selected(&profile.work_experience.0, &selected.work_experience),
            education: filter_selected(&profile.education.0, &selected.education),
            skills: filter_selected(&profile.skills.0, &selected.skills),
            projects: filter_selected(&profile.projects.0, &selected.projects),
            ..Default::default()
        },
        None => ResumeContent {
            work_experience: profile.work_experience.0.clone(),
            education: profile.education.0.clone(),
            skills: profile.skills.0.clone(),
            projects: profile.projects.0.clone(),
            ..Default::default()
        },
    }
}

fn filter_selected<T: Mergeable + Clone>(items: &[T], keys: &[String]) -> Vec<T> {
    items
        .iter()
        .filter(|item| keys.contains(&item.identity_key()))
        .cloned()
        .collect()
}

/// Import-extracted values win; the profile fills the gaps.
fn fill_personal_info(content: &mut ResumeContent, profile: &ProfileRow) {
    if content.first_name.is_none() {
        content.first_name = profile.first_name.clone();
    }
    if content.last_name.is_none() {
        content.last_name = profile.last_name.clone();
    }
    if content.email.is_none() {
        content.email = profile.email.clone();
    }
    if content.phone_number.is_none() {
        content.phone_number = profile.phone_number.clone();
    }
    if content.location.is_none() {
        content.location = profile.location.clone();
    }
    if content.website.is_none() {
        content.website = profile.website.clone();
    }
    if content.linkedin_url.is_none() {
        content.linkedin_url = profile.linkedin_url.clone();
    }
    if content.github_url.is_none() {
        content.github_url = profile.github_url.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_profile() -> ProfileRow {
        ProfileRow {
            user_id: Uuid::new_v4(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            email: Some("ada@example.com".to_string()),
            phone_number: None,
            location: Some("London".to_string()),
            website: None,
            linkedin_url: None,
            github_url: None,
            work_experience: Json(vec![
                WorkExperience {
                    company: "Acme".to_string(),
                    position: "Engineer".to_string(),
                    date: "2020".to_string(),
                    ..Default::default()
                },
                WorkExperience {
                    company: "Globex".to_string(),
                    position: "SRE".to_string(),
                    date: "2022".to_string(),
                    ..Default::default()
                },
            ]),
            education: Json(vec![]),
            skills: Json(vec![Skill {
                category: "Languages".to_string(),
                items: vec!["Rust".to_string()],
            }]),
            projects: Json(vec![]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_content_from_profile_with_selection() {
        let profile = sample_profile();
        let selected = SelectedItems {
            work_experience: vec!["Globex-SRE-2022".to_string()],
            ..Default::default()
        };
        let content = content_from_profile(Some(&profile), Some(&selected));
        assert_eq!(content.work_experience.len(), 1);
        assert_eq!(content.work_experience[0].company, "Globex");
        // Skills were not selected.
        assert!(content.skills.is_empty());
    }

    #[test]
    fn test_content_from_profile_without_selection_copies_all() {
        let profile = sample_profile();
        let content = content_from_profile(Some(&profile), None);
        assert_eq!(content.work_experience.len(), 2);
        assert_eq!(content.skills.len(), 1);
    }

    #[test]
    fn test_content_from_missing_profile_is_empty() {
        let content = content_from_profile(None, None);
        assert_eq!(content, ResumeContent::default());
    }

    #[test]
    fn test_fill_personal_info_does_not_overwrite() {
        let profile = sample_profile();
        let mut content = ResumeContent {
            first_name: Some("Grace".to_string()),
            ..Default::default()
        };
        fill_personal_info(&mut content, &profile);
        // Extracted value kept, gaps filled from the profile.
        assert_eq!(content.first_name.as_deref(), Some("Grace"));
        assert_eq!(content.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(content.location.as_deref(), Some("London"));
    }
}
