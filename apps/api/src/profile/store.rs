//! Profile persistence. One row per user, created the first time the user is
//! seen and updated only through full-document saves.

use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{Education, ProfileRow, Project, Skill, WorkExperience};
use crate::models::resume::ResumeContent;
use crate::profile::merge::{dedup_items, merge_items};

/// Identity fields seeded from auth metadata the first time a profile row is
/// created.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileSeed {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Full-document profile save. Collections must be submitted complete; there
/// is no per-item patch. Duplicate identity keys collapse before the write.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
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
}

pub async fn fetch_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ProfileRow>, AppError> {
    Ok(sqlx::query_as("SELECT * FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}

/// Fetches the user's profile, creating an empty one on first sight.
pub async fn ensure_profile(
    pool: &PgPool,
    user_id: Uuid,
    seed: &ProfileSeed,
) -> Result<ProfileRow, AppError> {
    if let Some(profile) = fetch_profile(pool, user_id).await? {
        return Ok(profile);
    }

    // Concurrent first requests race here; DO NOTHING keeps the first insert.
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, first_name, last_name, email,
                              work_experience, education, skills, projects)
        VALUES ($1, $2, $3, $4, '[]', '[]', '[]', '[]')
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(&seed.first_name)
    .bind(&seed.last_name)
    .bind(&seed.email)
    .execute(pool)
    .await?;

    info!("Created profile for user {user_id}");

    fetch_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id} not found")))
}

/// Replaces the whole profile document. Returns the stored row.
pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    update: ProfileUpdate,
) -> Result<ProfileRow, AppError> {
    let work_experience = dedup_items(update.work_experience);
    let education = dedup_items(update.education);
    let skills = dedup_items(update.skills);
    let projects = dedup_items(update.projects);

    sqlx::query_as::<_, ProfileRow>(
        r#"
        UPDATE profiles
        SET first_name = $2, last_name = $3, email = $4, phone_number = $5,
            location = $6, website = $7, linkedin_url = $8, github_url = $9,
            work_experience = $10, education = $11, skills = $12, projects = $13,
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.email)
    .bind(&update.phone_number)
    .bind(&update.location)
    .bind(&update.website)
    .bind(&update.linkedin_url)
    .bind(&update.github_url)
    .bind(Json(work_experience))
    .bind(Json(education))
    .bind(Json(skills))
    .bind(Json(projects))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id} not found")))
}

/// Empties every field and collection in place. The row itself survives, so
/// later requests see an empty profile rather than a missing one.
pub async fn reset_profile(pool: &PgPool, user_id: Uuid) -> Result<ProfileRow, AppError> {
    let profile = sqlx::query_as::<_, ProfileRow>(
        r#"
        UPDATE profiles
        SET first_name = NULL, last_name = NULL, email = NULL, phone_number = NULL,
            location = NULL, website = NULL, linkedin_url = NULL, github_url = NULL,
            work_experience = '[]', education = '[]', skills = '[]', projects = '[]',
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id} not found")))?;

    info!("Reset profile for user {user_id}");
    Ok(profile)
}

/// Merges AI-normalized content into the profile. Scalars fill in when the
/// import carries a value; collections merge by identity key, so re-importing
/// the same document enriches items instead of duplicating them.
pub async fn import_into_profile(
    pool: &PgPool,
    user_id: Uuid,
    content: ResumeContent,
) -> Result<ProfileRow, AppError> {
    let current = fetch_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id} not found")))?;

    let mut work_experience = current.work_experience.0;
    merge_items(&mut work_experience, content.work_experience);
    let mut education = current.education.0;
    merge_items(&mut education, content.education);
    let mut skills = current.skills.0;
    merge_items(&mut skills, content.skills);
    let mut projects = current.projects.0;
    merge_items(&mut projects, content.projects);

    let update = ProfileUpdate {
        first_name: content.first_name.or(current.first_name),
        last_name: content.last_name.or(current.last_name),
        email: content.email.or(current.email),
        phone_number: content.phone_number.or(current.phone_number),
        location: content.location.or(current.location),
        website: content.website.or(current.website),
        linkedin_url: content.linkedin_url.or(current.linkedin_url),
        github_url: content.github_url.or(current.github_url),
        work_experience,
        education,
        skills,
        projects,
    };

    update_profile(pool, user_id, update).await
}
