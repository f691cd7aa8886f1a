// Resume data model. A resume is either a base resume (general-purpose,
// kind "base") or a tailored resume (aimed at one job posting, kind
// "tailored"). The kind is fixed at creation and never changes afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::profile::{Education, Project, Skill, WorkExperience};

/// Base vs. tailored. Serialized lowercase in APIs ("base" / "tailored").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeKind {
    #[default]
    Base,
    Tailored,
}

impl ResumeKind {
    pub fn is_base(self) -> bool {
        matches!(self, ResumeKind::Base)
    }

    pub fn label(self) -> &'static str {
        match self {
            ResumeKind::Base => "base",
            ResumeKind::Tailored => "tailored",
        }
    }
}

/// A resume row as stored in Postgres. Carries its own copy of the personal
/// info fields, snapshotted from the profile at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub target_role: Option<String>,
    pub is_base_resume: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub work_experience: Json<Vec<WorkExperience>>,
    pub education: Json<Vec<Education>>,
    pub skills: Json<Vec<Skill>>,
    pub projects: Json<Vec<Project>>,
    pub job_id: Option<Uuid>,
    pub has_cover_letter: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResumeRow {
    pub fn kind(&self) -> ResumeKind {
        if self.is_base_resume {
            ResumeKind::Base
        } else {
            ResumeKind::Tailored
        }
    }

    /// Content view of this row: the personal snapshot plus the four
    /// collections, without row identity or timestamps.
    pub fn content(&self) -> ResumeContent {
        ResumeContent {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            location: self.location.clone(),
            website: self.website.clone(),
            linkedin_url: self.linkedin_url.clone(),
            github_url: self.github_url.clone(),
            work_experience: self.work_experience.0.clone(),
            education: self.education.0.clone(),
            skills: self.skills.0.clone(),
            projects: self.projects.0.clone(),
        }
    }
}

/// Resume-shaped content without row identity. Produced by the import
/// normalizer and consumed by every resume creation path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeContent {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
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
