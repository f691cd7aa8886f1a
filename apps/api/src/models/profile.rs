// Profile data model: one canonical record per user, holding contact fields
// and the four content collections (work experience, education, skills,
// projects). Collections live as JSONB documents on the row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// A single work-experience item. `description` holds display-ordered
/// bullet lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

/// A single education item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub school: String,
    pub degree: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub achievements: Vec<String>,
}

/// A single project item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// A named skill category with its items, e.g. "Languages" -> ["Rust", "Go"].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub category: String,
    #[serde(default)]
    pub items: Vec<String>,
}

/// A user's profile row as stored in Postgres.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
