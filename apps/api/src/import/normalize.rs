//! Shape normalization for model-extracted resume content.
//!
//! The model is instructed to emit resume-shaped JSON, but conformance is
//! not guaranteed. Every recoverable shape problem is repaired here: missing
//! or mistyped list fields become empty lists and missing scalars become
//! None, while non-object entries inside a collection are dropped. Nothing
//! in this module errors on malformed input.

use serde_json::Value;

use crate::errors::AppError;
use crate::llm_client::{AiConfig, LlmClient};
use crate::models::profile::{Education, Project, Skill, WorkExperience};
use crate::models::resume::ResumeContent;

use super::prompts::{TEXT_TO_RESUME_PROMPT_TEMPLATE, TEXT_TO_RESUME_SYSTEM};

/// Runs the extraction model over raw text and normalizes the reply into
/// resume-shaped content. One model call, no retries.
pub async fn convert_text_to_resume(
    llm: &LlmClient,
    ai: &AiConfig,
    is_pro: bool,
    raw_text: &str,
    target_role: Option<&str>,
) -> Result<ResumeContent, AppError> {
    let prompt = TEXT_TO_RESUME_PROMPT_TEMPLATE
        .replace(
            "{target_role}",
            target_role.unwrap_or("the role the candidate appears to be pursuing"),
        )
        .replace("{raw_text}", raw_text);

    let value: Value = llm
        .call_json(ai, is_pro, &prompt, TEXT_TO_RESUME_SYSTEM)
        .await?;
    Ok(resume_content_from_value(&value))
}

/// Builds a `ResumeContent` from whatever JSON the model produced.
pub fn resume_content_from_value(value: &Value) -> ResumeContent {
    ResumeContent {
        first_name: string_field(value, "first_name"),
        last_name: string_field(value, "last_name"),
        email: string_field(value, "email"),
        phone_number: string_field(value, "phone_number"),
        location: string_field(value, "location"),
        website: string_field(value, "website"),
        linkedin_url: string_field(value, "linkedin_url"),
        github_url: string_field(value, "github_url"),
        work_experience: items_field(value, "work_experience", work_experience_from_value),
        education: items_field(value, "education", education_from_value),
        skills: items_field(value, "skills", skill_from_value),
        projects: items_field(value, "projects", project_from_value),
    }
}

pub(crate) fn work_experience_from_value(item: &Value) -> Option<WorkExperience> {
    if !item.is_object() {
        return None;
    }
    let description = string_list(item, "description");
    Some(WorkExperience {
        company: string_field(item, "company").unwrap_or_default(),
        position: string_field(item, "position").unwrap_or_default(),
        location: string_field(item, "location"),
        date: string_field(item, "date").unwrap_or_default(),
        // A missing description still renders as one empty bullet line.
        description: if description.is_empty() {
            vec![String::new()]
        } else {
            description
        },
        technologies: string_list(item, "technologies"),
    })
}

pub(crate) fn education_from_value(item: &Value) -> Option<Education> {
    if !item.is_object() {
        return None;
    }
    Some(Education {
        school: string_field(item, "school").unwrap_or_default(),
        degree: string_field(item, "degree").unwrap_or_default(),
        field: string_field(item, "field").unwrap_or_default(),
        location: string_field(item, "location"),
        date: string_field(item, "date").unwrap_or_default(),
        gpa: gpa_field(item),
        achievements: string_list(item, "achievements"),
    })
}

pub(crate) fn project_from_value(item: &Value) -> Option<Project> {
    if !item.is_object() {
        return None;
    }
    Some(Project {
        name: string_field(item, "name").unwrap_or_default(),
        description: string_list(item, "description"),
        technologies: string_list(item, "technologies"),
        url: string_field(item, "url"),
        github_url: string_field(item, "github_url"),
        date: string_field(item, "date"),
    })
}

pub(crate) fn skill_from_value(item: &Value) -> Option<Skill> {
    if !item.is_object() {
        return None;
    }
    Some(Skill {
        category: string_field(item, "category").unwrap_or_default(),
        items: string_list(item, "items"),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Field walkers
// ────────────────────────────────────────────────────────────────────────────

/// Trimmed non-empty string, or None.
pub(crate) fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects string entries from an array field. A bare string is promoted to
/// a one-element list; anything else yields an empty list.
fn string_list(value: &Value, key: &str) -> Vec<String> {
    match value.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Applies `build` to each entry of an array field; non-arrays yield an
/// empty collection.
fn items_field<T>(value: &Value, key: &str, build: fn(&Value) -> Option<T>) -> Vec<T> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(build).collect())
        .unwrap_or_default()
}

/// GPA as a number or a numeric string ("3.8" happens often).
fn gpa_field(item: &Value) -> Option<f64> {
    match item.get("gpa") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_document_normalizes() {
        let value = json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "work_experience": [{
                "company": "Analytical Engines Ltd",
                "position": "Programmer",
                "date": "1842 - 1843",
                "description": ["Wrote the first published algorithm"],
                "technologies": ["Analytical Engine"]
            }],
            "skills": [{"category": "Mathematics", "items": ["Calculus"]}]
        });

        let content = resume_content_from_value(&value);
        assert_eq!(content.first_name.as_deref(), Some("Ada"));
        assert_eq!(content.work_experience.len(), 1);
        assert_eq!(content.work_experience[0].company, "Analytical Engines Ltd");
        assert_eq!(content.skills[0].items, vec!["Calculus"]);
        assert!(content.education.is_empty());
        assert!(content.projects.is_empty());
    }

    #[test]
    fn test_missing_description_becomes_single_empty_bullet() {
        let value = json!({
            "work_experience": [{"company": "Acme", "position": "Engineer", "date": "2020"}]
        });
        let content = resume_content_from_value(&value);
        assert_eq!(content.work_experience[0].description, vec![String::new()]);
    }

    #[test]
    fn test_mistyped_list_fields_become_empty() {
        let value = json!({
            "work_experience": "not an array",
            "education": 42,
            "skills": null
        });
        let content = resume_content_from_value(&value);
        assert!(content.work_experience.is_empty());
        assert!(content.education.is_empty());
        assert!(content.skills.is_empty());
    }

    #[test]
    fn test_non_object_entries_are_dropped() {
        let value = json!({
            "projects": [{"name": "resumeforge"}, "stray string", 7, null]
        });
        let content = resume_content_from_value(&value);
        assert_eq!(content.projects.len(), 1);
        assert_eq!(content.projects[0].name, "resumeforge");
    }

    #[test]
    fn test_bare_string_promoted_to_list() {
        let value = json!({
            "work_experience": [{
                "company": "Acme",
                "position": "Engineer",
                "date": "2020",
                "description": "Single accomplishment"
            }]
        });
        let content = resume_content_from_value(&value);
        assert_eq!(
            content.work_experience[0].description,
            vec!["Single accomplishment"]
        );
    }

    #[test]
    fn test_gpa_accepts_number_and_numeric_string() {
        let number = json!({"education": [{"school": "MIT", "degree": "BSc", "gpa": 3.9}]});
        let content = resume_content_from_value(&number);
        assert_eq!(content.education[0].gpa, Some(3.9));

        let string = json!({"education": [{"school": "MIT", "degree": "BSc", "gpa": "3.8"}]});
        let content = resume_content_from_value(&string);
        assert_eq!(content.education[0].gpa, Some(3.8));

        let junk = json!({"education": [{"school": "MIT", "degree": "BSc", "gpa": "excellent"}]});
        let content = resume_content_from_value(&junk);
        assert_eq!(content.education[0].gpa, None);
    }

    #[test]
    fn test_scalars_trim_and_drop_empty() {
        let value = json!({"first_name": "  Ada  ", "last_name": "   ", "email": 42});
        let content = resume_content_from_value(&value);
        assert_eq!(content.first_name.as_deref(), Some("Ada"));
        assert_eq!(content.last_name, None);
        assert_eq!(content.email, None);
    }

    #[test]
    fn test_empty_document() {
        let content = resume_content_from_value(&json!({}));
        assert_eq!(content, ResumeContent::default());
    }
}
