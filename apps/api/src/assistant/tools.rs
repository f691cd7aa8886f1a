//! Tool-call parsing and validation for the resume assistant.
//!
//! Tool payloads arrive as `{"name": ..., "arguments": ...}` from the
//! client-driven chat loop. The payload shape is model-controlled and never
//! trusted: every call parses into a closed enum, unknown tool names are
//! rejected, and indices are validated against the session document before
//! anything is applied.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::import::normalize::{
    education_from_value, project_from_value, skill_from_value, string_field,
    work_experience_from_value,
};
use crate::models::profile::{Education, Project, Skill, WorkExperience};
use crate::models::resume::ResumeRow;

/// A tool call as received on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RawToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Resume sections addressable by `getResume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    PersonalInfo,
    WorkExperience,
    Education,
    Skills,
    Projects,
    All,
}

/// The closed set of tools the assistant may invoke.
#[derive(Debug, Clone)]
pub enum ToolCall {
    GetResume { sections: Vec<Section> },
    SuggestWorkExperience { index: usize, improved: WorkExperience },
    SuggestProject { index: usize, improved: Project },
    SuggestSkill { index: usize, improved: Skill },
    SuggestEducation { index: usize, improved: Education },
    ModifyWholeResume(ResumeModification),
}

/// Partial update to the personal info block. Only present fields change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BasicInfoPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
}

/// Whole-resume modification: each present collection replaces the stored
/// one wholesale; absent collections are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ResumeModification {
    pub basic_info: Option<BasicInfoPatch>,
    pub work_experience: Option<Vec<WorkExperience>>,
    pub education: Option<Vec<Education>>,
    pub skills: Option<Vec<Skill>>,
    pub projects: Option<Vec<Project>>,
}

impl ResumeModification {
    pub fn is_empty(&self) -> bool {
        self.basic_info.is_none()
            && self.work_experience.is_none()
            && self.education.is_none()
            && self.skills.is_none()
            && self.projects.is_none()
    }
}

/// Parses and validates a raw tool call against the current session document.
pub fn parse_tool_call(call: &RawToolCall, resume: &ResumeRow) -> Result<ToolCall, AppError> {
    match call.name.as_str() {
        "getResume" => {
            let sections = match call.arguments.get("sections") {
                None => vec![Section::All],
                Some(value) => {
                    let sections: Vec<Section> = serde_json::from_value(value.clone())
                        .map_err(|e| AppError::Validation(format!("Invalid sections: {e}")))?;
                    if sections.is_empty() {
                        vec![Section::All]
                    } else {
                        sections
                    }
                }
            };
            Ok(ToolCall::GetResume { sections })
        }
        "suggest_work_experience_improvement" => {
            let index = index_arg(&call.arguments)?;
            check_index(index, resume.work_experience.0.len(), "work_experience")?;
            let improved =
                item_arg(&call.arguments, "improved_experience", work_experience_from_value)?;
            Ok(ToolCall::SuggestWorkExperience { index, improved })
        }
        "suggest_project_improvement" => {
            let index = index_arg(&call.arguments)?;
            check_index(index, resume.projects.0.len(), "projects")?;
            let improved = item_arg(&call.arguments, "improved_project", project_from_value)?;
            Ok(ToolCall::SuggestProject { index, improved })
        }
        "suggest_skill_improvement" => {
            let index = index_arg(&call.arguments)?;
            check_index(index, resume.skills.0.len(), "skills")?;
            let improved = item_arg(&call.arguments, "improved_skill", skill_from_value)?;
            Ok(ToolCall::SuggestSkill { index, improved })
        }
        "suggest_education_improvement" => {
            let index = index_arg(&call.arguments)?;
            check_index(index, resume.education.0.len(), "education")?;
            let improved = item_arg(&call.arguments, "improved_education", education_from_value)?;
            Ok(ToolCall::SuggestEducation { index, improved })
        }
        "modifyWholeResume" => {
            let modification = parse_modification(&call.arguments);
            if modification.is_empty() {
                return Err(AppError::Validation(
                    "modifyWholeResume requires at least one section".to_string(),
                ));
            }
            Ok(ToolCall::ModifyWholeResume(modification))
        }
        other => Err(AppError::Validation(format!("Unknown tool: {other}"))),
    }
}

/// Read-only projection of the requested sections. `all` additionally
/// includes the target role.
pub fn project_sections(resume: &ResumeRow, sections: &[Section]) -> Value {
    let all = sections.contains(&Section::All);
    let mut map = serde_json::Map::new();

    if all || sections.contains(&Section::PersonalInfo) {
        map.insert(
            "personal_info".to_string(),
            json!({
                "first_name": resume.first_name,
                "last_name": resume.last_name,
                "email": resume.email,
                "phone_number": resume.phone_number,
                "location": resume.location,
                "website": resume.website,
                "linkedin_url": resume.linkedin_url,
                "github_url": resume.github_url,
            }),
        );
    }
    if all || sections.contains(&Section::WorkExperience) {
        map.insert("work_experience".to_string(), json!(resume.work_experience.0));
    }
    if all || sections.contains(&Section::Education) {
        map.insert("education".to_string(), json!(resume.education.0));
    }
    if all || sections.contains(&Section::Skills) {
        map.insert("skills".to_string(), json!(resume.skills.0));
    }
    if all || sections.contains(&Section::Projects) {
        map.insert("projects".to_string(), json!(resume.projects.0));
    }
    if all {
        map.insert("target_role".to_string(), json!(resume.target_role));
    }

    Value::Object(map)
}

fn index_arg(arguments: &Value) -> Result<usize, AppError> {
    arguments
        .get("index")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| AppError::Validation("index is required".to_string()))
}

fn check_index(index: usize, len: usize, section: &str) -> Result<(), AppError> {
    if index >= len {
        return Err(AppError::Validation(format!(
            "{section} index {index} is out of bounds (len {len})"
        )));
    }
    Ok(())
}

/// Required object argument, run through the lenient item normalizer.
fn item_arg<T>(
    arguments: &Value,
    key: &str,
    build: fn(&Value) -> Option<T>,
) -> Result<T, AppError> {
    let value = arguments
        .get(key)
        .ok_or_else(|| AppError::Validation(format!("{key} is required")))?;
    build(value).ok_or_else(|| AppError::Validation(format!("{key} must be an object")))
}

fn parse_modification(arguments: &Value) -> ResumeModification {
    ResumeModification {
        basic_info: arguments
            .get("basic_info")
            .filter(|v| v.is_object())
            .map(basic_info_from_value),
        work_experience: list_arg(arguments, "work_experience", work_experience_from_value),
        education: list_arg(arguments, "education", education_from_value),
        skills: list_arg(arguments, "skills", skill_from_value),
        projects: list_arg(arguments, "projects", project_from_value),
    }
}

/// Present and an array means replace with the normalized items. Absent or
/// mistyped means the section is left untouched rather than emptied.
fn list_arg<T>(arguments: &Value, key: &str, build: fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    arguments
        .get(key)?
        .as_array()
        .map(|items| items.iter().filter_map(build).collect())
}

fn basic_info_from_value(value: &Value) -> BasicInfoPatch {
    BasicInfoPatch {
        first_name: string_field(value, "first_name"),
        last_name: string_field(value, "last_name"),
        email: string_field(value, "email"),
        phone_number: string_field(value, "phone_number"),
        location: string_field(value, "location"),
        website: string_field(value, "website"),
        linkedin_url: string_field(value, "linkedin_url"),
        github_url: string_field(value, "github_url"),
    }
}
