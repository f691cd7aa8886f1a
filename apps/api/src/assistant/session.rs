//! In-memory edit sessions for the assistant.
//!
//! One session per open resume editor: a working copy of the resume row,
//! the pending item suggestions, and a stack of whole-resume snapshots for
//! undo. Tool calls mutate only the working copy; nothing reaches Postgres
//! until the client asks for an explicit save, which also clears history.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::assistant::tools::{project_sections, ResumeModification, ToolCall};
use crate::errors::AppError;
use crate::models::profile::{Education, Project, Skill, WorkExperience};
use crate::models::resume::ResumeRow;

/// An improved item proposed by the assistant, waiting for an accept or
/// reject decision.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "section", content = "improved", rename_all = "snake_case")]
pub enum ProposedItem {
    WorkExperience(WorkExperience),
    Education(Education),
    Skills(Skill),
    Projects(Project),
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingSuggestion {
    pub id: Uuid,
    pub index: usize,
    #[serde(flatten)]
    pub item: ProposedItem,
}

/// What a tool call produced.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutcome {
    Resume { resume: Value },
    Suggestion { suggestion: PendingSuggestion },
    Modified { snapshot_depth: usize },
}

pub struct EditSession {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Working document. Diverges from the stored row until save.
    pub resume: ResumeRow,
    pub pending: Vec<PendingSuggestion>,
    /// Pre-modification snapshots, newest last.
    pub snapshots: Vec<ResumeRow>,
}

/// All open sessions, keyed by session id. In-memory and per-process: a
/// restart drops unsaved assistant work, never stored rows.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, EditSession>>>,
}

impl SessionStore {
    /// Opens a session on a resume, replacing any stale session for the same
    /// row.
    pub async fn open(&self, resume: ResumeRow) -> Uuid {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, s| s.resume.id != resume.id);

        let id = Uuid::new_v4();
        let user_id = resume.user_id;
        sessions.insert(
            id,
            EditSession {
                id,
                user_id,
                resume,
                pending: Vec::new(),
                snapshots: Vec::new(),
            },
        );
        id
    }

    /// Discards a session and all unsaved work in it.
    pub async fn close(&self, session_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&session_id) {
            Some(s) if s.user_id == user_id => {
                sessions.remove(&session_id);
                Ok(())
            }
            _ => Err(AppError::NotFound(format!("Session {session_id} not found"))),
        }
    }

    /// Runs `f` with exclusive access to a session. A session owned by a
    /// different user surfaces as not-found.
    pub async fn with_session<T>(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        f: impl FnOnce(&mut EditSession) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;
        f(session)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tool application
// ────────────────────────────────────────────────────────────────────────────

/// Applies a validated tool call to the session. Reads project the working
/// document; suggestions are registered for a later decision; whole-resume
/// modifications snapshot first, then apply.
pub fn apply_tool(session: &mut EditSession, call: ToolCall) -> ToolOutcome {
    match call {
        ToolCall::GetResume { sections } => ToolOutcome::Resume {
            resume: project_sections(&session.resume, &sections),
        },
        ToolCall::SuggestWorkExperience { index, improved } => {
            register_suggestion(session, index, ProposedItem::WorkExperience(improved))
        }
        ToolCall::SuggestProject { index, improved } => {
            register_suggestion(session, index, ProposedItem::Projects(improved))
        }
        ToolCall::SuggestSkill { index, improved } => {
            register_suggestion(session, index, ProposedItem::Skills(improved))
        }
        ToolCall::SuggestEducation { index, improved } => {
            register_suggestion(session, index, ProposedItem::Education(improved))
        }
        ToolCall::ModifyWholeResume(modification) => {
            session.snapshots.push(session.resume.clone());
            apply_modification(&mut session.resume, modification);
            ToolOutcome::Modified {
                snapshot_depth: session.snapshots.len(),
            }
        }
    }
}

fn register_suggestion(session: &mut EditSession, index: usize, item: ProposedItem) -> ToolOutcome {
    let suggestion = PendingSuggestion {
        id: Uuid::new_v4(),
        index,
        item,
    };
    session.pending.push(suggestion.clone());
    ToolOutcome::Suggestion { suggestion }
}

/// Applies a pending suggestion at its recorded index. The index is checked
/// against the current document, which may have changed since the proposal
/// was registered. Either way the suggestion is resolved.
pub fn accept_suggestion(session: &mut EditSession, suggestion_id: Uuid) -> Result<(), AppError> {
    let position = session
        .pending
        .iter()
        .position(|s| s.id == suggestion_id)
        .ok_or_else(|| AppError::NotFound(format!("Suggestion {suggestion_id} not found")))?;
    let suggestion = session.pending.remove(position);
    let index = suggestion.index;

    match suggestion.item {
        ProposedItem::WorkExperience(item) => {
            replace_at(&mut session.resume.work_experience.0, index, item)
        }
        ProposedItem::Education(item) => replace_at(&mut session.resume.education.0, index, item),
        ProposedItem::Skills(item) => replace_at(&mut session.resume.skills.0, index, item),
        ProposedItem::Projects(item) => replace_at(&mut session.resume.projects.0, index, item),
    }
}

/// Discards a pending suggestion without touching the document.
pub fn reject_suggestion(session: &mut EditSession, suggestion_id: Uuid) -> Result<(), AppError> {
    let position = session
        .pending
        .iter()
        .position(|s| s.id == suggestion_id)
        .ok_or_else(|| AppError::NotFound(format!("Suggestion {suggestion_id} not found")))?;
    session.pending.remove(position);
    Ok(())
}

/// Pops the newest snapshot and restores it verbatim.
pub fn undo_modification(session: &mut EditSession) -> Result<(), AppError> {
    let snapshot = session
        .snapshots
        .pop()
        .ok_or_else(|| AppError::Validation("No modification to undo".to_string()))?;
    restore_snapshot(&mut session.resume, snapshot);
    Ok(())
}

pub fn apply_modification(resume: &mut ResumeRow, modification: ResumeModification) {
    if let Some(basic) = modification.basic_info {
        if basic.first_name.is_some() {
            resume.first_name = basic.first_name;
        }
        if basic.last_name.is_some() {
            resume.last_name = basic.last_name;
        }
        if basic.email.is_some() {
            resume.email = basic.email;
        }
        if basic.phone_number.is_some() {
            resume.phone_number = basic.phone_number;
        }
        if basic.location.is_some() {
            resume.location = basic.location;
        }
        if basic.website.is_some() {
            resume.website = basic.website;
        }
        if basic.linkedin_url.is_some() {
            resume.linkedin_url = basic.linkedin_url;
        }
        if basic.github_url.is_some() {
            resume.github_url = basic.github_url;
        }
    }
    if let Some(items) = modification.work_experience {
        resume.work_experience.0 = items;
    }
    if let Some(items) = modification.education {
        resume.education.0 = items;
    }
    if let Some(items) = modification.skills {
        resume.skills.0 = items;
    }
    if let Some(items) = modification.projects {
        resume.projects.0 = items;
    }
}

/// Everything except row identity and timestamps comes back from the
/// snapshot.
fn restore_snapshot(resume: &mut ResumeRow, snapshot: ResumeRow) {
    resume.name = snapshot.name;
    resume.target_role = snapshot.target_role;
    resume.is_base_resume = snapshot.is_base_resume;
    resume.first_name = snapshot.first_name;
    resume.last_name = snapshot.last_name;
    resume.email = snapshot.email;
    resume.phone_number = snapshot.phone_number;
    resume.location = snapshot.location;
    resume.website = snapshot.website;
    resume.linkedin_url = snapshot.linkedin_url;
    resume.github_url = snapshot.github_url;
    resume.work_experience = snapshot.work_experience;
    resume.education = snapshot.education;
    resume.skills = snapshot.skills;
    resume.projects = snapshot.projects;
    resume.job_id = snapshot.job_id;
    resume.has_cover_letter = snapshot.has_cover_letter;
}

fn replace_at<T>(items: &mut [T], index: usize, item: T) -> Result<(), AppError> {
    let slot = items.get_mut(index).ok_or_else(|| {
        AppError::Validation(format!("Item index {index} is out of bounds"))
    })?;
    *slot = item;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::tools::BasicInfoPatch;
    use chrono::Utc;
    use sqlx::types::Json;

    fn sample_resume() -> ResumeRow {
        ResumeRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Engineer".to_string(),
            target_role: Some("Engineer".to_string()),
            is_base_resume: true,
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            email: None,
            phone_number: None,
            location: None,
            website: None,
            linkedin_url: None,
            github_url: None,
            work_experience: Json(vec![WorkExperience {
                company: "Acme".to_string(),
                position: "Engineer".to_string(),
                date: "2020".to_string(),
                description: vec!["Original bullet".to_string()],
                ..Default::default()
            }]),
            education: Json(vec![]),
            skills: Json(vec![Skill {
                category: "Languages".to_string(),
                items: vec!["Rust".to_string()],
            }]),
            projects: Json(vec![]),
            job_id: None,
            has_cover_letter: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn session_for(resume: ResumeRow) -> EditSession {
        EditSession {
            id: Uuid::new_v4(),
            user_id: resume.user_id,
            resume,
            pending: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    fn modify_skills(items: Vec<Skill>) -> ToolCall {
        ToolCall::ModifyWholeResume(ResumeModification {
            skills: Some(items),
            ..Default::default()
        })
    }

    #[test]
    fn test_modify_then_undo_restores_verbatim() {
        let resume = sample_resume();
        let before = resume.clone();
        let mut session = session_for(resume);

        apply_tool(
            &mut session,
            ToolCall::ModifyWholeResume(ResumeModification {
                basic_info: Some(BasicInfoPatch {
                    first_name: Some("Grace".to_string()),
                    ..Default::default()
                }),
                skills: Some(vec![]),
                ..Default::default()
            }),
        );
        assert_eq!(session.resume.first_name.as_deref(), Some("Grace"));
        assert!(session.resume.skills.0.is_empty());

        undo_modification(&mut session).unwrap();
        assert_eq!(session.resume.first_name, before.first_name);
        assert_eq!(session.resume.skills.0, before.skills.0);
        // Untouched fields survived the round trip too.
        assert_eq!(session.resume.last_name, before.last_name);
        assert_eq!(session.resume.work_experience.0, before.work_experience.0);
    }

    #[test]
    fn test_stacked_modifications_undo_in_lifo_order() {
        let mut session = session_for(sample_resume());

        apply_tool(
            &mut session,
            modify_skills(vec![Skill {
                category: "First".to_string(),
                items: vec![],
            }]),
        );
        apply_tool(
            &mut session,
            modify_skills(vec![Skill {
                category: "Second".to_string(),
                items: vec![],
            }]),
        );
        assert_eq!(session.snapshots.len(), 2);
        assert_eq!(session.resume.skills.0[0].category, "Second");

        undo_modification(&mut session).unwrap();
        assert_eq!(session.resume.skills.0[0].category, "First");

        undo_modification(&mut session).unwrap();
        assert_eq!(session.resume.skills.0[0].category, "Languages");
        assert!(session.snapshots.is_empty());
    }

    #[test]
    fn test_undo_with_empty_stack_errors() {
        let mut session = session_for(sample_resume());
        let err = undo_modification(&mut session);
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_accept_applies_at_index() {
        let mut session = session_for(sample_resume());

        let outcome = apply_tool(
            &mut session,
            ToolCall::SuggestWorkExperience {
                index: 0,
                improved: WorkExperience {
                    company: "Acme".to_string(),
                    position: "Staff Engineer".to_string(),
                    date: "2020".to_string(),
                    description: vec!["Improved bullet".to_string()],
                    ..Default::default()
                },
            },
        );
        let suggestion_id = match outcome {
            ToolOutcome::Suggestion { suggestion } => suggestion.id,
            other => panic!("expected suggestion, got {other:?}"),
        };

        accept_suggestion(&mut session, suggestion_id).unwrap();
        assert_eq!(session.resume.work_experience.0[0].position, "Staff Engineer");
        assert!(session.pending.is_empty());
    }

    #[test]
    fn test_reject_discards_without_applying() {
        let mut session = session_for(sample_resume());

        let outcome = apply_tool(
            &mut session,
            ToolCall::SuggestSkill {
                index: 0,
                improved: Skill {
                    category: "Everything".to_string(),
                    items: vec![],
                },
            },
        );
        let suggestion_id = match outcome {
            ToolOutcome::Suggestion { suggestion } => suggestion.id,
            other => panic!("expected suggestion, got {other:?}"),
        };

        reject_suggestion(&mut session, suggestion_id).unwrap();
        assert_eq!(session.resume.skills.0[0].category, "Languages");
        assert!(session.pending.is_empty());
    }

    #[test]
    fn test_accept_after_collection_shrank_fails_validation() {
        let mut session = session_for(sample_resume());

        let outcome = apply_tool(
            &mut session,
            ToolCall::SuggestWorkExperience {
                index: 0,
                improved: WorkExperience {
                    company: "Acme".to_string(),
                    position: "Staff Engineer".to_string(),
                    ..Default::default()
                },
            },
        );
        let suggestion_id = match outcome {
            ToolOutcome::Suggestion { suggestion } => suggestion.id,
            other => panic!("expected suggestion, got {other:?}"),
        };

        // A later modification empties the collection the suggestion targets.
        apply_tool(
            &mut session,
            ToolCall::ModifyWholeResume(ResumeModification {
                work_experience: Some(vec![]),
                ..Default::default()
            }),
        );

        let err = accept_suggestion(&mut session, suggestion_id);
        assert!(matches!(err, Err(AppError::Validation(_))));
        // Resolved either way.
        assert!(session.pending.is_empty());
    }

    #[test]
    fn test_accept_unknown_suggestion_not_found() {
        let mut session = session_for(sample_resume());
        let err = accept_suggestion(&mut session, Uuid::new_v4());
        assert!(matches!(err, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_store_reopening_replaces_stale_session() {
        let store = SessionStore::default();
        let resume = sample_resume();
        let user_id = resume.user_id;

        let first = store.open(resume.clone()).await;
        let second = store.open(resume).await;
        assert_ne!(first, second);

        let err = store.with_session(first, user_id, |_| Ok(())).await;
        assert!(matches!(err, Err(AppError::NotFound(_))));
        store.with_session(second, user_id, |_| Ok(())).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_sessions_are_owner_scoped() {
        let store = SessionStore::default();
        let resume = sample_resume();
        let owner = resume.user_id;
        let session_id = store.open(resume).await;

        let err = store.with_session(session_id, Uuid::new_v4(), |_| Ok(())).await;
        assert!(matches!(err, Err(AppError::NotFound(_))));

        let err = store.close(session_id, Uuid::new_v4()).await;
        assert!(matches!(err, Err(AppError::NotFound(_))));

        store.close(session_id, owner).await.unwrap();
        let err = store.with_session(session_id, owner, |_| Ok(())).await;
        assert!(matches!(err, Err(AppError::NotFound(_))));
    }
}
