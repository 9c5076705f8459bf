use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::template::WorkflowTemplate;

/// Opaque identifier for a running workflow instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(pub String);

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audit record for one completed approval step. Written once, never altered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCompletion {
    pub performed_by: String,
    pub performed_by_username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_code: Option<String>,
    pub performed_at: DateTime<Utc>,
}

/// Audit record for one applied state change. `transition_id` is empty for the
/// linear fallback advance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_state: String,
    pub to_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_id: Option<String>,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub author_username: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// One running occurrence of a template, with its own state, accumulated form
/// data, and audit trail.
///
/// Mutations go through the service facade and land in the store as a single
/// versioned write; `version` is the check-and-set token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: WorkflowId,
    pub template_code: String,
    pub title: String,
    pub current_state: String,
    pub data: Value,
    pub completed_steps: BTreeMap<String, BTreeMap<u32, StepCompletion>>,
    pub history: Vec<TransitionRecord>,
    pub comments: Vec<Comment>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    #[serde(default)]
    pub deleted: bool,
}

impl WorkflowInstance {
    pub fn new(
        id: WorkflowId,
        template: &WorkflowTemplate,
        title: impl Into<String>,
        created_by: impl Into<String>,
        initial_data: Option<Map<String, Value>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            template_code: template.code.clone(),
            title: title.into(),
            current_state: template.initial_state().code.clone(),
            data: Value::Object(initial_data.unwrap_or_default()),
            completed_steps: BTreeMap::new(),
            history: Vec::new(),
            comments: Vec::new(),
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
            version: 0,
            deleted: false,
        }
    }

    pub fn is_step_complete(&self, state_code: &str, step_index: u32) -> bool {
        self.completed_steps
            .get(state_code)
            .map_or(false, |steps| steps.contains_key(&step_index))
    }

    pub fn completed_in_state(&self, state_code: &str) -> usize {
        self.completed_steps
            .get(state_code)
            .map_or(0, BTreeMap::len)
    }

    /// Append a completion record. Refuses to overwrite: the audit trail is
    /// append-only and the caller surfaces the duplicate as an error.
    pub(crate) fn record_step(
        &mut self,
        state_code: &str,
        step_index: u32,
        completion: StepCompletion,
    ) -> bool {
        let steps = self
            .completed_steps
            .entry(state_code.to_string())
            .or_default();
        if steps.contains_key(&step_index) {
            return false;
        }
        steps.insert(step_index, completion);
        true
    }

    /// Apply a state change and append its audit record. Records for previous
    /// states stay in `completed_steps` untouched.
    pub(crate) fn enter_state(
        &mut self,
        to_state: &str,
        transition_id: Option<String>,
        performed_by: &str,
    ) {
        self.history.push(TransitionRecord {
            from_state: self.current_state.clone(),
            to_state: to_state.to_string(),
            transition_id,
            performed_by: performed_by.to_string(),
            performed_at: Utc::now(),
        });
        self.current_state = to_state.to_string();
    }

    pub(crate) fn add_comment(&mut self, author: &str, author_username: &str, body: String) {
        self.comments.push(Comment {
            author: author.to_string(),
            author_username: author_username.to_string(),
            body,
            created_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::approval::blueprint;

    fn completion(user: &str) -> StepCompletion {
        StepCompletion {
            performed_by: user.to_string(),
            performed_by_username: user.to_string(),
            role_code: None,
            performed_at: Utc::now(),
        }
    }

    #[test]
    fn new_instance_starts_in_initial_state() {
        let template = blueprint::standard_template();
        let instance = WorkflowInstance::new(
            WorkflowId("wf-000001".to_string()),
            &template,
            "Parcel 42 acquisition",
            "u1",
            None,
        );
        assert_eq!(instance.current_state, template.initial_state().code);
        assert_eq!(instance.version, 0);
        assert!(instance.history.is_empty());
    }

    #[test]
    fn record_step_refuses_duplicates() {
        let template = blueprint::standard_template();
        let mut instance = WorkflowInstance::new(
            WorkflowId("wf-000002".to_string()),
            &template,
            "Parcel 7",
            "u1",
            None,
        );

        assert!(instance.record_step("ApplicantRequest", 0, completion("u2")));
        assert!(!instance.record_step("ApplicantRequest", 0, completion("u3")));

        let recorded = &instance.completed_steps["ApplicantRequest"][&0];
        assert_eq!(recorded.performed_by, "u2");
    }

    #[test]
    fn enter_state_keeps_past_step_audit() {
        let template = blueprint::standard_template();
        let mut instance = WorkflowInstance::new(
            WorkflowId("wf-000003".to_string()),
            &template,
            "Parcel 7",
            "u1",
            None,
        );
        instance.record_step("ApplicantRequest", 0, completion("u2"));
        instance.enter_state("CEOInstruction", Some("t01".to_string()), "u2");

        assert_eq!(instance.current_state, "CEOInstruction");
        assert_eq!(instance.completed_in_state("ApplicantRequest"), 1);
        assert_eq!(instance.history.len(), 1);
        assert_eq!(instance.history[0].from_state, "ApplicantRequest");
    }
}
