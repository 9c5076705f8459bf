use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Behavioral category of a state within a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Form,
    Approval,
    Decision,
    Action,
}

impl StateKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Form => "Form",
            Self::Approval => "Approval",
            Self::Decision => "Decision",
            Self::Action => "Action",
        }
    }
}

/// One approval gate inside a state, satisfied by any of its roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDef {
    pub index: u32,
    pub name: String,
    pub required_roles: Vec<String>,
}

/// A named stage in the process. Form-kind states bind the form they collect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDef {
    pub code: String,
    pub name: String,
    pub kind: StateKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_number: Option<u32>,
    pub order: u32,
    pub steps: Vec<StepDef>,
}

impl StateDef {
    pub fn step(&self, index: u32) -> Option<&StepDef> {
        self.steps.iter().find(|step| step.index == index)
    }
}

/// Predicate guarding a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionCondition {
    Always,
    AllStepsApproved,
    AnyStepApproved,
    FieldValue {
        field_path: String,
        expected_value: Value,
    },
}

impl TransitionCondition {
    pub const fn condition_type(&self) -> &'static str {
        match self {
            Self::Always => "ALWAYS",
            Self::AllStepsApproved => "ALL_STEPS_APPROVED",
            Self::AnyStepApproved => "ANY_STEP_APPROVED",
            Self::FieldValue { .. } => "FIELD_VALUE",
        }
    }
}

/// Directed edge between two states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionDef {
    pub id: String,
    pub from_state: String,
    pub to_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub condition: TransitionCondition,
}

/// Immutable definition of states, steps, and transitions for a process type.
///
/// Construction validates referential integrity once; running instances rely on
/// every lookup here succeeding afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub code: String,
    pub name: String,
    pub description: String,
    states: Vec<StateDef>,
    transitions: Vec<TransitionDef>,
}

impl WorkflowTemplate {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        mut states: Vec<StateDef>,
        transitions: Vec<TransitionDef>,
    ) -> Result<Self, TemplateError> {
        if states.is_empty() {
            return Err(TemplateError::NoStates);
        }

        states.sort_by_key(|state| state.order);

        let mut codes = HashSet::new();
        for state in &states {
            if !codes.insert(state.code.clone()) {
                return Err(TemplateError::DuplicateState(state.code.clone()));
            }

            match (state.kind, state.form_number) {
                (StateKind::Form, None) => {
                    return Err(TemplateError::MissingFormNumber(state.code.clone()));
                }
                (StateKind::Form, Some(_)) => {}
                (kind, Some(_)) => {
                    return Err(TemplateError::UnexpectedFormNumber {
                        state: state.code.clone(),
                        kind: kind.label(),
                    });
                }
                (_, None) => {}
            }

            let mut indices = HashSet::new();
            for step in &state.steps {
                if !indices.insert(step.index) {
                    return Err(TemplateError::DuplicateStepIndex {
                        state: state.code.clone(),
                        index: step.index,
                    });
                }
            }
        }

        let mut transition_ids = HashSet::new();
        for transition in &transitions {
            if !transition_ids.insert(transition.id.clone()) {
                return Err(TemplateError::DuplicateTransition(transition.id.clone()));
            }
            for endpoint in [&transition.from_state, &transition.to_state] {
                if !codes.contains(endpoint.as_str()) {
                    return Err(TemplateError::UnknownState {
                        transition: transition.id.clone(),
                        state: endpoint.clone(),
                    });
                }
            }
        }

        Ok(Self {
            code: code.into(),
            name: name.into(),
            description: description.into(),
            states,
            transitions,
        })
    }

    pub fn states(&self) -> &[StateDef] {
        &self.states
    }

    pub fn transitions(&self) -> &[TransitionDef] {
        &self.transitions
    }

    pub fn state(&self, code: &str) -> Option<&StateDef> {
        self.states.iter().find(|state| state.code == code)
    }

    /// First state by `order`; `new` guarantees at least one exists.
    pub fn initial_state(&self) -> &StateDef {
        &self.states[0]
    }

    pub fn transition(&self, id: &str) -> Option<&TransitionDef> {
        self.transitions.iter().find(|t| t.id == id)
    }

    pub fn transitions_from(&self, state_code: &str) -> Vec<&TransitionDef> {
        self.transitions
            .iter()
            .filter(|t| t.from_state == state_code)
            .collect()
    }

    /// Successor in the linear ordering, used by the legacy fallback path.
    pub fn next_state_by_order(&self, state_code: &str) -> Option<&StateDef> {
        let position = self.states.iter().position(|s| s.code == state_code)?;
        self.states.get(position + 1)
    }

    /// Templates with explicit transitions drive the configurable engine; the
    /// rest advance linearly by `order`.
    pub fn is_configurable(&self) -> bool {
        !self.transitions.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template must define at least one state")]
    NoStates,
    #[error("duplicate state code {0}")]
    DuplicateState(String),
    #[error("duplicate transition id {0}")]
    DuplicateTransition(String),
    #[error("transition {transition} references unknown state {state}")]
    UnknownState { transition: String, state: String },
    #[error("form state {0} must bind a form number")]
    MissingFormNumber(String),
    #[error("{kind} state {state} must not bind a form number")]
    UnexpectedFormNumber { state: String, kind: &'static str },
    #[error("duplicate step index {index} in state {state}")]
    DuplicateStepIndex { state: String, index: u32 },
}

/// Lookup of registered templates by code. Immutable after construction.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, WorkflowTemplate>,
}

impl TemplateRegistry {
    pub fn new(templates: Vec<WorkflowTemplate>) -> Self {
        let templates = templates
            .into_iter()
            .map(|template| (template.code.clone(), template))
            .collect();
        Self { templates }
    }

    pub fn get(&self, code: &str) -> Option<&WorkflowTemplate> {
        self.templates.get(code)
    }

    pub fn codes(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(code: &str, order: u32, kind: StateKind, form: Option<u32>) -> StateDef {
        StateDef {
            code: code.to_string(),
            name: code.to_string(),
            kind,
            form_number: form,
            order,
            steps: Vec::new(),
        }
    }

    #[test]
    fn sorts_states_by_order_and_exposes_initial() {
        let template = WorkflowTemplate::new(
            "demo",
            "Demo",
            "",
            vec![
                state("second", 1, StateKind::Action, None),
                state("first", 0, StateKind::Action, None),
            ],
            Vec::new(),
        )
        .expect("valid template");

        assert_eq!(template.initial_state().code, "first");
        assert_eq!(template.next_state_by_order("first").unwrap().code, "second");
        assert!(template.next_state_by_order("second").is_none());
        assert!(!template.is_configurable());
    }

    #[test]
    fn rejects_form_state_without_form_number() {
        let result = WorkflowTemplate::new(
            "demo",
            "Demo",
            "",
            vec![state("intake", 0, StateKind::Form, None)],
            Vec::new(),
        );
        assert!(matches!(result, Err(TemplateError::MissingFormNumber(_))));
    }

    #[test]
    fn rejects_form_number_on_non_form_state() {
        let result = WorkflowTemplate::new(
            "demo",
            "Demo",
            "",
            vec![state("review", 0, StateKind::Approval, Some(2))],
            Vec::new(),
        );
        assert!(matches!(
            result,
            Err(TemplateError::UnexpectedFormNumber { .. })
        ));
    }

    #[test]
    fn rejects_transition_to_unknown_state() {
        let result = WorkflowTemplate::new(
            "demo",
            "Demo",
            "",
            vec![state("only", 0, StateKind::Action, None)],
            vec![TransitionDef {
                id: "t1".to_string(),
                from_state: "only".to_string(),
                to_state: "missing".to_string(),
                label: None,
                condition: TransitionCondition::Always,
            }],
        );
        assert!(matches!(result, Err(TemplateError::UnknownState { .. })));
    }

    #[test]
    fn condition_serializes_with_screaming_tags() {
        let condition = TransitionCondition::FieldValue {
            field_path: "roleAndOwnership.role".to_string(),
            expected_value: serde_json::json!("owner"),
        };
        let encoded = serde_json::to_value(&condition).expect("serializes");
        assert_eq!(encoded["type"], "FIELD_VALUE");
        assert_eq!(encoded["field_path"], "roleAndOwnership.role");
        assert_eq!(condition.condition_type(), "FIELD_VALUE");
    }
}
