//! Pure evaluation of transition conditions. Safe to call repeatedly from
//! status polling; never mutates and never fails.

use serde_json::Value;

use super::instance::WorkflowInstance;
use super::template::{StateDef, TransitionCondition};

/// Evaluate a condition for an instance sitting in `state`.
pub fn evaluate(
    condition: &TransitionCondition,
    state: &StateDef,
    instance: &WorkflowInstance,
) -> bool {
    match condition {
        TransitionCondition::Always => true,
        TransitionCondition::AllStepsApproved => state
            .steps
            .iter()
            .all(|step| instance.is_step_complete(&state.code, step.index)),
        TransitionCondition::AnyStepApproved => state
            .steps
            .iter()
            .any(|step| instance.is_step_complete(&state.code, step.index)),
        TransitionCondition::FieldValue {
            field_path,
            expected_value,
        } => resolve_path(&instance.data, field_path) == Some(expected_value),
    }
}

/// Resolve a dotted path against a JSON document. Missing segments resolve to
/// `None`; they never raise.
pub(crate) fn resolve_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(data, |node, key| node.as_object()?.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::approval::instance::{StepCompletion, WorkflowId};
    use crate::workflows::approval::template::{StateKind, StepDef};
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn review_state() -> StateDef {
        StateDef {
            code: "Form3".to_string(),
            name: "Ownership review".to_string(),
            kind: StateKind::Form,
            form_number: Some(3),
            order: 5,
            steps: vec![
                StepDef {
                    index: 0,
                    name: "Contracts lead sign-off".to_string(),
                    required_roles: vec!["LC_CONTRACTS_ASSEMBLIES_LEAD".to_string()],
                },
                StepDef {
                    index: 1,
                    name: "Urbanism lead sign-off".to_string(),
                    required_roles: vec!["RE_TECH_URBANISM_LEAD".to_string()],
                },
            ],
        }
    }

    fn instance_with(data: Value, completed: &[(&str, u32)]) -> WorkflowInstance {
        let mut completed_steps: BTreeMap<String, BTreeMap<u32, StepCompletion>> = BTreeMap::new();
        for (state, index) in completed {
            completed_steps.entry(state.to_string()).or_default().insert(
                *index,
                StepCompletion {
                    performed_by: "u1".to_string(),
                    performed_by_username: "u1".to_string(),
                    role_code: None,
                    performed_at: Utc::now(),
                },
            );
        }

        WorkflowInstance {
            id: WorkflowId("wf-000001".to_string()),
            template_code: "property_acquisition".to_string(),
            title: "Parcel".to_string(),
            current_state: "Form3".to_string(),
            data,
            completed_steps,
            history: Vec::new(),
            comments: Vec::new(),
            created_by: "u1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
            deleted: false,
        }
    }

    #[test]
    fn all_steps_requires_every_index() {
        let state = review_state();
        let condition = TransitionCondition::AllStepsApproved;

        let none = instance_with(json!({}), &[]);
        let partial = instance_with(json!({}), &[("Form3", 0)]);
        let full = instance_with(json!({}), &[("Form3", 0), ("Form3", 1)]);

        assert!(!evaluate(&condition, &state, &none));
        assert!(!evaluate(&condition, &state, &partial));
        assert!(evaluate(&condition, &state, &full));
    }

    #[test]
    fn all_steps_is_vacuously_true_for_zero_step_state() {
        let mut state = review_state();
        state.steps.clear();
        let instance = instance_with(json!({}), &[]);
        assert!(evaluate(&TransitionCondition::AllStepsApproved, &state, &instance));
    }

    #[test]
    fn any_step_requires_at_least_one() {
        let state = review_state();
        let condition = TransitionCondition::AnyStepApproved;

        assert!(!evaluate(&condition, &state, &instance_with(json!({}), &[])));
        assert!(evaluate(
            &condition,
            &state,
            &instance_with(json!({}), &[("Form3", 1)])
        ));
    }

    #[test]
    fn field_value_matches_strict_equality() {
        let state = review_state();
        let condition = TransitionCondition::FieldValue {
            field_path: "roleAndOwnership.role".to_string(),
            expected_value: json!("owner"),
        };

        let owner = instance_with(json!({"roleAndOwnership": {"role": "owner"}}), &[]);
        let agent = instance_with(json!({"roleAndOwnership": {"role": "agent"}}), &[]);
        let missing = instance_with(json!({}), &[]);

        assert!(evaluate(&condition, &state, &owner));
        assert!(!evaluate(&condition, &state, &agent));
        assert!(!evaluate(&condition, &state, &missing));
    }

    #[test]
    fn field_value_does_not_coerce_types() {
        let state = review_state();
        let condition = TransitionCondition::FieldValue {
            field_path: "propertyDetails.area".to_string(),
            expected_value: json!(250),
        };

        let numeric = instance_with(json!({"propertyDetails": {"area": 250}}), &[]);
        let stringly = instance_with(json!({"propertyDetails": {"area": "250"}}), &[]);

        assert!(evaluate(&condition, &state, &numeric));
        assert!(!evaluate(&condition, &state, &stringly));
    }

    #[test]
    fn resolve_path_walks_nested_objects_only() {
        let data = json!({"a": {"b": {"c": 1}}, "list": [1, 2]});
        assert_eq!(resolve_path(&data, "a.b.c"), Some(&json!(1)));
        assert_eq!(resolve_path(&data, "a.b.missing"), None);
        assert_eq!(resolve_path(&data, "list.0"), None);
    }
}
