//! Derived status and transition planning. Everything here is a pure read over
//! the template, the instance, and the grant table; the service facade applies
//! the resulting writes through the store.

use serde::Serialize;

use super::conditions::evaluate;
use super::identity::UserContext;
use super::instance::WorkflowInstance;
use super::permissions::{PermissionSet, PermissionType};
use super::service::ApprovalError;
use super::template::{StateDef, StateKind, TransitionDef, WorkflowTemplate};

/// The gate blocking the instance right now: which step, and a role able to
/// satisfy it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredApprover {
    pub role_code: String,
    pub step_index: u32,
}

/// Snapshot of an instance's position, recomputed on every read.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub instance_id: String,
    pub title: String,
    pub current_state: String,
    pub state_name: String,
    pub state_kind: StateKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_number: Option<u32>,
    pub can_approve: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_approver: Option<RequiredApprover>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_step: Option<u32>,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub will_auto_advance: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_state_if_complete: Option<String>,
    pub is_terminal: bool,
}

/// One outgoing transition with its current condition verdict.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionView {
    pub transition_id: String,
    pub to_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub condition_type: &'static str,
    pub condition_met: bool,
}

pub(crate) fn current_state<'a>(
    template: &'a WorkflowTemplate,
    instance: &WorkflowInstance,
) -> Result<&'a StateDef, ApprovalError> {
    template
        .state(&instance.current_state)
        .ok_or_else(|| ApprovalError::UnknownState(instance.current_state.clone()))
}

/// Lowest incomplete step index. Steps complete in any order, so this is a
/// display hint rather than a gate.
pub(crate) fn pending_step<'a>(
    state: &'a StateDef,
    instance: &WorkflowInstance,
) -> Option<&'a super::template::StepDef> {
    state
        .steps
        .iter()
        .filter(|step| !instance.is_step_complete(&state.code, step.index))
        .min_by_key(|step| step.index)
}

pub(crate) fn all_steps_complete(state: &StateDef, instance: &WorkflowInstance) -> bool {
    state
        .steps
        .iter()
        .all(|step| instance.is_step_complete(&state.code, step.index))
}

/// Target of the linear fallback: only states without explicit transitions
/// advance by `order`.
pub(crate) fn auto_advance_target<'a>(
    template: &'a WorkflowTemplate,
    state_code: &str,
) -> Option<&'a StateDef> {
    if !template.transitions_from(state_code).is_empty() {
        return None;
    }
    template.next_state_by_order(state_code)
}

pub fn status(
    template: &WorkflowTemplate,
    instance: &WorkflowInstance,
    permissions: &PermissionSet,
    user: &UserContext,
) -> Result<StatusView, ApprovalError> {
    let state = current_state(template, instance)?;

    let can_approve = state.steps.iter().any(|step| {
        !instance.is_step_complete(&state.code, step.index)
            && (user.is_superuser || user.holds_any(&step.required_roles))
            && permissions.step_approve_allows(user, &instance.created_by, &state.code, step.index)
    });

    let pending = pending_step(state, instance);
    let required_approver = pending.and_then(|step| {
        step.required_roles.first().map(|role| RequiredApprover {
            role_code: role.clone(),
            step_index: step.index,
        })
    });

    let fallback_target = auto_advance_target(template, &state.code);
    let is_terminal = template.transitions_from(&state.code).is_empty()
        && template.next_state_by_order(&state.code).is_none();

    Ok(StatusView {
        instance_id: instance.id.to_string(),
        title: instance.title.clone(),
        current_state: state.code.clone(),
        state_name: state.name.clone(),
        state_kind: state.kind,
        form_number: state.form_number,
        can_approve,
        required_approver,
        pending_step: pending.map(|step| step.index),
        total_steps: state.steps.len(),
        completed_steps: instance.completed_in_state(&state.code),
        will_auto_advance: fallback_target.is_some(),
        next_state_if_complete: fallback_target.map(|target| target.code.clone()),
        is_terminal,
    })
}

pub fn available_transitions(
    template: &WorkflowTemplate,
    instance: &WorkflowInstance,
) -> Result<Vec<TransitionView>, ApprovalError> {
    let state = current_state(template, instance)?;

    Ok(template
        .transitions_from(&state.code)
        .into_iter()
        .map(|transition| TransitionView {
            transition_id: transition.id.clone(),
            to_state: transition.to_state.clone(),
            label: transition.label.clone(),
            condition_type: transition.condition.condition_type(),
            condition_met: evaluate(&transition.condition, state, instance),
        })
        .collect())
}

/// Validate a requested transition without applying it. Checks run in order:
/// permission, existence/origin, condition.
pub fn plan_transition<'a>(
    template: &'a WorkflowTemplate,
    instance: &WorkflowInstance,
    permissions: &PermissionSet,
    user: &UserContext,
    transition_id: &str,
) -> Result<&'a TransitionDef, ApprovalError> {
    let state = current_state(template, instance)?;

    if !permissions.state_allows(
        user,
        &instance.created_by,
        &state.code,
        PermissionType::Transition,
    ) {
        return Err(ApprovalError::PermissionDenied {
            permission: PermissionType::Transition,
        });
    }

    let transition = template
        .transition(transition_id)
        .filter(|transition| transition.from_state == state.code)
        .ok_or_else(|| ApprovalError::InvalidTransition(transition_id.to_string()))?;

    if !evaluate(&transition.condition, state, instance) {
        return Err(ApprovalError::ConditionNotMet(transition.id.clone()));
    }

    Ok(transition)
}
