//! Facade over templates, forms, permissions, and the instance store. Every
//! mutation loads a fresh copy, applies the change, and writes it back as one
//! versioned check-and-set; a lost race surfaces as `ConcurrentModification`
//! and the caller retries against the new state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::engine::{self, StatusView, TransitionView};
use super::forms::{FormBinder, FormDataView, FormError};
use super::identity::UserContext;
use super::instance::{
    Comment, StepCompletion, TransitionRecord, WorkflowId, WorkflowInstance,
};
use super::permissions::{PermissionRule, PermissionSet, PermissionType};
use super::store::{InstanceStore, StoreError};
use super::template::{TemplateRegistry, WorkflowTemplate};

#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("workflow {0} not found")]
    InstanceNotFound(String),
    #[error("template {0} is not registered")]
    TemplateNotFound(String),
    #[error("instance references unknown state {0}")]
    UnknownState(String),
    #[error("{permission} permission denied")]
    PermissionDenied { permission: PermissionType },
    #[error("step requires one of roles {needed_roles:?}")]
    RoleNotAuthorized { needed_roles: Vec<String> },
    #[error("transition {0} is not available from the current state")]
    InvalidTransition(String),
    #[error("condition on transition {0} is not met")]
    ConditionNotMet(String),
    #[error("step {step} in state {state} is already complete")]
    StepAlreadyComplete { state: String, step: u32 },
    #[error("state {state} has no step {step}")]
    UnknownStep { state: String, step: u32 },
    #[error("no pending step in state {state}")]
    NoPendingStep { state: String },
    #[error("workflow changed underneath this request, reload and retry")]
    ConcurrentModification,
    #[error("permission rule {0} not found")]
    RuleNotFound(String),
    #[error("superuser privileges required")]
    SuperuserRequired,
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for ApprovalError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict => Self::ConcurrentModification,
            other => Self::Storage(other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowRequest {
    pub title: String,
    #[serde(default)]
    pub template_code: Option<String>,
    #[serde(default)]
    pub initial_data: Option<Map<String, Value>>,
}

/// Full detail payload for one instance.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowInfoView {
    pub id: String,
    pub template_code: String,
    pub template_name: String,
    pub is_configurable: bool,
    pub title: String,
    pub current_state: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    pub data: Value,
    pub completed_steps: Value,
    pub history: Vec<TransitionRecord>,
}

impl WorkflowInfoView {
    fn from_instance(instance: &WorkflowInstance, template: &WorkflowTemplate) -> Self {
        Self {
            id: instance.id.to_string(),
            template_code: instance.template_code.clone(),
            template_name: template.name.clone(),
            is_configurable: template.is_configurable(),
            title: instance.title.clone(),
            current_state: instance.current_state.clone(),
            created_by: instance.created_by.clone(),
            created_at: instance.created_at,
            updated_at: instance.updated_at,
            version: instance.version,
            data: instance.data.clone(),
            completed_steps: serde_json::to_value(&instance.completed_steps)
                .unwrap_or(Value::Null),
            history: instance.history.clone(),
        }
    }
}

/// Result of a step completion, including whether the linear fallback moved
/// the instance forward in the same write.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionView {
    pub completed_step: u32,
    pub auto_advanced: bool,
    pub status: StatusView,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormAccessView {
    #[serde(flatten)]
    pub form: FormDataView,
    pub can_edit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormSubmissionView {
    pub form_code: String,
    pub schema_version: u32,
    pub instance_version: u64,
}

/// One actionable row in a user's work queue.
#[derive(Debug, Clone, Serialize)]
pub struct InboxEntry {
    pub id: String,
    pub title: String,
    pub current_state: String,
    pub state_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_step: Option<u32>,
    pub can_approve: bool,
    pub is_own: bool,
    pub updated_at: DateTime<Utc>,
}

pub struct ApprovalService<S: InstanceStore> {
    templates: TemplateRegistry,
    binder: FormBinder,
    permissions: RwLock<PermissionSet>,
    store: Arc<S>,
    default_template: String,
    sequence: AtomicU64,
}

impl<S: InstanceStore> ApprovalService<S> {
    pub fn new(
        templates: TemplateRegistry,
        binder: FormBinder,
        permissions: PermissionSet,
        store: Arc<S>,
        default_template: impl Into<String>,
    ) -> Self {
        Self {
            templates,
            binder,
            permissions: RwLock::new(permissions),
            store,
            default_template: default_template.into(),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn binder(&self) -> &FormBinder {
        &self.binder
    }

    fn next_id(&self) -> WorkflowId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        WorkflowId(format!("wf-{id:06}"))
    }

    fn load(&self, id: &WorkflowId) -> Result<WorkflowInstance, ApprovalError> {
        let instance = self
            .store
            .fetch(id)?
            .ok_or_else(|| ApprovalError::InstanceNotFound(id.to_string()))?;
        if instance.deleted {
            return Err(ApprovalError::InstanceNotFound(id.to_string()));
        }
        Ok(instance)
    }

    fn template_for(
        &self,
        instance: &WorkflowInstance,
    ) -> Result<&WorkflowTemplate, ApprovalError> {
        self.templates
            .get(&instance.template_code)
            .ok_or_else(|| ApprovalError::TemplateNotFound(instance.template_code.clone()))
    }

    fn grants(&self) -> std::sync::RwLockReadGuard<'_, PermissionSet> {
        self.permissions.read().expect("permission table lock poisoned")
    }

    fn require_view(
        &self,
        user: &UserContext,
        instance: &WorkflowInstance,
    ) -> Result<(), ApprovalError> {
        let allowed = user.id == instance.created_by
            || self.grants().state_allows(
                user,
                &instance.created_by,
                &instance.current_state,
                PermissionType::View,
            );
        if allowed {
            Ok(())
        } else {
            Err(ApprovalError::PermissionDenied {
                permission: PermissionType::View,
            })
        }
    }

    pub fn create(
        &self,
        user: &UserContext,
        request: CreateWorkflowRequest,
    ) -> Result<WorkflowInfoView, ApprovalError> {
        let template_code = request
            .template_code
            .unwrap_or_else(|| self.default_template.clone());
        let template = self
            .templates
            .get(&template_code)
            .ok_or_else(|| ApprovalError::TemplateNotFound(template_code.clone()))?;

        let instance = WorkflowInstance::new(
            self.next_id(),
            template,
            request.title,
            &user.id,
            request.initial_data,
        );
        let stored = self.store.insert(instance)?;

        info!(
            workflow = %stored.id,
            template = %stored.template_code,
            created_by = %user.username,
            "workflow created"
        );
        Ok(WorkflowInfoView::from_instance(&stored, template))
    }

    pub fn workflow_info(
        &self,
        user: &UserContext,
        id: &WorkflowId,
    ) -> Result<WorkflowInfoView, ApprovalError> {
        let instance = self.load(id)?;
        self.require_view(user, &instance)?;
        let template = self.template_for(&instance)?;
        Ok(WorkflowInfoView::from_instance(&instance, template))
    }

    pub fn status(
        &self,
        user: &UserContext,
        id: &WorkflowId,
    ) -> Result<StatusView, ApprovalError> {
        let instance = self.load(id)?;
        self.require_view(user, &instance)?;
        let template = self.template_for(&instance)?;
        engine::status(template, &instance, &self.grants(), user)
    }

    pub fn available_transitions(
        &self,
        user: &UserContext,
        id: &WorkflowId,
    ) -> Result<Vec<TransitionView>, ApprovalError> {
        let instance = self.load(id)?;
        self.require_view(user, &instance)?;
        let template = self.template_for(&instance)?;
        engine::available_transitions(template, &instance)
    }

    /// Apply a named transition. The permission, origin, and condition checks
    /// all run against the freshly loaded copy, then the move lands as one
    /// versioned write.
    pub fn perform_transition(
        &self,
        user: &UserContext,
        id: &WorkflowId,
        transition_id: &str,
    ) -> Result<StatusView, ApprovalError> {
        let mut instance = self.load(id)?;
        let template = self.template_for(&instance)?;
        let expected_version = instance.version;

        let transition = {
            let grants = self.grants();
            engine::plan_transition(template, &instance, &grants, user, transition_id)?
        };
        let to_state = transition.to_state.clone();
        let applied_id = transition.id.clone();

        instance.enter_state(&to_state, Some(applied_id.clone()), &user.id);
        let stored = self.store.update(instance, expected_version)?;

        info!(
            workflow = %stored.id,
            transition = %applied_id,
            to_state = %to_state,
            performed_by = %user.username,
            "transition applied"
        );
        engine::status(template, &stored, &self.grants(), user)
    }

    /// Complete one approval step. With no explicit index the lowest incomplete
    /// step is taken. On templates without outgoing transitions, completing the
    /// last step advances the instance to the next state by order inside the
    /// same write.
    pub fn complete_step(
        &self,
        user: &UserContext,
        id: &WorkflowId,
        step_index: Option<u32>,
    ) -> Result<CompletionView, ApprovalError> {
        let mut instance = self.load(id)?;
        let template = self.template_for(&instance)?;
        let expected_version = instance.version;
        let state = engine::current_state(template, &instance)?;

        let step = match step_index {
            Some(index) => {
                let step = state.step(index).ok_or(ApprovalError::UnknownStep {
                    state: state.code.clone(),
                    step: index,
                })?;
                if instance.is_step_complete(&state.code, index) {
                    return Err(ApprovalError::StepAlreadyComplete {
                        state: state.code.clone(),
                        step: index,
                    });
                }
                step
            }
            None => engine::pending_step(state, &instance).ok_or_else(|| {
                ApprovalError::NoPendingStep {
                    state: state.code.clone(),
                }
            })?,
        };

        if !user.is_superuser && !user.holds_any(&step.required_roles) {
            return Err(ApprovalError::RoleNotAuthorized {
                needed_roles: step.required_roles.clone(),
            });
        }
        if !self
            .grants()
            .step_approve_allows(user, &instance.created_by, &state.code, step.index)
        {
            return Err(ApprovalError::PermissionDenied {
                permission: PermissionType::Approve,
            });
        }

        let completed_index = step.index;
        instance.record_step(
            &state.code,
            completed_index,
            StepCompletion {
                performed_by: user.id.clone(),
                performed_by_username: user.username.clone(),
                role_code: user.matching_role(&step.required_roles),
                performed_at: Utc::now(),
            },
        );

        let mut auto_advanced = false;
        if engine::all_steps_complete(state, &instance) {
            if let Some(target) = engine::auto_advance_target(template, &state.code) {
                let target_code = target.code.clone();
                instance.enter_state(&target_code, None, &user.id);
                auto_advanced = true;
            }
        }

        let stored = self.store.update(instance, expected_version)?;

        info!(
            workflow = %stored.id,
            state = %state.code,
            step = completed_index,
            performed_by = %user.username,
            auto_advanced,
            "step completed"
        );
        Ok(CompletionView {
            completed_step: completed_index,
            auto_advanced,
            status: engine::status(template, &stored, &self.grants(), user)?,
        })
    }

    /// Saved form data or an inheritance pre-fill, plus the caller's edit
    /// verdict so clients can render read-only views.
    pub fn form_data(
        &self,
        user: &UserContext,
        id: &WorkflowId,
        form_code: &str,
    ) -> Result<FormAccessView, ApprovalError> {
        let instance = self.load(id)?;
        let schema = self.binder.schema(form_code)?;

        let grants = self.grants();
        if !grants.form_allows(
            user,
            &instance.created_by,
            schema.form_number,
            &instance.current_state,
            PermissionType::View,
        ) {
            return Err(ApprovalError::PermissionDenied {
                permission: PermissionType::View,
            });
        }
        let can_edit = grants.form_allows(
            user,
            &instance.created_by,
            schema.form_number,
            &instance.current_state,
            PermissionType::Edit,
        );
        drop(grants);

        Ok(FormAccessView {
            form: self.binder.form_view(form_code, &instance)?,
            can_edit,
        })
    }

    /// Validate and persist one form submission under its namespace.
    pub fn submit_form(
        &self,
        user: &UserContext,
        id: &WorkflowId,
        form_code: &str,
        data: Map<String, Value>,
    ) -> Result<FormSubmissionView, ApprovalError> {
        let mut instance = self.load(id)?;
        let expected_version = instance.version;
        let schema = self.binder.schema(form_code)?;

        if !self.grants().form_allows(
            user,
            &instance.created_by,
            schema.form_number,
            &instance.current_state,
            PermissionType::Edit,
        ) {
            return Err(ApprovalError::PermissionDenied {
                permission: PermissionType::Edit,
            });
        }

        let schema_version = self.binder.submit(form_code, &mut instance, data)?;
        let stored = self.store.update(instance, expected_version)?;

        info!(
            workflow = %stored.id,
            form = form_code,
            submitted_by = %user.username,
            "form submitted"
        );
        Ok(FormSubmissionView {
            form_code: form_code.to_string(),
            schema_version,
            instance_version: stored.version,
        })
    }

    pub fn comments(
        &self,
        user: &UserContext,
        id: &WorkflowId,
    ) -> Result<Vec<Comment>, ApprovalError> {
        let instance = self.load(id)?;
        self.require_view(user, &instance)?;
        Ok(instance.comments)
    }

    /// Append a comment and return the updated thread.
    pub fn add_comment(
        &self,
        user: &UserContext,
        id: &WorkflowId,
        body: String,
    ) -> Result<Vec<Comment>, ApprovalError> {
        let mut instance = self.load(id)?;
        self.require_view(user, &instance)?;
        let expected_version = instance.version;

        instance.add_comment(&user.id, &user.username, body);
        let stored = self.store.update(instance, expected_version)?;
        Ok(stored.comments)
    }

    /// Soft delete: the record stays in the store for audit but disappears from
    /// every read path.
    pub fn delete(&self, user: &UserContext, id: &WorkflowId) -> Result<(), ApprovalError> {
        let mut instance = self.load(id)?;
        let expected_version = instance.version;

        if !self.grants().state_allows(
            user,
            &instance.created_by,
            &instance.current_state,
            PermissionType::Delete,
        ) {
            return Err(ApprovalError::PermissionDenied {
                permission: PermissionType::Delete,
            });
        }

        instance.deleted = true;
        self.store.update(instance, expected_version)?;
        info!(workflow = %id, deleted_by = %user.username, "workflow deleted");
        Ok(())
    }

    /// Instances the user can act on or owns, newest activity first.
    pub fn inbox(&self, user: &UserContext) -> Result<Vec<InboxEntry>, ApprovalError> {
        let grants = self.grants();
        let mut entries = Vec::new();

        for instance in self.store.list()? {
            if instance.deleted {
                continue;
            }
            let template = self.template_for(&instance)?;
            let view = engine::status(template, &instance, &grants, user)?;
            let is_own = instance.created_by == user.id;
            if !view.can_approve && !is_own {
                continue;
            }
            entries.push(InboxEntry {
                id: view.instance_id,
                title: view.title,
                current_state: view.current_state,
                state_name: view.state_name,
                pending_step: view.pending_step,
                can_approve: view.can_approve,
                is_own,
                updated_at: instance.updated_at,
            });
        }

        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(entries)
    }

    fn require_superuser(user: &UserContext) -> Result<(), ApprovalError> {
        if user.is_superuser {
            Ok(())
        } else {
            Err(ApprovalError::SuperuserRequired)
        }
    }

    pub fn permission_rules(
        &self,
        user: &UserContext,
    ) -> Result<Vec<PermissionRule>, ApprovalError> {
        Self::require_superuser(user)?;
        Ok(self.grants().rules().to_vec())
    }

    pub fn grant_permission(
        &self,
        user: &UserContext,
        rule: PermissionRule,
    ) -> Result<(), ApprovalError> {
        Self::require_superuser(user)?;
        let mut grants = self
            .permissions
            .write()
            .expect("permission table lock poisoned");
        grants.grant(rule);
        Ok(())
    }

    pub fn set_rule_active(
        &self,
        user: &UserContext,
        rule_id: &str,
        active: bool,
    ) -> Result<(), ApprovalError> {
        Self::require_superuser(user)?;
        let mut grants = self
            .permissions
            .write()
            .expect("permission table lock poisoned");
        if grants.set_active(rule_id, active) {
            Ok(())
        } else {
            Err(ApprovalError::RuleNotFound(rule_id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::approval::blueprint::{self, roles};
    use crate::workflows::approval::store::InMemoryInstanceStore;
    use crate::workflows::approval::template::{
        StateDef, StateKind, StepDef, WorkflowTemplate,
    };
    use serde_json::json;

    fn standard_service() -> ApprovalService<InMemoryInstanceStore> {
        ApprovalService::new(
            TemplateRegistry::new(vec![blueprint::standard_template()]),
            FormBinder::standard(),
            blueprint::standard_permissions(),
            Arc::new(InMemoryInstanceStore::default()),
            blueprint::STANDARD_TEMPLATE_CODE,
        )
    }

    fn create(service: &ApprovalService<InMemoryInstanceStore>) -> WorkflowId {
        let applicant = UserContext::new("u-app", "reza", &[roles::APPLICANT]);
        let view = service
            .create(
                &applicant,
                CreateWorkflowRequest {
                    title: "Parcel 42".to_string(),
                    template_code: None,
                    initial_data: None,
                },
            )
            .expect("create succeeds");
        WorkflowId(view.id)
    }

    #[test]
    fn create_assigns_sequential_ids_and_initial_state() {
        let service = standard_service();
        let first = create(&service);
        let second = create(&service);
        assert_eq!(first.0, "wf-000001");
        assert_eq!(second.0, "wf-000002");

        let applicant = UserContext::new("u-app", "reza", &[roles::APPLICANT]);
        let info = service.workflow_info(&applicant, &first).expect("info");
        assert_eq!(info.current_state, "ApplicantRequest");
        assert_eq!(info.version, 0);
    }

    #[test]
    fn create_rejects_unknown_template() {
        let service = standard_service();
        let applicant = UserContext::new("u-app", "reza", &[roles::APPLICANT]);
        assert!(matches!(
            service.create(
                &applicant,
                CreateWorkflowRequest {
                    title: "Parcel".to_string(),
                    template_code: Some("missing".to_string()),
                    initial_data: None,
                },
            ),
            Err(ApprovalError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn complete_step_records_audit_and_enables_transition() {
        let service = standard_service();
        let id = create(&service);
        let lead = UserContext::new("u-lead", "vida", &[roles::RE_VALUATION_LEASING_LEAD]);

        let completion = service
            .complete_step(&lead, &id, None)
            .expect("step completes");
        assert_eq!(completion.completed_step, 0);
        assert!(!completion.auto_advanced);

        let view = service
            .perform_transition(&lead, &id, "t01")
            .expect("transition applies");
        assert_eq!(view.current_state, "CEOInstruction");

        let admin = UserContext::superuser("u0", "admin");
        let info = service.workflow_info(&admin, &id).expect("info");
        assert_eq!(info.history.len(), 1);
        assert_eq!(info.history[0].transition_id.as_deref(), Some("t01"));
        assert_eq!(info.version, 2);
    }

    #[test]
    fn duplicate_completion_is_rejected_and_audit_unchanged() {
        let service = standard_service();
        let id = create(&service);
        let lead = UserContext::new("u-lead", "vida", &[roles::RE_VALUATION_LEASING_LEAD]);

        service
            .complete_step(&lead, &id, Some(0))
            .expect("first completion");
        assert!(matches!(
            service.complete_step(&lead, &id, Some(0)),
            Err(ApprovalError::StepAlreadyComplete { step: 0, .. })
        ));

        let info = service.workflow_info(&lead, &id).expect("info");
        assert_eq!(
            info.completed_steps["ApplicantRequest"]["0"]["performed_by"],
            json!("u-lead")
        );
    }

    #[test]
    fn wrong_role_cannot_complete_a_step() {
        let service = standard_service();
        let id = create(&service);
        let accountant = UserContext::new("u-fa", "omid", &[roles::FA_ACCOUNTING_LEAD]);

        assert!(matches!(
            service.complete_step(&accountant, &id, None),
            Err(ApprovalError::RoleNotAuthorized { .. })
        ));
    }

    #[test]
    fn superuser_bypasses_role_and_permission_checks() {
        let service = standard_service();
        let id = create(&service);
        let admin = UserContext::superuser("u0", "admin");

        let completion = service
            .complete_step(&admin, &id, None)
            .expect("superuser completes");
        assert_eq!(completion.completed_step, 0);
    }

    #[test]
    fn unknown_step_index_is_rejected() {
        let service = standard_service();
        let id = create(&service);
        let lead = UserContext::new("u-lead", "vida", &[roles::RE_VALUATION_LEASING_LEAD]);

        assert!(matches!(
            service.complete_step(&lead, &id, Some(9)),
            Err(ApprovalError::UnknownStep { step: 9, .. })
        ));
    }

    #[test]
    fn linear_template_auto_advances_on_last_step() {
        let template = WorkflowTemplate::new(
            "linear_review",
            "Linear review",
            "",
            vec![
                StateDef {
                    code: "Draft".to_string(),
                    name: "Draft".to_string(),
                    kind: StateKind::Approval,
                    form_number: None,
                    order: 0,
                    steps: vec![
                        StepDef {
                            index: 0,
                            name: "Lead sign-off".to_string(),
                            required_roles: vec!["LEAD".to_string()],
                        },
                        StepDef {
                            index: 1,
                            name: "Manager sign-off".to_string(),
                            required_roles: vec!["MANAGER".to_string()],
                        },
                    ],
                },
                StateDef {
                    code: "Published".to_string(),
                    name: "Published".to_string(),
                    kind: StateKind::Action,
                    form_number: None,
                    order: 1,
                    steps: Vec::new(),
                },
            ],
            Vec::new(),
        )
        .expect("valid template");

        let service = ApprovalService::new(
            TemplateRegistry::new(vec![template]),
            FormBinder::standard(),
            PermissionSet::default(),
            Arc::new(InMemoryInstanceStore::default()),
            "linear_review",
        );
        let admin = UserContext::superuser("u0", "admin");
        let id = WorkflowId(
            service
                .create(
                    &admin,
                    CreateWorkflowRequest {
                        title: "Memo".to_string(),
                        template_code: None,
                        initial_data: None,
                    },
                )
                .expect("create")
                .id,
        );

        let first = service.complete_step(&admin, &id, None).expect("step 0");
        assert!(!first.auto_advanced);
        assert_eq!(first.status.current_state, "Draft");

        let second = service.complete_step(&admin, &id, None).expect("step 1");
        assert!(second.auto_advanced);
        assert_eq!(second.status.current_state, "Published");

        let info = service.workflow_info(&admin, &id).expect("info");
        assert_eq!(info.history.len(), 1);
        assert!(info.history[0].transition_id.is_none());
    }

    #[test]
    fn form_submission_requires_edit_grant() {
        let service = standard_service();
        let id = create(&service);
        let accountant = UserContext::new("u-fa", "omid", &[roles::FA_ACCOUNTING_LEAD]);

        assert!(matches!(
            service.submit_form(
                &accountant,
                &id,
                "applicant_info",
                json!({"firstName": "Sara"})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            ),
            Err(ApprovalError::PermissionDenied {
                permission: PermissionType::Edit
            })
        ));
    }

    #[test]
    fn soft_deleted_workflow_disappears_from_reads() {
        let service = standard_service();
        let id = create(&service);
        let admin = UserContext::superuser("u0", "admin");

        service.delete(&admin, &id).expect("delete succeeds");
        let applicant = UserContext::new("u-app", "reza", &[roles::APPLICANT]);
        assert!(matches!(
            service.workflow_info(&applicant, &id),
            Err(ApprovalError::InstanceNotFound(_))
        ));
        assert!(service.inbox(&admin).expect("inbox").is_empty());
    }

    #[test]
    fn inbox_lists_actionable_and_own_items() {
        let service = standard_service();
        let id = create(&service);
        let lead = UserContext::new("u-lead", "vida", &[roles::RE_VALUATION_LEASING_LEAD]);
        let applicant = UserContext::new("u-app", "reza", &[roles::APPLICANT]);
        let accountant = UserContext::new("u-fa", "omid", &[roles::FA_ACCOUNTING_LEAD]);

        let lead_inbox = service.inbox(&lead).expect("inbox");
        assert_eq!(lead_inbox.len(), 1);
        assert!(lead_inbox[0].can_approve);
        assert_eq!(lead_inbox[0].id, id.0);

        let own_inbox = service.inbox(&applicant).expect("inbox");
        assert_eq!(own_inbox.len(), 1);
        assert!(own_inbox[0].is_own);
        assert!(!own_inbox[0].can_approve);

        assert!(service.inbox(&accountant).expect("inbox").is_empty());
    }

    #[test]
    fn permission_admin_is_superuser_only() {
        let service = standard_service();
        let lead = UserContext::new("u-lead", "vida", &[roles::RE_VALUATION_LEASING_LEAD]);
        let admin = UserContext::superuser("u0", "admin");

        assert!(matches!(
            service.permission_rules(&lead),
            Err(ApprovalError::SuperuserRequired)
        ));
        assert!(matches!(
            service.set_rule_active(&admin, "no-such-rule", false),
            Err(ApprovalError::RuleNotFound(_))
        ));

        let before = service.permission_rules(&admin).expect("rules").len();
        service
            .grant_permission(
                &admin,
                PermissionRule::state_grant(
                    "extra-grant",
                    "Settlement",
                    PermissionType::View,
                    crate::workflows::approval::permissions::Principal::Role {
                        code: roles::FA_ACCOUNTING_LEAD.to_string(),
                    },
                ),
            )
            .expect("grant");
        assert_eq!(service.permission_rules(&admin).expect("rules").len(), before + 1);
        assert!(service.set_rule_active(&admin, "extra-grant", false).is_ok());
    }
}
