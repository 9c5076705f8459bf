use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::forms::FormError;
use super::identity::{RoleDirectory, UserContext};
use super::instance::WorkflowId;
use super::permissions::PermissionRule;
use super::service::{ApprovalError, ApprovalService, CreateWorkflowRequest};
use super::store::InstanceStore;

/// Header carrying the caller's identity, resolved through the directory.
pub const USER_HEADER: &str = "x-user-id";

/// Shared state for the approval endpoints: the service facade plus the
/// directory that turns a user id into roles.
pub struct ApprovalApi<S: InstanceStore> {
    pub service: Arc<ApprovalService<S>>,
    pub directory: Arc<dyn RoleDirectory>,
}

impl<S: InstanceStore> Clone for ApprovalApi<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            directory: Arc::clone(&self.directory),
        }
    }
}

/// Router builder exposing the workflow, form, comment, and permission
/// endpoints.
pub fn approval_router<S>(api: ApprovalApi<S>) -> Router
where
    S: InstanceStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/workflows",
            post(create_handler::<S>).get(inbox_handler::<S>),
        )
        .route(
            "/api/v1/workflows/:workflow_id",
            get(info_handler::<S>).delete(delete_handler::<S>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/status",
            get(status_handler::<S>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/transitions",
            get(transitions_handler::<S>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/transitions/:transition_id",
            post(perform_transition_handler::<S>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/approve",
            post(approve_handler::<S>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/forms/:form_code",
            get(form_view_handler::<S>).post(form_submit_handler::<S>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/comments",
            get(comments_handler::<S>).post(add_comment_handler::<S>),
        )
        .route(
            "/api/v1/permissions",
            get(permission_rules_handler::<S>).post(grant_permission_handler::<S>),
        )
        .route(
            "/api/v1/permissions/:rule_id/active",
            post(rule_active_handler::<S>),
        )
        .with_state(api)
}

impl IntoResponse for ApprovalError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApprovalError::PermissionDenied { .. }
            | ApprovalError::RoleNotAuthorized { .. }
            | ApprovalError::SuperuserRequired => StatusCode::FORBIDDEN,
            ApprovalError::InstanceNotFound(_)
            | ApprovalError::TemplateNotFound(_)
            | ApprovalError::InvalidTransition(_)
            | ApprovalError::UnknownStep { .. }
            | ApprovalError::RuleNotFound(_)
            | ApprovalError::Form(FormError::SchemaNotFound(_)) => StatusCode::NOT_FOUND,
            ApprovalError::ConditionNotMet(_) | ApprovalError::NoPendingStep { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApprovalError::StepAlreadyComplete { .. }
            | ApprovalError::ConcurrentModification => StatusCode::CONFLICT,
            ApprovalError::Form(FormError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApprovalError::UnknownState(_) | ApprovalError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match &self {
            ApprovalError::Form(FormError::Validation(violations)) => json!({
                "error": self.to_string(),
                "violations": violations,
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}

fn authenticate<S: InstanceStore>(
    api: &ApprovalApi<S>,
    headers: &HeaderMap,
) -> Result<UserContext, Response> {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty());

    let Some(user_id) = user_id else {
        let payload = json!({ "error": "missing x-user-id header" });
        return Err((StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response());
    };

    api.directory.resolve(user_id).ok_or_else(|| {
        let payload = json!({ "error": "unknown user" });
        (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApproveRequest {
    #[serde(default)]
    pub(crate) step: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentRequest {
    pub(crate) body: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RuleActiveRequest {
    pub(crate) active: bool,
}

pub(crate) async fn create_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<CreateWorkflowRequest>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.create(&user, request) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn inbox_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.inbox(&user) {
        Ok(entries) => axum::Json(entries).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn info_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    Path(workflow_id): Path<String>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.workflow_info(&user, &WorkflowId(workflow_id)) {
        Ok(view) => axum::Json(view).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn status_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    Path(workflow_id): Path<String>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.status(&user, &WorkflowId(workflow_id)) {
        Ok(view) => axum::Json(view).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn transitions_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    Path(workflow_id): Path<String>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api
        .service
        .available_transitions(&user, &WorkflowId(workflow_id))
    {
        Ok(views) => axum::Json(views).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn perform_transition_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    Path((workflow_id, transition_id)): Path<(String, String)>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api
        .service
        .perform_transition(&user, &WorkflowId(workflow_id), &transition_id)
    {
        Ok(view) => axum::Json(view).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn approve_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    Path(workflow_id): Path<String>,
    request: Option<axum::Json<ApproveRequest>>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let step = request.and_then(|axum::Json(body)| body.step);
    match api
        .service
        .complete_step(&user, &WorkflowId(workflow_id), step)
    {
        Ok(view) => axum::Json(view).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn form_view_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    Path((workflow_id, form_code)): Path<(String, String)>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api
        .service
        .form_data(&user, &WorkflowId(workflow_id), &form_code)
    {
        Ok(view) => axum::Json(view).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn form_submit_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    Path((workflow_id, form_code)): Path<(String, String)>,
    axum::Json(data): axum::Json<Map<String, Value>>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api
        .service
        .submit_form(&user, &WorkflowId(workflow_id), &form_code, data)
    {
        Ok(view) => axum::Json(view).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn comments_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    Path(workflow_id): Path<String>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.comments(&user, &WorkflowId(workflow_id)) {
        Ok(comments) => axum::Json(comments).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn add_comment_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    Path(workflow_id): Path<String>,
    axum::Json(request): axum::Json<CommentRequest>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api
        .service
        .add_comment(&user, &WorkflowId(workflow_id), request.body)
    {
        Ok(comments) => (StatusCode::CREATED, axum::Json(comments)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn delete_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    Path(workflow_id): Path<String>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.delete(&user, &WorkflowId(workflow_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn permission_rules_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.permission_rules(&user) {
        Ok(rules) => axum::Json(rules).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn grant_permission_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    axum::Json(rule): axum::Json<PermissionRule>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.grant_permission(&user, rule) {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn rule_active_handler<S: InstanceStore>(
    State(api): State<ApprovalApi<S>>,
    headers: HeaderMap,
    Path(rule_id): Path<String>,
    axum::Json(request): axum::Json<RuleActiveRequest>,
) -> Response {
    let user = match authenticate(&api, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.set_rule_active(&user, &rule_id, request.active) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}
