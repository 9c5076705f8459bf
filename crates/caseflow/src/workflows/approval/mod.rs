//! Configurable multi-step approval workflows.
//!
//! A [`template::WorkflowTemplate`] declares states, approval steps, and
//! condition-guarded transitions; [`service::ApprovalService`] runs instances
//! of it against an [`store::InstanceStore`], enforcing the three-tier grant
//! table in [`permissions`] and binding dynamic forms through [`forms`].

pub mod blueprint;
pub mod conditions;
pub mod engine;
pub mod forms;
pub mod identity;
pub mod instance;
pub mod permissions;
pub mod router;
pub mod service;
pub mod store;
pub mod template;

pub use engine::{StatusView, TransitionView};
pub use forms::{FormBinder, FormError};
pub use identity::{RoleDirectory, UserContext};
pub use instance::{WorkflowId, WorkflowInstance};
pub use permissions::{PermissionRule, PermissionSet, PermissionType, Principal};
pub use router::{approval_router, ApprovalApi, USER_HEADER};
pub use service::{ApprovalError, ApprovalService, CreateWorkflowRequest};
pub use store::{InMemoryInstanceStore, InstanceStore, StoreError};
pub use template::{TemplateRegistry, WorkflowTemplate};
