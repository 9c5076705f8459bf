//! Configurable approval workflow engine for applicant requests.
//!
//! A request moves through the ordered states of an immutable template; each state
//! gates its exit behind role-bound approval steps, dynamic form submissions, and
//! condition-guarded transitions. The crate owns the state machine, the three-tier
//! permission model, the step audit trail, and the form binder; persistence and
//! identity lookup are injected through the traits in [`workflows::approval`].

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
