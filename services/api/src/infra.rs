use caseflow::workflows::approval::blueprint::roles;
use caseflow::workflows::approval::{RoleDirectory, UserContext};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Mutex-guarded user directory backing the `x-user-id` header lookup. Stands
/// in for the organization's identity provider in local deployments and demos.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRoleDirectory {
    users: Arc<Mutex<HashMap<String, UserContext>>>,
}

impl InMemoryRoleDirectory {
    pub(crate) fn with_users(users: Vec<UserContext>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect();
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }

    /// One user per role in the standard template, plus an applicant and a
    /// superuser admin.
    pub(crate) fn seeded() -> Self {
        Self::with_users(vec![
            UserContext::superuser("u-admin", "admin"),
            UserContext::new("u-applicant", "reza", &[roles::APPLICANT]),
            UserContext::new("u-valuation", "vida", &[roles::RE_VALUATION_LEASING_LEAD]),
            UserContext::new("u-ceo", "farid", &[roles::CEO_MANAGER]),
            UserContext::new("u-ceo-office", "hadi", &[roles::CEO_OFFICE_CHIEF]),
            UserContext::new("u-expert", "nima", &[roles::RE_ACQUISITION_REGEN_EXPERT]),
            UserContext::new("u-contracts", "sahar", &[roles::LC_CONTRACTS_ASSEMBLIES_LEAD]),
            UserContext::new("u-urbanism", "kian", &[roles::RE_TECH_URBANISM_LEAD]),
            UserContext::new("u-acq-lead", "mina", &[roles::RE_ACQUISITION_REGEN_LEAD]),
            UserContext::new("u-re-manager", "leila", &[roles::RE_MANAGER]),
            UserContext::new("u-accounting", "omid", &[roles::FA_ACCOUNTING_LEAD]),
        ])
    }
}

impl RoleDirectory for InMemoryRoleDirectory {
    fn resolve(&self, user_id: &str) -> Option<UserContext> {
        let guard = self.users.lock().expect("directory mutex poisoned");
        guard.get(user_id).cloned()
    }
}
