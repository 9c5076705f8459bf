use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Caller identity as resolved by the external directory: the engine never
/// issues or refreshes credentials, it only consumes this snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub id: String,
    pub username: String,
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub is_superuser: bool,
}

impl UserContext {
    pub fn new(id: impl Into<String>, username: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            roles: roles.iter().map(|role| role.to_string()).collect(),
            is_superuser: false,
        }
    }

    pub fn superuser(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            roles: BTreeSet::new(),
            is_superuser: true,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// True when the user holds at least one of the given role codes.
    pub fn holds_any<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.roles.contains(role.as_ref()))
    }

    /// First of the given roles the user actually holds, recorded in step audits.
    pub fn matching_role<S: AsRef<str>>(&self, roles: &[S]) -> Option<String> {
        roles
            .iter()
            .map(AsRef::as_ref)
            .find(|role| self.roles.contains(*role))
            .map(str::to_string)
    }
}

/// Identity/role lookup seam; the API layer supplies the concrete directory.
pub trait RoleDirectory: Send + Sync {
    fn resolve(&self, user_id: &str) -> Option<UserContext>;
}
