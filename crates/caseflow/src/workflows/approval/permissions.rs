use std::fmt;

use serde::{Deserialize, Serialize};

use super::identity::UserContext;

/// Action a grant permits at its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    View,
    Edit,
    Approve,
    Delete,
    Transition,
}

impl PermissionType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Approve => "approve",
            Self::Delete => "delete",
            Self::Transition => "transition",
        }
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coordinate a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum PermissionScope {
    State {
        state: String,
    },
    Step {
        state: String,
        step: u32,
    },
    Form {
        form_number: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
}

/// Who a grant applies to: a role code or one specific user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    Role { code: String },
    User { id: String },
}

impl Principal {
    fn matches(&self, user: &UserContext) -> bool {
        match self {
            Principal::Role { code } => user.has_role(code),
            Principal::User { id } => user.id == *id,
        }
    }
}

fn default_active() -> bool {
    true
}

/// One additive grant row. There is no explicit deny; absence of a matching
/// active row is the deny.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub id: String,
    #[serde(flatten)]
    pub scope: PermissionScope,
    pub permission: PermissionType,
    pub principal: Principal,
    #[serde(default)]
    pub restrict_to_own: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl PermissionRule {
    pub fn state_grant(
        id: impl Into<String>,
        state: impl Into<String>,
        permission: PermissionType,
        principal: Principal,
    ) -> Self {
        Self {
            id: id.into(),
            scope: PermissionScope::State {
                state: state.into(),
            },
            permission,
            principal,
            restrict_to_own: false,
            is_active: true,
        }
    }

    pub fn step_grant(
        id: impl Into<String>,
        state: impl Into<String>,
        step: u32,
        principal: Principal,
    ) -> Self {
        Self {
            id: id.into(),
            scope: PermissionScope::Step {
                state: state.into(),
                step,
            },
            permission: PermissionType::Approve,
            principal,
            restrict_to_own: false,
            is_active: true,
        }
    }

    pub fn form_grant(
        id: impl Into<String>,
        form_number: u32,
        state: Option<String>,
        permission: PermissionType,
        principal: Principal,
    ) -> Self {
        Self {
            id: id.into(),
            scope: PermissionScope::Form { form_number, state },
            permission,
            principal,
            restrict_to_own: false,
            is_active: true,
        }
    }

    pub fn restricted_to_own(mut self) -> Self {
        self.restrict_to_own = true;
        self
    }
}

/// The full grant table plus the resolution rules over it.
///
/// Resolution is fail-closed: a scope with no matching active rows denies every
/// principal except superusers, who bypass all checks.
#[derive(Debug, Default, Clone)]
pub struct PermissionSet {
    rules: Vec<PermissionRule>,
}

impl PermissionSet {
    pub fn new(rules: Vec<PermissionRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[PermissionRule] {
        &self.rules
    }

    pub fn grant(&mut self, rule: PermissionRule) {
        self.rules.push(rule);
    }

    /// Toggle a rule by id, returning false when no such rule exists.
    pub fn set_active(&mut self, rule_id: &str, active: bool) -> bool {
        match self.rules.iter_mut().find(|rule| rule.id == rule_id) {
            Some(rule) => {
                rule.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Replace a rule in place by id, returning false when no such rule exists.
    pub fn update(&mut self, rule: PermissionRule) -> bool {
        match self.rules.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => {
                *existing = rule;
                true
            }
            None => false,
        }
    }

    fn rule_matches(
        rule: &PermissionRule,
        user: &UserContext,
        instance_created_by: &str,
    ) -> bool {
        rule.is_active
            && rule.principal.matches(user)
            && (!rule.restrict_to_own || instance_created_by == user.id)
    }

    /// State-scope check for VIEW/EDIT/APPROVE/DELETE/TRANSITION.
    pub fn state_allows(
        &self,
        user: &UserContext,
        instance_created_by: &str,
        state: &str,
        permission: PermissionType,
    ) -> bool {
        if user.is_superuser {
            return true;
        }

        self.rules.iter().any(|rule| {
            matches!(&rule.scope, PermissionScope::State { state: scoped } if scoped == state)
                && rule.permission == permission
                && Self::rule_matches(rule, user, instance_created_by)
        })
    }

    /// APPROVE check at a (state, step) coordinate. Step-scope rows are more
    /// specific: when any exist for the coordinate they alone decide, even if a
    /// state-scope grant would have matched.
    pub fn step_approve_allows(
        &self,
        user: &UserContext,
        instance_created_by: &str,
        state: &str,
        step: u32,
    ) -> bool {
        if user.is_superuser {
            return true;
        }

        let mut step_rules = self
            .rules
            .iter()
            .filter(|rule| {
                matches!(
                    &rule.scope,
                    PermissionScope::Step { state: scoped, step: scoped_step }
                        if scoped == state && *scoped_step == step
                ) && rule.is_active
            })
            .peekable();

        if step_rules.peek().is_some() {
            return step_rules.any(|rule| Self::rule_matches(rule, user, instance_created_by));
        }

        self.state_allows(user, instance_created_by, state, PermissionType::Approve)
    }

    /// Form-scope check; rows carrying a state restriction only apply while the
    /// instance sits in that state.
    pub fn form_allows(
        &self,
        user: &UserContext,
        instance_created_by: &str,
        form_number: u32,
        current_state: &str,
        permission: PermissionType,
    ) -> bool {
        if user.is_superuser {
            return true;
        }

        self.rules.iter().any(|rule| {
            let scope_matches = match &rule.scope {
                PermissionScope::Form {
                    form_number: scoped,
                    state,
                } => {
                    *scoped == form_number
                        && state
                            .as_deref()
                            .map_or(true, |scoped_state| scoped_state == current_state)
                }
                _ => false,
            };
            scope_matches
                && rule.permission == permission
                && Self::rule_matches(rule, user, instance_created_by)
        })
    }
}
