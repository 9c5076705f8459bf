//! Built-in property-acquisition process: the template every new request runs
//! on unless a request names another registered template.

use serde_json::json;

use super::permissions::{PermissionRule, PermissionSet, PermissionType, Principal};
use super::template::{
    StateDef, StateKind, StepDef, TransitionCondition, TransitionDef, WorkflowTemplate,
};

pub const STANDARD_TEMPLATE_CODE: &str = "property_acquisition";

/// Role codes referenced by the standard template and its seeded grants.
pub mod roles {
    pub const APPLICANT: &str = "APPLICANT";
    pub const RE_VALUATION_LEASING_LEAD: &str = "RE_VALUATION_LEASING_LEAD";
    pub const CEO_MANAGER: &str = "CEO_MANAGER";
    pub const CEO_OFFICE_CHIEF: &str = "CEO_OFFICE_CHIEF";
    pub const RE_ACQUISITION_REGEN_EXPERT: &str = "RE_ACQUISITION_REGEN_EXPERT";
    pub const LC_CONTRACTS_ASSEMBLIES_LEAD: &str = "LC_CONTRACTS_ASSEMBLIES_LEAD";
    pub const RE_TECH_URBANISM_LEAD: &str = "RE_TECH_URBANISM_LEAD";
    pub const RE_ACQUISITION_REGEN_LEAD: &str = "RE_ACQUISITION_REGEN_LEAD";
    pub const RE_MANAGER: &str = "RE_MANAGER";
    pub const FA_ACCOUNTING_LEAD: &str = "FA_ACCOUNTING_LEAD";
}

fn step(index: u32, name: &str, required_roles: &[&str]) -> StepDef {
    StepDef {
        index,
        name: name.to_string(),
        required_roles: required_roles.iter().map(|role| role.to_string()).collect(),
    }
}

fn state(
    code: &str,
    name: &str,
    kind: StateKind,
    form_number: Option<u32>,
    order: u32,
    steps: Vec<StepDef>,
) -> StateDef {
    StateDef {
        code: code.to_string(),
        name: name.to_string(),
        kind,
        form_number,
        order,
        steps,
    }
}

fn advance(id: &str, from: &str, to: &str) -> TransitionDef {
    TransitionDef {
        id: id.to_string(),
        from_state: from.to_string(),
        to_state: to.to_string(),
        label: None,
        condition: TransitionCondition::AllStepsApproved,
    }
}

/// The standard acquisition process. Linear `ALL_STEPS_APPROVED` chain with a
/// `FIELD_VALUE`-guarded exit from the appraisal decision.
pub fn standard_template() -> WorkflowTemplate {
    use roles::*;

    let states = vec![
        state(
            "ApplicantRequest",
            "Applicant request intake",
            StateKind::Action,
            None,
            0,
            vec![step(0, "Register the request", &[RE_VALUATION_LEASING_LEAD])],
        ),
        state(
            "CEOInstruction",
            "CEO instruction",
            StateKind::Approval,
            None,
            1,
            vec![step(
                0,
                "Record the CEO instruction",
                &[CEO_MANAGER, CEO_OFFICE_CHIEF],
            )],
        ),
        state(
            "Form1",
            "Applicant information",
            StateKind::Form,
            Some(1),
            2,
            vec![step(0, "Verify applicant details", &[RE_ACQUISITION_REGEN_EXPERT])],
        ),
        state(
            "Form2",
            "Property details",
            StateKind::Form,
            Some(2),
            3,
            vec![step(0, "Verify property details", &[RE_ACQUISITION_REGEN_EXPERT])],
        ),
        state(
            "DocsCollection",
            "Document collection",
            StateKind::Action,
            None,
            4,
            vec![step(0, "Confirm the document file", &[RE_ACQUISITION_REGEN_EXPERT])],
        ),
        state(
            "Form3",
            "Ownership review",
            StateKind::Form,
            Some(3),
            5,
            vec![
                step(0, "Contracts lead sign-off", &[LC_CONTRACTS_ASSEMBLIES_LEAD]),
                step(1, "Urbanism lead sign-off", &[RE_TECH_URBANISM_LEAD]),
                step(2, "Acquisition lead sign-off", &[RE_ACQUISITION_REGEN_LEAD]),
                step(3, "Real estate manager sign-off", &[RE_MANAGER]),
            ],
        ),
        state(
            "Form4",
            "Acquisition review",
            StateKind::Form,
            Some(4),
            6,
            vec![
                step(0, "Valuation lead sign-off", &[RE_VALUATION_LEASING_LEAD]),
                step(1, "Acquisition lead sign-off", &[RE_ACQUISITION_REGEN_LEAD]),
                step(2, "Real estate manager sign-off", &[RE_MANAGER]),
                step(3, "CEO office sign-off", &[CEO_MANAGER, CEO_OFFICE_CHIEF]),
            ],
        ),
        state(
            "AMLForm",
            "Anti-money-laundering declaration",
            StateKind::Form,
            Some(5),
            7,
            vec![step(0, "Accounting clearance", &[FA_ACCOUNTING_LEAD])],
        ),
        state(
            "EvaluationCommittee",
            "Evaluation committee",
            StateKind::Approval,
            None,
            8,
            vec![step(0, "Committee session held", &[RE_VALUATION_LEASING_LEAD])],
        ),
        state(
            "AppraisalFeeDeposit",
            "Appraisal fee deposit",
            StateKind::Action,
            None,
            9,
            vec![step(0, "Fee deposit confirmed", &[RE_VALUATION_LEASING_LEAD])],
        ),
        state(
            "AppraisalNotice",
            "Appraisal notice",
            StateKind::Action,
            None,
            10,
            vec![step(0, "Notice dispatched", &[RE_VALUATION_LEASING_LEAD])],
        ),
        state(
            "AppraisalOpinion",
            "Appraisal opinion",
            StateKind::Approval,
            None,
            11,
            vec![step(0, "Opinion registered", &[RE_VALUATION_LEASING_LEAD])],
        ),
        state(
            "AppraisalDecision",
            "Appraisal decision",
            StateKind::Decision,
            None,
            12,
            vec![step(0, "Decision recorded", &[RE_VALUATION_LEASING_LEAD])],
        ),
        state(
            "Settlement",
            "Settlement",
            StateKind::Action,
            None,
            13,
            vec![step(0, "Settlement executed", &[RE_ACQUISITION_REGEN_LEAD])],
        ),
    ];

    let transitions = vec![
        advance("t01", "ApplicantRequest", "CEOInstruction"),
        advance("t02", "CEOInstruction", "Form1"),
        advance("t03", "Form1", "Form2"),
        advance("t04", "Form2", "DocsCollection"),
        advance("t05", "DocsCollection", "Form3"),
        advance("t06", "Form3", "Form4"),
        advance("t07", "Form4", "AMLForm"),
        advance("t08", "AMLForm", "EvaluationCommittee"),
        advance("t09", "EvaluationCommittee", "AppraisalFeeDeposit"),
        advance("t10", "AppraisalFeeDeposit", "AppraisalNotice"),
        advance("t11", "AppraisalNotice", "AppraisalOpinion"),
        advance("t12", "AppraisalOpinion", "AppraisalDecision"),
        TransitionDef {
            id: "t13".to_string(),
            from_state: "AppraisalDecision".to_string(),
            to_state: "Settlement".to_string(),
            label: Some("Approve acquisition".to_string()),
            condition: TransitionCondition::FieldValue {
                field_path: "appraisalDecision.outcome".to_string(),
                expected_value: json!("approved"),
            },
        },
    ];

    WorkflowTemplate::new(
        STANDARD_TEMPLATE_CODE,
        "Property acquisition approval",
        "Multi-department approval chain for acquiring applicant-offered property.",
        states,
        transitions,
    )
    .expect("standard template is internally consistent")
}

/// Seeded grant table for the standard template: every step role may view,
/// approve, and transition its state; form states additionally open their bound
/// form for editing; applicants see their own requests end to end.
pub fn standard_permissions() -> PermissionSet {
    let template = standard_template();
    let mut rules = Vec::new();
    let mut sequence = 0u32;
    let mut next_id = |prefix: &str| {
        sequence += 1;
        format!("{prefix}-{sequence:03}")
    };

    for state in template.states() {
        let mut state_roles: Vec<String> = Vec::new();
        for step in &state.steps {
            for role in &step.required_roles {
                if !state_roles.contains(role) {
                    state_roles.push(role.clone());
                }
            }
        }

        for role in &state_roles {
            let principal = Principal::Role { code: role.clone() };
            for permission in [
                PermissionType::View,
                PermissionType::Approve,
                PermissionType::Transition,
            ] {
                rules.push(PermissionRule::state_grant(
                    next_id("grant"),
                    state.code.clone(),
                    permission,
                    principal.clone(),
                ));
            }

            if let Some(form_number) = state.form_number {
                for permission in [PermissionType::View, PermissionType::Edit] {
                    rules.push(PermissionRule::form_grant(
                        next_id("grant"),
                        form_number,
                        None,
                        permission,
                        principal.clone(),
                    ));
                }
            }
        }

        rules.push(
            PermissionRule::state_grant(
                next_id("grant"),
                state.code.clone(),
                PermissionType::View,
                Principal::Role {
                    code: roles::APPLICANT.to_string(),
                },
            )
            .restricted_to_own(),
        );
    }

    // The decision form is not bound to any state; the valuation lead files it
    // while the appraisal is underway.
    for permission in [PermissionType::View, PermissionType::Edit] {
        rules.push(PermissionRule::form_grant(
            next_id("grant"),
            6,
            None,
            permission,
            Principal::Role {
                code: roles::RE_VALUATION_LEASING_LEAD.to_string(),
            },
        ));
    }

    PermissionSet::new(rules)
}
