use caseflow::error::AppError;
use caseflow::workflows::approval::blueprint::{self, roles};
use caseflow::workflows::approval::{
    ApprovalService, CreateWorkflowRequest, FormBinder, InMemoryInstanceStore, TemplateRegistry,
    UserContext, WorkflowId,
};
use clap::Args;
use serde_json::json;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Title for the demo acquisition request
    #[arg(long, default_value = "Parcel 42 acquisition")]
    pub(crate) title: String,
    /// Print the full audit trail at the end of the walkthrough
    #[arg(long)]
    pub(crate) show_audit: bool,
}

fn demo_users() -> Vec<UserContext> {
    vec![
        UserContext::new("u-valuation", "vida", &[roles::RE_VALUATION_LEASING_LEAD]),
        UserContext::new("u-ceo", "farid", &[roles::CEO_MANAGER]),
        UserContext::new("u-expert", "nima", &[roles::RE_ACQUISITION_REGEN_EXPERT]),
        UserContext::new("u-contracts", "sahar", &[roles::LC_CONTRACTS_ASSEMBLIES_LEAD]),
        UserContext::new("u-urbanism", "kian", &[roles::RE_TECH_URBANISM_LEAD]),
        UserContext::new("u-acq-lead", "mina", &[roles::RE_ACQUISITION_REGEN_LEAD]),
        UserContext::new("u-re-manager", "leila", &[roles::RE_MANAGER]),
        UserContext::new("u-accounting", "omid", &[roles::FA_ACCOUNTING_LEAD]),
    ]
}

fn approver_for(users: &[UserContext], required_roles: &[String]) -> Option<UserContext> {
    users
        .iter()
        .find(|user| user.holds_any(required_roles))
        .cloned()
}

/// Walk one request through every state of the standard acquisition template,
/// printing each sign-off and transition as it lands.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = ApprovalService::new(
        TemplateRegistry::new(vec![blueprint::standard_template()]),
        FormBinder::standard(),
        blueprint::standard_permissions(),
        Arc::new(InMemoryInstanceStore::default()),
        blueprint::STANDARD_TEMPLATE_CODE,
    );
    let template = blueprint::standard_template();
    let users = demo_users();
    let applicant = UserContext::new("u-applicant", "reza", &[roles::APPLICANT]);
    let admin = UserContext::superuser("u-admin", "admin");
    let valuation = users[0].clone();

    println!("Approval workflow demo");
    let created = service.create(
        &applicant,
        CreateWorkflowRequest {
            title: args.title.clone(),
            template_code: None,
            initial_data: None,
        },
    )?;
    let id = WorkflowId(created.id.clone());
    println!(
        "- Created {} ({}) in state {}",
        created.id, created.title, created.current_state
    );

    // Forms filed along the way; the decision form gates the final transition.
    service.submit_form(
        &service_user(&users, roles::RE_ACQUISITION_REGEN_EXPERT),
        &id,
        "applicant_info",
        json!({
            "firstName": "Sara",
            "lastName": "Ahmadi",
            "nationalCode": "1234567890",
            "mobileNumber": "+989121234567",
            "residenceAddress": "12 Valiasr St, Tehran",
        })
        .as_object()
        .cloned()
        .unwrap_or_default(),
    )?;
    println!("- Filed form applicant_info");

    service.submit_form(
        &valuation,
        &id,
        "appraisal_decision",
        json!({
            "outcome": "approved",
            "justification": "Appraisal confirms the offered price.",
        })
        .as_object()
        .cloned()
        .unwrap_or_default(),
    )?;
    println!("- Filed form appraisal_decision (outcome: approved)");

    loop {
        let status = service.status(&admin, &id)?;
        if status.current_state == "Settlement" {
            println!("- Reached terminal state Settlement");
            break;
        }

        let Some(state) = template.state(&status.current_state) else {
            break;
        };
        for step in &state.steps {
            let Some(approver) = approver_for(&users, &step.required_roles) else {
                continue;
            };
            let completion = service.complete_step(&approver, &id, Some(step.index))?;
            println!(
                "  [{}] step {} signed off by {}{}",
                state.code,
                step.index,
                approver.username,
                if completion.auto_advanced {
                    " (auto-advanced)"
                } else {
                    ""
                }
            );
        }

        let exits = service.available_transitions(&admin, &id)?;
        let Some(open) = exits.iter().find(|view| view.condition_met) else {
            println!("  [{}] no open exit, stopping walkthrough", state.code);
            break;
        };
        let status = service.perform_transition(&admin, &id, &open.transition_id)?;
        println!(
            "  [{}] -> {} via {}",
            state.code, status.current_state, open.transition_id
        );
    }

    let inbox = service.inbox(&valuation)?;
    println!("- Inbox for {}: {} item(s)", valuation.username, inbox.len());

    if args.show_audit {
        let info = service.workflow_info(&admin, &id)?;
        println!("\nAudit trail");
        for record in &info.history {
            println!(
                "  {} -> {} by {} ({})",
                record.from_state,
                record.to_state,
                record.performed_by,
                record
                    .transition_id
                    .as_deref()
                    .unwrap_or("auto-advance")
            );
        }
        match serde_json::to_string_pretty(&info.completed_steps) {
            Ok(json) => println!("\nStep completions\n{json}"),
            Err(err) => println!("step completions unavailable: {err}"),
        }
    }

    Ok(())
}

fn service_user(users: &[UserContext], role: &str) -> UserContext {
    users
        .iter()
        .find(|user| user.has_role(role))
        .cloned()
        .unwrap_or_else(|| UserContext::superuser("u-admin", "admin"))
}
