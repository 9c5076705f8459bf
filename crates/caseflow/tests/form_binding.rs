//! Integration scenarios for dynamic form binding: inheritance pre-fill,
//! computed fields, schema versions, and namespace isolation as seen through
//! the service facade.

mod common {
    use std::sync::Arc;

    use serde_json::{Map, Value};

    use caseflow::workflows::approval::blueprint::{self, roles};
    use caseflow::workflows::approval::{
        ApprovalService, CreateWorkflowRequest, FormBinder, InMemoryInstanceStore,
        TemplateRegistry, UserContext, WorkflowId,
    };

    pub(super) fn expert() -> UserContext {
        UserContext::new("u-expert", "nima", &[roles::RE_ACQUISITION_REGEN_EXPERT])
    }

    pub(super) fn valuation_lead() -> UserContext {
        UserContext::new("u-valuation", "vida", &[roles::RE_VALUATION_LEASING_LEAD])
    }

    pub(super) fn accounting_lead() -> UserContext {
        UserContext::new("u-accounting", "omid", &[roles::FA_ACCOUNTING_LEAD])
    }

    pub(super) fn build() -> (Arc<ApprovalService<InMemoryInstanceStore>>, WorkflowId) {
        let service = Arc::new(ApprovalService::new(
            TemplateRegistry::new(vec![blueprint::standard_template()]),
            FormBinder::standard(),
            blueprint::standard_permissions(),
            Arc::new(InMemoryInstanceStore::default()),
            blueprint::STANDARD_TEMPLATE_CODE,
        ));
        let applicant = UserContext::new("u-applicant", "reza", &[roles::APPLICANT]);
        let view = service
            .create(
                &applicant,
                CreateWorkflowRequest {
                    title: "Parcel 42".to_string(),
                    template_code: None,
                    initial_data: None,
                },
            )
            .expect("workflow created");
        (service, WorkflowId(view.id))
    }

    pub(super) fn object(value: Value) -> Map<String, Value> {
        value.as_object().expect("object literal").clone()
    }
}

mod binding {
    use super::common::*;
    use caseflow::workflows::approval::{ApprovalError, FormError};
    use serde_json::json;

    #[test]
    fn applicant_data_prefills_later_forms() {
        let (service, id) = build();

        service
            .submit_form(
                &expert(),
                &id,
                "applicant_info",
                object(json!({
                    "firstName": "Sara",
                    "lastName": "Ahmadi",
                    "nationalCode": "1234567890",
                    "mobileNumber": "+989121234567",
                    "residenceAddress": "12 Valiasr St",
                })),
            )
            .expect("form 1 submitted");

        let access = service
            .form_data(&expert(), &id, "property_details")
            .expect("form 2 readable");
        assert!(access.form.prefilled);
        assert_eq!(access.form.data.get("address"), Some(&json!("12 Valiasr St")));
        assert!(access.form.data.get("area").is_none());
        assert!(access.can_edit);
    }

    #[test]
    fn computed_full_name_ignores_client_values() {
        let (service, id) = build();

        let submission = service
            .submit_form(
                &expert(),
                &id,
                "applicant_info",
                object(json!({
                    "firstName": "Sara",
                    "lastName": "Ahmadi",
                    "nationalCode": "1234567890",
                    "mobileNumber": "+989121234567",
                    "fullName": "Forged Name",
                })),
            )
            .expect("submission accepted");
        assert_eq!(submission.schema_version, 2);
        assert_eq!(submission.instance_version, 1);

        let access = service
            .form_data(&expert(), &id, "applicant_info")
            .expect("form readable");
        assert_eq!(access.form.data.get("fullName"), Some(&json!("Sara Ahmadi")));
        assert_eq!(access.form.version, 2);
    }

    #[test]
    fn failed_validation_merges_nothing() {
        let (service, id) = build();

        let error = service
            .submit_form(
                &expert(),
                &id,
                "applicant_info",
                object(json!({"firstName": "S", "nationalCode": "12x"})),
            )
            .expect_err("submission rejected");

        let ApprovalError::Form(FormError::Validation(violations)) = error else {
            panic!("expected a validation error");
        };
        assert!(violations.iter().any(|v| v.field == "lastName" && v.rule == "required"));
        assert!(violations.iter().any(|v| v.field == "nationalCode" && v.rule == "pattern"));

        let access = service
            .form_data(&expert(), &id, "applicant_info")
            .expect("form readable");
        assert!(access.form.prefilled, "nothing was saved");
        assert!(access.form.data.is_empty());
    }

    #[test]
    fn namespaces_do_not_bleed_between_forms() {
        let (service, id) = build();

        service
            .submit_form(
                &expert(),
                &id,
                "applicant_info",
                object(json!({
                    "firstName": "Sara",
                    "lastName": "Ahmadi",
                    "nationalCode": "1234567890",
                    "mobileNumber": "+989121234567",
                })),
            )
            .expect("form 1 submitted");
        service
            .submit_form(
                &expert(),
                &id,
                "property_details",
                object(json!({
                    "registrationPlateNumber": "44/128",
                    "address": "Parcel 42, district 3",
                    "area": 250,
                    "usageType": "residential",
                })),
            )
            .expect("form 2 submitted");

        let admin = caseflow::workflows::approval::UserContext::superuser("u0", "admin");
        let info = service.workflow_info(&admin, &id).expect("info");
        assert_eq!(info.data["personalInformation"]["firstName"], json!("Sara"));
        assert_eq!(info.data["propertyDetails"]["area"], json!(250));
        assert!(info.data["personalInformation"].get("area").is_none());
    }

    #[test]
    fn select_fields_enforce_membership() {
        let (service, id) = build();

        let error = service
            .submit_form(
                &valuation_lead(),
                &id,
                "appraisal_decision",
                object(json!({"outcome": "maybe"})),
            )
            .expect_err("unknown option rejected");

        let ApprovalError::Form(FormError::Validation(violations)) = error else {
            panic!("expected a validation error");
        };
        assert!(violations.iter().any(|v| v.field == "outcome"));
    }

    #[test]
    fn aml_form_is_accounting_territory() {
        let (service, id) = build();

        let payload = object(json!({
            "fundsOrigin": "Savings account, documented.",
            "declarationSigned": "signed:omid:2026-08-21",
        }));
        assert!(matches!(
            service.submit_form(&valuation_lead(), &id, "aml_declaration", payload.clone()),
            Err(ApprovalError::PermissionDenied { .. })
        ));
        service
            .submit_form(&accounting_lead(), &id, "aml_declaration", payload)
            .expect("accounting submits");
    }
}
