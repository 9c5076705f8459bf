//! The standard form set. Schemas are versioned; submissions record the
//! version they were validated against.

use super::schema::{ComputedField, FieldKind, FormField, FormSchema, ValidationRules};

#[derive(Debug, Default)]
pub struct FormRegistry {
    forms: Vec<FormSchema>,
}

impl FormRegistry {
    pub fn new(forms: Vec<FormSchema>) -> Self {
        Self { forms }
    }

    pub fn standard() -> Self {
        Self::new(standard_forms())
    }

    pub fn by_code(&self, code: &str) -> Option<&FormSchema> {
        self.forms.iter().find(|form| form.code == code)
    }

    pub fn by_number(&self, form_number: u32) -> Option<&FormSchema> {
        self.forms.iter().find(|form| form.form_number == form_number)
    }

    pub fn schemas(&self) -> &[FormSchema] {
        &self.forms
    }
}

fn field(code: &str, label: &str, kind: FieldKind) -> FormField {
    FormField {
        code: code.to_string(),
        label: label.to_string(),
        kind,
        required: false,
        rules: ValidationRules::default(),
        computed: None,
    }
}

fn required(mut form_field: FormField) -> FormField {
    form_field.required = true;
    form_field
}

fn with_rules(mut form_field: FormField, rules: ValidationRules) -> FormField {
    form_field.rules = rules;
    form_field
}

fn computed(code: &str, label: &str, template: &str, sources: &[&str]) -> FormField {
    FormField {
        code: code.to_string(),
        label: label.to_string(),
        kind: FieldKind::Text,
        required: false,
        rules: ValidationRules::default(),
        computed: Some(ComputedField {
            template: template.to_string(),
            source_fields: sources.iter().map(|source| source.to_string()).collect(),
        }),
    }
}

fn select(options: &[&str]) -> FieldKind {
    FieldKind::Select {
        options: options.iter().map(|option| option.to_string()).collect(),
    }
}

fn standard_forms() -> Vec<FormSchema> {
    vec![
        FormSchema {
            code: "applicant_info".to_string(),
            form_number: 1,
            title: "Applicant information".to_string(),
            version: 2,
            namespace: "personalInformation".to_string(),
            fields: vec![
                with_rules(
                    required(field("firstName", "First name", FieldKind::Text)),
                    ValidationRules {
                        min_length: Some(2),
                        max_length: Some(60),
                        ..ValidationRules::default()
                    },
                ),
                with_rules(
                    required(field("lastName", "Last name", FieldKind::Text)),
                    ValidationRules {
                        min_length: Some(2),
                        max_length: Some(60),
                        ..ValidationRules::default()
                    },
                ),
                computed(
                    "fullName",
                    "Full name",
                    "{firstName} {lastName}",
                    &["firstName", "lastName"],
                ),
                with_rules(
                    required(field("nationalCode", "National code", FieldKind::Text)),
                    ValidationRules {
                        pattern: Some(r"^\d{10}$".to_string()),
                        ..ValidationRules::default()
                    },
                ),
                field("fatherName", "Father's name", FieldKind::Text),
                required(field("mobileNumber", "Mobile number", FieldKind::Phone)),
                field("email", "Email", FieldKind::Email),
                field("birthDate", "Birth date", FieldKind::Date),
                field("residenceAddress", "Residence address", FieldKind::TextArea),
                with_rules(
                    field("postalCode", "Postal code", FieldKind::Text),
                    ValidationRules {
                        pattern: Some(r"^\d{10}$".to_string()),
                        ..ValidationRules::default()
                    },
                ),
            ],
        },
        FormSchema {
            code: "property_details".to_string(),
            form_number: 2,
            title: "Property details".to_string(),
            version: 1,
            namespace: "propertyDetails".to_string(),
            fields: vec![
                with_rules(
                    required(field(
                        "registrationPlateNumber",
                        "Registration plate number",
                        FieldKind::Text,
                    )),
                    ValidationRules {
                        pattern: Some(r"^\d+(/\d+)*$".to_string()),
                        ..ValidationRules::default()
                    },
                ),
                required(field("address", "Property address", FieldKind::TextArea)),
                with_rules(
                    required(field("area", "Area (square meters)", FieldKind::Number)),
                    ValidationRules {
                        min: Some(1.0),
                        ..ValidationRules::default()
                    },
                ),
                required(field(
                    "usageType",
                    "Usage type",
                    select(&["residential", "commercial", "agricultural"]),
                )),
            ],
        },
        FormSchema {
            code: "ownership_review".to_string(),
            form_number: 3,
            title: "Ownership review".to_string(),
            version: 1,
            namespace: "roleAndOwnership".to_string(),
            fields: vec![
                required(field(
                    "role",
                    "Applicant role",
                    select(&["owner", "agent", "heir"]),
                )),
                field(
                    "ownershipDocumentNumber",
                    "Ownership document number",
                    FieldKind::Text,
                ),
                field("hasPriorClaims", "Prior claims exist", FieldKind::Checkbox),
            ],
        },
        FormSchema {
            code: "acquisition_review".to_string(),
            form_number: 4,
            title: "Acquisition review".to_string(),
            version: 1,
            namespace: "acquisitionReview".to_string(),
            fields: vec![
                with_rules(
                    required(field("proposedPrice", "Proposed price", FieldKind::Number)),
                    ValidationRules {
                        min: Some(0.0),
                        ..ValidationRules::default()
                    },
                ),
                field("committeeNotes", "Committee notes", FieldKind::TextArea),
            ],
        },
        FormSchema {
            code: "aml_declaration".to_string(),
            form_number: 5,
            title: "Anti-money-laundering declaration".to_string(),
            version: 1,
            namespace: "amlDeclaration".to_string(),
            fields: vec![
                required(field("fundsOrigin", "Origin of funds", FieldKind::TextArea)),
                required(field(
                    "declarationSigned",
                    "Declaration signature",
                    FieldKind::Signature,
                )),
            ],
        },
        FormSchema {
            code: "appraisal_decision".to_string(),
            form_number: 6,
            title: "Appraisal decision".to_string(),
            version: 1,
            namespace: "appraisalDecision".to_string(),
            fields: vec![
                required(field(
                    "outcome",
                    "Decision outcome",
                    select(&["approved", "rejected"]),
                )),
                with_rules(
                    field("justification", "Justification", FieldKind::TextArea),
                    ValidationRules {
                        min_length: Some(10),
                        ..ValidationRules::default()
                    },
                ),
            ],
        },
    ]
}
