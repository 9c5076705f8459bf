use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Field categories and their intrinsic value checks. Adding a kind means
/// adding one variant and one arm in `intrinsic_violation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    TextArea,
    Number,
    Email,
    Phone,
    Date,
    Select { options: Vec<String> },
    Checkbox,
    Signature,
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::TextArea => "textarea",
            Self::Number => "number",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Date => "date",
            Self::Select { .. } => "select",
            Self::Checkbox => "checkbox",
            Self::Signature => "signature",
        }
    }

    fn intrinsic_violation(&self, field: &str, value: &Value) -> Option<Violation> {
        match self {
            Self::Text | Self::TextArea | Self::Signature => value
                .as_str()
                .is_none()
                .then(|| Violation::new(field, "type", "expected a string value")),
            Self::Number => value
                .as_f64()
                .is_none()
                .then(|| Violation::new(field, "type", "expected a numeric value")),
            Self::Checkbox => value
                .as_bool()
                .is_none()
                .then(|| Violation::new(field, "type", "expected a boolean value")),
            Self::Email => match value.as_str() {
                Some(raw) if email_shaped(raw) => None,
                Some(_) => Some(Violation::new(field, "email", "not a valid email address")),
                None => Some(Violation::new(field, "type", "expected a string value")),
            },
            Self::Phone => match value.as_str() {
                Some(raw) if phone_shaped(raw) => None,
                Some(_) => Some(Violation::new(field, "phone", "not a valid phone number")),
                None => Some(Violation::new(field, "type", "expected a string value")),
            },
            Self::Date => match value.as_str() {
                Some(raw) if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() => None,
                Some(_) => Some(Violation::new(field, "date", "expected an ISO date (YYYY-MM-DD)")),
                None => Some(Violation::new(field, "type", "expected a string value")),
            },
            Self::Select { options } => match value.as_str() {
                Some(raw) if options.iter().any(|option| option == raw) => None,
                Some(raw) => Some(Violation::new(
                    field,
                    "option",
                    format!("'{raw}' is not one of the allowed options"),
                )),
                None => Some(Violation::new(field, "type", "expected a string value")),
            },
        }
    }
}

fn email_shaped(raw: &str) -> bool {
    let mut parts = raw.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        _ => false,
    }
}

fn phone_shaped(raw: &str) -> bool {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    (7..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Declared constraints beyond the field kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Server-side derivation recipe for a computed field: `{code}` placeholders
/// substituted with current source-field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedField {
    pub template: String,
    pub source_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub code: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub rules: ValidationRules,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed: Option<ComputedField>,
}

impl FormField {
    pub fn is_computed(&self) -> bool {
        self.computed.is_some()
    }

    /// All violations for a submitted value, not just the first.
    pub fn violations(&self, value: Option<&Value>) -> Vec<Violation> {
        let mut violations = Vec::new();

        let present = value.map_or(false, |v| !value_is_empty(v));
        if self.required && !present {
            violations.push(Violation::new(
                &self.code,
                "required",
                format!("{} is required", self.label),
            ));
        }

        let Some(value) = value.filter(|v| !value_is_empty(v)) else {
            return violations;
        };

        if let Some(violation) = self.kind.intrinsic_violation(&self.code, value) {
            violations.push(violation);
        }

        if let Some(text) = value.as_str() {
            let length = text.chars().count();
            if let Some(min) = self.rules.min_length {
                if length < min {
                    violations.push(Violation::new(
                        &self.code,
                        "minLength",
                        format!("must be at least {min} characters"),
                    ));
                }
            }
            if let Some(max) = self.rules.max_length {
                if length > max {
                    violations.push(Violation::new(
                        &self.code,
                        "maxLength",
                        format!("must be at most {max} characters"),
                    ));
                }
            }
            if let Some(pattern) = &self.rules.pattern {
                match Regex::new(pattern) {
                    Ok(regex) => {
                        if !regex.is_match(text) {
                            violations.push(Violation::new(
                                &self.code,
                                "pattern",
                                format!("{} does not match the expected format", self.label),
                            ));
                        }
                    }
                    Err(err) => {
                        warn!(field = %self.code, %err, "skipping unparseable pattern rule");
                    }
                }
            }
        }

        if let Some(number) = value.as_f64() {
            if let Some(min) = self.rules.min {
                if number < min {
                    violations.push(Violation::new(
                        &self.code,
                        "min",
                        format!("must be at least {min}"),
                    ));
                }
            }
            if let Some(max) = self.rules.max {
                if number > max {
                    violations.push(Violation::new(
                        &self.code,
                        "max",
                        format!("must be at most {max}"),
                    ));
                }
            }
        }

        violations
    }
}

fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// One field-level rule failure; submissions report every failure at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub rule: String,
    pub message: String,
}

impl Violation {
    fn new(field: &str, rule: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            rule: rule.to_string(),
            message: message.into(),
        }
    }
}

/// Renderable form definition bound to a data namespace on the instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSchema {
    pub code: String,
    pub form_number: u32,
    pub title: String,
    pub version: u32,
    pub namespace: String,
    pub fields: Vec<FormField>,
}

impl FormSchema {
    pub fn field(&self, code: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.code == code)
    }

    /// Validate a full submission, collecting violations across every field.
    pub fn validate(&self, data: &Map<String, Value>) -> Vec<Violation> {
        self.fields
            .iter()
            .filter(|field| !field.is_computed())
            .flat_map(|field| field.violations(data.get(&field.code)))
            .collect()
    }
}
