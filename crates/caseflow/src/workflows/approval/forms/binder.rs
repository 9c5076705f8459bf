use serde::Serialize;
use serde_json::{Map, Value};

use super::inheritance::inherited_value;
use super::registry::FormRegistry;
use super::schema::{FormSchema, Violation};
use crate::workflows::approval::instance::WorkflowInstance;

/// Binds form schemas to instance data: pre-fill on open, validate and merge on
/// submission.
#[derive(Debug, Default)]
pub struct FormBinder {
    registry: FormRegistry,
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("form {0} is not registered")]
    SchemaNotFound(String),
    #[error("form data failed validation with {} violation(s)", .0.len())]
    Validation(Vec<Violation>),
}

/// Form payload handed to renderers, either saved data or advisory pre-fill.
#[derive(Debug, Clone, Serialize)]
pub struct FormDataView {
    pub form_code: String,
    pub form_number: u32,
    pub title: String,
    pub version: u32,
    pub data: Map<String, Value>,
    pub prefilled: bool,
}

impl FormBinder {
    pub fn new(registry: FormRegistry) -> Self {
        Self { registry }
    }

    pub fn standard() -> Self {
        Self::new(FormRegistry::standard())
    }

    pub fn registry(&self) -> &FormRegistry {
        &self.registry
    }

    pub fn schema(&self, form_code: &str) -> Result<&FormSchema, FormError> {
        self.registry
            .by_code(form_code)
            .ok_or_else(|| FormError::SchemaNotFound(form_code.to_string()))
    }

    /// Saved data for the form, or an inheritance pre-fill when nothing has
    /// been submitted yet. Pre-fill is advisory and never written back.
    pub fn form_view(
        &self,
        form_code: &str,
        instance: &WorkflowInstance,
    ) -> Result<FormDataView, FormError> {
        let schema = self.schema(form_code)?;
        let saved = namespace_object(&instance.data, &schema.namespace);

        let (data, prefilled) = match saved {
            Some(saved) if !saved.is_empty() => {
                let mut data = Map::new();
                for field in &schema.fields {
                    if let Some(value) = saved.get(&field.code) {
                        data.insert(field.code.clone(), value.clone());
                    }
                }
                (data, false)
            }
            _ => {
                let mut data = Map::new();
                for field in &schema.fields {
                    if field.is_computed() {
                        continue;
                    }
                    if let Some(value) = inherited_value(&instance.data, &field.code) {
                        data.insert(field.code.clone(), value.clone());
                    }
                }
                for field in &schema.fields {
                    if let Some(computed) = &field.computed {
                        if let Some(value) =
                            compute_value(&computed.template, &computed.source_fields, &data)
                        {
                            data.insert(field.code.clone(), Value::String(value));
                        }
                    }
                }
                (data, true)
            }
        };

        Ok(FormDataView {
            form_code: schema.code.clone(),
            form_number: schema.form_number,
            title: schema.title.clone(),
            version: schema.version,
            data,
            prefilled,
        })
    }

    /// Validate and merge a submission into the instance document under the
    /// form's namespace. Client values for computed fields are discarded and
    /// recomputed from current sources. Returns the schema version the data
    /// was validated against.
    pub fn submit(
        &self,
        form_code: &str,
        instance: &mut WorkflowInstance,
        raw_data: Map<String, Value>,
    ) -> Result<u32, FormError> {
        let schema = self.schema(form_code)?;

        // Only declared, non-computed fields survive; the stored document
        // never carries keys the schema does not know about.
        let mut raw_data = raw_data;
        let mut cleaned = Map::new();
        for field in &schema.fields {
            if field.is_computed() {
                continue;
            }
            if let Some(value) = raw_data.remove(&field.code) {
                cleaned.insert(field.code.clone(), value);
            }
        }

        let violations = schema.validate(&cleaned);
        if !violations.is_empty() {
            return Err(FormError::Validation(violations));
        }

        // Computed fields derive from the merged view so sources saved in an
        // earlier submission still count.
        let mut context = namespace_object(&instance.data, &schema.namespace)
            .cloned()
            .unwrap_or_default();
        for (key, value) in &cleaned {
            context.insert(key.clone(), value.clone());
        }

        for field in &schema.fields {
            if let Some(computed) = &field.computed {
                if let Some(value) =
                    compute_value(&computed.template, &computed.source_fields, &context)
                {
                    cleaned.insert(field.code.clone(), Value::String(value));
                }
            }
        }

        merge_namespace(&mut instance.data, &schema.namespace, cleaned);
        Ok(schema.version)
    }
}

fn namespace_object<'a>(data: &'a Value, namespace: &str) -> Option<&'a Map<String, Value>> {
    data.as_object()?.get(namespace)?.as_object()
}

fn merge_namespace(data: &mut Value, namespace: &str, updates: Map<String, Value>) {
    if !data.is_object() {
        *data = Value::Object(Map::new());
    }
    let root = data.as_object_mut().expect("document root is an object");
    let target = root
        .entry(namespace.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    deep_merge(target, updates);
}

fn deep_merge(target: &mut Value, updates: Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let object = target.as_object_mut().expect("merge target is an object");
    for (key, value) in updates {
        match (object.get_mut(&key), value) {
            (Some(existing @ Value::Object(_)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                object.insert(key, value);
            }
        }
    }
}

/// `{code}` placeholder substitution over the source fields. Empty results are
/// treated as "nothing to compute".
fn compute_value(
    template: &str,
    source_fields: &[String],
    context: &Map<String, Value>,
) -> Option<String> {
    let mut result = template.to_string();
    for source in source_fields {
        let placeholder = format!("{{{source}}}");
        let rendered = context.get(source).map(render_scalar).unwrap_or_default();
        result = result.replace(&placeholder, &rendered);
    }

    let trimmed = result.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}
