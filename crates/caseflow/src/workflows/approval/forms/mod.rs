//! Dynamic forms: schema definitions, validation, computed fields, cross-form
//! inheritance, and the binder that merges submissions into instance data.

pub mod binder;
pub mod inheritance;
pub mod registry;
pub mod schema;

pub use binder::{FormBinder, FormDataView, FormError};
pub use registry::FormRegistry;
pub use schema::{
    ComputedField, FieldKind, FormField, FormSchema, ValidationRules, Violation,
};
