//! Cross-form field inheritance: when a form opens with no saved data, known
//! field codes pre-fill from earlier submissions elsewhere in the instance
//! document. The mapping is declared statically so it can be audited and
//! unit-tested on its own; bump the version when entries change.

use serde_json::Value;

use crate::workflows::approval::conditions::resolve_path;

pub const INHERITANCE_TABLE_VERSION: u32 = 1;

/// Field code → candidate dotted paths, highest priority first.
const FIELD_INHERITANCE: &[(&str, &[&str])] = &[
    (
        "firstName",
        &[
            "personalInformation.firstName",
            "applicantDetails.firstName",
            "firstName",
        ],
    ),
    (
        "lastName",
        &[
            "personalInformation.lastName",
            "applicantDetails.lastName",
            "lastName",
        ],
    ),
    ("fullName", &["personalInformation.fullName", "fullName"]),
    (
        "nationalCode",
        &[
            "personalInformation.nationalCode",
            "applicantDetails.nationalCode",
            "nationalCode",
        ],
    ),
    (
        "fatherName",
        &["personalInformation.fatherName", "fatherName"],
    ),
    (
        "birthDate",
        &["personalInformation.birthDate", "birthDate"],
    ),
    (
        "birthCertificateNumber",
        &[
            "personalInformation.birthCertificateNumber",
            "birthCertificateNumber",
        ],
    ),
    (
        "mobileNumber",
        &[
            "personalInformation.mobileNumber",
            "applicantDetails.mobileNumber",
            "mobileNumber",
        ],
    ),
    (
        "phoneNumber",
        &["personalInformation.phoneNumber", "phoneNumber"],
    ),
    (
        "landlineNumber",
        &["personalInformation.landlineNumber", "landlineNumber"],
    ),
    ("email", &["personalInformation.email", "email"]),
    (
        "address",
        &[
            "personalInformation.residenceAddress",
            "propertyDetails.address",
            "address",
        ],
    ),
    (
        "postalCode",
        &["personalInformation.postalCode", "postalCode"],
    ),
    (
        "registrationPlateNumber",
        &[
            "propertyDetails.registrationPlateNumber",
            "registrationPlateNumber",
        ],
    ),
];

/// Strip the `form<N>_` prefix some schemas carry so shared fields line up
/// across forms.
pub fn canonical_field_code(code: &str) -> &str {
    if let Some(rest) = code.strip_prefix("form") {
        if let Some(position) = rest.find('_') {
            if position > 0 && rest[..position].bytes().all(|b| b.is_ascii_digit()) {
                return &rest[position + 1..];
            }
        }
    }
    code
}

/// First non-empty value the mapping finds for a field code, if any.
pub fn inherited_value<'a>(data: &'a Value, field_code: &str) -> Option<&'a Value> {
    let canonical = canonical_field_code(field_code);
    let (_, paths) = FIELD_INHERITANCE
        .iter()
        .find(|(code, _)| *code == canonical)?;

    paths
        .iter()
        .filter_map(|path| resolve_path(data, path))
        .find(|value| !inherited_empty(value))
}

fn inherited_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_earlier_paths() {
        let data = json!({
            "personalInformation": {"firstName": "Sara"},
            "applicantDetails": {"firstName": "S."},
        });
        assert_eq!(inherited_value(&data, "firstName"), Some(&json!("Sara")));
    }

    #[test]
    fn falls_through_empty_values() {
        let data = json!({
            "personalInformation": {"firstName": ""},
            "applicantDetails": {"firstName": "Sara"},
        });
        assert_eq!(inherited_value(&data, "firstName"), Some(&json!("Sara")));
    }

    #[test]
    fn unknown_fields_inherit_nothing() {
        let data = json!({"personalInformation": {"firstName": "Sara"}});
        assert_eq!(inherited_value(&data, "committeeNotes"), None);
    }

    #[test]
    fn address_inherits_from_residence_then_property() {
        let data = json!({"propertyDetails": {"address": "12 Valiasr St"}});
        assert_eq!(
            inherited_value(&data, "address"),
            Some(&json!("12 Valiasr St"))
        );
    }

    #[test]
    fn canonical_code_strips_form_prefix() {
        assert_eq!(canonical_field_code("form1_firstName"), "firstName");
        assert_eq!(canonical_field_code("form12_address"), "address");
        assert_eq!(canonical_field_code("formless"), "formless");
        assert_eq!(canonical_field_code("firstName"), "firstName");
    }

    #[test]
    fn prefixed_codes_inherit_like_their_canonical_form() {
        let data = json!({"personalInformation": {"firstName": "Sara"}});
        assert_eq!(
            inherited_value(&data, "form2_firstName"),
            Some(&json!("Sara"))
        );
    }
}
