//! Fill in fields the browser did not send.
//!
//! Browsers omit disabled controls and unchecked checkboxes entirely. Before validation every
//! field with a default in the schema table is inserted if absent, and optional checkboxes
//! whose `<name>-valid` marker is missing are reset to unset, so that a hidden checkbox is
//! never mistaken for an explicit "unchecked".

use crate::constants::CHECKBOX_MARKER_SUFFIX;
use crate::form::FieldMap;
use crate::schema::FormSchema;

/// Apply schema defaults and the optional-checkbox correction to `fields`.
pub fn normalize(fields: &mut FieldMap, schema: &FormSchema) {
    add_defaults(fields, schema);
    correct_optional_checkboxes(fields, schema);
}

fn add_defaults(fields: &mut FieldMap, schema: &FormSchema) {
    for spec in schema.submitted_fields() {
        if let Some(default) = spec.default {
            if !fields.contains(spec.name) {
                fields.insert(spec.name, default);
            }
        }
    }
}

fn correct_optional_checkboxes(fields: &mut FieldMap, schema: &FormSchema) {
    for spec in schema.fields().filter(|f| f.optional_checkbox) {
        let marker = format!("{}{CHECKBOX_MARKER_SUFFIX}", spec.name);
        if !fields.contains(&marker) {
            fields.insert(spec.name, "");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FORM_V2_2, FORM_V2_3};

    #[test]
    fn defaults_fill_absent_fields_only() {
        let mut fields: FieldMap = [("maximum-ftf-left", "12.5")].into_iter().collect();
        normalize(&mut fields, &FORM_V2_3);

        assert_eq!(fields.get("maximum-ftf-left"), Some("12.5"));
        assert_eq!(fields.get("maximum-ftf-right"), Some(""));
        assert_eq!(fields.get("repeated-test"), Some("off"));
        assert_eq!(fields.get("psqi-meds"), Some(""));
        assert_eq!(fields.get("signature-data"), Some(""));
    }

    #[test]
    fn fields_without_default_stay_absent() {
        let mut fields = FieldMap::new();
        normalize(&mut fields, &FORM_V2_3);

        assert!(!fields.contains("subject-pseudonym"));
        assert!(!fields.contains("subject-group"));
        assert!(!fields.contains("hashed-string"));
        assert!(!fields.contains("kopss-applicable"));
    }

    #[test]
    fn version_specific_defaults() {
        let mut fields = FieldMap::new();
        normalize(&mut fields, &FORM_V2_2);
        assert!(!fields.contains("psqi-meds"));
    }

    #[test]
    fn optional_checkbox_without_marker_is_unset() {
        let mut fields: FieldMap = [("additional-mrt-dti", "on")].into_iter().collect();
        normalize(&mut fields, &FORM_V2_3);

        assert_eq!(fields.get("additional-mrt-dti"), Some(""));
        assert_eq!(fields.get("jtt-incorrectly-executed"), Some(""));
    }

    #[test]
    fn optional_checkbox_with_marker_keeps_value() {
        let mut fields: FieldMap = [
            ("additional-mrt-dti", "on"),
            ("additional-mrt-dti-valid", "1"),
            ("tmt-a-incorrectly-executed-valid", "1"),
        ]
        .into_iter()
        .collect();
        normalize(&mut fields, &FORM_V2_3);

        assert_eq!(fields.get("additional-mrt-dti"), Some("on"));
        // rendered but unchecked: the default applies
        assert_eq!(fields.get("tmt-a-incorrectly-executed"), Some("off"));
    }

    #[test]
    fn plain_checkbox_is_not_reset() {
        let mut fields: FieldMap = [("repeated-test", "on")].into_iter().collect();
        normalize(&mut fields, &FORM_V2_3);
        assert_eq!(fields.get("repeated-test"), Some("on"));
    }
}
