//! Presence validation of required fields.

use crate::form::FieldMap;
use crate::schema::{FieldSpec, FormSchema, Requirement};
use crate::{IntakeError, IntakeResult};

/// Names of every required field absent from `fields`, in table order.
///
/// Always-required fields are checked unconditionally; gated fields only when their gate is
/// open (e.g. patient-only fields when `subject-group == patient`). All missing names are
/// collected in one pass.
///
/// A gated field is only satisfied by a non-empty value: the normalizer fills every gated
/// field with an empty default for the closed-gate case, and that default must not count as
/// an answer once the gate is open.
pub fn missing_fields(fields: &FieldMap, schema: &FormSchema) -> Vec<String> {
    schema
        .submitted_fields()
        .filter(|spec| spec.requirement.applies(fields))
        .filter(|spec| !is_satisfied(spec, fields))
        .map(|spec| spec.name.to_string())
        .collect()
}

fn is_satisfied(spec: &FieldSpec, fields: &FieldMap) -> bool {
    match (spec.requirement, fields.get(spec.name)) {
        (_, None) => false,
        (Requirement::When(_), Some(value)) => !value.is_empty(),
        (_, Some(_)) => true,
    }
}

/// Fail with [`IntakeError::MissingFields`] when any required field is absent.
pub fn require_fields(fields: &FieldMap, schema: &FormSchema) -> IntakeResult<()> {
    let missing = missing_fields(fields, schema);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(IntakeError::MissingFields(missing))
    }
}
