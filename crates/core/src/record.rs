//! Typed projection of a validated submission.
//!
//! Every field of the selected schema table is parsed from its raw string into a
//! [`FieldValue`]. A value that cannot be read as its declared kind aborts the whole request
//! as a server fault: by this point the canonical string has already been accepted, so a type
//! error means the form and the schema table disagree, not that the user mistyped.

use crate::canonical::parse_real;
use crate::constants::{CHECKBOX_OFF, CHECKBOX_ON};
use crate::form::FieldMap;
use crate::schema::{FieldKind, FieldSpec, FormSchema};
use crate::{IntakeError, IntakeResult};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A typed field value. Serialises as a bare JSON scalar; `Absent` is `null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Flag(bool),
    Absent,
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// The typed record of one submission, in schema table order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(&'static str, FieldValue)>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Parse every field of `schema` from `fields`. Fields not present are [`FieldValue::Absent`].
pub fn build_record(fields: &FieldMap, schema: &FormSchema) -> IntakeResult<Record> {
    let fields = schema
        .fields()
        .map(|spec| {
            let value = match fields.get(spec.name) {
                Some(raw) => parse_value(spec, raw)?,
                None => FieldValue::Absent,
            };
            Ok((spec.name, value))
        })
        .collect::<IntakeResult<Vec<_>>>()?;

    Ok(Record { fields })
}

/// Parse one raw value according to its spec.
pub fn parse_value(spec: &FieldSpec, raw: &str) -> IntakeResult<FieldValue> {
    let type_error = || IntakeError::FieldType {
        field: spec.name.to_string(),
        expected: spec.kind.as_str(),
        value: raw.to_string(),
    };

    match spec.kind {
        FieldKind::Text if raw.is_empty() => Ok(FieldValue::Absent),
        FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
        FieldKind::Integer if raw.is_empty() => Ok(FieldValue::Absent),
        FieldKind::Integer => parse_integer(raw)
            .map(FieldValue::Integer)
            .ok_or_else(type_error),
        FieldKind::Real if raw.is_empty() => Ok(FieldValue::Absent),
        FieldKind::Real => parse_real(raw).map(FieldValue::Real).ok_or_else(type_error),
        FieldKind::Checkbox => match raw {
            CHECKBOX_ON => Ok(FieldValue::Flag(true)),
            CHECKBOX_OFF => Ok(FieldValue::Flag(false)),
            "" => Ok(FieldValue::Absent),
            _ => Err(type_error()),
        },
    }
}

/// Integers are accepted in any real notation as long as the value is integral (`"2.0"`).
fn parse_integer(raw: &str) -> Option<i64> {
    let number = parse_real(raw)?;
    if number.fract() != 0.0 || number < i64::MIN as f64 || number >= i64::MAX as f64 {
        return None;
    }
    Some(number as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::schema::FORM_V2_3;

    fn spec(name: &str) -> &'static FieldSpec {
        FORM_V2_3.field(name).unwrap()
    }

    #[test]
    fn integers_accept_integral_reals() {
        let arat = spec("arat-left");
        assert_eq!(parse_value(arat, ".0").unwrap(), FieldValue::Integer(0));
        assert_eq!(parse_value(arat, "1.0").unwrap(), FieldValue::Integer(1));
        assert_eq!(parse_value(arat, "2").unwrap(), FieldValue::Integer(2));
        assert_eq!(parse_value(arat, "2.0").unwrap(), FieldValue::Integer(2));
        assert_eq!(parse_value(arat, "").unwrap(), FieldValue::Absent);
    }

    #[test]
    fn integers_reject_fractions_and_words() {
        let arat = spec("arat-left");
        for raw in ["3.4", "a", "1e400"] {
            let err = parse_value(arat, raw).unwrap_err();
            match err {
                IntakeError::FieldType {
                    field, expected, ..
                } => {
                    assert_eq!(field, "arat-left");
                    assert_eq!(expected, "integer");
                }
                other => panic!("unexpected error for {raw}: {other:?}"),
            }
        }
    }

    #[test]
    fn reals_and_text() {
        assert_eq!(
            parse_value(spec("time-tmt-a"), "12.75").unwrap(),
            FieldValue::Real(12.75)
        );
        assert_eq!(
            parse_value(spec("time-tmt-a"), "").unwrap(),
            FieldValue::Absent
        );
        assert_eq!(
            parse_value(spec("euroqol-code"), "11223").unwrap(),
            FieldValue::Text("11223".into())
        );
        assert_eq!(
            parse_value(spec("euroqol-code"), "").unwrap(),
            FieldValue::Absent
        );
    }

    #[test]
    fn checkboxes_are_tri_state() {
        let cb = spec("additional-mrt-dti");
        assert_eq!(parse_value(cb, "on").unwrap(), FieldValue::Flag(true));
        assert_eq!(parse_value(cb, "off").unwrap(), FieldValue::Flag(false));
        assert_eq!(parse_value(cb, "").unwrap(), FieldValue::Absent);
        assert!(parse_value(cb, "true").is_err());
    }

    #[test]
    fn record_covers_schema_in_order_and_serialises_scalars() {
        let mut fields: FieldMap = [
            ("form-data-version", "2.3"),
            ("subject-group", "healthy"),
            ("laterality-quotient", "2.0"),
            ("maximum-ftf-left", "3.5"),
            ("kopss-applicable", "on"),
        ]
        .into_iter()
        .collect();
        normalize(&mut fields, &FORM_V2_3);

        let record = build_record(&fields, &FORM_V2_3).unwrap();
        assert_eq!(record.len(), FORM_V2_3.fields().count());
        assert_eq!(record.iter().next().unwrap().0, "form-data-version");
        assert!(record.get("hashed-string").is_none());
        assert!(record.get("additional-mrt").unwrap().is_absent());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["form-data-version"], "2.3");
        assert_eq!(json["laterality-quotient"], 2);
        assert_eq!(json["maximum-ftf-left"], 3.5);
        assert_eq!(json["maximum-ftf-right"], serde_json::Value::Null);
        assert_eq!(json["repeated-test"], false);
        assert_eq!(json["kopss-applicable"], true);
        assert_eq!(json["subject-pseudonym"], serde_json::Value::Null);
    }

    #[test]
    fn one_bad_field_fails_the_record() {
        let mut fields: FieldMap = [("laterality-quotient", "3.4")].into_iter().collect();
        normalize(&mut fields, &FORM_V2_3);
        let err = build_record(&fields, &FORM_V2_3).unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::ServerFault);
    }
}
