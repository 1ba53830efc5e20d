//! Canonical string and integrity check.
//!
//! The form computes, client-side, a canonical serialisation of its own field values together
//! with the SHA-256 of that string, and posts both alongside the fields. The server rebuilds
//! the string from the received fields and requires both to match before anything is stored.
//! This detects transport corruption, stale cached forms and field-ordering bugs without any
//! session state.
//!
//! ## Format
//!
//! `name:value` for every hashed field of the schema, in table order, joined by `;`.
//!
//! - text: the raw value unchanged
//! - checkbox: `on` → `True`, `off` → `False`, empty → empty
//! - number: empty → empty; integral values without a decimal point (`2.0` → `2`), other
//!   values as the shortest decimal that round-trips (`2.50` → `2.5`). Magnitudes below
//!   `1e-4` switch to exponent notation with a signed two-digit exponent (`1e-07`), the
//!   text the form's own number formatter produces.

use crate::constants::{CHECKBOX_OFF, CHECKBOX_ON};
use crate::form::FieldMap;
use crate::schema::{FieldKind, FieldSpec, FormSchema};
use crate::{IntakeError, IntakeResult};
use sha2::{Digest, Sha256};

/// The two integrity strings of an accepted submission, carried into the envelope.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IntegrityProof {
    pub canonical: String,
    pub hash: String,
}

/// Lowercase hex SHA-256 of the UTF-8 bytes of `input`.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Build the canonical string of `fields` for `schema`.
///
/// # Errors
///
/// - [`IntakeError::FieldVanished`] if a hashed field is absent (normalization fills them all).
/// - [`IntakeError::UnrecognizedCheckbox`] for a checkbox value other than `on`/`off`/empty.
/// - [`IntakeError::UnparsableNumber`] for a numeric value that is not a finite real.
pub fn canonical_string(fields: &FieldMap, schema: &FormSchema) -> IntakeResult<String> {
    let parts = schema
        .hashed_fields()
        .map(|spec| {
            let raw = fields
                .get(spec.name)
                .ok_or_else(|| IntakeError::FieldVanished(spec.name.to_string()))?;
            Ok(format!("{}:{}", spec.name, format_value(spec, raw)?))
        })
        .collect::<IntakeResult<Vec<_>>>()?;

    Ok(parts.join(";"))
}

/// Rebuild the canonical string and check it, then its hash, against the submitted values.
///
/// The string comparison runs first; a hash is only compared once the strings agree.
pub fn verify_integrity(
    fields: &FieldMap,
    schema: &FormSchema,
    sent_canonical: &str,
    sent_hash: &str,
) -> IntakeResult<IntegrityProof> {
    let local = canonical_string(fields, schema)?;
    if local != sent_canonical {
        return Err(IntakeError::CanonicalMismatch {
            local,
            sent: sent_canonical.to_string(),
        });
    }

    let local_hash = sha256_hex(&local);
    if local_hash != sent_hash {
        return Err(IntakeError::HashMismatch {
            local: local_hash,
            sent: sent_hash.to_string(),
        });
    }

    Ok(IntegrityProof {
        canonical: local,
        hash: local_hash,
    })
}

fn format_value(spec: &FieldSpec, raw: &str) -> IntakeResult<String> {
    match spec.kind {
        FieldKind::Text => Ok(raw.to_string()),
        FieldKind::Checkbox => format_checkbox(spec.name, raw),
        FieldKind::Integer | FieldKind::Real => format_number(spec.name, raw),
    }
}

fn format_checkbox(name: &str, raw: &str) -> IntakeResult<String> {
    match raw {
        CHECKBOX_ON => Ok("True".into()),
        CHECKBOX_OFF => Ok("False".into()),
        "" => Ok(String::new()),
        _ => Err(IntakeError::UnrecognizedCheckbox {
            field: name.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn format_number(name: &str, raw: &str) -> IntakeResult<String> {
    if raw.is_empty() {
        return Ok(String::new());
    }

    let number = parse_real(raw).ok_or_else(|| IntakeError::UnparsableNumber {
        field: name.to_string(),
        value: raw.to_string(),
    })?;

    if number == 0.0 {
        // covers -0.0
        Ok("0".into())
    } else if number.fract() == 0.0 {
        Ok(format!("{number:.0}"))
    } else if number.abs() < 1e-4 {
        Ok(exponent_form(number))
    } else {
        Ok(number.to_string())
    }
}

/// `1.5e-7` → `1.5e-07`.
fn exponent_form(number: f64) -> String {
    let shortest = format!("{number:e}");
    match shortest.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => shortest,
    }
}

/// Parse a finite real number, tolerating surrounding whitespace.
pub(crate) fn parse_real(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
