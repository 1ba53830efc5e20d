//! Declarative, versioned field schema of the assessment form.
//!
//! Every field the form can send is described once by a [`FieldSpec`]: how its raw value is
//! typed, whether it must be present, what the browser-omitted default is, and whether it takes
//! part in the canonical string. A [`FormSchema`] is an ordered list of such specs for one
//! `form-data-version`; table order is canonical order.
//!
//! Schema versions are assembled from shared sections so that a newer form version only lists
//! what it adds. All tables are immutable statics.

use crate::constants::{
    CHECKBOX_OFF, HASHED_STRING_FIELD, HASH_VALUE_FIELD, PATIENT_GROUP, SIGNATURE_FIELD,
    SUBJECT_GROUP_FIELD,
};
use crate::form::FieldMap;

/// How a raw value is typed and canonicalised.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Text,
    Integer,
    Real,
    /// Tri-state checkbox: `on`, `off`, or unset.
    Checkbox,
}

impl FieldKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Checkbox => "checkbox",
        }
    }
}

/// A condition on another field's value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Gate {
    pub field: &'static str,
    pub value: &'static str,
}

impl Gate {
    pub fn is_open(&self, fields: &FieldMap) -> bool {
        fields.get(self.field) == Some(self.value)
    }
}

/// Patient-only fields are required when `subject-group == patient`.
pub const PATIENT_GATE: Gate = Gate {
    field: SUBJECT_GROUP_FIELD,
    value: PATIENT_GROUP,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Requirement {
    Always,
    When(Gate),
    Never,
}

impl Requirement {
    pub fn applies(&self, fields: &FieldMap) -> bool {
        match self {
            Self::Always => true,
            Self::When(gate) => gate.is_open(fields),
            Self::Never => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub requirement: Requirement,
    /// Raw value inserted when the browser did not send the field.
    pub default: Option<&'static str>,
    /// Whether the field is part of the canonical string.
    pub hashed: bool,
    /// Checkbox that is only meaningful when its `<name>-valid` marker was sent.
    pub optional_checkbox: bool,
}

impl FieldSpec {
    const fn base(name: &'static str, kind: FieldKind, default: Option<&'static str>) -> Self {
        Self {
            name,
            kind,
            requirement: Requirement::Always,
            default,
            hashed: true,
            optional_checkbox: false,
        }
    }

    /// Always-required text the client must send itself.
    const fn identity(name: &'static str) -> Self {
        Self::base(name, FieldKind::Text, None)
    }

    const fn text(name: &'static str) -> Self {
        Self::base(name, FieldKind::Text, Some(""))
    }

    const fn int(name: &'static str) -> Self {
        Self::base(name, FieldKind::Integer, Some(""))
    }

    const fn real(name: &'static str) -> Self {
        Self::base(name, FieldKind::Real, Some(""))
    }

    const fn checkbox(name: &'static str) -> Self {
        Self::base(name, FieldKind::Checkbox, Some(CHECKBOX_OFF))
    }

    const fn optional_checkbox(name: &'static str) -> Self {
        Self {
            optional_checkbox: true,
            ..Self::checkbox(name)
        }
    }

    /// Recorded when sent, never required, not hashed.
    const fn extra_checkbox(name: &'static str) -> Self {
        Self {
            requirement: Requirement::Never,
            default: None,
            hashed: false,
            ..Self::checkbox(name)
        }
    }

    const fn patient(self) -> Self {
        Self {
            requirement: Requirement::When(PATIENT_GATE),
            ..self
        }
    }

    const fn unhashed(self) -> Self {
        Self {
            hashed: false,
            ..self
        }
    }
}

const IDENTITY: &[FieldSpec] = &[
    FieldSpec::identity("form-data-version"),
    FieldSpec::identity("data-entry-domain"),
    FieldSpec::identity("data-entry-employee"),
    FieldSpec::identity("project-code"),
    FieldSpec::identity("subject-pseudonym"),
    FieldSpec::identity("date-of-birth"),
    FieldSpec::identity("sex"),
    FieldSpec::identity("date-of-test"),
    FieldSpec::checkbox("repeated-test"),
    FieldSpec::identity(SUBJECT_GROUP_FIELD).unhashed(),
];

const PATIENT: &[FieldSpec] = &[
    FieldSpec::text("patient-year-first-symptom").patient(),
    FieldSpec::text("patient-month-first-symptom").patient(),
    FieldSpec::text("patient-day-first-symptom").patient(),
    FieldSpec::text("patient-year-diagnosis").patient(),
    FieldSpec::text("patient-month-diagnosis").patient(),
    FieldSpec::text("patient-day-diagnosis").patient(),
    FieldSpec::text("patient-main-disease").patient(),
    FieldSpec::text("patient-stronger-impacted-hand").patient(),
];

const ASSESSMENTS: &[FieldSpec] = &[
    FieldSpec::int("laterality-quotient"),
    FieldSpec::real("maximum-ftf-left"),
    FieldSpec::real("maximum-ftf-right"),
    FieldSpec::real("maximum-gs-left"),
    FieldSpec::real("maximum-gs-right"),
    FieldSpec::real("purdue-pegboard-left"),
    FieldSpec::real("purdue-pegboard-right"),
    FieldSpec::real("turn-cards-left"),
    FieldSpec::real("turn-cards-right"),
    FieldSpec::real("small-things-left"),
    FieldSpec::real("small-things-right"),
    FieldSpec::real("simulated-feeding-left"),
    FieldSpec::real("simulated-feeding-right"),
    FieldSpec::real("checkers-left"),
    FieldSpec::real("checkers-right"),
    FieldSpec::real("large-light-things-left"),
    FieldSpec::real("large-light-things-right"),
    FieldSpec::real("large-heavy-things-left"),
    FieldSpec::real("large-heavy-things-right"),
    FieldSpec::optional_checkbox("jtt-incorrectly-executed"),
    FieldSpec::int("arat-left"),
    FieldSpec::int("arat-right"),
    FieldSpec::real("tug-executed"),
    FieldSpec::optional_checkbox("tug-a-incorrectly-executed"),
    FieldSpec::optional_checkbox("tug-a-tools-required"),
    FieldSpec::real("tug-imagined"),
    FieldSpec::int("go-nogo-block-count"),
    FieldSpec::int("go-nogo-total-errors"),
    FieldSpec::int("go-nogo-wrong-errors"),
    FieldSpec::int("go-nogo-recognized-errors"),
    FieldSpec::real("go-nogo-correct-answer-time"),
    FieldSpec::real("go-nogo-recognized-error-time"),
    FieldSpec::optional_checkbox("go-nogo-incorrectly-executed"),
    FieldSpec::int("kas-pantomime-bukko-facial"),
    FieldSpec::int("kas-pantomime-arm-hand"),
    FieldSpec::int("kas-imitation-bukko-facial"),
    FieldSpec::int("kas-imitation-arm-hand"),
    FieldSpec::int("kopss-orientation"),
    FieldSpec::real("kopss-speech"),
    FieldSpec::int("kopss-praxie"),
    FieldSpec::int("kopss-visual-spatial-performance"),
    FieldSpec::int("kopss-calculating"),
    FieldSpec::real("kopss-executive-performance"),
    FieldSpec::int("kopss-memory"),
    FieldSpec::int("kopss-affect"),
    FieldSpec::int("kopss-behavior-observation"),
    FieldSpec::real("acl-k-loud-reading"),
    FieldSpec::int("acl-k-color-form-test"),
    FieldSpec::int("acl-k-supermarket-task"),
    FieldSpec::int("acl-k-communication-ability"),
    FieldSpec::int("bdi-ii-score"),
    FieldSpec::int("madrs-score"),
    FieldSpec::int("demtect-wordlist"),
    FieldSpec::int("demtect-convert-numbers"),
    FieldSpec::int("demtect-supermarket-task"),
    FieldSpec::int("demtect-numbers-reverse"),
    FieldSpec::int("demtect-wordlist-recall"),
    FieldSpec::real("time-tmt-a"),
    FieldSpec::optional_checkbox("tmt-a-incorrectly-executed"),
    FieldSpec::real("time-tmt-b"),
    FieldSpec::optional_checkbox("tmt-b-incorrectly-executed"),
    FieldSpec::int("mrs-score"),
    FieldSpec::text("euroqol-code"),
    FieldSpec::int("euroqol-vas"),
    FieldSpec::int("isced-value"),
];

// Pittsburgh Sleep Quality Index components, added in 2.3.
const PSQI: &[FieldSpec] = &[
    FieldSpec::int("psqi-sleep-quality"),
    FieldSpec::int("psqi-sleep-latency"),
    FieldSpec::int("psqi-sleep-duration"),
    FieldSpec::int("psqi-sleep-efficiency"),
    FieldSpec::int("psqi-sleep-disturbance"),
    FieldSpec::int("psqi-meds"),
    FieldSpec::int("psqi-day-dysfunction"),
];

const ADDITIONAL: &[FieldSpec] = &[
    FieldSpec::text("additional-mrt-url"),
    FieldSpec::optional_checkbox("additional-mrt-resting-state"),
    FieldSpec::optional_checkbox("additional-mrt-tapping-task"),
    FieldSpec::optional_checkbox("additional-mrt-anatomical-representation"),
    FieldSpec::optional_checkbox("additional-mrt-dti"),
    FieldSpec::text("additional-eeg-url"),
    FieldSpec::text("additional-blood-sampling-url"),
    FieldSpec::text("additional-remarks"),
];

const EXTRAS: &[FieldSpec] = &[
    FieldSpec::extra_checkbox("tug-v-not-executable"),
    FieldSpec::extra_checkbox("kopss-applicable"),
    FieldSpec::extra_checkbox("additional-mrt"),
    FieldSpec::extra_checkbox("additional-eeg"),
    FieldSpec::extra_checkbox("additional-blood-sampling"),
];

/// Fields that travel with every submission but belong to the envelope, not the record.
pub const ENVELOPE_FIELDS: &[FieldSpec] = &[
    FieldSpec::identity(HASHED_STRING_FIELD).unhashed(),
    FieldSpec::identity(HASH_VALUE_FIELD).unhashed(),
    FieldSpec {
        requirement: Requirement::Never,
        ..FieldSpec::text(SIGNATURE_FIELD).unhashed()
    },
];

/// The field table of one form version.
#[derive(Debug)]
pub struct FormSchema {
    version: &'static str,
    sections: &'static [&'static [FieldSpec]],
}

pub static FORM_V2_2: FormSchema = FormSchema {
    version: "2.2",
    sections: &[IDENTITY, PATIENT, ASSESSMENTS, ADDITIONAL, EXTRAS],
};

pub static FORM_V2_3: FormSchema = FormSchema {
    version: "2.3",
    sections: &[IDENTITY, PATIENT, ASSESSMENTS, PSQI, ADDITIONAL, EXTRAS],
};

static SCHEMAS: &[&FormSchema] = &[&FORM_V2_2, &FORM_V2_3];

impl FormSchema {
    /// Look up the table for a `form-data-version`.
    pub fn lookup(version: &str) -> Option<&'static FormSchema> {
        SCHEMAS.iter().copied().find(|s| s.version == version)
    }

    pub fn latest() -> &'static FormSchema {
        &FORM_V2_3
    }

    pub fn supported_versions() -> impl Iterator<Item = &'static str> {
        SCHEMAS.iter().map(|s| s.version)
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    /// Record fields in table order.
    pub fn fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        let sections = self.sections;
        sections.iter().flat_map(|section| section.iter())
    }

    /// Record fields followed by the envelope fields.
    pub fn submitted_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields().chain(ENVELOPE_FIELDS.iter())
    }

    /// Fields of the canonical string, in canonical order.
    pub fn hashed_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields().filter(|f| f.hashed)
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().find(|f| f.name == name)
    }
}
