//! Constants used throughout the intake core crate.
//!
//! Path names, field names outside the schema tables, and fixed response texts live here so
//! that the orchestrator, the storage layer and the CLI agree on them.

/// Directory below the dataset root that receives submitted records.
pub const INPUT_DIR_NAME: &str = "input";

/// Extension of persisted envelope files.
pub const RECORD_FILE_EXTENSION: &str = "json";

/// Name of the confirmation page template inside the template directory.
pub const SUCCESS_TEMPLATE_NAME: &str = "success.html.tera";

/// Template directory shipped with the repository, relative to the workspace root.
pub const BUNDLED_TEMPLATE_DIR: &str = "templates";

/// Sub-project label shown on the confirmation page.
pub const SUB_PROJECT: &str = "Z03";

/// Field carrying the schema version of the submitted form.
pub const FORM_VERSION_FIELD: &str = "form-data-version";

/// Field carrying the client-side canonical string.
pub const HASHED_STRING_FIELD: &str = "hashed-string";

/// Field carrying the client-side SHA-256 of the canonical string.
pub const HASH_VALUE_FIELD: &str = "hash-value";

/// Field carrying an optional hand-drawn signature.
pub const SIGNATURE_FIELD: &str = "signature-data";

/// Suffix of the marker field that accompanies a rendered optional checkbox.
pub const CHECKBOX_MARKER_SUFFIX: &str = "-valid";

/// Gate field deciding whether patient-only fields are required.
pub const SUBJECT_GROUP_FIELD: &str = "subject-group";

/// Value of [`SUBJECT_GROUP_FIELD`] that requires the patient-only fields.
pub const PATIENT_GROUP: &str = "patient";

/// Raw value a checked checkbox sends.
pub const CHECKBOX_ON: &str = "on";

/// Raw value an explicitly unchecked checkbox carries.
pub const CHECKBOX_OFF: &str = "off";

/// Committer identity used when neither the home nor the repository configuration has one.
pub const FALLBACK_COMMITTER_NAME: &str = "intake";
pub const FALLBACK_COMMITTER_EMAIL: &str = "intake@localhost";

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Contact notice printed at the top of every diagnostic 500 body.
pub const FAULT_NOTICE: &str = "An unexpected error occurred during processing. If this error\n\
persists, please send an email with the following information\n\
to the data entry maintainers:\n";
