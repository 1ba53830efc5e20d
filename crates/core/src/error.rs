//! Error types for the intake pipeline.
//!
//! Every failure a request can run into is an [`IntakeError`]. The variants are grouped into
//! four classes by [`IntakeError::class`], and the class alone decides the HTTP status of the
//! response: the three client classes produce `400 BAD REQUEST`, everything else is a
//! `500 INTERNAL ERROR` with a full diagnostic body.

use std::path::PathBuf;

/// Coarse classification of an [`IntakeError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// The request itself has the wrong shape (e.g. wrong method).
    ClientShape,
    /// Required fields are missing or the form version is unknown.
    Validation,
    /// Client and server disagree on the submitted values.
    Integrity,
    /// Anything else. Reported with stack trace, environment and raw body.
    ServerFault,
}

impl ErrorClass {
    /// HTTP status code used for responses of this class.
    pub const fn status(self) -> u16 {
        match self {
            Self::ClientShape | Self::Validation | Self::Integrity => 400,
            Self::ServerFault => 500,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("method {0} is not supported, only POST is")]
    MethodNotAllowed(String),

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("unsupported form-data-version: {0}")]
    UnsupportedVersion(String),

    #[error("local canonical string does not match the submitted one")]
    CanonicalMismatch { local: String, sent: String },
    #[error("server side hash value does not match the submitted hash value")]
    HashMismatch { local: String, sent: String },
    #[error("checkbox field {field} has unrecognised value {value:?}")]
    UnrecognizedCheckbox { field: String, value: String },
    #[error("numeric field {field} has unparsable value {value:?}")]
    UnparsableNumber { field: String, value: String },

    #[error("request body is not valid UTF-8: {0}")]
    BodyEncoding(std::str::Utf8Error),
    #[error("failed to decode form body: {0}")]
    FormDecode(serde_urlencoded::de::Error),
    #[error("expected exactly one value for field {field}, got {count}")]
    MultipleValues { field: String, count: usize },
    // the value stays out of the message, faults are logged
    #[error("field {field} cannot be read as {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
        value: String,
    },
    #[error("field {0} is missing after validation")]
    FieldVanished(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to create dataset directory {path}: {source}", path = path.display())]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("record file already exists: {}", .0.display())]
    RecordExists(PathBuf),
    #[error("failed to write record file {path}: {source}", path = path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize envelope: {0}")]
    Serialization(serde_json::Error),

    #[error("failed to open git repository: {0}")]
    GitOpen(git2::Error),
    #[error("failed to read git configuration: {0}")]
    GitConfig(git2::Error),
    #[error("failed to access git index: {0}")]
    GitIndex(git2::Error),
    #[error("failed to add file to git index: {0}")]
    GitAdd(git2::Error),
    #[error("failed to write git tree: {0}")]
    GitWriteTree(git2::Error),
    #[error("failed to find git tree: {0}")]
    GitFindTree(git2::Error),
    #[error("failed to create git signature: {0}")]
    GitSignature(git2::Error),
    #[error("failed to get git head: {0}")]
    GitHead(git2::Error),
    #[error("failed to peel git commit: {0}")]
    GitPeel(git2::Error),
    #[error("failed to create git commit: {0}")]
    GitCommit(git2::Error),
    #[error("file {} is outside the dataset working directory", .0.display())]
    OutsideDataset(PathBuf),

    #[error("failed to load template: {0}")]
    TemplateLoad(tera::Error),
    #[error("failed to render confirmation page: {0}")]
    TemplateRender(tera::Error),
}

impl IntakeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MethodNotAllowed(_) => ErrorClass::ClientShape,
            Self::MissingFields(_) | Self::UnsupportedVersion(_) => ErrorClass::Validation,
            Self::CanonicalMismatch { .. }
            | Self::HashMismatch { .. }
            | Self::UnrecognizedCheckbox { .. }
            | Self::UnparsableNumber { .. } => ErrorClass::Integrity,
            _ => ErrorClass::ServerFault,
        }
    }
}

pub type IntakeResult<T> = std::result::Result<T, IntakeError>;
