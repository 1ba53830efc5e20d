//! # Intake Core
//!
//! Core logic of the clinical form intake handler.
//!
//! This crate contains the whole request pipeline and nothing HTTP specific:
//! - Versioned field tables ([`schema`]) driving normalization, validation, the canonical
//!   string and typed parsing
//! - The integrity check of client-signed submissions ([`canonical`])
//! - Envelope persistence with exclusive create and git commits ([`storage`])
//! - Confirmation page rendering ([`render`])
//! - The orchestrator turning a request into a response ([`processor`])
//!
//! **No API concerns**: routing, sockets and OpenAPI belong in `api-rest`.

pub mod canonical;
pub mod clock;
pub mod config;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod form;
pub mod normalize;
pub mod processor;
pub mod record;
pub mod render;
pub mod schema;
pub mod storage;
pub mod validate;

pub use canonical::{canonical_string, sha256_hex, verify_integrity, IntegrityProof};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{resolve_template_dir, IntakeConfig};
pub use envelope::{Envelope, Source, TimeStamp};
pub use error::{ErrorClass, IntakeError, IntakeResult};
pub use form::FieldMap;
pub use processor::{IntakeProcessor, IntakeRequest, IntakeResponse};
pub use record::{build_record, FieldValue, Record};
pub use render::{PageRenderer, TeraRenderer};
pub use schema::FormSchema;
pub use storage::{write_envelope, DatasetStore, GitDatasetStore};
