//! The intake processor: one linear pass per request.
//!
//! 1. Only `POST` is accepted.
//! 2. The body is the first `Content-Length` bytes (empty if the header is missing or invalid).
//! 3. The body is decoded into a [`FieldMap`].
//! 4. Defaults are filled in and required fields are checked.
//! 5. The canonical string and its hash are checked against the submitted ones.
//! 6. The typed record is built.
//! 7. The envelope is stamped with the current time and written with exclusive create.
//! 8. The written file is committed through the [`DatasetStore`].
//! 9. The confirmation page is rendered.
//!
//! Client errors become `400` responses with a short plain-text explanation. Everything else
//! becomes a `500` with a diagnostic body meant for the maintainer: the error chain, a
//! backtrace, the request environment and the raw body.

use crate::canonical::verify_integrity;
use crate::clock::{Clock, SystemClock};
use crate::config::IntakeConfig;
use crate::constants::{
    FAULT_NOTICE, FORM_VERSION_FIELD, HASHED_STRING_FIELD, HASH_VALUE_FIELD, SIGNATURE_FIELD,
    TEXT_HTML, TEXT_PLAIN,
};
use crate::envelope::Envelope;
use crate::form::FieldMap;
use crate::normalize::normalize;
use crate::record::build_record;
use crate::render::{page_reference, PageRenderer, TeraRenderer};
use crate::schema::FormSchema;
use crate::storage::{write_envelope, DatasetStore, GitDatasetStore};
use crate::validate::require_fields;
use crate::{ErrorClass, IntakeError, IntakeResult};
use std::backtrace::Backtrace;
use std::error::Error as _;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

/// A request as handed over by the HTTP layer.
#[derive(Clone, Debug, Default)]
pub struct IntakeRequest {
    pub method: String,
    pub path: String,
    pub remote_addr: String,
    /// Header name/value pairs in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl IntakeRequest {
    /// The declared `Content-Length`, or `0` if it is missing or not a number.
    pub fn content_length(&self) -> usize {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0)
    }

    /// The body bytes covered by `Content-Length`.
    pub fn declared_body(&self) -> &[u8] {
        let len = self.content_length().min(self.body.len());
        &self.body[..len]
    }
}

/// Status, content type and body of a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntakeResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl IntakeResponse {
    fn text(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: body.into_bytes(),
        }
    }

    fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: TEXT_HTML,
            body: body.into_bytes(),
        }
    }

    pub fn status_line(&self) -> &'static str {
        match self.status {
            200 => "200 OK",
            400 => "400 BAD REQUEST",
            _ => "500 INTERNAL ERROR",
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Outcome of an accepted submission.
#[derive(Clone, Debug)]
pub struct Accepted {
    pub version: &'static str,
    /// Absolute path of the written envelope.
    pub path: PathBuf,
    /// Reference id returned by the dataset store.
    pub reference_id: String,
    pub page: String,
}

/// Runs the intake pipeline against a configured dataset.
///
/// Holds no per-request state; a single processor can serve concurrent requests.
pub struct IntakeProcessor {
    config: IntakeConfig,
    store: Arc<dyn DatasetStore>,
    renderer: Arc<dyn PageRenderer>,
    clock: Arc<dyn Clock>,
}

impl IntakeProcessor {
    pub fn new(
        config: IntakeConfig,
        store: Arc<dyn DatasetStore>,
        renderer: Arc<dyn PageRenderer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            renderer,
            clock,
        }
    }

    /// Processor with the git store, the tera renderer and the system clock.
    pub fn from_config(config: IntakeConfig) -> IntakeResult<Self> {
        let store = GitDatasetStore::new(config.home_dir());
        let renderer = TeraRenderer::new(config.template_dir())?;
        Ok(Self::new(
            config,
            Arc::new(store),
            Arc::new(renderer),
            Arc::new(SystemClock),
        ))
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Handle one request. Never fails: every error is turned into a response.
    pub fn handle(&self, request: &IntakeRequest) -> IntakeResponse {
        match self.process(request) {
            Ok(accepted) => {
                tracing::info!(
                    "stored form {} submission at {} as {}",
                    accepted.version,
                    accepted.path.display(),
                    accepted.reference_id
                );
                IntakeResponse::html(accepted.page)
            }
            Err(err) => self.error_response(request, &err),
        }
    }

    /// Run the pipeline, returning the first error.
    pub fn process(&self, request: &IntakeRequest) -> IntakeResult<Accepted> {
        if request.method != "POST" {
            return Err(IntakeError::MethodNotAllowed(request.method.clone()));
        }

        let mut fields = FieldMap::parse_bytes(request.declared_body())?;
        let schema = select_schema(&fields)?;

        normalize(&mut fields, schema);
        require_fields(&fields, schema)?;

        let sent_canonical = required(&fields, HASHED_STRING_FIELD)?;
        let sent_hash = required(&fields, HASH_VALUE_FIELD)?;
        let proof = verify_integrity(&fields, schema, sent_canonical, sent_hash)?;

        let record = build_record(&fields, schema)?;

        let envelope = Envelope::new(
            self.clock.now(),
            schema.version(),
            &request.remote_addr,
            proof,
            fields.get(SIGNATURE_FIELD),
            record,
        );
        let dataset_root = self.config.dataset_root();
        let path = write_envelope(dataset_root, &envelope)?;

        // no rollback: a failed commit leaves the file for `intake commit`
        let reference_id = self.store.commit(dataset_root, &path)?;

        let page =
            self.renderer
                .render(&reference_id, envelope.source.time_stamp, &envelope.data)?;

        tracing::debug!(
            "page reference {}",
            page_reference(envelope.source.time_stamp, &reference_id)
        );

        Ok(Accepted {
            version: schema.version(),
            path,
            reference_id,
            page,
        })
    }

    fn error_response(&self, request: &IntakeRequest, err: &IntakeError) -> IntakeResponse {
        match err.class() {
            ErrorClass::ServerFault => {
                tracing::error!("Store data error: {}", error_chain(err));
                self.fault_response(request, &error_chain(err))
            }
            class => {
                tracing::warn!("Rejected submission ({:?}): {}", class, rejection_kind(err));
                IntakeResponse::text(class.status(), rejection_body(err))
            }
        }
    }

    /// The diagnostic `500` response for a fault described by `description`.
    ///
    /// Also used by the HTTP layer when processing panicked.
    pub fn fault_response(&self, request: &IntakeRequest, description: &str) -> IntakeResponse {
        let backtrace = Backtrace::force_capture();
        let raw_body = request.declared_body();

        let mut body = String::from(FAULT_NOTICE);
        body.push_str("\n--------\n1. Stacktrace:\n");
        let _ = writeln!(body, "{description}");
        let _ = writeln!(body, "{backtrace}");

        body.push_str("2. Environment:\n");
        let _ = writeln!(body, "REQUEST_METHOD: {}", request.method);
        let _ = writeln!(body, "PATH_INFO: {}", request.path);
        let _ = writeln!(body, "REMOTE_ADDR: {}", request.remote_addr);
        for (name, value) in &request.headers {
            let _ = writeln!(body, "{name}: {value}");
        }
        for (key, value) in self.config.context_entries() {
            let _ = writeln!(body, "{key}: {value}");
        }

        let _ = writeln!(body, "\n3. Request body ({} bytes):", raw_body.len());
        body.push_str(&String::from_utf8_lossy(raw_body));
        body.push_str("\n--------\n");

        IntakeResponse::text(500, body)
    }
}

/// Pick the schema table named by `form-data-version`, or the latest one if absent.
fn select_schema(fields: &FieldMap) -> IntakeResult<&'static FormSchema> {
    match fields.get(FORM_VERSION_FIELD) {
        Some(version) => FormSchema::lookup(version)
            .ok_or_else(|| IntakeError::UnsupportedVersion(version.to_string())),
        None => Ok(FormSchema::latest()),
    }
}

fn required<'a>(fields: &'a FieldMap, name: &str) -> IntakeResult<&'a str> {
    fields
        .get(name)
        .ok_or_else(|| IntakeError::FieldVanished(name.to_string()))
}

/// `err` followed by each of its sources, one per line.
fn error_chain(err: &IntakeError) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(chain, "\ncaused by: {cause}");
        source = cause.source();
    }
    chain
}

/// Short label for the log. Never contains field values.
fn rejection_kind(err: &IntakeError) -> String {
    match err {
        IntakeError::MissingFields(names) => format!("{} missing fields", names.len()),
        IntakeError::UnsupportedVersion(_) => "unsupported form version".into(),
        IntakeError::CanonicalMismatch { .. } => "canonical string mismatch".into(),
        IntakeError::HashMismatch { .. } => "hash mismatch".into(),
        IntakeError::UnrecognizedCheckbox { field, .. } => format!("bad checkbox {field}"),
        IntakeError::UnparsableNumber { field, .. } => format!("bad number {field}"),
        IntakeError::MethodNotAllowed(method) => format!("method {method}"),
        _ => "other".into(),
    }
}

/// Plain-text body of a `400` response.
fn rejection_body(err: &IntakeError) -> String {
    match err {
        IntakeError::MethodNotAllowed(_) => "Only POST is supported\n".into(),
        IntakeError::MissingFields(names) => format!(
            "The following keys are missing from the request:\n{}\n",
            names.join("\n")
        ),
        IntakeError::UnsupportedVersion(version) => format!(
            "Unsupported form-data-version: {version}\nSupported versions: {}\n",
            FormSchema::supported_versions().collect::<Vec<_>>().join(", ")
        ),
        IntakeError::CanonicalMismatch { local, sent } => format!(
            "Local hash input-string does not match submitted values\nLOCAL: {local}\nSENT:  {sent}\n"
        ),
        IntakeError::HashMismatch { local, sent } => format!(
            "Server side hash value does not match submitted hash value\nLOCAL: {local}\nSENT:  {sent}\n"
        ),
        other => format!(
            "Local hash input-string cannot be computed from submitted values\n{other}\n"
        ),
    }
}
