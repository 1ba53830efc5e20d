//! The persisted unit of an accepted submission.
//!
//! An envelope pairs request metadata (`source`) with the typed record (`data`) and is written
//! exactly once, to `input/<version>/<time_stamp>.json` below the dataset root.
//!
//! ```json
//! {
//!   "source": {
//!     "time_stamp": 1700000000.25,
//!     "version": "2.3",
//!     "remote_address": "1.2.3.4",
//!     "hashed-string": "form-data-version:2.3;...",
//!     "hash-value": "ce79...",
//!     "signature-data": null
//!   },
//!   "data": { "form-data-version": "2.3", "laterality-quotient": 80, ... }
//! }
//! ```

use crate::canonical::IntegrityProof;
use crate::constants::{INPUT_DIR_NAME, RECORD_FILE_EXTENSION};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Unix time in seconds, as a float.
///
/// Rendered in its shortest round-trip form with at least one decimal (`0.0`,
/// `1700000000.25`). That rendering names the record file and prefixes the page reference.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeStamp(f64);

impl TimeStamp {
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(self) -> f64 {
        self.0
    }

    /// File name of the record written at this instant.
    pub fn file_name(self) -> String {
        format!("{self}.{RECORD_FILE_EXTENSION}")
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug keeps the trailing `.0` on integral values
        write!(f, "{:?}", self.0)
    }
}

/// Request metadata stored alongside the record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub time_stamp: TimeStamp,
    pub version: String,
    pub remote_address: String,
    #[serde(rename = "hashed-string")]
    pub hashed_string: String,
    #[serde(rename = "hash-value")]
    pub hash_value: String,
    #[serde(rename = "signature-data")]
    pub signature_data: Option<String>,
}

/// An envelope around the record type `D`.
///
/// Built with [`Record`] when writing; stored envelopes are read back with a generic JSON
/// `data` object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<D = Record> {
    pub source: Source,
    pub data: D,
}

impl Envelope<Record> {
    /// Assemble the envelope of an accepted submission.
    ///
    /// An empty signature is stored as `null`.
    pub fn new(
        time_stamp: TimeStamp,
        version: &str,
        remote_address: &str,
        proof: IntegrityProof,
        signature: Option<&str>,
        data: Record,
    ) -> Self {
        Self {
            source: Source {
                time_stamp,
                version: version.to_string(),
                remote_address: remote_address.to_string(),
                hashed_string: proof.canonical,
                hash_value: proof.hash,
                signature_data: signature.filter(|s| !s.is_empty()).map(str::to_string),
            },
            data,
        }
    }
}

impl<D> Envelope<D> {
    /// Path of the envelope file relative to the dataset root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(INPUT_DIR_NAME)
            .join(&self.source.version)
            .join(self.source.time_stamp.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof() -> IntegrityProof {
        IntegrityProof {
            canonical: "a:b".into(),
            hash: "00ff".into(),
        }
    }

    #[test]
    fn time_stamp_renders_like_a_float() {
        assert_eq!(TimeStamp::from_secs(0.0).to_string(), "0.0");
        assert_eq!(TimeStamp::from_secs(1700000000.25).to_string(), "1700000000.25");
        assert_eq!(TimeStamp::from_secs(1700000000.0).to_string(), "1700000000.0");
        assert_eq!(TimeStamp::from_secs(0.0).file_name(), "0.0.json");
    }

    #[test]
    fn relative_path_uses_version_and_time_stamp() {
        let envelope = Envelope::new(
            TimeStamp::from_secs(0.0),
            "2.3",
            "1.2.3.4",
            proof(),
            None,
            Record::default(),
        );
        assert_eq!(envelope.relative_path(), PathBuf::from("input/2.3/0.0.json"));
    }

    #[test]
    fn source_uses_wire_key_names() {
        let envelope = Envelope::new(
            TimeStamp::from_secs(1.5),
            "2.2",
            "127.0.0.1",
            proof(),
            Some(""),
            Record::default(),
        );
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["source"]["time_stamp"], 1.5);
        assert_eq!(json["source"]["version"], "2.2");
        assert_eq!(json["source"]["remote_address"], "127.0.0.1");
        assert_eq!(json["source"]["hashed-string"], "a:b");
        assert_eq!(json["source"]["hash-value"], "00ff");
        assert_eq!(json["source"]["signature-data"], serde_json::Value::Null);
        assert!(json["data"].as_object().unwrap().is_empty());
    }

    #[test]
    fn non_empty_signature_is_kept() {
        let envelope = Envelope::new(
            TimeStamp::from_secs(1.5),
            "2.2",
            "127.0.0.1",
            proof(),
            Some("data:image/png;base64,AAAA"),
            Record::default(),
        );
        assert_eq!(
            envelope.source.signature_data.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[test]
    fn stored_envelope_reads_back_with_json_data() {
        let raw = r#"{"source": {"time_stamp": 0.0, "version": "2.3", "remote_address": "1.2.3.4",
            "hashed-string": "x", "hash-value": "y", "signature-data": null},
            "data": {"sex": "male"}}"#;
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.source.hashed_string, "x");
        assert_eq!(envelope.data["sex"], "male");
        assert_eq!(envelope.relative_path(), PathBuf::from("input/2.3/0.0.json"));
    }
}
