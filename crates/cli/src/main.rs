use clap::{Parser, Subcommand};
use intake_core::constants::FORM_VERSION_FIELD;
use intake_core::normalize::normalize;
use intake_core::validate::missing_fields;
use intake_core::{
    canonical_string, sha256_hex, DatasetStore, Envelope, FieldMap, FormSchema, GitDatasetStore,
    IntakeError, IntakeResult,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Clinical form intake operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical string and hash of a URL-encoded form body
    Canonical {
        /// File containing the posted body
        body_file: PathBuf,
        /// Form version to use instead of the body's form-data-version
        #[arg(long)]
        version: Option<String>,
    },
    /// Re-check the integrity hash of a stored envelope
    Verify {
        /// Envelope JSON file below input/<version>/
        envelope: PathBuf,
    },
    /// Commit a record file whose commit failed during the request
    Commit {
        /// Dataset root (git working directory)
        dataset_root: PathBuf,
        /// Record file, absolute or relative to the dataset root
        file: PathBuf,
        /// Directory whose .gitconfig supplies the committer identity
        #[arg(long)]
        home: Option<PathBuf>,
    },
}

/// Canonical string and hash of a body.
struct CanonicalReport {
    version: &'static str,
    canonical: String,
    hash: String,
}

fn canonical_report(body: &str, version: Option<&str>) -> IntakeResult<CanonicalReport> {
    let mut fields = FieldMap::parse(body)?;
    let schema = match version.or_else(|| fields.get(FORM_VERSION_FIELD)) {
        Some(v) => {
            FormSchema::lookup(v).ok_or_else(|| IntakeError::UnsupportedVersion(v.to_string()))?
        }
        None => FormSchema::latest(),
    };

    normalize(&mut fields, schema);
    // the envelope fields are what this command computes, only record fields count here
    let missing: Vec<String> = missing_fields(&fields, schema)
        .into_iter()
        .filter(|name| schema.field(name).is_some())
        .collect();
    if !missing.is_empty() {
        return Err(IntakeError::MissingFields(missing));
    }

    let canonical = canonical_string(&fields, schema)?;
    let hash = sha256_hex(&canonical);

    Ok(CanonicalReport {
        version: schema.version(),
        canonical,
        hash,
    })
}

/// Whether the stored hash matches the stored canonical string.
fn verify_envelope(path: &Path) -> IntakeResult<bool> {
    let raw = fs::read(path).map_err(IntakeError::FileRead)?;
    let envelope: Envelope<serde_json::Value> =
        serde_json::from_slice(&raw).map_err(IntakeError::Serialization)?;
    Ok(sha256_hex(&envelope.source.hashed_string) == envelope.source.hash_value)
}

fn commit_file(dataset_root: &Path, file: &Path, home: Option<PathBuf>) -> IntakeResult<String> {
    let home = home.unwrap_or_else(|| dataset_root.to_path_buf());
    GitDatasetStore::new(home).commit(dataset_root, file)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Canonical { body_file, version } => {
            let body = fs::read_to_string(&body_file)?;
            let report = canonical_report(body.trim_end(), version.as_deref())?;
            println!("version: {}", report.version);
            println!("hashed-string: {}", report.canonical);
            println!("hash-value: {}", report.hash);
        }
        Commands::Verify { envelope } => {
            if verify_envelope(&envelope)? {
                println!("OK: {}", envelope.display());
            } else {
                eprintln!("MISMATCH: {}", envelope.display());
                std::process::exit(1);
            }
        }
        Commands::Commit {
            dataset_root,
            file,
            home,
        } => {
            let reference = commit_file(&dataset_root, &file, home)?;
            println!("{reference}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL_V2_3: &str = include_str!("../../core/testdata/minimal_v2_3.form");

    #[test]
    fn canonical_matches_the_submitted_hash() {
        let report = canonical_report(MINIMAL_V2_3, None).unwrap();
        assert_eq!(report.version, "2.3");
        assert_eq!(
            report.hash,
            "ce79e0bf021bf3770a7747a5328ab59aab7edb26f5d90dd168c39cf0c59d548c"
        );
    }

    #[test]
    fn canonical_version_override() {
        let report = canonical_report(MINIMAL_V2_3, Some("2.2")).unwrap();
        assert_eq!(report.version, "2.2");
        assert!(!report.canonical.contains("psqi-"));

        assert!(canonical_report(MINIMAL_V2_3, Some("9.9")).is_err());
    }

    #[test]
    fn canonical_reports_missing_fields() {
        match canonical_report("sex=male", None) {
            Err(IntakeError::MissingFields(names)) => {
                assert!(names.contains(&"project-code".to_string()));
                assert!(!names.contains(&"sex".to_string()));
                assert!(!names.contains(&"hash-value".to_string()));
            }
            other => panic!("expected missing fields, got {:?}", other.err()),
        }
    }

    fn write_envelope_file(dir: &Path, hashed: &str, hash: &str) -> PathBuf {
        let path = dir.join("0.0.json");
        let json = serde_json::json!({
            "source": {
                "time_stamp": 0.0,
                "version": "2.3",
                "remote_address": "1.2.3.4",
                "hashed-string": hashed,
                "hash-value": hash,
                "signature-data": null
            },
            "data": {}
        });
        fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();
        path
    }

    #[test]
    fn verify_detects_tampering() {
        let temp = TempDir::new().unwrap();
        let good = write_envelope_file(temp.path(), "a:b", &sha256_hex("a:b"));
        assert!(verify_envelope(&good).unwrap());

        let bad = write_envelope_file(temp.path(), "a:c", &sha256_hex("a:b"));
        assert!(!verify_envelope(&bad).unwrap());
    }

    #[test]
    fn commit_reconciles_a_left_over_file() {
        let temp = TempDir::new().unwrap();
        let repo = git2::Repository::init(temp.path()).unwrap();
        fs::create_dir_all(temp.path().join("input/2.3")).unwrap();
        fs::write(temp.path().join("input/2.3/7.5.json"), "{}").unwrap();

        let reference =
            commit_file(temp.path(), Path::new("input/2.3/7.5.json"), None).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.id().to_string(), reference);
    }
}
