//! Dataset storage: the exclusive envelope write and the durable commit.
//!
//! Writing and committing are separate steps. The envelope file is created with
//! `create_new`, so two requests stamped with the same instant cannot overwrite each other;
//! the second one fails. The commit is delegated to a [`DatasetStore`]. A failed commit leaves
//! the written file on disk for the operator to reconcile (`intake commit`).

use crate::constants::{FALLBACK_COMMITTER_EMAIL, FALLBACK_COMMITTER_NAME};
use crate::envelope::Envelope;
use crate::record::Record;
use crate::{IntakeError, IntakeResult};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Write `envelope` below `dataset_root` and return the absolute path of the new file.
///
/// The version directory is created if absent. An existing file is never replaced.
///
/// # Errors
///
/// - [`IntakeError::DirCreation`] if the version directory cannot be created.
/// - [`IntakeError::RecordExists`] if a record with the same timestamp already exists.
/// - [`IntakeError::FileWrite`] / [`IntakeError::Serialization`] if writing fails.
pub fn write_envelope(dataset_root: &Path, envelope: &Envelope<Record>) -> IntakeResult<PathBuf> {
    let path = dataset_root.join(envelope.relative_path());
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| IntakeError::DirCreation {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_vec(envelope).map_err(IntakeError::Serialization)?;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|source| match source.kind() {
            io::ErrorKind::AlreadyExists => IntakeError::RecordExists(path.clone()),
            _ => IntakeError::FileWrite {
                path: path.clone(),
                source,
            },
        })?;

    let written = file.write_all(&json).and_then(|()| file.sync_all());
    drop(file);
    discard_on_error(&path, written)?;

        Ok(path)
}

/// Remove the file this request just created if filling it failed.
///
/// Only called after `create_new` succeeded, so the file cannot belong to another request.
fn discard_on_error(path: &Path, written: io::Result<()>) -> IntakeResult<()> {
    written.map_err(|source| {
        if let Err(e) = fs::remove_file(path) {
            tracing::error!("could not remove partial record {}: {}", path.display(), e);
        }
        IntakeError::FileWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Durable storage of written records.
pub trait DatasetStore: Send + Sync {
    /// Record `file` (below `dataset_root`) durably and return an opaque reference id.
    fn commit(&self, dataset_root: &Path, file: &Path) -> IntakeResult<String>;
}

/// Commits each record to the git repository at the dataset root.
///
/// The committer identity is read from `<home>/.gitconfig` when that file exists, falling back
/// to the repository configuration and finally to a fixed identity.
#[derive(Clone, Debug)]
pub struct GitDatasetStore {
    home_dir: PathBuf,
}

impl GitDatasetStore {
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
        }
    }

    /// Open the repository at exactly `dataset_root`, without searching parent directories.
    fn open(dataset_root: &Path) -> IntakeResult<(git2::Repository, PathBuf)> {
        let repo = git2::Repository::open_ext(
            dataset_root,
            git2::RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&std::ffi::OsStr>(),
        )
        .map_err(IntakeError::GitOpen)?;
        // git2 may canonicalise the workdir, so strip prefixes against what it reports.
        let workdir = repo
            .workdir()
            .ok_or_else(|| {
                IntakeError::GitOpen(git2::Error::from_str("repository has no working directory"))
            })?
            .to_path_buf();
        Ok((repo, workdir))
    }

    fn signature(&self, repo: &git2::Repository) -> IntakeResult<git2::Signature<'static>> {
        let home_config = self.home_dir.join(".gitconfig");
        let configs = if home_config.is_file() {
            vec![git2::Config::open(&home_config).map_err(IntakeError::GitConfig)?]
        } else {
            Vec::new()
        };
        let configs = configs
            .into_iter()
            .chain(repo.config().ok())
            .collect::<Vec<_>>();

        let lookup = |key: &str| {
            configs
                .iter()
                .find_map(|config| config.get_string(key).ok())
                .filter(|value| !value.is_empty())
        };
        let name = lookup("user.name").unwrap_or_else(|| FALLBACK_COMMITTER_NAME.to_string());
        let email = lookup("user.email").unwrap_or_else(|| FALLBACK_COMMITTER_EMAIL.to_string());

        git2::Signature::now(&name, &email).map_err(IntakeError::GitSignature)
    }

    fn relative_to_workdir(file: &Path, dataset_root: &Path, workdir: &Path) -> IntakeResult<PathBuf> {
        let outside = || IntakeError::OutsideDataset(file.to_path_buf());

        let rel = if file.is_absolute() {
            file.strip_prefix(workdir)
                .or_else(|_| file.strip_prefix(dataset_root))
                .map_err(|_| outside())?
                .to_path_buf()
        } else {
            file.to_path_buf()
        };

        if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(outside());
        }
        Ok(rel)
    }

    fn resolve_head_parents(repo: &git2::Repository) -> IntakeResult<Vec<git2::Commit<'_>>> {
        match repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(IntakeError::GitPeel)?;
                Ok(vec![commit])
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(vec![]),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(vec![]),
            Err(e) => Err(IntakeError::GitHead(e)),
        }
    }
}

impl DatasetStore for GitDatasetStore {
    fn commit(&self, dataset_root: &Path, file: &Path) -> IntakeResult<String> {
        let (repo, workdir) = Self::open(dataset_root)?;
        let rel = Self::relative_to_workdir(file, dataset_root, &workdir)?;

        let mut index = repo.index().map_err(IntakeError::GitIndex)?;
        index.add_path(&rel).map_err(IntakeError::GitAdd)?;
        index.write().map_err(IntakeError::GitIndex)?;

        let tree_id = index.write_tree().map_err(IntakeError::GitWriteTree)?;
        let tree = repo.find_tree(tree_id).map_err(IntakeError::GitFindTree)?;
        let sig = self.signature(&repo)?;

        // git paths always use forward slashes
        let rel_display = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let message = format!("adding file {rel_display}");

        let parents = Self::resolve_head_parents(&repo)?;
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, &message, &tree, &parent_refs)
            .map_err(IntakeError::GitCommit)?;

        Ok(oid.to_string())
    }
}
