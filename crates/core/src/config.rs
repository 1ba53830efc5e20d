//! Core runtime configuration.
//!
//! The deployment context (dataset root, home directory of the storage identity, template
//! directory) is resolved once at process startup and then passed into the processor. Request
//! handling never reads process-wide environment variables.

use crate::constants::{BUNDLED_TEMPLATE_DIR, SUCCESS_TEMPLATE_NAME};
use crate::{IntakeError, IntakeResult};
use std::path::{Path, PathBuf};

/// Deployment context resolved at startup.
#[derive(Clone, Debug)]
pub struct IntakeConfig {
    dataset_root: PathBuf,
    home_dir: PathBuf,
    template_dir: PathBuf,
}

impl IntakeConfig {
    /// Create a new `IntakeConfig`.
    ///
    /// The dataset root must be an existing directory. The template directory is expected to
    /// have been resolved with [`resolve_template_dir`].
    pub fn new(
        dataset_root: PathBuf,
        home_dir: PathBuf,
        template_dir: PathBuf,
    ) -> IntakeResult<Self> {
        if !dataset_root.is_dir() {
            return Err(IntakeError::InvalidConfig(format!(
                "dataset root is not a directory: {}",
                dataset_root.display()
            )));
        }

        Ok(Self {
            dataset_root,
            home_dir,
            template_dir,
        })
    }

    pub fn dataset_root(&self) -> &Path {
        &self.dataset_root
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Key/value view of the context, printed in diagnostic responses.
    pub fn context_entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("dataset_root", self.dataset_root.display().to_string()),
            ("home", self.home_dir.display().to_string()),
            ("templates", self.template_dir.display().to_string()),
        ]
    }
}

/// Resolve the template directory without reading environment variables.
///
/// If `override_dir` is provided, it must contain the success template. Otherwise this looks
/// for `templates/` relative to the current working directory and then walks up from
/// `CARGO_MANIFEST_DIR`.
pub fn resolve_template_dir(override_dir: Option<PathBuf>) -> IntakeResult<PathBuf> {
    fn has_success_template(path: &Path) -> bool {
        path.join(SUCCESS_TEMPLATE_NAME).is_file()
    }

    if let Some(template_dir) = override_dir {
        if has_success_template(&template_dir) {
            return Ok(template_dir);
        }
        return Err(IntakeError::InvalidConfig(format!(
            "template directory override does not contain {SUCCESS_TEMPLATE_NAME}: {}",
            template_dir.display()
        )));
    }

    let cwd_relative = PathBuf::from(BUNDLED_TEMPLATE_DIR);
    if has_success_template(&cwd_relative) {
        return Ok(cwd_relative);
    }

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join(BUNDLED_TEMPLATE_DIR);
        if has_success_template(&candidate) {
            return Ok(candidate);
        }
    }

    Err(IntakeError::InvalidConfig(format!(
        "could not locate a {BUNDLED_TEMPLATE_DIR}/ directory containing {SUCCESS_TEMPLATE_NAME}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_rejects_missing_dataset_root() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let err = IntakeConfig::new(missing, temp.path().into(), temp.path().into()).unwrap_err();
        assert!(matches!(err, IntakeError::InvalidConfig(_)));
    }

    #[test]
    fn context_entries_name_every_directory() {
        let temp = TempDir::new().unwrap();
        let cfg = IntakeConfig::new(
            temp.path().to_path_buf(),
            temp.path().join("home"),
            temp.path().join("templates"),
        )
        .unwrap();
        let keys: Vec<_> = cfg.context_entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["dataset_root", "home", "templates"]);
    }

    #[test]
    fn bundled_templates_are_found_from_the_manifest() {
        let dir = resolve_template_dir(None).expect("bundled templates should resolve");
        assert!(dir.join(SUCCESS_TEMPLATE_NAME).is_file());
    }

    #[test]
    fn override_without_template_is_rejected() {
        let temp = TempDir::new().unwrap();
        let err = resolve_template_dir(Some(temp.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, IntakeError::InvalidConfig(_)));
    }
}
