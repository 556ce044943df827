//! Filesystem inventory of learned models and implementation discovery
//!
//! Layout: `<root>/<implementation>/<version>/<protocol>/`. Only directories
//! count; stray files at any level are ignored. Names starting with `.` are
//! skipped.
use crate::data_model::{Combination, Implementation, LearnedEntry, Protocol, VersionTag};
use crate::error::{ReconcileError, SourceError};
use crate::source::ModelInventory;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Model repository checkout
#[derive(Debug, Clone)]
pub struct ModelDirectory {
    root: PathBuf,
}

impl ModelDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the model for `entry` lives inside this checkout
    pub fn model_path(&self, entry: &LearnedEntry) -> PathBuf {
        self.root.join(entry.model_file())
    }
}

#[async_trait]
impl ModelInventory for ModelDirectory {
    async fn learned(
        &self,
        implementation: &Implementation,
    ) -> Result<BTreeSet<Combination>, SourceError> {
        let implementation_dir = self.root.join(implementation.as_str());

        let versions = match subdirectories(&implementation_dir).await {
            Ok(versions) => versions,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %implementation_dir.display(), "no models learned yet");
                return Ok(BTreeSet::new());
            }
            Err(err) => return Err(SourceError::io(&implementation_dir, &err)),
        };

        let mut learned = BTreeSet::new();
        for version in versions {
            let version_dir = implementation_dir.join(&version);
            let protocols = subdirectories(&version_dir)
                .await
                .map_err(|err| SourceError::io(&version_dir, &err))?;
            for protocol in protocols {
                learned.insert((VersionTag::new(version.clone()), Protocol::new(protocol)));
            }
        }
        Ok(learned)
    }
}

/// Names of the visible subdirectories of `dir`, symlinks followed.
///
/// `NotFound` only ever means `dir` itself is missing: links whose target
/// is gone are skipped here.
async fn subdirectories(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "skipping dangling link");
                continue;
            }
            Err(err) => {
                return Err(std::io::Error::new(
                    err.kind(),
                    format!("{}: {}", path.display(), err),
                ))
            }
        };
        if metadata.is_dir() {
            names.push(name);
        }
    }
    Ok(names)
}

/// List implementations as the subdirectories of `dir`, sorted by name.
///
/// The returned order is the discovery order used for the manifest. Names
/// double as registry repository names and as path components, so a
/// directory that is not all lowercase is left out with a warning.
pub fn discover_implementations(dir: &Path) -> Result<Vec<Implementation>, ReconcileError> {
    let discovery_error = |err: std::io::Error| ReconcileError::Discovery {
        path: dir.to_path_buf(),
        message: err.to_string(),
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(discovery_error)? {
        let entry = entry.map_err(discovery_error)?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }
        if name != name.to_lowercase() {
            warn!(path = %entry.path().display(), "implementation directory names must be lowercase, skipping");
            continue;
        }
        names.push(name);
    }

    let mut implementations: Vec<Implementation> = names.iter().map(Implementation::new).collect();
    implementations.sort();
    Ok(implementations)
}
