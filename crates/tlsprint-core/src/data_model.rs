//! Data Model: Implementation, VersionTag, Protocol, Target, Reconciliation
use crate::version::compare_versions;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// File name of a learned model inside its `<impl>/<version>/<protocol>/` directory
pub const MODEL_FILE_NAME: &str = "learnedModel.dot";

/// Lowercase name of a piece of software under study (ex: "openssl")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Implementation(String);

impl Implementation {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Released build of an implementation, ordered by [`compare_versions`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for VersionTag {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_versions(&self.0, &other.0)
    }
}

impl PartialOrd for VersionTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability dimension a version may support (ex: "TLS12")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Protocol(String);

impl Protocol {
    /// Protocol labels used by the TLS learning setup
    pub const KNOWN: [&'static str; 3] = ["TLS10", "TLS11", "TLS12"];

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A (version, protocol) pair. Sets of these iterate in target order:
/// version ascending, then protocol name ascending.
pub type Combination = (VersionTag, Protocol);

/// One completed learning unit, stored at `<impl>/<version>/<protocol>/`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LearnedEntry {
    pub implementation: Implementation,
    pub version: VersionTag,
    pub protocol: Protocol,
}

impl LearnedEntry {
    pub fn new(implementation: Implementation, version: VersionTag, protocol: Protocol) -> Self {
        Self {
            implementation,
            version,
            protocol,
        }
    }

    /// Directory of this entry, relative to the model root
    pub fn relative_dir(&self) -> PathBuf {
        [
            self.implementation.as_str(),
            self.version.as_str(),
            self.protocol.as_str(),
        ]
        .iter()
        .collect()
    }

    /// Model file of this entry, relative to the model root
    pub fn model_file(&self) -> PathBuf {
        self.relative_dir().join(MODEL_FILE_NAME)
    }
}

/// A combination that still has to be learned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub implementation: Implementation,
    pub version: VersionTag,
    pub protocol: Protocol,
    /// Every protocol the version supports
    pub capabilities: BTreeSet<Protocol>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImplementationStatus {
    Reconciled,
    Skipped { reason: String },
}

/// Per-implementation counts for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationReport {
    pub implementation: Implementation,
    pub status: ImplementationStatus,
    pub tags: usize,
    pub possible: usize,
    pub learned: usize,
    pub to_learn: usize,
}

impl ImplementationReport {
    pub fn skipped(implementation: Implementation, reason: impl Into<String>) -> Self {
        Self {
            implementation,
            status: ImplementationStatus::Skipped {
                reason: reason.into(),
            },
            tags: 0,
            possible: 0,
            learned: 0,
            to_learn: 0,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, ImplementationStatus::Skipped { .. })
    }
}

/// Output of a reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
    pub run_id: String,
    /// Targets in manifest order
    pub targets: Vec<Target>,
    /// One report per implementation, in discovery order
    pub reports: Vec<ImplementationReport>,
}

impl Reconciliation {
    pub fn total(&self) -> usize {
        self.targets.len()
    }

    pub fn count_for(&self, implementation: &Implementation) -> usize {
        self.reports
            .iter()
            .find(|r| &r.implementation == implementation)
            .map(|r| r.to_learn)
            .unwrap_or(0)
    }

    pub fn targets_for<'a>(
        &'a self,
        implementation: &'a Implementation,
    ) -> impl Iterator<Item = &'a Target> + 'a {
        self.targets
            .iter()
            .filter(move |t| &t.implementation == implementation)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ImplementationReport> {
        self.reports.iter().filter(|r| r.is_skipped())
    }
}
