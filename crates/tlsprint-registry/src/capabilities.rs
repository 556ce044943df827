//! Capability Matrix: which protocols each version of an implementation supports
//!
//! Every implementation directory carries a `capabilities.yaml`:
//!
//! ```yaml
//! rules:
//!   - protocols: [TLS10, TLS11]
//!     since: "1.0.0"
//!     until: "1.1.0"
//!   - protocols: [TLS12]
//!     since: "1.0.1"
//! ```
//!
//! A version supports the union of the protocols of every rule whose
//! `[since, until)` range contains it.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tlsprint_core::{
    CapabilityResolver, Implementation, Protocol, SourceError, VersionRange, VersionTag,
};
use tracing::debug;

/// File name of the capability table inside an implementation directory
pub const CAPABILITIES_FILE: &str = "capabilities.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRule {
    pub protocols: Vec<String>,
    #[serde(flatten)]
    pub range: VersionRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTable {
    #[serde(default)]
    pub rules: Vec<CapabilityRule>,
}

impl CapabilityTable {
    pub fn from_yaml(yaml: &str) -> Result<Self, SourceError> {
        serde_yaml::from_str(yaml).map_err(|e| SourceError::Malformed(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|e| SourceError::io(path, &e))?;
        Self::from_yaml(&content)
    }

    pub fn protocols_for(&self, version: &VersionTag) -> BTreeSet<Protocol> {
        self.rules
            .iter()
            .filter(|rule| rule.range.contains(version.as_str()))
            .flat_map(|rule| rule.protocols.iter().map(Protocol::new))
            .collect()
    }
}

/// Capability tables for all known implementations
#[derive(Debug, Clone, Default)]
pub struct CapabilityMatrix {
    tables: HashMap<Implementation, Result<CapabilityTable, SourceError>>,
}

impl CapabilityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, implementation: Implementation, table: CapabilityTable) {
        self.tables.insert(implementation, Ok(table));
    }

    /// Load `<dir>/<implementation>/capabilities.yaml` for each implementation.
    ///
    /// A table that fails to load is kept as an error and reported when that
    /// implementation is queried, so it only affects that implementation.
    pub fn load(dir: &Path, implementations: &[Implementation]) -> Self {
        let tables = implementations
            .iter()
            .map(|implementation| {
                let path = dir.join(implementation.as_str()).join(CAPABILITIES_FILE);
                debug!(implementation = %implementation, path = %path.display(), "loading capability table");
                (implementation.clone(), CapabilityTable::load(&path))
            })
            .collect();
        Self { tables }
    }

    pub fn table(&self, implementation: &Implementation) -> Result<&CapabilityTable, SourceError> {
        match self.tables.get(implementation) {
            Some(Ok(table)) => Ok(table),
            Some(Err(err)) => Err(err.clone()),
            None => Err(SourceError::UnknownImplementation(implementation.to_string())),
        }
    }
}

#[async_trait]
impl CapabilityResolver for CapabilityMatrix {
    async fn capabilities(
        &self,
        implementation: &Implementation,
        version: &VersionTag,
    ) -> Result<BTreeSet<Protocol>, SourceError> {
        Ok(self.table(implementation)?.protocols_for(version))
    }
}
