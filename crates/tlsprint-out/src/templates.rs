//! Manifest template loading.
//!
//! A template is a plain Handlebars file. Its render context is:
//!
//! ```text
//! schema   "v1" | "v2"
//! total    number of targets
//! targets  [{ implementation, version, protocol, protocols? }]
//! ```
//!
//! `protocols` (every protocol the version supports) is only present in v2.

use crate::RenderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Versioned layout of the records handed to the template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestSchema {
    /// implementation, version, protocol
    #[default]
    V1,
    /// v1 plus the version's full protocol list
    V2,
}

impl ManifestSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

impl fmt::Display for ManifestSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManifestSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(Self::V1),
            "v2" | "2" => Ok(Self::V2),
            other => Err(format!("unknown manifest schema '{}'", other)),
        }
    }
}

/// A named template source
#[derive(Debug, Clone)]
pub struct ManifestTemplate {
    pub name: String,
    pub source: String,
}

impl ManifestTemplate {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Load a template file; the file name becomes the template name
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            RenderError::Template(format!("failed to read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("manifest")
            .to_string();
        Ok(Self::new(name, source))
    }
}
