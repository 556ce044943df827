//! Unified Error Model
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single collaborator call (registry, capability lookup, inventory scan).
///
/// The engine converts these into an empty contribution for the affected
/// implementation, except for inventory failures other than timeouts, which
/// are structural.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("TRANSPORT/{0}")]
    Transport(String),

    #[error("STATUS/{status} from {url}")]
    Status { status: u16, url: String },

    #[error("MALFORMED/{0}")]
    Malformed(String),

    #[error("UNKNOWN/{0}")]
    UnknownImplementation(String),

    #[error("TIMEOUT/no answer after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("IO/{}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

impl SourceError {
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Failure that aborts a whole reconciliation run.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("DISCOVERY/{}: {message}", .path.display())]
    Discovery { path: PathBuf, message: String },

    #[error("INVENTORY/{implementation}: {source}")]
    Inventory {
        implementation: String,
        #[source]
        source: SourceError,
    },
}
