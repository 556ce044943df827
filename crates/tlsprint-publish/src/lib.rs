//! tlsprint-publish: commit manifests and learned models to GitLab
pub mod commit;
pub mod gitlab;

use thiserror::Error;

pub use commit::{ActionKind, CommitAction, CommitRequest};
pub use gitlab::{CommitInfo, GitLabPublisher, PublishConfig};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("AUTH/no GitLab API key configured")]
    MissingCredential,

    #[error("HTTP/{0}")]
    Http(String),

    #[error("REJECTED/{status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("MALFORMED/{0}")]
    Malformed(String),
}
