//! Commit payloads for the GitLab commits API
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tlsprint_core::{LearnedEntry, MODEL_FILE_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Update,
}

/// One file change inside a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAction {
    pub action: ActionKind,
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub commit_message: String,
    pub actions: Vec<CommitAction>,
}

impl CommitRequest {
    /// Write the rendered manifest at `file_path`; `action` is `Create` when
    /// the file is not in the repository yet
    pub fn manifest_update(
        action: ActionKind,
        file_path: &str,
        content: &str,
        date: NaiveDate,
    ) -> Self {
        Self {
            commit_message: format!("Automatic update {}", date.format("%Y-%m-%d")),
            actions: vec![CommitAction {
                action,
                file_path: file_path.to_string(),
                content: content.to_string(),
            }],
        }
    }

    /// Add a freshly learned model at `<impl>/<version>/<protocol>/learnedModel.dot`
    pub fn learned_model(entry: &LearnedEntry, model: String) -> Self {
        let version = entry.version.as_str().to_lowercase();
        Self {
            commit_message: format!(
                "Add model of {} version {}, for {}",
                entry.implementation, version, entry.protocol
            ),
            actions: vec![CommitAction {
                action: ActionKind::Create,
                // Repository paths always use '/', whatever the local platform
                file_path: format!(
                    "{}/{}/{}/{}",
                    entry.implementation, version, entry.protocol, MODEL_FILE_NAME
                ),
                content: model,
            }],
        }
    }
}
