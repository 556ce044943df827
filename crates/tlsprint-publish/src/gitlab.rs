//! GitLab publisher
//!
//! Credentials and endpoint come in through [`PublishConfig`]; nothing here
//! reads the environment.
use crate::commit::CommitRequest;
use crate::PublishError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone)]
pub struct PublishConfig {
    /// Base URL of the GitLab installation (ex: "https://gitlab.com")
    pub base_url: String,
    /// Numeric id or `namespace/project` path
    pub project_id: String,
    pub branch: String,
    pub private_token: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishConfig")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("branch", &self.branch)
            .field("private_token", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct CommitPayload<'a> {
    branch: &'a str,
    #[serde(flatten)]
    request: &'a CommitRequest,
}

/// The commit GitLab created
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitInfo {
    pub id: String,
    #[serde(default)]
    pub web_url: Option<String>,
}

pub struct GitLabPublisher {
    client: reqwest::Client,
    config: PublishConfig,
}

impl GitLabPublisher {
    pub fn new(config: PublishConfig) -> Result<Self, PublishError> {
        if config.private_token.trim().is_empty() {
            return Err(PublishError::MissingCredential);
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("tlsprint/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PublishError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn project_url(&self) -> String {
        format!(
            "{}/api/v4/projects/{}",
            self.config.base_url.trim_end_matches('/'),
            encode_component(&self.config.project_id)
        )
    }

    pub fn commits_url(&self) -> String {
        format!("{}/repository/commits", self.project_url())
    }

    pub fn raw_file_url(&self, file_path: &str) -> String {
        format!(
            "{}/repository/files/{}/raw",
            self.project_url(),
            encode_component(file_path)
        )
    }

    /// Content of `file_path` on the configured branch, `None` when the file
    /// does not exist there
    pub async fn file_content(&self, file_path: &str) -> Result<Option<String>, PublishError> {
        let response = self
            .client
            .get(self.raw_file_url(file_path))
            .query(&[("ref", self.config.branch.as_str())])
            .header("PRIVATE-TOKEN", &self.config.private_token)
            .send()
            .await
            .map_err(|e| PublishError::Http(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(file = file_path, branch = %self.config.branch, "file not in repository");
            return Ok(None);
        }
        let body = response
            .text()
            .await
            .map_err(|e| PublishError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(Some(body))
    }

    pub async fn commit(&self, request: &CommitRequest) -> Result<CommitInfo, PublishError> {
        let payload = CommitPayload {
            branch: &self.config.branch,
            request,
        };
        if let Ok(pretty) = serde_json::to_string_pretty(&payload) {
            debug!(payload = %pretty, "commit payload");
        }

        info!(
            project = %self.config.project_id,
            branch = %self.config.branch,
            actions = request.actions.len(),
            "committing: {}",
            request.commit_message
        );

        let response = self
            .client
            .post(self.commits_url())
            .header("PRIVATE-TOKEN", &self.config.private_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PublishError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PublishError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let commit: CommitInfo = serde_json::from_str(&body)
            .map_err(|e| PublishError::Malformed(e.to_string()))?;
        info!(commit = %commit.id, "commit created");
        Ok(commit)
    }
}

/// Percent-encode a project path or file path as a single URL path segment
fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
