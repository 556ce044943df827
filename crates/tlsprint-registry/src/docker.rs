//! Docker Registry: tag listing over HTTP
//!
//! Two response shapes are understood:
//! - the legacy v1 listing, a bare array `[{"layer": "", "name": "1.0.2"}]`
//! - the paged hub listing `{"results": [{"name": "1.0.2"}], "next": "<url>"}`,
//!   whose `next` links are followed up to `max_pages`.
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tlsprint_core::{Implementation, RegistryGateway, SourceError, VersionTag};
use tracing::debug;

pub const DEFAULT_TAGS_URL: &str =
    "https://registry.hub.docker.com/v1/repositories/{namespace}/{image}/tags";
pub const DEFAULT_NAMESPACE: &str = "tlsprint";

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Tag listing URL with `{namespace}` and `{image}` placeholders
    pub tags_url: String,
    pub namespace: String,
    pub max_pages: usize,
    pub request_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            tags_url: DEFAULT_TAGS_URL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_pages: 50,
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl RegistryConfig {
    pub fn tags_url_for(&self, implementation: &Implementation) -> String {
        self.tags_url
            .replace("{namespace}", &self.namespace)
            .replace("{image}", implementation.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct TagRecord {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagListing {
    Legacy(Vec<TagRecord>),
    Paged {
        results: Vec<TagRecord>,
        #[serde(default)]
        next: Option<String>,
    },
}

/// One page of a tag listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPage {
    pub names: Vec<String>,
    pub next: Option<String>,
}

pub fn parse_tag_listing(body: &str) -> Result<TagPage, SourceError> {
    let listing: TagListing = serde_json::from_str(body)
        .map_err(|e| SourceError::Malformed(format!("tag listing: {}", e)))?;

    let (records, next) = match listing {
        TagListing::Legacy(records) => (records, None),
        TagListing::Paged { results, next } => (results, next.filter(|n| !n.is_empty())),
    };

    Ok(TagPage {
        names: records
            .into_iter()
            .map(|r| r.name)
            .filter(|n| !n.trim().is_empty())
            .collect(),
        next,
    })
}

pub struct DockerRegistry {
    client: reqwest::Client,
    config: RegistryConfig,
}

impl DockerRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tlsprint/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    async fn fetch_page(&self, url: &str) -> Result<TagPage, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        parse_tag_listing(&body)
    }
}

#[async_trait]
impl RegistryGateway for DockerRegistry {
    async fn list_tags(
        &self,
        implementation: &Implementation,
    ) -> Result<BTreeSet<VersionTag>, SourceError> {
        let mut url = self.config.tags_url_for(implementation);
        let mut tags = BTreeSet::new();

        for page in 0..self.config.max_pages {
            debug!(implementation = %implementation, page, url = %url, "querying image tags");
            let listing = self.fetch_page(&url).await?;
            tags.extend(listing.names.into_iter().map(VersionTag::new));
            match listing.next {
                Some(next) => url = next,
                None => return Ok(tags),
            }
        }

        Err(SourceError::Malformed(format!(
            "tag listing for '{}' exceeds {} pages",
            implementation, self.config.max_pages
        )))
    }
}
