//! `tlsprint.yaml` configuration
//!
//! Every field has a default, so the file itself is optional. Command line
//! flags are applied on top of whatever the file provides.
use crate::cli::{GitLabArgs, UpdateArgs};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tlsprint_out::ManifestSchema;
use tlsprint_publish::PublishConfig;
use tlsprint_registry::docker::{DEFAULT_NAMESPACE, DEFAULT_TAGS_URL};
use tlsprint_registry::RegistryConfig;

pub const DEFAULT_CONFIG_FILE: &str = "tlsprint.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// One subdirectory per implementation, each with a `capabilities.yaml`
    pub implementations_dir: PathBuf,
    /// Checkout of the model repository
    pub models_dir: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
    pub schema: ManifestSchema,
    /// Per-call bound for registry and inventory lookups, 0 disables it
    pub timeout_secs: u64,
    pub concurrent: bool,
    pub registry: RegistrySettings,
    pub gitlab: GitLabSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            implementations_dir: PathBuf::from("docker-images"),
            models_dir: PathBuf::from("models"),
            template: PathBuf::from("templates/drone.yml.hbs"),
            output: PathBuf::from(".drone.yml"),
            schema: ManifestSchema::V1,
            timeout_secs: 30,
            concurrent: true,
            registry: RegistrySettings::default(),
            gitlab: GitLabSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub tags_url: String,
    pub namespace: String,
    pub max_pages: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            tags_url: DEFAULT_TAGS_URL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_pages: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitLabSettings {
    pub url: String,
    /// Project receiving the regenerated manifest
    pub manifest_project: String,
    /// Manifest location inside that project; derived from `output` when unset
    pub manifest_path: Option<String>,
    /// Project holding the learned models
    pub models_project: String,
    pub branch: String,
}

impl Default for GitLabSettings {
    fn default() -> Self {
        Self {
            url: "https://gitlab.sidnlabs.nl".to_string(),
            manifest_project: "tlsprint/tlsprint".to_string(),
            manifest_path: None,
            models_project: "50".to_string(),
            branch: "master".to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file deserializes to `null`
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("invalid configuration")
    }

    /// Load `path` when given, else `./tlsprint.yaml` if it exists, else defaults.
    ///
    /// An explicitly named file that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("in {}", path.display()))
    }

    pub fn apply_update_args(&mut self, args: &UpdateArgs) {
        if let Some(url) = &args.registry_url {
            self.registry.tags_url = url.clone();
        }
        if let Some(namespace) = &args.namespace {
            self.registry.namespace = namespace.clone();
        }
        if let Some(template) = &args.template {
            self.template = template.clone();
        }
        if let Some(output) = &args.output {
            self.output = output.clone();
        }
        if let Some(schema) = args.schema {
            self.schema = schema;
        }
        if let Some(secs) = args.timeout_secs {
            self.timeout_secs = secs;
        }
        if args.sequential {
            self.concurrent = false;
        }
        self.gitlab.apply(&args.gitlab);
        if let Some(id) = &args.gitlab.project_id {
            self.gitlab.manifest_project = id.clone();
        }
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn registry_config(&self) -> RegistryConfig {
        let mut config = RegistryConfig {
            tags_url: self.registry.tags_url.clone(),
            namespace: self.registry.namespace.clone(),
            max_pages: self.registry.max_pages,
            ..RegistryConfig::default()
        };
        if let Some(timeout) = self.call_timeout() {
            config.request_timeout = timeout;
        }
        config
    }
}

impl GitLabSettings {
    /// Apply the endpoint flags. `--project-id` is left to the caller, it
    /// names a different project per subcommand.
    pub fn apply(&mut self, args: &GitLabArgs) {
        if let Some(url) = &args.gitlab_url {
            self.url = url.clone();
        }
        if let Some(branch) = &args.branch {
            self.branch = branch.clone();
        }
    }

    pub fn publish_config(&self, project_id: &str, private_token: String) -> PublishConfig {
        PublishConfig {
            base_url: self.url.clone(),
            project_id: project_id.to_string(),
            branch: self.branch.clone(),
            private_token,
            request_timeout: Duration::from_secs(30),
        }
    }
}
