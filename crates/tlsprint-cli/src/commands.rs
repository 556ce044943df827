//! Subcommand handlers
use crate::config::Config;
use anyhow::{bail, Context, Result};
use std::path::{Component, Path};
use std::sync::Arc;
use tlsprint_core::{
    discover_implementations, Implementation, LearnedEntry, ModelDirectory, Protocol,
    Reconciliation, ReconciliationEngine, RunContext, VersionTag,
};
use tlsprint_out::{render_manifest, RenderedManifest};
use tlsprint_publish::{ActionKind, CommitInfo, CommitRequest, GitLabPublisher};
use tlsprint_registry::{CapabilityMatrix, DockerRegistry};
use tracing::{info, warn};

pub const API_KEY_ENV: &str = "GITLAB_TLSPRINT_API_KEY";

/// `--api-key` first, then the value of `GITLAB_TLSPRINT_API_KEY`; blank counts as unset
pub fn resolve_api_key(flag: Option<&str>, env: Option<&str>) -> Option<String> {
    [flag, env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .map(str::to_string)
}

fn require_api_key(api_key: Option<&str>) -> Result<String> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => bail!("no API key specified, pass --api-key or define {}", API_KEY_ENV),
    }
}

#[derive(Debug)]
pub struct UpdateOutcome {
    pub reconciliation: Reconciliation,
    pub manifest: RenderedManifest,
    /// False when the local manifest already had this content
    pub changed: bool,
    /// Set when a commit was made; the remote branch decides, not `changed`
    pub commit: Option<CommitInfo>,
}

/// Discover, reconcile, render and write the manifest; publish it on `commit`.
///
/// The manifest is on disk before any credential is looked at.
pub async fn update(config: &Config, commit: bool, api_key: Option<&str>) -> Result<UpdateOutcome> {
    let implementations = discover_implementations(&config.implementations_dir)?;
    info!("found {} implementations", implementations.len());
    for implementation in &implementations {
        info!("  - {}", implementation);
    }

    let registry = DockerRegistry::new(config.registry_config())
        .context("cannot set up the registry client")?;
    let capabilities = CapabilityMatrix::load(&config.implementations_dir, &implementations);
    let inventory = ModelDirectory::new(&config.models_dir);
    let engine = ReconciliationEngine::new(
        Arc::new(registry),
        Arc::new(capabilities),
        Arc::new(inventory),
    );

    let mut ctx = RunContext::new().with_timeout(config.call_timeout());
    if !config.concurrent {
        ctx = ctx.sequential();
    }
    let reconciliation = engine.reconcile(&implementations, &ctx).await?;
    for report in reconciliation.skipped() {
        warn!(implementation = %report.implementation, "left out of the manifest");
    }

    info!(
        "generating {} from {}",
        config.output.display(),
        config.template.display()
    );
    let manifest = render_manifest(&config.template, &reconciliation.targets, config.schema)?;
    let previous = std::fs::read_to_string(&config.output).ok();
    let changed = previous.as_deref() != Some(manifest.text.as_str());
    manifest.write_to(&config.output)?;
    info!(digest = %manifest.digest, changed, "manifest written");

    let commit = if commit {
        publish_manifest(config, &manifest, api_key).await?
    } else {
        None
    };

    Ok(UpdateOutcome {
        reconciliation,
        manifest,
        changed,
        commit,
    })
}

/// Commit `manifest` unless the manifest project's branch already holds
/// exactly this text. The local file plays no part in the decision.
async fn publish_manifest(
    config: &Config,
    manifest: &RenderedManifest,
    api_key: Option<&str>,
) -> Result<Option<CommitInfo>> {
    let token = require_api_key(api_key)?;
    let path = manifest_repository_path(config)?;
    let publisher =
        GitLabPublisher::new(config.gitlab.publish_config(&config.gitlab.manifest_project, token))?;

    let action = match publisher.file_content(&path).await? {
        Some(published) if published == manifest.text => {
            info!(file = %path, "published manifest is up to date, nothing to commit");
            return Ok(None);
        }
        Some(_) => ActionKind::Update,
        None => ActionKind::Create,
    };
    let request = CommitRequest::manifest_update(
        action,
        &path,
        &manifest.text,
        chrono::Local::now().date_naive(),
    );
    Ok(Some(publisher.commit(&request).await?))
}

/// Path of the manifest inside the repository it is committed to
fn manifest_repository_path(config: &Config) -> Result<String> {
    if let Some(path) = &config.gitlab.manifest_path {
        return Ok(path.trim_start_matches('/').to_string());
    }
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    repository_path(&config.output, &cwd)
}

/// `output` as a `/`-separated path relative to `root`
fn repository_path(output: &Path, root: &Path) -> Result<String> {
    let relative = if output.is_absolute() {
        output.strip_prefix(root).with_context(|| {
            format!(
                "{} is outside {}, set gitlab.manifest_path",
                output.display(),
                root.display()
            )
        })?
    } else {
        output
    };

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => match part.to_str() {
                Some(part) => parts.push(part),
                None => bail!("output path {} is not valid UTF-8", output.display()),
            },
            _ => bail!(
                "output path {} leaves the repository, set gitlab.manifest_path",
                output.display()
            ),
        }
    }
    if parts.is_empty() {
        bail!("output path {} has no file name", output.display());
    }
    Ok(parts.join("/"))
}

pub struct ModelSubmission<'a> {
    pub implementation: &'a str,
    pub version: &'a str,
    pub tls_version: &'a str,
    pub model: &'a Path,
}

/// Commit one learned model file to the model repository
pub async fn commit_model(
    config: &Config,
    submission: &ModelSubmission<'_>,
    api_key: Option<&str>,
) -> Result<CommitInfo> {
    if !Protocol::KNOWN.iter().any(|known| *known == submission.tls_version) {
        bail!(
            "unknown TLS version {}, expected one of {}",
            submission.tls_version,
            Protocol::KNOWN.join(", ")
        );
    }
    let content = std::fs::read_to_string(submission.model)
        .with_context(|| format!("cannot read model {}", submission.model.display()))?;

    let entry = LearnedEntry::new(
        Implementation::new(submission.implementation),
        VersionTag::new(submission.version.to_lowercase()),
        Protocol::new(submission.tls_version),
    );
    let local = ModelDirectory::new(&config.models_dir).model_path(&entry);
    if local.exists() {
        warn!(path = %local.display(), "model already present in the local checkout");
    }

    let token = require_api_key(api_key)?;
    let publisher =
        GitLabPublisher::new(config.gitlab.publish_config(&config.gitlab.models_project, token))?;
    let commit = publisher
        .commit(&CommitRequest::learned_model(&entry, content))
        .await?;
    Ok(commit)
}
