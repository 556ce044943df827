//! tlsprint: schedule state machine learning for new TLS releases
//!
//! `update` turns the registry tags, capability tables and learned models into
//! the CI manifest; `commit-model` pushes a freshly learned model.
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

use anyhow::Result;
use cli::{Cli, Command};
use commands::{resolve_api_key, ModelSubmission};
use config::Config;
use tracing::info;

/// Run one invocation. `env_api_key` is the value of `GITLAB_TLSPRINT_API_KEY`.
pub async fn run(cli: Cli, env_api_key: Option<String>) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Update(args) => {
            config.apply_update_args(&args);
            let api_key = resolve_api_key(args.gitlab.api_key.as_deref(), env_api_key.as_deref());
            let outcome = commands::update(&config, args.commit, api_key.as_deref()).await?;
            if let Some(commit) = outcome.commit {
                info!(commit = %commit.id, "manifest published");
            }
        }
        Command::CommitModel(args) => {
            config.gitlab.apply(&args.gitlab);
            if let Some(id) = &args.gitlab.project_id {
                config.gitlab.models_project = id.clone();
            }
            let api_key = resolve_api_key(args.gitlab.api_key.as_deref(), env_api_key.as_deref());
            let submission = ModelSubmission {
                implementation: &args.implementation,
                version: &args.impl_version,
                tls_version: &args.tls_version,
                model: &args.model,
            };
            let commit = commands::commit_model(&config, &submission, api_key.as_deref()).await?;
            info!(commit = %commit.id, "model committed");
        }
    }
    Ok(())
}
