//! Command line definition
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tlsprint_core::Protocol;
use tlsprint_out::ManifestSchema;

#[derive(Debug, Parser)]
#[command(name = "tlsprint", version, about = "Schedule TLS state machine learning for new releases")]
pub struct Cli {
    /// Provide verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ./tlsprint.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Regenerate the CI manifest from the registry and the learned models
    Update(UpdateArgs),
    /// Commit a learned model to the model repository
    CommitModel(CommitModelArgs),
}

/// GitLab endpoint and credential overrides
#[derive(Debug, Clone, Default, Args)]
pub struct GitLabArgs {
    /// GitLab API key. If empty, GITLAB_TLSPRINT_API_KEY is used instead.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Base URL of the GitLab installation
    #[arg(long)]
    pub gitlab_url: Option<String>,

    /// GitLab id (or path) of the project to commit to
    #[arg(long)]
    pub project_id: Option<String>,

    /// Branch to commit to
    #[arg(long)]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct UpdateArgs {
    /// Commit the regenerated manifest
    #[arg(long)]
    pub commit: bool,

    /// Tag listing URL, with {namespace} and {image} placeholders
    #[arg(long)]
    pub registry_url: Option<String>,

    /// Registry namespace holding the implementation images
    #[arg(long)]
    pub namespace: Option<String>,

    /// Manifest template
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Where to write the manifest
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Manifest schema (v1, v2)
    #[arg(long)]
    pub schema: Option<ManifestSchema>,

    /// Seconds allowed for each registry or inventory call
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Query implementations one after another
    #[arg(long)]
    pub sequential: bool,

    #[command(flatten)]
    pub gitlab: GitLabArgs,
}

#[derive(Debug, Clone, Args)]
pub struct CommitModelArgs {
    /// Name of the implementation
    #[arg(long)]
    pub implementation: String,

    /// Version of the implementation
    #[arg(long = "version")]
    pub impl_version: String,

    /// TLS version for which this model is learned
    #[arg(long, value_parser = PossibleValuesParser::new(Protocol::KNOWN))]
    pub tls_version: String,

    /// File where the model to be committed is stored
    #[arg(long)]
    pub model: PathBuf,

    #[command(flatten)]
    pub gitlab: GitLabArgs,
}
