//! Binary entrypoint for `tlsprint`.
use clap::Parser;
use std::process::ExitCode;
use tlsprint_cli::cli::Cli;
use tlsprint_cli::commands::API_KEY_ENV;
use tlsprint_cli::{logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = logging::init(cli.verbose) {
        eprintln!("cannot set up logging: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli, std::env::var(API_KEY_ENV).ok()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
