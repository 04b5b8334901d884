//! ferry: minify, rewrite and publish web assets to object storage.

mod cli;
mod command;
mod error;
mod logging;

use clap::Parser;
use cli::{Cli, Command};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Command::Refresh { url }) => command::refresh::run(cli.config.as_deref(), url).await,
        Some(Command::Init { force }) => command::init::run(cli.config.as_deref(), *force),
        // Nothing to do: same as --help.
        None if cli.upload.files.is_empty() => cli::print_help(&mut std::io::stdout()).map(|()| ExitCode::SUCCESS),
        None => command::upload::run(cli.config.as_deref(), &cli.upload).await,
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = ?err, "{err}");
            ExitCode::FAILURE
        },
    }
}
