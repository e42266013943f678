//! ladle command line application.

// CLI binary needs to output to stderr - this is intentional
#![allow(clippy::print_stderr)]

mod cli;
mod logging;

use clap::Parser;
use ladle_closure::PackageManager;
use ladle_core::config::Config;
use std::process::ExitCode;
use tracing::info;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = logging::init_tracing(cli.log_format, cli.log_level) {
        eprintln!("{error:?}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            render_error(error);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ladle_core::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Restore { directory } => {
            let manager = PackageManager::from_config(&config)?;
            manager.restore_packages(&directory).await?;
            info!("Restore complete");
        }
    }

    Ok(())
}

/// Handled errors are expected outcomes and only print their message.
fn render_error(error: ladle_core::Error) {
    if error.is_handled() {
        eprintln!("{error}");
    } else {
        eprintln!("{:?}", miette::Report::new(error));
    }
}
