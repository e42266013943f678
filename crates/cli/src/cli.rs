//! Command line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::{LogLevel, TracingFormat};

/// Resolve, lock and restore the packages of a build.
#[derive(Parser, Debug)]
#[command(name = "ladle")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        default_value = "warn",
        value_enum
    )]
    pub log_level: LogLevel,

    /// Log output format.
    #[arg(long, global = true, default_value = "pretty", value_enum)]
    pub log_format: TracingFormat,

    /// Configuration file, defaults to `<config dir>/ladle/config.toml`.
    #[arg(long, global = true, value_name = "PATH", env = "LADLE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore all packages needed to build a directory.
    Restore {
        /// Directory containing the root recipe.
        #[arg(value_name = "DIR", default_value = ".")]
        directory: PathBuf,
    },
}
