// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `execdriver`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "execdriver",
    version,
    about = "Run a process inside an active container and stream its I/O.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Execdriver.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Execdriver.toml")]
    pub config: String,

    /// Id of the container to run the process in.
    #[arg(long, short = 'c', value_name = "ID")]
    pub container: String,

    /// Attach the process to an interactive console.
    #[arg(long, short = 't')]
    pub tty: bool,

    /// Working directory inside the container.
    #[arg(long, short = 'w', value_name = "DIR")]
    pub workdir: Option<String>,

    /// Extra environment variable (`NAME=VALUE`); may be repeated.
    #[arg(long = "env", short = 'e', value_name = "NAME=VALUE")]
    pub env: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `EXECDRIVER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the command line and environment that would be used, without
    /// running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Entrypoint followed by its arguments. Arguments are joined with
    /// single spaces and are not re-quoted.
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
