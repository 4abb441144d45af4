// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `mediaflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mediaflow",
    version,
    about = "Run media processing workflows defined in a TOML file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Mediaflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Mediaflow.toml")]
    pub config: String,

    /// Id of the workflow definition to run.
    #[arg(long, value_name = "ID")]
    pub workflow: Option<String>,

    /// Media package to process, as JSON. A fresh, empty media package is
    /// used if omitted.
    #[arg(long, value_name = "FILE")]
    pub media_package: Option<String>,

    /// Workflow property `key=value`. May be repeated.
    #[arg(long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MEDIAFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print definitions, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
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

fn parse_property(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
