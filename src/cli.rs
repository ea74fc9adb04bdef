// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `rollout`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rollout",
    version,
    about = "Build the app, push it to every target host and restart the service.",
    long_about = None
)]
pub struct CliArgs {
    /// Hosts to deploy to (ssh destinations), deployed in parallel.
    #[arg(value_name = "TARGET", required = true, num_args = 1..)]
    pub targets: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Rollout.toml` in the current working directory, falling back
    /// to built-in defaults when that file does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ROLLOUT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Assemble the workflow and print it, but don't execute anything.
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

/// Convenience wrapper around `CliArgs::parse()`.
///
/// Exits the process with clap's usage output on bad arguments (status 2), or
/// prints help/version and exits 0.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn targets_are_required() {
        let err = CliArgs::try_parse_from(["rollout"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_targets_and_flags() {
        let args = CliArgs::try_parse_from([
            "rollout",
            "--dry-run",
            "--log-level",
            "debug",
            "--config",
            "deploy.toml",
            "isu1",
            "isu2",
        ])
        .unwrap();

        assert_eq!(args.targets, ["isu1", "isu2"]);
        assert!(args.dry_run);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert_eq!(args.config.as_deref(), Some("deploy.toml"));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = CliArgs::try_parse_from(["rollout", "--log-level", "loud", "isu1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }
}
