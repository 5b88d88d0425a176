use std::path::PathBuf;

use miette::{Diagnostic, SourceSpan};
use tally_rt::RunError;
use thiserror::Error;

/// Everything the `tally` binary can fail with.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Run failed")]
    #[diagnostic(
        code("TALLY-001"),
        help("Run with -v or RUST_LOG=debug to see the message traffic of every participant")
    )]
    Run(#[from] RunError),

    #[error("Failed to read configuration file {path}")]
    #[diagnostic(code("TALLY-002"))]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {message}")]
    #[diagnostic(
        code("TALLY-003"),
        help("Known keys are n, participants, granularity, method and progress")
    )]
    ConfigParse {
        path: PathBuf,
        #[source_code]
        src: String,
        #[label("{message}")]
        span: Option<SourceSpan>,
        message: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("'{input}' is not a valid N")]
    #[diagnostic(code("TALLY-004"), help("N must be a whole number of at least 1"))]
    InvalidNumber { input: String },

    #[error("Failed to read N from standard input")]
    #[diagnostic(code("TALLY-005"))]
    Stdin(#[source] std::io::Error),

    /// The run finished but disagrees with `N(N+1)/2`.
    #[error("Total {total} does not match the expected {expected}")]
    #[diagnostic(code("TALLY-006"))]
    WrongTotal { total: u128, expected: u128 },
}

/// Converts a TOML error into a diagnostic pointing at the offending span.
pub fn convert_toml_error(error: toml::de::Error, path: PathBuf, src: String) -> CliError {
    let span = error
        .span()
        .map(|range| SourceSpan::from((range.start, range.end - range.start)));
    CliError::ConfigParse {
        path,
        src,
        span,
        message: error.message().to_string(),
        source: error,
    }
}
