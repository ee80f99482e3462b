//! CLI error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use fwwatch_config::ConfigError;
use fwwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(
        code(fwwatch::config),
        help(
            "Check the file shown by `fwwatch config path` and any\n\
             FWWATCH_* or FW_WEBHOOK environment variables."
        )
    )]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(code(fwwatch::core))]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(fwwatch::io))]
    Io(#[from] std::io::Error),

    #[error("Failed to encode event: {0}")]
    #[diagnostic(code(fwwatch::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => exit_code::CONFIG,
            Self::Core(_) | Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}
