//! CLI error types with exit code handling
//!
//! Every fatal error of a run ends up as a `CliError`, which knows the
//! exit code the process should terminate with.

use kontemplate_core::ConfigError;
use kontemplate_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Cluster configuration could not be loaded
    #[error("Failed to load cluster configuration")]
    #[diagnostic(code(kontemplate::cli::config))]
    Config {
        #[source]
        source: ConfigError,
        #[help]
        help: Option<String>,
    },

    /// Some templates failed to render; everything else was processed
    #[error("{failed} template(s) failed to render")]
    #[diagnostic(
        code(kontemplate::cli::template),
        help("failed templates were skipped, see the warnings above")
    )]
    Template { failed: usize },

    /// Writing rendered output failed
    #[error("IO error: {message}")]
    #[diagnostic(code(kontemplate::cli::io))]
    Io { message: String },

    /// An external tool failed; remaining resource sets were not dispatched
    #[error("Deployment aborted")]
    #[diagnostic(
        code(kontemplate::cli::dispatch),
        help("resource sets after the failing one were not dispatched")
    )]
    Dispatch {
        #[source]
        source: KubeError,
    },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Template { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Dispatch { .. } => exit_codes::DISPATCH_ERROR,
        }
    }

    /// Create an IO error with the path that failed
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(source: ConfigError) -> Self {
        let help = match &source {
            ConfigError::NotFound { .. } => {
                Some("pass the path of an existing cluster configuration file".to_string())
            }
            ConfigError::DuplicateResourceSet { .. } => Some(
                "resource set names must be unique, including nested `parent/child` names"
                    .to_string(),
            ),
            ConfigError::InvalidVariable { .. } => Some(
                "variables are passed as --var KEY=VALUE, nested keys as --var a.b=VALUE"
                    .to_string(),
            ),
            _ => None,
        };
        CliError::Config { source, help }
    }
}

impl From<KubeError> for CliError {
    fn from(source: KubeError) -> Self {
        CliError::Dispatch { source }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
