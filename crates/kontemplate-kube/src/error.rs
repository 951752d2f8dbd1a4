//! Error types for kontemplate-kube

use thiserror::Error;

/// Result type for kontemplate-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors raised while handing resource sets to external tools
///
/// Every variant carries the full command line that failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// The tool could not be started at all
    #[error("failed to run `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing rendered manifests to the tool's stdin failed
    #[error("failed to write manifests to `{command}`: {source}")]
    Input {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the tool to finish failed
    #[error("failed to wait for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool exited with a non-zero code
    #[error("`{command}` exited with code {code}")]
    Exit { command: String, code: i32 },

    /// The tool was terminated without an exit code
    #[error("`{command}` was terminated by a signal")]
    Signalled { command: String },
}

impl KubeError {
    /// The command line of the failing invocation
    pub fn command(&self) -> &str {
        match self {
            Self::Launch { command, .. }
            | Self::Input { command, .. }
            | Self::Wait { command, .. }
            | Self::Exit { command, .. }
            | Self::Signalled { command } => command,
        }
    }
}
