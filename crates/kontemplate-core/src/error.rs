//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cluster configuration not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid cluster configuration: {message}")]
    InvalidContext { message: String },

    #[error("Resource set '{name}' is declared more than once")]
    DuplicateResourceSet { name: String },

    #[error("Invalid resource set '{name}': {message}")]
    InvalidResourceSet { name: String, message: String },

    #[error("Invalid variable: {message}")]
    InvalidVariable { message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
