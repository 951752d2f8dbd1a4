//! Kontemplate Core - cluster configuration and variable resolution
//!
//! This crate provides the foundational types used throughout Kontemplate:
//! - `Context`: the target cluster with its resolved resource sets
//! - `ResourceSetDeclaration`: one named group of templates or a helm chart
//! - `Values`: variable mappings with deep merge support

pub mod context;
pub mod error;
pub mod values;

pub use context::{Context, HelmRepository, ResourceSetDeclaration, ResourceSetKind};
pub use error::{ConfigError, Result};
pub use values::{Values, parse_var_overrides};
