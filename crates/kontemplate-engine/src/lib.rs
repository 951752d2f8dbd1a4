//! Kontemplate Engine - MiniJinja templating for resource sets
//!
//! This crate renders the templates of each resource set with:
//! - Manifest-oriented filters (toyaml, b64encode, nindent, ...)
//! - Helper functions for inserting files and templates, DNS and `pass` lookups
//! - Human-readable error messages with suggestions
//! - Per-file error collection so one broken template does not hide the rest

pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;
pub mod suggestions;

pub use engine::{Engine, RenderOutput, RenderedResource, RenderedResourceSet, is_selected};
pub use error::{RenderReport, Result, TemplateError, TemplateErrorKind};
pub use suggestions::{AVAILABLE_FILTERS, AVAILABLE_FUNCTIONS};
