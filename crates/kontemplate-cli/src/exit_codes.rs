//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions where applicable. Usage errors
//! are reported by clap with its own exit code.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// Template error - at least one template failed to render
pub const TEMPLATE_ERROR: i32 = 3;

/// Config error - invalid cluster configuration or variables
pub const CONFIG_ERROR: i32 = 4;

/// IO error - output directory could not be written
pub const IO_ERROR: i32 = 5;

/// Dispatch error - kubectl or helm failed
pub const DISPATCH_ERROR: i32 = 6;
