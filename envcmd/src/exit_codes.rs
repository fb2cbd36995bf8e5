//! Stable exit codes for the envcmd CLI.

/// Scan completed, regardless of individual rule or command failures.
pub const OK: i32 = 0;
/// Startup failed: context could not be resolved in strict mode, or invalid options.
pub const FATAL: i32 = 1;
