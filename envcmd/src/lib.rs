//! Context-triggered command runner.
//!
//! Environment variables named `EVC_[ASYNC_]<DIR|BRA>_<TARGET>` describe rules:
//! when the current directory's base name (`DIR`) or git branch (`BRA`)
//! equals `TARGET` ignoring case, the comma-separated commands in the value
//! are run through `sh`, one after another or all at once (`ASYNC_`).
//!
//! - **[`core`]**: Pure decoding and matching. No I/O.
//! - **[`io`]**: Side effects: git, directory resolution, child processes and
//!   the console.
//!
//! [`scan`] and [`schedule`] coordinate the two to implement the CLI.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod scan;
pub mod schedule;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
