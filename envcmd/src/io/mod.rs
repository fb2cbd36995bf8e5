//! I/O helpers for envcmd: context resolution, child processes, console.

pub mod console;
pub mod context;
pub mod git;
pub mod process;
