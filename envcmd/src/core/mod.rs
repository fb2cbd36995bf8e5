//! Deterministic, pure logic: rule decoding and trigger matching.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod matcher;
pub mod rule;
