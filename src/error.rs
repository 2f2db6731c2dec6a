//! Compiler-level error types.
//!
//! Per-filter problems (unsupported options, empty patterns, empty
//! resource-type mappings) are never errors — they are silent drops,
//! logged at `debug` level and otherwise invisible to the caller. The
//! types here cover only I/O failures at the CLI boundary and internal
//! invariant violations, which are bugs rather than bad input.

use thiserror::Error;

/// Errors that can escape the compiler or its CLI wrapper.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// Reading filter text or writing the rule set failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the rule list to JSON failed.
    #[error("failed to serialize rule set: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A rule failed one of its own postconditions before being handed
    /// to the caller. This is always a compiler bug, never bad input.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
