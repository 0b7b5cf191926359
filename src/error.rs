//! Error types for the sort-data sidecar subsystem.
//!
//! This module provides a unified error type for writer and reader
//! operations, following the error kinds in the format design: `io`,
//! `malformed`, `truncated`, `mismatch`, and `unresolved`. `misuse` (calling
//! `write` before `begin`, double `commit`, etc.) is a programmer error and
//! is asserted against rather than returned as a value.

use thiserror::Error;

/// Result type alias for sort-data operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while writing or reading a sort-data file.
///
/// Reader-side errors are always non-fatal to the caller: the recovery
/// driver is expected to fall back to a full index rebuild rather than
/// propagate them. Writer-side errors are fatal to the sidecar only — the
/// snapshot itself remains usable.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying filesystem operation failed (`open`, `read`, `write`,
    /// `seek`).
    #[error("[SORTDATA-IO] {0}")]
    Io(#[from] std::io::Error),

    /// The file header is not well-formed: bad magic, bad version, an
    /// entry line that doesn't match the exact separator grammar, or a
    /// `len == 0 ⇔ psize == 0` violation.
    #[error("[SORTDATA-MALFORMED] {0}")]
    Malformed(String),

    /// A read came up short of what the header promised (PK stream or SK
    /// payload ended before `len`/`psize` bytes were consumed).
    #[error("[SORTDATA-TRUNCATED] {0}")]
    Truncated(String),

    /// The file's `Instance` UUID does not match the caller's instance.
    #[error("[SORTDATA-MISMATCH] instance UUID {found} does not match expected {expected}")]
    InstanceMismatch {
        /// UUID recorded in the file.
        found: String,
        /// UUID the caller expected.
        expected: String,
    },

    /// `resolve` was called with an old pointer never published through
    /// `add_pk_tuple`.
    #[error("[SORTDATA-UNRESOLVED] old pointer {0:#x} has no remap entry")]
    Unresolved(u64),
}

impl Error {
    /// Returns a short error code, e.g. `SORTDATA-IO`, for diagnostics.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "SORTDATA-IO",
            Self::Malformed(_) => "SORTDATA-MALFORMED",
            Self::Truncated(_) => "SORTDATA-TRUNCATED",
            Self::InstanceMismatch { .. } => "SORTDATA-MISMATCH",
            Self::Unresolved(_) => "SORTDATA-UNRESOLVED",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
