//! Error types for bulk imports.

use thiserror::Error;

use crate::row::RowFailure;

/// Errors that abort a batch as a whole.
///
/// Per-row failures during processing are *not* errors — they are
/// collected into the [`crate::BatchReport`] and never thrown past the
/// batch boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// The upfront validation pass failed; nothing was committed.
    #[error("batch rejected: {} row(s) failed upfront validation", failures.len())]
    BatchRejected { failures: Vec<RowFailure> },
}
