//! Batch rows and their lifecycle.

use serde::{Deserialize, Serialize};

/// One input record in a bulk admission.
///
/// References are human-readable — the department by its code prefix, the
/// class by its code — and resolved to ids during processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRow {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Department code prefix, e.g. `CS`.
    pub department: String,
    /// Class code, e.g. `C24001`.
    pub class: String,
    pub year: u16,
    /// Pre-chosen student number; allocated when absent.
    #[serde(default)]
    pub code: Option<String>,
}

/// Lifecycle of a batch row.
///
/// Rows only move forward: `Pending → Validated → Resolved → Committed`
/// or to `Failed` from any non-terminal state. Failure is terminal for
/// the row and invisible to its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RowState {
    Pending,
    Validated,
    Resolved,
    Committed,
    Failed,
}

impl RowState {
    /// Moves to the next state.
    pub(crate) fn advance(self, next: RowState) -> RowState {
        debug_assert!(next > self, "row state never moves backward: {self:?} -> {next:?}");
        debug_assert!(
            !matches!(self, RowState::Committed | RowState::Failed),
            "terminal row states never transition"
        );
        next
    }

    /// Returns true for the two terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, RowState::Committed | RowState::Failed)
    }
}

/// A row-local failure, positional against the original input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 1-based row number in the submitted batch.
    pub row: usize,
    /// The field the failure is attributed to.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

impl RowFailure {
    pub fn new(row: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
            message: message.into(),
        }
    }
}
