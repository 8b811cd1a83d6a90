//! Batch result reporting.

use chrono::{DateTime, Utc};
use roster_types::{Code, StudentId};
use serde::{Deserialize, Serialize};

use crate::row::RowFailure;

/// A row that committed, with the identity it was assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedRow {
    /// 1-based row number in the submitted batch.
    pub row: usize,
    pub student: StudentId,
    pub code: Code,
}

/// Structured partial-success report for a processed batch.
///
/// Bulk operations always return this report — never an all-or-nothing
/// boolean. A caller renders `failed` against the original input
/// positionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub committed: Vec<CommittedRow>,
    pub failed: Vec<RowFailure>,
    pub completed_at: DateTime<Utc>,
}

impl BatchReport {
    /// Returns true if every row committed.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of rows accounted for.
    pub fn total_rows(&self) -> usize {
        self.committed.len() + self.failed.len()
    }
}
