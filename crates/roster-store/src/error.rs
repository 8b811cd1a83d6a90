//! Store errors.

use roster_types::{ClassId, Code, CourseId, DepartmentId, EntityKind, StudentId};

/// Errors from store reads and transaction commits.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The code column's uniqueness constraint rejected a staged insert.
    /// Retryable: the allocator responds by trying the next sequence
    /// number.
    #[error("{kind} code '{code}' already exists")]
    CodeConstraint { kind: EntityKind, code: Code },

    /// A class row changed between the transaction's read and its commit.
    /// Retryable: rebuild the transaction from a fresh read.
    #[error("concurrent update to class {class_id}: expected version {expected}, found {actual}")]
    WriteConflict {
        class_id: ClassId,
        expected: u64,
        actual: u64,
    },

    #[error("department {0} not found")]
    DepartmentNotFound(DepartmentId),

    #[error("class {0} not found")]
    ClassNotFound(ClassId),

    #[error("course {0} not found")]
    CourseNotFound(CourseId),

    #[error("student {0} not found")]
    StudentNotFound(StudentId),

    /// The student was already tombstoned by an earlier withdrawal.
    #[error("student {0} is already withdrawn")]
    StudentWithdrawn(StudentId),

    /// A counter update was staged for a class the transaction never read.
    /// Read-check-write is mandatory so the commit has a version to
    /// validate against.
    #[error("counter update for class {0} without a prior read in this transaction")]
    CounterNotRead(ClassId),
}

impl StoreError {
    /// Returns true if retrying the whole transaction from a fresh read
    /// can succeed (commit-order races, not logic errors).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::CodeConstraint { .. } | StoreError::WriteConflict { .. }
        )
    }
}
