//! Error types for the Roster SDK.
//!
//! One taxonomy for every caller-visible failure, returned as a tagged
//! result type. Uniqueness conflicts never surface directly: the
//! allocator retries them, and only exhaustion is reported.

use roster_directory::DirectoryError;
use roster_store::StoreError;
use roster_types::{InvalidCode, Scope};

/// Result type for Roster operations.
pub type Result<T> = std::result::Result<T, RosterError>;

/// Errors surfaced by registrar operations.
#[derive(thiserror::Error, Debug)]
pub enum RosterError {
    /// A field failed validation. Row-local in bulk operations; fatal for
    /// a single-entity operation.
    #[error("validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// The class is full. Aborts the enclosing transaction; named after
    /// the class and its limit so the caller can render it directly.
    #[error("class '{class}' is full ({limit} seats)")]
    CapacityExceeded { class: String, limit: u32 },

    /// A release would have driven an enrollment count below zero — a
    /// lost decrement elsewhere, surfaced instead of clamped.
    #[error("enrollment for class '{class}' would drop below zero")]
    NegativeEnrollment { class: String },

    /// No unique code could be reserved within the attempt bound.
    /// Indicates systemic contention or a scope with a pathological
    /// template.
    #[error("no unique code available in scope '{scope}' after {attempts} attempts")]
    ExhaustedRetries { scope: Scope, attempts: u32 },

    /// A referenced department, class, course, or student does not exist.
    #[error("{kind} '{reference}' does not exist")]
    DependencyMissing {
        kind: &'static str,
        reference: String,
    },

    /// The account directory rejected or failed the account creation;
    /// the whole unit is aborted.
    #[error("account directory: {0}")]
    Directory(#[from] DirectoryError),

    /// A store failure that is not expressible as one of the variants
    /// above (retryable conflicts are consumed by the retry loop first).
    #[error("store: {0}")]
    Store(StoreError),

    /// A code failed normalization.
    #[error("invalid code: {0}")]
    InvalidCode(#[from] InvalidCode),
}

impl RosterError {
    /// Maps a store error, translating missing-dependency cases into the
    /// taxonomy's [`RosterError::DependencyMissing`].
    pub(crate) fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::DepartmentNotFound(id) => RosterError::DependencyMissing {
                kind: "department",
                reference: id.to_string(),
            },
            StoreError::ClassNotFound(id) => RosterError::DependencyMissing {
                kind: "class",
                reference: id.to_string(),
            },
            StoreError::CourseNotFound(id) => RosterError::DependencyMissing {
                kind: "course",
                reference: id.to_string(),
            },
            StoreError::StudentNotFound(id) => RosterError::DependencyMissing {
                kind: "student",
                reference: id.to_string(),
            },
            StoreError::StudentWithdrawn(id) => RosterError::Validation {
                field: "student".to_string(),
                message: format!("student {id} is withdrawn"),
            },
            other => RosterError::Store(other),
        }
    }
}
