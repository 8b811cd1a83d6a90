//! # Roster
//!
//! Identifier allocation and capacity-constrained enrollment for school
//! registries.
//!
//! Every student, class, and course needs a unique, human-readable,
//! year/department-scoped code (`CS24007`), generated by scanning the
//! highest existing suffix and incrementing it — with no database-native
//! atomic counter — while a class's enrollment count must never exceed its
//! capacity, including across transfers and partial-failure bulk imports.
//! Roster is that subsystem, extracted as a standalone service.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                            Roster                              │
//! │  ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌───────────┐  │
//! │  │ Registrar│ → │ Allocator │ → │  Kernel   │ → │   Store   │  │
//! │  │ (writer) │   │ (retry)   │   │(pure rules)│  │ (txn/uniq)│  │
//! │  └──────────┘   └───────────┘   └───────────┘   └───────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The scan-then-increment allocation is deliberately optimistic: the
//! scan is not linearizable with the insert, two concurrent workers can
//! pick the same candidate, and only the store's uniqueness constraint
//! plus the retry loop restores correctness. There is no centralized
//! counter service — that would reintroduce a single point of contention
//! across unrelated scopes.
//!
//! # Quick Start
//!
//! ```
//! use roster::{Capacity, Command, Roster};
//! use roster_types::AdmissionYear;
//!
//! let roster = Roster::in_memory();
//! let registrar = roster.registrar();
//!
//! let cs = roster.create_department("Computer Science", "CS");
//! let class = registrar
//!     .create_class(Command::create_class(
//!         "CS Intake A",
//!         Capacity::Limited(30),
//!         AdmissionYear::new(2024),
//!     ))
//!     .unwrap();
//!
//! let registered = registrar
//!     .register_student(Command::register_student(
//!         "Ada Lovelace",
//!         "ada@example.edu",
//!         "correct horse",
//!         cs.id,
//!         class.id,
//!         AdmissionYear::new(2024),
//!     ))
//!     .unwrap();
//! assert_eq!(registered.code.as_str(), "CS24001");
//! ```
//!
//! # Modules
//!
//! - [`Roster`], [`RegistrarHandle`] — main API
//! - [`IdentifierAllocator`] — scan + format + collision retry
//! - [`SideEffectDispatcher`] — deferred post-commit side effects

mod allocator;
mod dispatch;
mod error;
mod registrar;
mod roster;

#[cfg(test)]
mod tests;

// SDK Layer - Main API
pub use error::{Result, RosterError};
pub use registrar::{Execution, Registered, RegistrarHandle, Transferred, Withdrawn};
pub use roster::{Outcome, Roster};

// Allocation
pub use allocator::IdentifierAllocator;

// Side-effect dispatch
pub use dispatch::{DispatchError, LoggingDispatcher, SideEffectDispatcher};

// Re-export core types from roster-types
pub use roster_types::{
    AccountId, AdmissionYear, AuditAction, Capacity, ClassId, ClientRequestId, Code, CourseId,
    DepartmentId, EnrollmentCounter, EntityKind, InvalidCode, Scope, SequenceNumber, StudentId,
    Timestamp,
};

// Re-export kernel types
pub use roster_kernel::{CodeTemplate, Command, Effect, LedgerError, NotificationJob};

// Re-export store types for advanced usage
pub use roster_store::{
    ClassRecord, CourseRecord, DepartmentRecord, EntityStore, StoreError, StudentRecord,
    Transaction,
};

// Re-export collaborator boundaries
pub use roster_config::RosterConfig;
pub use roster_directory::{AccountDirectory, DirectoryError, InMemoryDirectory};
