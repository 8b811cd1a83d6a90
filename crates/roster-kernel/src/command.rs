//! Registrar commands.
//!
//! A command represents caller intent as data only. Commands use domain
//! vocabulary (departments, classes, admission years) and carry an
//! optional caller-supplied code; when the code is absent the registrar
//! allocates one.

use roster_types::{AdmissionYear, Capacity, ClassId, Code, DepartmentId, StudentId};
use serde::{Deserialize, Serialize};

/// A request for one transactional unit of registrar work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Register a new student: allocate or validate a student number,
    /// create a login account, persist the record, and admit the student
    /// to a class — all or nothing.
    RegisterStudent {
        name: String,
        email: String,
        password: String,
        department: DepartmentId,
        class: ClassId,
        year: AdmissionYear,
        /// Pre-chosen student number; validated for uniqueness instead of
        /// allocated.
        supplied_code: Option<Code>,
    },

    /// Move a student to another class, releasing the old seat and taking
    /// a new one atomically.
    TransferStudent {
        student: StudentId,
        to_class: ClassId,
    },

    /// Withdraw a student: tombstone the record and release the seat.
    /// The student number stays reserved forever.
    WithdrawStudent { student: StudentId },

    /// Create a class with a capacity limit.
    CreateClass {
        name: String,
        capacity: Capacity,
        year: AdmissionYear,
        supplied_code: Option<Code>,
    },

    /// Create a course within a department.
    CreateCourse {
        title: String,
        department: DepartmentId,
        supplied_code: Option<Code>,
    },
}

impl Command {
    pub fn register_student(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        department: DepartmentId,
        class: ClassId,
        year: AdmissionYear,
    ) -> Self {
        Command::RegisterStudent {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            department,
            class,
            year,
            supplied_code: None,
        }
    }

    pub fn transfer_student(student: StudentId, to_class: ClassId) -> Self {
        Command::TransferStudent { student, to_class }
    }

    pub fn withdraw_student(student: StudentId) -> Self {
        Command::WithdrawStudent { student }
    }

    pub fn create_class(
        name: impl Into<String>,
        capacity: Capacity,
        year: AdmissionYear,
    ) -> Self {
        Command::CreateClass {
            name: name.into(),
            capacity,
            year,
            supplied_code: None,
        }
    }

    pub fn create_course(title: impl Into<String>, department: DepartmentId) -> Self {
        Command::CreateCourse {
            title: title.into(),
            department,
            supplied_code: None,
        }
    }

    /// Attaches a pre-chosen code to a creating command.
    ///
    /// The registrar validates the code for uniqueness instead of
    /// allocating one. No effect on transfer/withdraw commands.
    pub fn with_code(mut self, code: Code) -> Self {
        match &mut self {
            Command::RegisterStudent { supplied_code, .. }
            | Command::CreateClass { supplied_code, .. }
            | Command::CreateCourse { supplied_code, .. } => *supplied_code = Some(code),
            Command::TransferStudent { .. } | Command::WithdrawStudent { .. } => {}
        }
        self
    }
}
