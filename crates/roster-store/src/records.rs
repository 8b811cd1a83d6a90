//! Entity records.
//!
//! `New*` drafts are what callers stage; the store assigns the numeric id
//! at staging time and the creation timestamp at commit, so records in
//! committed state always carry monotonic `created_at` values — the
//! property sequence scanning depends on.

use roster_types::{
    AccountId, AdmissionYear, Capacity, ClassId, Code, CourseId, DepartmentId, EnrollmentCounter,
    StudentId, Timestamp,
};
use serde::{Deserialize, Serialize};

/// A department: provides the code prefix used in scoped templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentRecord {
    pub id: DepartmentId,
    pub name: String,
    /// Short prefix substituted for `{dept}` in templates, e.g. `CS`.
    pub code_prefix: String,
    pub created_at: Timestamp,
}

/// A class: a teaching group with an enrollment counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: ClassId,
    pub code: Code,
    pub name: String,
    pub year: AdmissionYear,
    pub counter: EnrollmentCounter,
    /// Bumped on every counter update; transactions validate it at commit.
    pub version: u64,
    pub created_at: Timestamp,
}

/// A course offered by a department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: CourseId,
    pub code: Code,
    pub title: String,
    pub department: DepartmentId,
    pub created_at: Timestamp,
}

/// A student record, linked to a login account and a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: StudentId,
    pub code: Code,
    pub name: String,
    pub email: String,
    pub department: DepartmentId,
    pub class: ClassId,
    pub year: AdmissionYear,
    pub account: AccountId,
    pub created_at: Timestamp,
    /// Set when the student is withdrawn. Tombstoned rows stay in the
    /// uniqueness index and in scope scans.
    pub withdrawn_at: Option<Timestamp>,
}

impl StudentRecord {
    /// Returns true if the record has been tombstoned.
    pub fn is_withdrawn(&self) -> bool {
        self.withdrawn_at.is_some()
    }
}

/// Draft of a student row, staged into a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub code: Code,
    pub name: String,
    pub email: String,
    pub department: DepartmentId,
    pub class: ClassId,
    pub year: AdmissionYear,
    pub account: AccountId,
}

/// Draft of a class row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClass {
    pub code: Code,
    pub name: String,
    pub year: AdmissionYear,
    pub capacity: Capacity,
}

/// Draft of a course row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCourse {
    pub code: Code,
    pub title: String,
    pub department: DepartmentId,
}
