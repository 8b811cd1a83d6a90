//! # roster-types: Core types for Roster
//!
//! This crate contains shared types used across the Roster system:
//! - Entity IDs ([`StudentId`], [`ClassId`], [`CourseId`], [`DepartmentId`])
//! - Allocation namespaces ([`Scope`], [`EntityKind`])
//! - Human-readable identifiers ([`Code`], [`SequenceNumber`])
//! - Enrollment accounting ([`Capacity`], [`EnrollmentCounter`])
//! - Temporal types ([`Timestamp`], [`AdmissionYear`])
//! - Client mutation tracking ([`ClientRequestId`])
//! - Audit actions ([`AuditAction`])

use std::fmt::{Debug, Display};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ============================================================================
// Entity IDs - All Copy (cheap 8-byte values)
// ============================================================================

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the raw numeric value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id! {
    /// Unique identifier for a student.
    StudentId
}

entity_id! {
    /// Unique identifier for a class (a teaching group with a capacity).
    ClassId
}

entity_id! {
    /// Unique identifier for a course.
    CourseId
}

entity_id! {
    /// Unique identifier for a department.
    DepartmentId
}

/// Identifier of a login account minted by the external identity service.
///
/// Roster never generates these itself; the directory boundary returns
/// them from `create_account` and the student record links to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(uuid::Uuid);

impl AccountId {
    pub fn new(id: uuid::Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(self) -> uuid::Uuid {
        self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for AccountId {
    fn from(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

// ============================================================================
// Entity Kind - Copy (selects the table a code must be unique within)
// ============================================================================

/// The kind of entity a code or scope refers to.
///
/// Codes are unique per entity table, never across tables: a class and a
/// course may legitimately share the string `C24001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Student,
    Class,
    Course,
}

impl EntityKind {
    /// Returns the lowercase name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Student => "student",
            EntityKind::Class => "class",
            EntityKind::Course => "course",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Admission Year - Copy (period component of a scope)
// ============================================================================

/// An admission year, the period component of an allocation scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AdmissionYear(u16);

impl AdmissionYear {
    pub fn new(year: u16) -> Self {
        Self(year)
    }

    /// Returns the full four-digit year.
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the two-digit form used in compact codes (`2024` → `24`).
    pub fn two_digit(self) -> u16 {
        self.0 % 100
    }
}

impl Display for AdmissionYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for AdmissionYear {
    fn from(year: u16) -> Self {
        Self(year)
    }
}

impl From<AdmissionYear> for u16 {
    fn from(year: AdmissionYear) -> Self {
        year.0
    }
}

// ============================================================================
// Scope - Clone (allocation namespace)
// ============================================================================

/// An allocation namespace: sequence numbers are contiguous and codes
/// unique within one scope.
///
/// A scope is `(entity kind, optional department, optional admission year)`.
/// `(Student, Some(cs), Some(2024))` scopes student numbers per department
/// and intake; `(Class, None, None)` is a single global namespace for class
/// codes. A scope is immutable once chosen for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub kind: EntityKind,
    pub department: Option<DepartmentId>,
    pub year: Option<AdmissionYear>,
}

impl Scope {
    /// A single global namespace for the given entity kind.
    pub fn global(kind: EntityKind) -> Self {
        Self {
            kind,
            department: None,
            year: None,
        }
    }

    /// A namespace scoped to one department and admission year.
    pub fn department_year(kind: EntityKind, department: DepartmentId, year: AdmissionYear) -> Self {
        Self {
            kind,
            department: Some(department),
            year: Some(year),
        }
    }

    /// A namespace scoped to one admission year across all departments.
    pub fn year(kind: EntityKind, year: AdmissionYear) -> Self {
        Self {
            kind,
            department: None,
            year: Some(year),
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(dept) = self.department {
            write!(f, "/dept:{dept}")?;
        }
        if let Some(year) = self.year {
            write!(f, "/{year}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Sequence Number - Copy (per-scope counter value)
// ============================================================================

/// A per-scope sequence number.
///
/// Sequence numbers start at 1 (`SequenceNumber::ONE`); 0 is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(u32);

impl SequenceNumber {
    /// The first sequence number issued in any scope.
    pub const ONE: SequenceNumber = SequenceNumber(1);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the next sequence number (incremented by 1).
    pub fn next(self) -> Self {
        SequenceNumber(self.0.saturating_add(1))
    }
}

impl Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SequenceNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<SequenceNumber> for u32 {
    fn from(seq: SequenceNumber) -> Self {
        seq.0
    }
}

// ============================================================================
// Code - Clone (normalized human-readable identifier)
// ============================================================================

/// A human-readable unique identifier (student number, class code,
/// course code), e.g. `CS24007`.
///
/// Construction applies the one canonical normalization for the whole
/// system: ASCII whitespace is trimmed and ASCII letters uppercased. Both
/// allocator-generated and caller-supplied codes pass through here, so the
/// two paths can never disagree on case or padding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Code(String);

impl Code {
    /// Creates a normalized code.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCode::Empty`] if the input is empty after trimming.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, InvalidCode> {
        let normalized = raw.as_ref().trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(InvalidCode::Empty);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the trailing `width` characters, if the code is long enough.
    ///
    /// Used by sequence scanning for padded templates; the caller decides
    /// what to do when the slice is not numeric.
    pub fn trailing(&self, width: usize) -> Option<&str> {
        let len = self.0.len();
        if width == 0 || len < width {
            return None;
        }
        // Codes are ASCII after normalization, so byte slicing is safe.
        self.0.get(len - width..)
    }

    /// Returns the trailing run of ASCII digits (empty if the code does
    /// not end in a digit).
    pub fn trailing_digits(&self) -> &str {
        let tail_start = self
            .0
            .rfind(|c: char| !c.is_ascii_digit())
            .map_or(0, |i| i + 1);
        &self.0[tail_start..]
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Code {
    type Error = InvalidCode;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Code::new(value)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}

/// Error returned when a code fails normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidCode {
    /// The code was empty (or whitespace-only) after trimming.
    Empty,
}

impl Display for InvalidCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "code is empty after normalization"),
        }
    }
}

impl std::error::Error for InvalidCode {}

// ============================================================================
// Capacity & Enrollment Counter - Copy (ledger accounting values)
// ============================================================================

/// A class capacity limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Capacity {
    /// No limit configured; admissions always succeed.
    #[default]
    Unbounded,
    /// At most this many enrolled students.
    Limited(u32),
}

impl Capacity {
    /// Returns true if one more admission is allowed at the given count.
    pub fn admits(self, enrolled: u32) -> bool {
        match self {
            Capacity::Unbounded => true,
            Capacity::Limited(max) => enrolled < max,
        }
    }

    /// Returns the configured limit, if any.
    pub fn limit(self) -> Option<u32> {
        match self {
            Capacity::Unbounded => None,
            Capacity::Limited(max) => Some(max),
        }
    }
}

impl Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capacity::Unbounded => write!(f, "unbounded"),
            Capacity::Limited(max) => write!(f, "{max}"),
        }
    }
}

/// The enrollment counter owned by a class.
///
/// Mutated only through the ledger operations in `roster-kernel`; every
/// committed state satisfies `enrolled <= capacity` when the capacity is
/// limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrollmentCounter {
    pub enrolled: u32,
    pub capacity: Capacity,
}

impl EnrollmentCounter {
    /// Creates an empty counter with the given capacity.
    pub fn new(capacity: Capacity) -> Self {
        Self {
            enrolled: 0,
            capacity,
        }
    }

    /// Returns true if no further admission is allowed.
    pub fn is_full(self) -> bool {
        !self.capacity.admits(self.enrolled)
    }

    /// Returns the number of open seats, if the capacity is limited.
    pub fn remaining(self) -> Option<u32> {
        self.capacity
            .limit()
            .map(|max| max.saturating_sub(self.enrolled))
    }
}

// ============================================================================
// Timestamp - Copy (8-byte value with monotonic guarantee)
// ============================================================================

/// Wall-clock timestamp with a monotonic guarantee within the system.
///
/// Sequence scanning orders rows by creation time, so creation timestamps
/// must be strictly increasing even when the system clock is adjusted or
/// two rows are created in the same nanosecond. Stored as nanoseconds
/// since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch (1970-01-01 00:00:00 UTC).
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a timestamp from nanoseconds since the Unix epoch.
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Returns the timestamp as nanoseconds since the Unix epoch.
    pub fn as_nanos(self) -> u64 {
        self.0
    }

    /// Creates a timestamp for the current time.
    ///
    /// # Panics
    ///
    /// Panics if the system clock is before the Unix epoch (should never
    /// happen).
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before Unix epoch");
        Self(duration.as_nanos() as u64)
    }

    /// Creates a timestamp ensuring monotonicity: `max(now, last + 1ns)`.
    pub fn now_monotonic(last: Option<Timestamp>) -> Self {
        let now = Self::now();
        match last {
            Some(prev) if now.0 <= prev.0 => Timestamp(prev.0.saturating_add(1)),
            _ => now,
        }
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0 / 1_000_000_000;
        let nanos = self.0 % 1_000_000_000;
        write!(f, "{secs}.{nanos:09}")
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::EPOCH
    }
}

// ============================================================================
// Client Request Id - Copy (16-byte identifier for optimistic mutations)
// ============================================================================

/// Length of client request IDs in bytes.
pub const CLIENT_REQUEST_ID_LENGTH: usize = 16;

/// Identifier a client mints for one optimistic mutation.
///
/// The reconciler keys tentative entries by this ID so the later
/// confirmation or rejection can find exactly the entry it settles.
///
/// # FCIS Pattern
///
/// - `from_bytes()`: pure restoration from storage or the wire
/// - `from_random_bytes()`: pure construction from bytes (`pub(crate)`)
/// - `generate()`: impure shell that invokes the OS CSPRNG
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientRequestId([u8; CLIENT_REQUEST_ID_LENGTH]);

impl ClientRequestId {
    /// Pure construction from random bytes.
    ///
    /// Restricted to `pub(crate)` to prevent misuse with weak random
    /// sources. External callers should use `generate()` or
    /// `from_bytes()`.
    pub(crate) fn from_random_bytes(bytes: [u8; CLIENT_REQUEST_ID_LENGTH]) -> Self {
        debug_assert!(
            bytes.iter().any(|&b| b != 0),
            "client request ID bytes are all zeros"
        );
        Self(bytes)
    }

    /// Restoration from stored bytes (pure).
    pub fn from_bytes(bytes: [u8; CLIENT_REQUEST_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the ID as a byte slice.
    pub fn as_bytes(&self) -> &[u8; CLIENT_REQUEST_ID_LENGTH] {
        &self.0
    }

    /// Generates a new random request ID using the OS CSPRNG.
    ///
    /// # Panics
    ///
    /// Panics if the OS CSPRNG fails, which indicates a catastrophic
    /// system error.
    pub fn generate() -> Self {
        let mut bytes = [0u8; CLIENT_REQUEST_ID_LENGTH];
        getrandom::fill(&mut bytes).expect("CSPRNG failure is catastrophic");
        Self::from_random_bytes(bytes)
    }
}

impl Debug for ClientRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClientRequestId(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

impl Display for ClientRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Audit Actions - Clone (for flexibility in logging)
// ============================================================================

/// Actions recorded in the audit log after a unit commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    /// A student was registered and admitted to a class.
    StudentRegistered {
        student_id: StudentId,
        code: Code,
        class_id: ClassId,
    },
    /// A student moved between classes.
    StudentTransferred {
        student_id: StudentId,
        from_class: ClassId,
        to_class: ClassId,
    },
    /// A student was withdrawn and their seat released.
    StudentWithdrawn {
        student_id: StudentId,
        class_id: ClassId,
    },
    /// A class was created.
    ClassCreated {
        class_id: ClassId,
        code: Code,
        capacity: Capacity,
    },
    /// A course was created.
    CourseCreated { course_id: CourseId, code: Code },
}
