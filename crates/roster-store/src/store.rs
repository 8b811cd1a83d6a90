//! The shared entity store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use roster_types::{
    ClassId, Code, CourseId, DepartmentId, EntityKind, Scope, StudentId, Timestamp,
};

use crate::records::{ClassRecord, CourseRecord, DepartmentRecord, StudentRecord};
use crate::transaction::Transaction;

/// Handle to the shared entity store.
///
/// Cloning is cheap; all clones see the same committed state. Each
/// allocation/write request runs on its own worker with its own
/// [`Transaction`] — there is no shared in-process queue serializing
/// writers, and correctness comes from commit-time validation alone.
#[derive(Clone, Default)]
pub struct EntityStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
pub(crate) struct Inner {
    pub(crate) departments: BTreeMap<DepartmentId, DepartmentRecord>,
    pub(crate) classes: BTreeMap<ClassId, ClassRecord>,
    pub(crate) courses: BTreeMap<CourseId, CourseRecord>,
    pub(crate) students: BTreeMap<StudentId, StudentRecord>,

    /// Every code ever committed, per entity table — including codes of
    /// tombstoned rows. This index is the uniqueness constraint.
    pub(crate) codes: BTreeMap<EntityKind, BTreeSet<Code>>,

    next_department: u64,
    next_class: u64,
    next_course: u64,
    next_student: u64,

    /// Last creation timestamp handed out; keeps `created_at` strictly
    /// increasing even within one commit.
    pub(crate) last_created: Option<Timestamp>,
}

impl Inner {
    pub(crate) fn code_exists(&self, kind: EntityKind, code: &Code) -> bool {
        self.codes.get(&kind).is_some_and(|set| set.contains(code))
    }

    pub(crate) fn register_code(&mut self, kind: EntityKind, code: Code) {
        self.codes.entry(kind).or_default().insert(code);
    }

    pub(crate) fn next_created_at(&mut self) -> Timestamp {
        let ts = Timestamp::now_monotonic(self.last_created);
        self.last_created = Some(ts);
        ts
    }

    pub(crate) fn latest_in_scope(&self, scope: &Scope) -> Option<Code> {
        match scope.kind {
            EntityKind::Student => self
                .students
                .values()
                .filter(|s| scope.department.is_none_or(|d| s.department == d))
                .filter(|s| scope.year.is_none_or(|y| s.year == y))
                .max_by_key(|s| s.created_at)
                .map(|s| s.code.clone()),
            EntityKind::Class => self
                .classes
                .values()
                .filter(|c| scope.year.is_none_or(|y| c.year == y))
                .max_by_key(|c| c.created_at)
                .map(|c| c.code.clone()),
            EntityKind::Course => self
                .courses
                .values()
                .filter(|c| scope.department.is_none_or(|d| c.department == d))
                .max_by_key(|c| c.created_at)
                .map(|c| c.code.clone()),
        }
    }
}

impl EntityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a new optimistic transaction.
    pub fn begin(&self) -> Transaction {
        Transaction::new(self.clone())
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("store lock poisoned")
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("store lock poisoned")
    }

    // ========================================================================
    // Department management (setup data, written outside transactions)
    // ========================================================================

    /// Creates a department directly.
    ///
    /// Departments are reference data: they carry no allocated code, only
    /// the prefix other codes are built from.
    pub fn insert_department(
        &self,
        name: impl Into<String>,
        code_prefix: impl Into<String>,
    ) -> DepartmentRecord {
        let mut inner = self.write();
        inner.next_department += 1;
        let record = DepartmentRecord {
            id: DepartmentId::new(inner.next_department),
            name: name.into(),
            code_prefix: code_prefix.into(),
            created_at: inner.next_created_at(),
        };
        inner.departments.insert(record.id, record.clone());
        record
    }

    // ========================================================================
    // Reads (short-lived lock, cloned results)
    // ========================================================================

    pub fn department(&self, id: DepartmentId) -> Option<DepartmentRecord> {
        self.read().departments.get(&id).cloned()
    }

    pub fn department_by_prefix(&self, prefix: &str) -> Option<DepartmentRecord> {
        self.read()
            .departments
            .values()
            .find(|d| d.code_prefix.eq_ignore_ascii_case(prefix))
            .cloned()
    }

    pub fn class(&self, id: ClassId) -> Option<ClassRecord> {
        self.read().classes.get(&id).cloned()
    }

    pub fn class_by_code(&self, code: &Code) -> Option<ClassRecord> {
        self.read()
            .classes
            .values()
            .find(|c| &c.code == code)
            .cloned()
    }

    pub fn course(&self, id: CourseId) -> Option<CourseRecord> {
        self.read().courses.get(&id).cloned()
    }

    pub fn course_by_code(&self, code: &Code) -> Option<CourseRecord> {
        self.read()
            .courses
            .values()
            .find(|c| &c.code == code)
            .cloned()
    }

    pub fn student(&self, id: StudentId) -> Option<StudentRecord> {
        self.read().students.get(&id).cloned()
    }

    pub fn student_by_code(&self, code: &Code) -> Option<StudentRecord> {
        self.read()
            .students
            .values()
            .find(|s| &s.code == code)
            .cloned()
    }

    /// Returns the live (non-withdrawn) students of a class.
    pub fn students_in_class(&self, class: ClassId) -> Vec<StudentRecord> {
        self.read()
            .students
            .values()
            .filter(|s| s.class == class && !s.is_withdrawn())
            .cloned()
            .collect()
    }

    /// Returns true if the code is taken in the given entity table,
    /// including by tombstoned rows.
    pub fn code_exists(&self, kind: EntityKind, code: &Code) -> bool {
        self.read().code_exists(kind, code)
    }

    /// Returns the code of the most recently created row in `scope`,
    /// ordered by creation time (not by the code itself — creation time
    /// is monotonic and trustworthy, code parsing is not).
    ///
    /// Tombstoned rows participate: their codes were issued and the
    /// sequence must keep climbing past them.
    pub fn latest_in_scope(&self, scope: &Scope) -> Option<Code> {
        self.read().latest_in_scope(scope)
    }

    // ========================================================================
    // Id reservation (staging support)
    // ========================================================================

    pub(crate) fn reserve_student_id(&self) -> StudentId {
        let mut inner = self.write();
        inner.next_student += 1;
        StudentId::new(inner.next_student)
    }

    pub(crate) fn reserve_class_id(&self) -> ClassId {
        let mut inner = self.write();
        inner.next_class += 1;
        ClassId::new(inner.next_class)
    }

    pub(crate) fn reserve_course_id(&self) -> CourseId {
        let mut inner = self.write();
        inner.next_course += 1;
        CourseId::new(inner.next_course)
    }
}
