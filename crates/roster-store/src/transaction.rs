//! Optimistic unit-of-work.

use std::collections::{BTreeMap, BTreeSet};

use roster_types::{
    ClassId, Code, CourseId, DepartmentId, EnrollmentCounter, EntityKind, Scope, StudentId,
};

use crate::error::StoreError;
use crate::records::{
    ClassRecord, CourseRecord, DepartmentRecord, NewClass, NewCourse, NewStudent, StudentRecord,
};
use crate::store::EntityStore;

/// One all-or-nothing unit of work against the store.
///
/// Writes are staged locally and validated at commit:
///
/// - staged codes against the committed uniqueness index — staging also
///   pre-checks, so most duplicates are caught immediately, but two
///   concurrent transactions can both pass the pre-check with the same
///   candidate; the commit-time check is the authority and the loser gets
///   [`StoreError::CodeConstraint`];
/// - counter updates against the class version captured by the
///   read-check-write sequence ([`Transaction::class`] then
///   [`Transaction::update_counter`]).
///
/// Dropping the transaction abandons it with no persisted effect. There
/// is no mid-flight cancellation once `commit` has begun.
pub struct Transaction {
    store: EntityStore,
    staged: Vec<StagedWrite>,
    staged_codes: BTreeMap<EntityKind, BTreeSet<Code>>,
    counter_reads: BTreeMap<ClassId, u64>,
}

#[derive(Debug)]
enum StagedWrite {
    InsertStudent { id: StudentId, draft: NewStudent },
    InsertClass { id: ClassId, draft: NewClass },
    InsertCourse { id: CourseId, draft: NewCourse },
    UpdateCounter {
        class_id: ClassId,
        counter: EnrollmentCounter,
    },
    ReassignStudent { id: StudentId, class: ClassId },
    TombstoneStudent { id: StudentId },
}

impl Transaction {
    pub(crate) fn new(store: EntityStore) -> Self {
        Self {
            store,
            staged: Vec::new(),
            staged_codes: BTreeMap::new(),
            counter_reads: BTreeMap::new(),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Reads a class row and captures its version for a later
    /// [`update_counter`](Self::update_counter).
    pub fn class(&mut self, id: ClassId) -> Result<ClassRecord, StoreError> {
        let record = self
            .store
            .class(id)
            .ok_or(StoreError::ClassNotFound(id))?;
        self.counter_reads.entry(id).or_insert(record.version);
        Ok(record)
    }

    pub fn student(&self, id: StudentId) -> Result<StudentRecord, StoreError> {
        self.store
            .student(id)
            .ok_or(StoreError::StudentNotFound(id))
    }

    pub fn department(&self, id: DepartmentId) -> Result<DepartmentRecord, StoreError> {
        self.store
            .department(id)
            .ok_or(StoreError::DepartmentNotFound(id))
    }

    /// Returns true if the code is taken — committed or staged in this
    /// transaction. This is the allocator's pre-check.
    pub fn code_exists(&self, kind: EntityKind, code: &Code) -> bool {
        self.staged_codes
            .get(&kind)
            .is_some_and(|set| set.contains(code))
            || self.store.code_exists(kind, code)
    }

    /// Latest committed code in scope, by creation time. Staged rows are
    /// not visible here (they have no creation timestamp yet); candidate
    /// collisions with staged rows are caught by
    /// [`code_exists`](Self::code_exists).
    pub fn latest_in_scope(&self, scope: &Scope) -> Option<Code> {
        self.store.latest_in_scope(scope)
    }

    // ========================================================================
    // Staged writes
    // ========================================================================

    /// Stages a student insert, reserving its numeric id.
    ///
    /// # Errors
    ///
    /// [`StoreError::CodeConstraint`] if the code is already taken at
    /// staging time (committed or staged here). The commit-time check can
    /// still fail for a code that a concurrent transaction commits first.
    pub fn insert_student(&mut self, draft: NewStudent) -> Result<StudentId, StoreError> {
        self.reserve_code(EntityKind::Student, &draft.code)?;
        let id = self.store.reserve_student_id();
        self.staged.push(StagedWrite::InsertStudent { id, draft });
        Ok(id)
    }

    /// Stages a class insert, reserving its numeric id.
    pub fn insert_class(&mut self, draft: NewClass) -> Result<ClassId, StoreError> {
        self.reserve_code(EntityKind::Class, &draft.code)?;
        let id = self.store.reserve_class_id();
        self.staged.push(StagedWrite::InsertClass { id, draft });
        Ok(id)
    }

    /// Stages a course insert, reserving its numeric id.
    pub fn insert_course(&mut self, draft: NewCourse) -> Result<CourseId, StoreError> {
        self.reserve_code(EntityKind::Course, &draft.code)?;
        let id = self.store.reserve_course_id();
        self.staged.push(StagedWrite::InsertCourse { id, draft });
        Ok(id)
    }

    /// Stages a counter update for a class read earlier in this
    /// transaction. A later update for the same class replaces the
    /// earlier one.
    pub fn update_counter(
        &mut self,
        class_id: ClassId,
        counter: EnrollmentCounter,
    ) -> Result<(), StoreError> {
        if !self.counter_reads.contains_key(&class_id) {
            return Err(StoreError::CounterNotRead(class_id));
        }

        for write in &mut self.staged {
            if let StagedWrite::UpdateCounter {
                class_id: staged_id,
                counter: staged_counter,
            } = write
            {
                if *staged_id == class_id {
                    *staged_counter = counter;
                    return Ok(());
                }
            }
        }

        self.staged
            .push(StagedWrite::UpdateCounter { class_id, counter });
        Ok(())
    }

    /// Stages moving a student to another class. Counter changes are the
    /// caller's responsibility (read-check-write on both classes).
    pub fn reassign_student(&mut self, id: StudentId, class: ClassId) -> Result<(), StoreError> {
        let record = self.student(id)?;
        if record.is_withdrawn() {
            return Err(StoreError::StudentWithdrawn(id));
        }
        self.staged.push(StagedWrite::ReassignStudent { id, class });
        Ok(())
    }

    /// Stages a student tombstone. The student's code stays reserved.
    pub fn tombstone_student(&mut self, id: StudentId) -> Result<(), StoreError> {
        let record = self.student(id)?;
        if record.is_withdrawn() {
            return Err(StoreError::StudentWithdrawn(id));
        }
        self.staged.push(StagedWrite::TombstoneStudent { id });
        Ok(())
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Validates and applies every staged write under one exclusive
    /// section. On any error nothing is applied.
    pub fn commit(self) -> Result<(), StoreError> {
        let store = self.store.clone();
        let mut inner = store.write();

        // Validate everything before touching anything.
        for write in &self.staged {
            match write {
                StagedWrite::InsertStudent { draft, .. } => {
                    if inner.code_exists(EntityKind::Student, &draft.code) {
                        return Err(StoreError::CodeConstraint {
                            kind: EntityKind::Student,
                            code: draft.code.clone(),
                        });
                    }
                    if !inner.departments.contains_key(&draft.department) {
                        return Err(StoreError::DepartmentNotFound(draft.department));
                    }
                    if !inner.classes.contains_key(&draft.class) {
                        return Err(StoreError::ClassNotFound(draft.class));
                    }
                }
                StagedWrite::InsertClass { draft, .. } => {
                    if inner.code_exists(EntityKind::Class, &draft.code) {
                        return Err(StoreError::CodeConstraint {
                            kind: EntityKind::Class,
                            code: draft.code.clone(),
                        });
                    }
                }
                StagedWrite::InsertCourse { draft, .. } => {
                    if inner.code_exists(EntityKind::Course, &draft.code) {
                        return Err(StoreError::CodeConstraint {
                            kind: EntityKind::Course,
                            code: draft.code.clone(),
                        });
                    }
                    if !inner.departments.contains_key(&draft.department) {
                        return Err(StoreError::DepartmentNotFound(draft.department));
                    }
                }
                StagedWrite::UpdateCounter { class_id, counter } => {
                    let class = inner
                        .classes
                        .get(class_id)
                        .ok_or(StoreError::ClassNotFound(*class_id))?;
                    let expected = *self
                        .counter_reads
                        .get(class_id)
                        .ok_or(StoreError::CounterNotRead(*class_id))?;
                    if class.version != expected {
                        return Err(StoreError::WriteConflict {
                            class_id: *class_id,
                            expected,
                            actual: class.version,
                        });
                    }
                    debug_assert!(
                        counter
                            .capacity
                            .limit()
                            .is_none_or(|max| counter.enrolled <= max),
                        "staged counter violates the capacity invariant"
                    );
                }
                StagedWrite::ReassignStudent { id, class } => {
                    let student = inner
                        .students
                        .get(id)
                        .ok_or(StoreError::StudentNotFound(*id))?;
                    if student.is_withdrawn() {
                        return Err(StoreError::StudentWithdrawn(*id));
                    }
                    if !inner.classes.contains_key(class) {
                        return Err(StoreError::ClassNotFound(*class));
                    }
                }
                StagedWrite::TombstoneStudent { id } => {
                    let student = inner
                        .students
                        .get(id)
                        .ok_or(StoreError::StudentNotFound(*id))?;
                    if student.is_withdrawn() {
                        return Err(StoreError::StudentWithdrawn(*id));
                    }
                }
            }
        }

        // Apply. No fallible step below this line.
        for write in self.staged {
            match write {
                StagedWrite::InsertStudent { id, draft } => {
                    let created_at = inner.next_created_at();
                    inner.register_code(EntityKind::Student, draft.code.clone());
                    inner.students.insert(
                        id,
                        StudentRecord {
                            id,
                            code: draft.code,
                            name: draft.name,
                            email: draft.email,
                            department: draft.department,
                            class: draft.class,
                            year: draft.year,
                            account: draft.account,
                            created_at,
                            withdrawn_at: None,
                        },
                    );
                }
                StagedWrite::InsertClass { id, draft } => {
                    let created_at = inner.next_created_at();
                    inner.register_code(EntityKind::Class, draft.code.clone());
                    inner.classes.insert(
                        id,
                        ClassRecord {
                            id,
                            code: draft.code,
                            name: draft.name,
                            year: draft.year,
                            counter: EnrollmentCounter::new(draft.capacity),
                            version: 0,
                            created_at,
                        },
                    );
                }
                StagedWrite::InsertCourse { id, draft } => {
                    let created_at = inner.next_created_at();
                    inner.register_code(EntityKind::Course, draft.code.clone());
                    inner.courses.insert(
                        id,
                        CourseRecord {
                            id,
                            code: draft.code,
                            title: draft.title,
                            department: draft.department,
                            created_at,
                        },
                    );
                }
                StagedWrite::UpdateCounter { class_id, counter } => {
                    let class = inner
                        .classes
                        .get_mut(&class_id)
                        .expect("validated above: class exists");
                    class.counter = counter;
                    class.version += 1;
                }
                StagedWrite::ReassignStudent { id, class } => {
                    let student = inner
                        .students
                        .get_mut(&id)
                        .expect("validated above: student exists");
                    student.class = class;
                }
                StagedWrite::TombstoneStudent { id } => {
                    let withdrawn_at = inner.next_created_at();
                    let student = inner
                        .students
                        .get_mut(&id)
                        .expect("validated above: student exists");
                    student.withdrawn_at = Some(withdrawn_at);
                }
            }
        }

        Ok(())
    }

    fn reserve_code(&mut self, kind: EntityKind, code: &Code) -> Result<(), StoreError> {
        if self.code_exists(kind, code) {
            return Err(StoreError::CodeConstraint {
                kind,
                code: code.clone(),
            });
        }
        self.staged_codes
            .entry(kind)
            .or_default()
            .insert(code.clone());
        Ok(())
    }
}
