//! The transactional entity writer.
//!
//! Each registrar operation composes, as one all-or-nothing unit:
//! allocate or validate a code, write the entity row, create and link the
//! login account, and apply the enrollment ledger. Deferred side effects
//! are dispatched strictly after commit.

use std::collections::BTreeMap;

use bytes::Bytes;
use roster_kernel::{CodeTemplate, Command, Effect, NotificationJob, ledger};
use roster_store::{ClassRecord, CourseRecord, NewClass, NewCourse, NewStudent, StoreError};
use roster_types::{
    AccountId, AdmissionYear, AuditAction, Capacity, ClassId, Code, DepartmentId, EntityKind,
    Scope, StudentId,
};

use crate::allocator::IdentifierAllocator;
use crate::error::{Result, RosterError};
use crate::roster::{Outcome, Roster};

/// Result of a successful student registration.
#[derive(Debug, Clone)]
pub struct Registered {
    pub student: StudentId,
    pub code: Code,
    pub account: AccountId,
    pub class: ClassId,
    pub outcome: Outcome,
}

/// Result of a successful transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transferred {
    pub student: StudentId,
    pub from_class: ClassId,
    pub to_class: ClassId,
}

/// Result of a successful withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Withdrawn {
    pub student: StudentId,
    pub class: ClassId,
}

/// Result of executing an arbitrary [`Command`].
#[derive(Debug, Clone)]
pub enum Execution {
    Registered(Registered),
    Transferred(Transferred),
    Withdrawn(Withdrawn),
    ClassCreated(ClassRecord),
    CourseCreated(CourseRecord),
}

/// Handle for transactional registrar operations.
///
/// Operations retry internally on commit-order conflicts (a lost code
/// race, a stale counter version); retries are bounded by the allocator's
/// `max_attempts`, and exhaustion surfaces as
/// [`RosterError::ExhaustedRetries`].
#[derive(Clone)]
pub struct RegistrarHandle {
    roster: Roster,
    allocator: IdentifierAllocator,
    max_attempts: u32,
    student_template: CodeTemplate,
    class_template: CodeTemplate,
    course_template: CodeTemplate,
}

impl RegistrarHandle {
    pub(crate) fn new(roster: Roster) -> Self {
        let config = roster.config.clone();
        Self {
            allocator: IdentifierAllocator::new(config.allocator.max_attempts),
            max_attempts: config.allocator.max_attempts,
            student_template: CodeTemplate::new(&config.codes.student_template),
            class_template: CodeTemplate::new(&config.codes.class_template),
            course_template: CodeTemplate::new(&config.codes.course_template),
            roster,
        }
    }

    /// Executes any registrar command.
    pub fn execute(&self, cmd: Command) -> Result<Execution> {
        match cmd {
            Command::RegisterStudent {
                name,
                email,
                password,
                department,
                class,
                year,
                supplied_code,
            } => self
                .do_register(&name, &email, &password, department, class, year, supplied_code)
                .map(Execution::Registered),
            Command::TransferStudent { student, to_class } => {
                self.do_transfer(student, to_class).map(Execution::Transferred)
            }
            Command::WithdrawStudent { student } => {
                self.do_withdraw(student).map(Execution::Withdrawn)
            }
            Command::CreateClass {
                name,
                capacity,
                year,
                supplied_code,
            } => self
                .do_create_class(&name, capacity, year, supplied_code)
                .map(Execution::ClassCreated),
            Command::CreateCourse {
                title,
                department,
                supplied_code,
            } => self
                .do_create_course(&title, department, supplied_code)
                .map(Execution::CourseCreated),
        }
    }

    /// Registers a student. Convenience wrapper around [`execute`](Self::execute).
    pub fn register_student(&self, cmd: Command) -> Result<Registered> {
        match cmd {
            Command::RegisterStudent {
                name,
                email,
                password,
                department,
                class,
                year,
                supplied_code,
            } => self.do_register(&name, &email, &password, department, class, year, supplied_code),
            other => Err(wrong_command("RegisterStudent", &other)),
        }
    }

    /// Transfers a student between classes.
    pub fn transfer_student(&self, cmd: Command) -> Result<Transferred> {
        match cmd {
            Command::TransferStudent { student, to_class } => self.do_transfer(student, to_class),
            other => Err(wrong_command("TransferStudent", &other)),
        }
    }

    /// Withdraws a student, releasing their seat.
    pub fn withdraw_student(&self, cmd: Command) -> Result<Withdrawn> {
        match cmd {
            Command::WithdrawStudent { student } => self.do_withdraw(student),
            other => Err(wrong_command("WithdrawStudent", &other)),
        }
    }

    /// Creates a class.
    pub fn create_class(&self, cmd: Command) -> Result<ClassRecord> {
        match cmd {
            Command::CreateClass {
                name,
                capacity,
                year,
                supplied_code,
            } => self.do_create_class(&name, capacity, year, supplied_code),
            other => Err(wrong_command("CreateClass", &other)),
        }
    }

    /// Creates a course.
    pub fn create_course(&self, cmd: Command) -> Result<CourseRecord> {
        match cmd {
            Command::CreateCourse {
                title,
                department,
                supplied_code,
            } => self.do_create_course(&title, department, supplied_code),
            other => Err(wrong_command("CreateCourse", &other)),
        }
    }

    // ========================================================================
    // Student Registration
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    fn do_register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        department: DepartmentId,
        class_id: ClassId,
        year: AdmissionYear,
        supplied_code: Option<Code>,
    ) -> Result<Registered> {
        if name.trim().is_empty() {
            return Err(validation("name", "must not be empty"));
        }
        if !email.contains('@') {
            return Err(validation("email", "must be an email address"));
        }

        // Fail fast on dependencies and capacity before the account call:
        // account creation is externally visible, so nothing cheap to
        // check should be allowed to fail after it. The transactional
        // attempt re-validates both.
        let dept = self
            .roster
            .store
            .department(department)
            .ok_or(RosterError::DependencyMissing {
                kind: "department",
                reference: department.to_string(),
            })?;
        let class = self
            .roster
            .store
            .class(class_id)
            .ok_or(RosterError::DependencyMissing {
                kind: "class",
                reference: class_id.to_string(),
            })?;
        ledger::admit(class.id, class.counter).map_err(|e| ledger_error(e, &class, &class))?;

        // The account is part of the unit: a failure here aborts the whole
        // registration before any entity write.
        let account = self.roster.directory.create_account(email, password, name)?;

        let scope = Scope::department_year(EntityKind::Student, dept.id, year);
        let metadata = BTreeMap::from([("dept".to_string(), dept.code_prefix.clone())]);

        self.run_allocating_unit(scope, supplied_code.is_some(), || {
            let mut tx = self.roster.store.begin();

            let class = tx.class(class_id).map_err(RosterError::from_store)?;
            let admitted =
                ledger::admit(class.id, class.counter).map_err(|e| ledger_error(e, &class, &class))?;

            let code = match supplied_code.clone() {
                Some(code) => self.allocator.validate_supplied(&tx, EntityKind::Student, code)?,
                None => self
                    .allocator
                    .allocate(&tx, scope, &self.student_template, &metadata)?,
            };

            let student = tx
                .insert_student(NewStudent {
                    code: code.clone(),
                    name: name.to_string(),
                    email: email.to_string(),
                    department: dept.id,
                    class: class.id,
                    year,
                    account,
                })
                .map_err(RosterError::from_store)?;
            tx.update_counter(class.id, admitted)
                .map_err(RosterError::from_store)?;

            tx.commit().map_err(RosterError::from_store)?;

            let outcome = self.roster.execute_effects(vec![
                Effect::EnqueueNotification(self.welcome_job(email, name, &code)),
                Effect::AuditAppend(AuditAction::StudentRegistered {
                    student_id: student,
                    code: code.clone(),
                    class_id: class.id,
                }),
            ]);

            Ok(Registered {
                student,
                code,
                account,
                class: class.id,
                outcome,
            })
        })
    }

    // ========================================================================
    // Transfer & Withdrawal
    // ========================================================================

    fn do_transfer(&self, student_id: StudentId, to_class: ClassId) -> Result<Transferred> {
        self.run_counter_unit(|| {
            let mut tx = self.roster.store.begin();

            let student = tx.student(student_id).map_err(RosterError::from_store)?;
            if student.is_withdrawn() {
                return Err(validation("student", "student is withdrawn"));
            }
            // Transferring into the current class is a no-op, not a seat
            // churn.
            if student.class == to_class {
                return Ok(Transferred {
                    student: student_id,
                    from_class: to_class,
                    to_class,
                });
            }

            let from = tx.class(student.class).map_err(RosterError::from_store)?;
            let to = tx.class(to_class).map_err(RosterError::from_store)?;

            // Destination capacity is checked before any mutation; a full
            // destination leaves both counters untouched.
            let (from_after, to_after) =
                ledger::transfer((from.id, from.counter), (to.id, to.counter))
                    .map_err(|e| ledger_error(e, &from, &to))?;

            tx.update_counter(from.id, from_after)
                .map_err(RosterError::from_store)?;
            tx.update_counter(to.id, to_after)
                .map_err(RosterError::from_store)?;
            tx.reassign_student(student_id, to.id)
                .map_err(RosterError::from_store)?;

            tx.commit().map_err(RosterError::from_store)?;

            self.roster
                .execute_effects(vec![Effect::AuditAppend(AuditAction::StudentTransferred {
                    student_id,
                    from_class: from.id,
                    to_class: to.id,
                })]);

            Ok(Transferred {
                student: student_id,
                from_class: from.id,
                to_class: to.id,
            })
        })
    }

    fn do_withdraw(&self, student_id: StudentId) -> Result<Withdrawn> {
        self.run_counter_unit(|| {
            let mut tx = self.roster.store.begin();

            let student = tx.student(student_id).map_err(RosterError::from_store)?;
            if student.is_withdrawn() {
                return Err(validation("student", "student is already withdrawn"));
            }

            let class = tx.class(student.class).map_err(RosterError::from_store)?;
            let released =
                ledger::release(class.id, class.counter).map_err(|e| ledger_error(e, &class, &class))?;

            tx.tombstone_student(student_id)
                .map_err(RosterError::from_store)?;
            tx.update_counter(class.id, released)
                .map_err(RosterError::from_store)?;

            tx.commit().map_err(RosterError::from_store)?;

            self.roster
                .execute_effects(vec![Effect::AuditAppend(AuditAction::StudentWithdrawn {
                    student_id,
                    class_id: class.id,
                })]);

            Ok(Withdrawn {
                student: student_id,
                class: class.id,
            })
        })
    }

    // ========================================================================
    // Class & Course Creation
    // ========================================================================

    fn do_create_class(
        &self,
        name: &str,
        capacity: Capacity,
        year: AdmissionYear,
        supplied_code: Option<Code>,
    ) -> Result<ClassRecord> {
        if name.trim().is_empty() {
            return Err(validation("name", "must not be empty"));
        }

        let scope = Scope::year(EntityKind::Class, year);
        let metadata = BTreeMap::new();

        let class_id = self.run_allocating_unit(scope, supplied_code.is_some(), || {
            let mut tx = self.roster.store.begin();

            let code = match supplied_code.clone() {
                Some(code) => self.allocator.validate_supplied(&tx, EntityKind::Class, code)?,
                None => self
                    .allocator
                    .allocate(&tx, scope, &self.class_template, &metadata)?,
            };

            let class_id = tx
                .insert_class(NewClass {
                    code: code.clone(),
                    name: name.to_string(),
                    year,
                    capacity,
                })
                .map_err(RosterError::from_store)?;

            tx.commit().map_err(RosterError::from_store)?;

            self.roster
                .execute_effects(vec![Effect::AuditAppend(AuditAction::ClassCreated {
                    class_id,
                    code,
                    capacity,
                })]);

            Ok(class_id)
        })?;

        self.roster
            .store
            .class(class_id)
            .ok_or_else(|| RosterError::Store(StoreError::ClassNotFound(class_id)))
    }

    fn do_create_course(
        &self,
        title: &str,
        department: DepartmentId,
        supplied_code: Option<Code>,
    ) -> Result<CourseRecord> {
        if title.trim().is_empty() {
            return Err(validation("title", "must not be empty"));
        }

        let dept = self
            .roster
            .store
            .department(department)
            .ok_or(RosterError::DependencyMissing {
                kind: "department",
                reference: department.to_string(),
            })?;

        let scope = Scope {
            kind: EntityKind::Course,
            department: Some(dept.id),
            year: None,
        };
        let metadata = BTreeMap::from([("dept".to_string(), dept.code_prefix.clone())]);

        let course_id = self.run_allocating_unit(scope, supplied_code.is_some(), || {
            let mut tx = self.roster.store.begin();

            let code = match supplied_code.clone() {
                Some(code) => self.allocator.validate_supplied(&tx, EntityKind::Course, code)?,
                None => self
                    .allocator
                    .allocate(&tx, scope, &self.course_template, &metadata)?,
            };

            let course_id = tx
                .insert_course(NewCourse {
                    code: code.clone(),
                    title: title.to_string(),
                    department: dept.id,
                })
                .map_err(RosterError::from_store)?;

            tx.commit().map_err(RosterError::from_store)?;

            self.roster
                .execute_effects(vec![Effect::AuditAppend(AuditAction::CourseCreated {
                    course_id,
                    code,
                })]);

            Ok(course_id)
        })?;

        self.roster
            .store
            .course(course_id)
            .ok_or_else(|| RosterError::Store(StoreError::CourseNotFound(course_id)))
    }

    // ========================================================================
    // Retry Loops
    // ========================================================================

    /// Runs a code-allocating unit, retrying retryable commit conflicts.
    ///
    /// A lost code race re-runs the whole unit: the fresh scan sees the
    /// winner's row, so the loser naturally takes the next number. A
    /// caller-supplied code that loses its race is the caller's error,
    /// not a retry case.
    fn run_allocating_unit<T>(
        &self,
        scope: Scope,
        supplied: bool,
        mut unit: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let mut attempts = 0u32;
        loop {
            match unit() {
                Err(RosterError::Store(err)) if err.is_retryable() => {
                    if supplied && matches!(err, StoreError::CodeConstraint { .. }) {
                        return Err(validation("code", "code is already in use"));
                    }
                    attempts += 1;
                    if attempts >= self.max_attempts {
                        return Err(RosterError::ExhaustedRetries {
                            scope,
                            attempts: self.max_attempts,
                        });
                    }
                    tracing::debug!(%scope, attempts, "retrying unit after commit conflict");
                }
                other => return other,
            }
        }
    }

    /// Runs a counter-only unit (transfer, withdrawal), retrying stale
    /// counter versions. Enrollment counters are hot rows under
    /// concurrent admission; retry-on-conflict is the accepted policy.
    fn run_counter_unit<T>(&self, mut unit: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempts = 0u32;
        loop {
            match unit() {
                Err(RosterError::Store(err @ StoreError::WriteConflict { .. })) => {
                    attempts += 1;
                    if attempts >= self.max_attempts {
                        return Err(RosterError::Store(err));
                    }
                    tracing::debug!(attempts, "retrying unit after counter conflict");
                }
                other => return other,
            }
        }
    }

    fn welcome_job(&self, email: &str, name: &str, code: &Code) -> NotificationJob {
        let payload = serde_json::json!({
            "kind": "welcome_email",
            "to": email,
            "display_name": name,
            "student_code": code.as_str(),
        });
        NotificationJob::new(
            Bytes::from(payload.to_string().into_bytes()),
            self.roster.config.dispatch.callback_url.clone(),
        )
    }
}

fn validation(field: &str, message: impl Into<String>) -> RosterError {
    RosterError::Validation {
        field: field.to_string(),
        message: message.into(),
    }
}

fn wrong_command(expected: &str, got: &Command) -> RosterError {
    validation(
        "command",
        format!("expected a {expected} command, got {}", command_kind(got)),
    )
}

/// Discriminant name for error messages. Commands carry credentials, so
/// they are never debug-printed wholesale.
fn command_kind(cmd: &Command) -> &'static str {
    match cmd {
        Command::RegisterStudent { .. } => "RegisterStudent",
        Command::TransferStudent { .. } => "TransferStudent",
        Command::WithdrawStudent { .. } => "WithdrawStudent",
        Command::CreateClass { .. } => "CreateClass",
        Command::CreateCourse { .. } => "CreateCourse",
    }
}

/// Maps a ledger error to the taxonomy, naming the class it concerns.
///
/// `from`/`to` let transfer pick the right class record by id; the other
/// operations pass the same record twice.
fn ledger_error(
    err: roster_kernel::LedgerError,
    from: &ClassRecord,
    to: &ClassRecord,
) -> RosterError {
    match err {
        roster_kernel::LedgerError::CapacityExceeded { class_id, limit } => {
            let class = if class_id == to.id { to } else { from };
            RosterError::CapacityExceeded {
                class: class.name.clone(),
                limit,
            }
        }
        roster_kernel::LedgerError::NegativeEnrollment { class_id } => {
            let class = if class_id == from.id { from } else { to };
            RosterError::NegativeEnrollment {
                class: class.name.clone(),
            }
        }
    }
}
