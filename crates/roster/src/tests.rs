//! Unit tests for the Roster SDK.
//!
//! These exercise whole registrar units against the in-memory store and
//! collaborators: allocation, capacity, transfer, withdrawal, and the
//! deferred-dispatch outcome paths.

use std::sync::Arc;
use std::thread;

use proptest::prelude::*;

use crate::dispatch::{DispatchError, SideEffectDispatcher};
use crate::{
    AdmissionYear, Capacity, ClassRecord, Code, Command, DepartmentRecord, EntityKind,
    NotificationJob, Outcome, Roster, RosterError, StoreError,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn year() -> AdmissionYear {
    AdmissionYear::new(2024)
}

fn setup() -> (Roster, DepartmentRecord, ClassRecord) {
    let roster = Roster::in_memory();
    let dept = roster.create_department("Computer Science", "CS");
    let class = roster
        .registrar()
        .create_class(Command::create_class(
            "CS Intake A",
            Capacity::Limited(30),
            year(),
        ))
        .expect("create class");
    (roster, dept, class)
}

fn register_cmd(roster_suffix: &str, dept: &DepartmentRecord, class: &ClassRecord) -> Command {
    Command::register_student(
        format!("Student {roster_suffix}"),
        format!("student{roster_suffix}@example.edu"),
        "correct horse",
        dept.id,
        class.id,
        year(),
    )
}

/// Dispatcher that always fails, for degraded-outcome tests.
#[derive(Debug)]
struct FailingDispatcher;

impl SideEffectDispatcher for FailingDispatcher {
    fn dispatch(&self, _job: NotificationJob) -> Result<(), DispatchError> {
        Err(DispatchError("queue unreachable".to_string()))
    }
}

// ============================================================================
// Registration & Allocation
// ============================================================================

#[test]
fn first_registration_gets_sequence_one() {
    let (roster, dept, class) = setup();

    let registered = roster
        .registrar()
        .register_student(register_cmd("a", &dept, &class))
        .expect("register");

    assert_eq!(registered.code.as_str(), "CS24001");
    assert!(registered.outcome.is_clean());
    assert_eq!(roster.store().class(class.id).unwrap().counter.enrolled, 1);

    let record = roster.store().student(registered.student).unwrap();
    assert_eq!(record.account, registered.account);
    assert_eq!(record.class, class.id);
}

#[test]
fn sequential_registrations_count_upward() {
    let (roster, dept, class) = setup();
    let registrar = roster.registrar();

    for expected in 1..=5u32 {
        let registered = registrar
            .register_student(register_cmd(&expected.to_string(), &dept, &class))
            .expect("register");
        assert_eq!(registered.code.as_str(), format!("CS24{expected:03}"));
    }
}

#[test]
fn allocation_continues_from_highest_existing_suffix() {
    let (roster, dept, class) = setup();
    let registrar = roster.registrar();

    // Seed the scope with a pre-chosen number, as a legacy import would.
    registrar
        .register_student(
            register_cmd("legacy", &dept, &class).with_code(Code::new("CS24007").unwrap()),
        )
        .expect("seed");

    let next = registrar
        .register_student(register_cmd("next", &dept, &class))
        .expect("register");
    assert_eq!(next.code.as_str(), "CS24008");
}

#[test]
fn malformed_existing_code_restarts_at_one() {
    let (roster, dept, class) = setup();
    let registrar = roster.registrar();

    registrar
        .register_student(
            register_cmd("legacy", &dept, &class).with_code(Code::new("LEGACY-XYZ").unwrap()),
        )
        .expect("seed");

    let next = registrar
        .register_student(register_cmd("next", &dept, &class))
        .expect("register");
    assert_eq!(next.code.as_str(), "CS24001");
}

#[test]
fn scopes_allocate_independently() {
    let (roster, cs, class) = setup();
    let math = roster.create_department("Mathematics", "MA");
    let registrar = roster.registrar();

    let a = registrar
        .register_student(register_cmd("a", &cs, &class))
        .unwrap();
    let b = registrar
        .register_student(register_cmd("b", &math, &class))
        .unwrap();

    assert_eq!(a.code.as_str(), "CS24001");
    assert_eq!(b.code.as_str(), "MA24001");
}

#[test]
fn supplied_code_is_normalized_and_validated() {
    let (roster, dept, class) = setup();
    let registrar = roster.registrar();

    let first = registrar
        .register_student(
            register_cmd("a", &dept, &class).with_code(Code::new("  cs24010 ").unwrap()),
        )
        .expect("register");
    assert_eq!(first.code.as_str(), "CS24010");

    // Same code again, differently cased: rejected as a validation error.
    let err = registrar
        .register_student(
            register_cmd("b", &dept, &class).with_code(Code::new("CS24010").unwrap()),
        )
        .unwrap_err();
    assert!(matches!(err, RosterError::Validation { ref field, .. } if field == "code"));
}

#[test]
fn missing_dependencies_are_named() {
    let (roster, dept, class) = setup();
    let registrar = roster.registrar();

    let err = registrar
        .register_student(Command::register_student(
            "X",
            "x@example.edu",
            "pw",
            crate::DepartmentId::new(999),
            class.id,
            year(),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        RosterError::DependencyMissing { kind: "department", .. }
    ));

    let err = registrar
        .register_student(Command::register_student(
            "X",
            "x@example.edu",
            "pw",
            dept.id,
            crate::ClassId::new(999),
            year(),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        RosterError::DependencyMissing { kind: "class", .. }
    ));
}

#[test]
fn duplicate_email_aborts_the_whole_unit() {
    let (roster, dept, class) = setup();
    let registrar = roster.registrar();

    registrar
        .register_student(register_cmd("a", &dept, &class))
        .expect("first");

    let err = registrar
        .register_student(Command::register_student(
            "Other Name",
            "studenta@example.edu", // same email as "a"
            "pw",
            dept.id,
            class.id,
            year(),
        ))
        .unwrap_err();
    assert!(matches!(err, RosterError::Directory(_)));

    // No partial entity, no orphaned enrollment increment.
    assert_eq!(roster.store().class(class.id).unwrap().counter.enrolled, 1);
    assert_eq!(roster.store().students_in_class(class.id).len(), 1);
}

// ============================================================================
// Capacity Invariant
// ============================================================================

#[test]
fn admission_to_a_full_class_fails_and_count_is_unchanged() {
    let roster = Roster::in_memory();
    let dept = roster.create_department("Computer Science", "CS");
    let registrar = roster.registrar();
    let tiny = registrar
        .create_class(Command::create_class("Tiny", Capacity::Limited(1), year()))
        .unwrap();

    registrar
        .register_student(register_cmd("a", &dept, &tiny))
        .expect("first seat");

    let err = registrar
        .register_student(register_cmd("b", &dept, &tiny))
        .unwrap_err();
    assert!(matches!(
        err,
        RosterError::CapacityExceeded { ref class, limit: 1 } if class == "Tiny"
    ));

    // Count unchanged, no student row, and the candidate code was not
    // burned into the uniqueness index.
    assert_eq!(roster.store().class(tiny.id).unwrap().counter.enrolled, 1);
    assert_eq!(roster.store().students_in_class(tiny.id).len(), 1);
    assert!(!roster
        .store()
        .code_exists(EntityKind::Student, &Code::new("CS24002").unwrap()));
}

#[test]
fn zero_capacity_class_rejects_every_admission() {
    let roster = Roster::in_memory();
    let dept = roster.create_department("Computer Science", "CS");
    let registrar = roster.registrar();
    let closed = registrar
        .create_class(Command::create_class("Closed", Capacity::Limited(0), year()))
        .unwrap();

    let err = registrar
        .register_student(register_cmd("a", &dept, &closed))
        .unwrap_err();
    assert!(matches!(err, RosterError::CapacityExceeded { limit: 0, .. }));
}

// ============================================================================
// Transfer
// ============================================================================

#[test]
fn transfer_moves_student_and_both_counters() {
    let (roster, dept, from) = setup();
    let registrar = roster.registrar();
    let to = registrar
        .create_class(Command::create_class("CS Intake B", Capacity::Limited(30), year()))
        .unwrap();

    let registered = registrar
        .register_student(register_cmd("a", &dept, &from))
        .unwrap();

    let transferred = registrar
        .transfer_student(Command::transfer_student(registered.student, to.id))
        .unwrap();
    assert_eq!(transferred.from_class, from.id);
    assert_eq!(transferred.to_class, to.id);

    assert_eq!(roster.store().class(from.id).unwrap().counter.enrolled, 0);
    assert_eq!(roster.store().class(to.id).unwrap().counter.enrolled, 1);
    assert_eq!(roster.store().student(registered.student).unwrap().class, to.id);
}

#[test]
fn transfer_to_a_full_class_leaves_both_counters_unchanged() {
    let (roster, dept, from) = setup();
    let registrar = roster.registrar();
    let full = registrar
        .create_class(Command::create_class("Full", Capacity::Limited(1), year()))
        .unwrap();

    let mover = registrar
        .register_student(register_cmd("mover", &dept, &from))
        .unwrap();
    registrar
        .register_student(register_cmd("seatholder", &dept, &full))
        .unwrap();

    let err = registrar
        .transfer_student(Command::transfer_student(mover.student, full.id))
        .unwrap_err();
    assert!(matches!(
        err,
        RosterError::CapacityExceeded { ref class, limit: 1 } if class == "Full"
    ));

    // No partial transfer.
    assert_eq!(roster.store().class(from.id).unwrap().counter.enrolled, 1);
    assert_eq!(roster.store().class(full.id).unwrap().counter.enrolled, 1);
    assert_eq!(roster.store().student(mover.student).unwrap().class, from.id);
}

#[test]
fn transfer_into_current_class_is_a_no_op() {
    let (roster, dept, class) = setup();
    let registrar = roster.registrar();

    let registered = registrar
        .register_student(register_cmd("a", &dept, &class))
        .unwrap();

    let transferred = registrar
        .transfer_student(Command::transfer_student(registered.student, class.id))
        .unwrap();
    assert_eq!(transferred.from_class, class.id);
    assert_eq!(roster.store().class(class.id).unwrap().counter.enrolled, 1);
}

// ============================================================================
// Withdrawal
// ============================================================================

#[test]
fn withdrawal_releases_the_seat_but_never_the_code() {
    let (roster, dept, class) = setup();
    let registrar = roster.registrar();

    let registered = registrar
        .register_student(register_cmd("a", &dept, &class))
        .unwrap();
    assert_eq!(registered.code.as_str(), "CS24001");

    registrar
        .withdraw_student(Command::withdraw_student(registered.student))
        .expect("withdraw");

    assert_eq!(roster.store().class(class.id).unwrap().counter.enrolled, 0);
    assert!(roster.store().student(registered.student).unwrap().is_withdrawn());

    // The withdrawn student's number is never reissued: the next
    // registration continues past it.
    let next = registrar
        .register_student(register_cmd("b", &dept, &class))
        .unwrap();
    assert_eq!(next.code.as_str(), "CS24002");
}

#[test]
fn double_withdrawal_is_rejected() {
    let (roster, dept, class) = setup();
    let registrar = roster.registrar();

    let registered = registrar
        .register_student(register_cmd("a", &dept, &class))
        .unwrap();
    registrar
        .withdraw_student(Command::withdraw_student(registered.student))
        .unwrap();

    let err = registrar
        .withdraw_student(Command::withdraw_student(registered.student))
        .unwrap_err();
    assert!(matches!(err, RosterError::Validation { ref field, .. } if field == "student"));

    // The seat was released exactly once.
    assert_eq!(roster.store().class(class.id).unwrap().counter.enrolled, 0);
}

// ============================================================================
// Deferred Side Effects
// ============================================================================

#[test]
fn dispatch_failure_degrades_but_does_not_undo_the_commit() {
    let roster = Roster::in_memory().with_dispatcher(Arc::new(FailingDispatcher));
    let dept = roster.create_department("Computer Science", "CS");
    let registrar = roster.registrar();
    let class = registrar
        .create_class(Command::create_class("A", Capacity::Limited(30), year()))
        .unwrap();

    let registered = registrar
        .register_student(register_cmd("a", &dept, &class))
        .expect("registration itself succeeds");

    assert!(matches!(registered.outcome, Outcome::Degraded { .. }));
    // Entity and counter state committed despite the failed dispatch.
    assert!(roster.store().student(registered.student).is_some());
    assert_eq!(roster.store().class(class.id).unwrap().counter.enrolled, 1);
}

// ============================================================================
// Command Narrowing
// ============================================================================

#[test]
fn wrong_command_kind_is_a_validation_error() {
    let (roster, _dept, class) = setup();
    let err = roster
        .registrar()
        .register_student(Command::create_class("X", Capacity::Unbounded, year()))
        .unwrap_err();
    assert!(matches!(err, RosterError::Validation { ref field, .. } if field == "command"));
    let _ = class;
}

// ============================================================================
// Classes & Courses
// ============================================================================

#[test]
fn class_codes_allocate_within_their_year_scope() {
    let roster = Roster::in_memory();
    let registrar = roster.registrar();

    let a = registrar
        .create_class(Command::create_class("A", Capacity::Unbounded, year()))
        .unwrap();
    let b = registrar
        .create_class(Command::create_class("B", Capacity::Unbounded, year()))
        .unwrap();
    let c = registrar
        .create_class(Command::create_class(
            "C",
            Capacity::Unbounded,
            AdmissionYear::new(2025),
        ))
        .unwrap();

    assert_eq!(a.code.as_str(), "C24001");
    assert_eq!(b.code.as_str(), "C24002");
    assert_eq!(c.code.as_str(), "C25001");
}

#[test]
fn course_codes_use_the_department_prefix() {
    let roster = Roster::in_memory();
    let dept = roster.create_department("Computer Science", "CS");
    let registrar = roster.registrar();

    let course = registrar
        .create_course(Command::create_course("Algorithms", dept.id))
        .unwrap();
    assert_eq!(course.code.as_str(), "CS-001");

    let err = registrar
        .create_course(Command::create_course("Orphans", crate::DepartmentId::new(99)))
        .unwrap_err();
    assert!(matches!(
        err,
        RosterError::DependencyMissing { kind: "department", .. }
    ));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_registrations_in_one_scope_get_distinct_codes() {
    let (roster, dept, class) = setup();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let roster = roster.clone();
            let dept = dept.clone();
            let class = class.clone();
            thread::spawn(move || {
                roster
                    .registrar()
                    .register_student(register_cmd(&format!("t{i}"), &dept, &class))
                    .expect("concurrent registration")
            })
        })
        .collect();

    let codes: Vec<Code> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked").code)
        .collect();

    let distinct: std::collections::BTreeSet<_> = codes.iter().collect();
    assert_eq!(distinct.len(), 8, "every concurrent caller gets a unique code");
    assert_eq!(roster.store().class(class.id).unwrap().counter.enrolled, 8);
}

#[test]
fn concurrent_admissions_never_overshoot_capacity() {
    let roster = Roster::in_memory();
    let dept = roster.create_department("Computer Science", "CS");
    let registrar = roster.registrar();
    let class = registrar
        .create_class(Command::create_class("Small", Capacity::Limited(3), year()))
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let roster = roster.clone();
            let dept = dept.clone();
            let class = class.clone();
            thread::spawn(move || {
                roster
                    .registrar()
                    .register_student(register_cmd(&format!("t{i}"), &dept, &class))
                    .is_ok()
            })
        })
        .collect();

    let admitted = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .filter(|admitted| *admitted)
        .count();

    assert_eq!(admitted, 3, "exactly capacity-many admissions succeed");
    assert_eq!(roster.store().class(class.id).unwrap().counter.enrolled, 3);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Issuing k registrations sequentially yields codes with strictly
    /// increasing sequence numbers 1..=k.
    #[test]
    fn sequential_allocation_is_dense_and_increasing(k in 1usize..12) {
        let (roster, dept, class) = setup();
        let registrar = roster.registrar();

        for expected in 1..=k {
            let registered = registrar
                .register_student(register_cmd(&format!("p{expected}"), &dept, &class))
                .expect("register");
            prop_assert_eq!(registered.code.as_str(), format!("CS24{expected:03}"));
        }
    }
}

// Store errors that survive the retry loop surface as `Store`; check the
// conversion helper covers the named dependencies.
#[test]
fn store_error_mapping_names_dependencies() {
    let err = RosterError::from_store(StoreError::ClassNotFound(crate::ClassId::new(4)));
    assert!(matches!(err, RosterError::DependencyMissing { kind: "class", .. }));

    let err = RosterError::from_store(StoreError::CounterNotRead(crate::ClassId::new(4)));
    assert!(matches!(err, RosterError::Store(_)));
}
