//! Unit tests for roster-client.

use proptest::prelude::*;

use super::*;

/// A toy view state: the rows a form is showing.
fn initial() -> Vec<String> {
    vec!["CS24001".to_string(), "CS24002".to_string()]
}

#[test]
fn commit_replaces_the_tentative_value() {
    let mut reconciler = Reconciler::new(initial());

    let id = reconciler.stage(|rows| rows.push("PENDING".to_string()));
    assert_eq!(reconciler.phase(id), Some(MutationPhase::Optimistic));

    reconciler
        .commit(id, |rows| {
            let last = rows.last_mut().expect("tentative row present");
            *last = "CS24003".to_string();
        })
        .unwrap();

    assert_eq!(reconciler.phase(id), Some(MutationPhase::Committed));
    assert_eq!(
        reconciler.state(),
        &vec![
            "CS24001".to_string(),
            "CS24002".to_string(),
            "CS24003".to_string()
        ]
    );
    assert!(!reconciler.has_unsettled());
}

#[test]
fn reject_restores_the_exact_pre_mutation_snapshot() {
    let mut reconciler = Reconciler::new(initial());
    let before = reconciler.state().clone();

    let id = reconciler.stage(|rows| {
        rows.push("PENDING".to_string());
        rows[0] = "MANGLED".to_string();
    });
    assert_ne!(reconciler.state(), &before);

    reconciler.reject(id).unwrap();

    // No residual tentative fields: state equals the snapshot exactly.
    assert_eq!(reconciler.state(), &before);
    assert_eq!(reconciler.phase(id), Some(MutationPhase::RolledBack));
}

#[test]
fn settle_reaches_a_terminal_phase_on_both_paths() {
    let mut reconciler = Reconciler::new(initial());

    let id = reconciler.stage(|rows| rows.push("PENDING".to_string()));
    let outcome: Result<String, &str> = Ok("CS24003".to_string());
    let settled = reconciler
        .settle(id, outcome, |rows, code| {
            *rows.last_mut().expect("tentative row") = code.clone();
        })
        .unwrap();
    assert_eq!(settled.unwrap(), "CS24003");
    assert_eq!(reconciler.phase(id), Some(MutationPhase::Committed));

    let id = reconciler.stage(|rows| rows.push("PENDING".to_string()));
    let outcome: Result<String, &str> = Err("class is full");
    let settled = reconciler.settle(id, outcome, |_, _| {}).unwrap();
    assert_eq!(settled.unwrap_err(), "class is full");
    assert_eq!(reconciler.phase(id), Some(MutationPhase::RolledBack));

    assert!(!reconciler.has_unsettled());
}

#[test]
fn settling_twice_is_an_error() {
    let mut reconciler = Reconciler::new(initial());
    let id = reconciler.stage(|rows| rows.push("PENDING".to_string()));
    reconciler.commit(id, |_| {}).unwrap();

    let err = reconciler.reject(id).unwrap_err();
    assert_eq!(
        err,
        ReconcileError::AlreadySettled {
            id,
            phase: MutationPhase::Committed
        }
    );
}

#[test]
fn unknown_mutation_is_an_error() {
    let mut reconciler = Reconciler::new(initial());
    let stranger = roster_types::ClientRequestId::generate();
    assert_eq!(
        reconciler.reject(stranger).unwrap_err(),
        ReconcileError::UnknownMutation(stranger)
    );
}

#[test]
fn rollback_unsettled_unwinds_overlapping_mutations_lifo() {
    let mut reconciler = Reconciler::new(initial());
    let before = reconciler.state().clone();

    reconciler.stage(|rows| rows.push("PENDING-A".to_string()));
    reconciler.stage(|rows| rows.push("PENDING-B".to_string()));

    let rolled_back = reconciler.rollback_unsettled();
    assert_eq!(rolled_back, 2);
    assert!(!reconciler.has_unsettled());

    // LIFO unwinding lands on the earliest snapshot.
    assert_eq!(reconciler.state(), &before);
}

#[test]
fn compact_drops_settled_entries_only() {
    let mut reconciler = Reconciler::new(initial());

    let settled = reconciler.stage(|rows| rows.push("A".to_string()));
    reconciler.commit(settled, |_| {}).unwrap();
    let in_flight = reconciler.stage(|rows| rows.push("B".to_string()));

    reconciler.compact();

    assert_eq!(reconciler.phase(settled), None);
    assert_eq!(reconciler.phase(in_flight), Some(MutationPhase::Optimistic));
}

proptest! {
    /// Any sequence of staged mutations, settled in any order with any
    /// mix of confirmations and rejections, leaves nothing Optimistic
    /// once every request has settled.
    #[test]
    fn no_mutation_stays_optimistic_after_settling(
        outcomes in prop::collection::vec(any::<bool>(), 1..20),
    ) {
        let mut reconciler = Reconciler::new(Vec::<u32>::new());

        for (i, confirmed) in outcomes.iter().enumerate() {
            let id = reconciler.stage(|rows| rows.push(i as u32));
            let result: Result<u32, ()> = if *confirmed { Ok(i as u32) } else { Err(()) };
            reconciler.settle(id, result, |_, _| {}).expect("settles");
            prop_assert!(reconciler.phase(id).expect("known").is_settled());
        }

        prop_assert!(!reconciler.has_unsettled());
    }

    /// A rejected mutation restores the state byte-for-byte, whatever the
    /// tentative change did.
    #[test]
    fn rejection_is_a_pure_snapshot_restore(
        base in prop::collection::vec(any::<u32>(), 0..10),
        pushed in any::<u32>(),
        mangle_first in any::<bool>(),
    ) {
        let mut reconciler = Reconciler::new(base.clone());

        let id = reconciler.stage(|rows| {
            rows.push(pushed);
            if mangle_first && !rows.is_empty() {
                rows[0] = rows[0].wrapping_add(1);
            }
        });
        reconciler.reject(id).expect("rejects");

        prop_assert_eq!(reconciler.state(), &base);
    }
}
