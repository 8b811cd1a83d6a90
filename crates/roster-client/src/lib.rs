//! roster-client: Optimistic mutation reconciliation
//!
//! Client code applies a tentative change to local state immediately,
//! issues the request, and reconciles with the authoritative result:
//! replace the tentative value on success, restore a pre-mutation
//! snapshot on rejection. Rollback is a pure function of the snapshot —
//! there are no hand-written inverse operations per call site.
//!
//! State machine per mutation:
//!
//! ```text
//! Idle ──stage──▶ Optimistic ──commit──▶ Committed
//!                     │
//!                     └────reject──▶ RolledBack
//! ```
//!
//! Invariant: local state never remains `Optimistic` after the request
//! settles. [`Reconciler::settle`] encodes that invariant directly; the
//! escape hatch for a client-side exception path is
//! [`Reconciler::rollback_unsettled`].
//!
//! # Example
//!
//! ```
//! use roster_client::Reconciler;
//!
//! let mut reconciler = Reconciler::new(vec!["CS24001".to_string()]);
//!
//! // Tentatively add a student row while the request is in flight.
//! let id = reconciler.stage(|state| state.push("PENDING".to_string()));
//! assert_eq!(reconciler.state().len(), 2);
//!
//! // Server rejected: state is exactly the pre-mutation snapshot again.
//! reconciler.reject(id).unwrap();
//! assert_eq!(reconciler.state(), &vec!["CS24001".to_string()]);
//! ```

use std::collections::HashMap;

use roster_types::ClientRequestId;

#[cfg(test)]
mod tests;

/// Phase of one optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    /// Tentative change applied locally; request in flight.
    Optimistic,
    /// Server confirmed; authoritative value applied.
    Committed,
    /// Server rejected; snapshot restored.
    RolledBack,
}

impl MutationPhase {
    /// Returns true for the two terminal phases.
    pub fn is_settled(self) -> bool {
        matches!(self, MutationPhase::Committed | MutationPhase::RolledBack)
    }
}

/// Errors from settling a mutation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("unknown mutation {0}")]
    UnknownMutation(ClientRequestId),

    #[error("mutation {id} already settled as {phase:?}")]
    AlreadySettled {
        id: ClientRequestId,
        phase: MutationPhase,
    },
}

struct Entry<S> {
    /// Immutable pre-mutation snapshot; dropped once the mutation
    /// settles.
    snapshot: Option<S>,
    phase: MutationPhase,
    /// Staging order, for LIFO rollback of overlapping mutations.
    seq: u64,
}

/// Reconciles optimistic local mutations against authoritative results.
///
/// `S` is the client's local state for one view (typically a collection
/// of rows). The reconciler owns the state; reads go through
/// [`state`](Self::state).
pub struct Reconciler<S: Clone> {
    state: S,
    entries: HashMap<ClientRequestId, Entry<S>>,
    next_seq: u64,
}

impl<S: Clone> Reconciler<S> {
    /// Creates a reconciler over the given initial state.
    pub fn new(state: S) -> Self {
        Self {
            state,
            entries: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Returns the current local state, tentative changes included.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Returns the phase of a mutation, if known.
    pub fn phase(&self, id: ClientRequestId) -> Option<MutationPhase> {
        self.entries.get(&id).map(|e| e.phase)
    }

    /// Returns true while any mutation is still `Optimistic`.
    pub fn has_unsettled(&self) -> bool {
        self.entries
            .values()
            .any(|e| e.phase == MutationPhase::Optimistic)
    }

    /// Applies a tentative mutation and returns its id.
    ///
    /// The pre-mutation snapshot is captured before `mutate` runs, so a
    /// later [`reject`](Self::reject) is a pure restore.
    pub fn stage(&mut self, mutate: impl FnOnce(&mut S)) -> ClientRequestId {
        let id = ClientRequestId::generate();
        let snapshot = self.state.clone();
        mutate(&mut self.state);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            id,
            Entry {
                snapshot: Some(snapshot),
                phase: MutationPhase::Optimistic,
                seq,
            },
        );
        id
    }

    /// Settles a mutation as confirmed.
    ///
    /// `reconcile` replaces the tentative entry with the server-returned
    /// authoritative value (e.g. swap a placeholder code for the real
    /// one). The snapshot is discarded.
    pub fn commit(
        &mut self,
        id: ClientRequestId,
        reconcile: impl FnOnce(&mut S),
    ) -> Result<(), ReconcileError> {
        let entry = self.unsettled_entry(id)?;
        entry.phase = MutationPhase::Committed;
        entry.snapshot = None;
        reconcile(&mut self.state);
        Ok(())
    }

    /// Settles a mutation as rejected: restores the pre-mutation
    /// snapshot exactly, discarding the tentative change.
    pub fn reject(&mut self, id: ClientRequestId) -> Result<(), ReconcileError> {
        let entry = self.unsettled_entry(id)?;
        entry.phase = MutationPhase::RolledBack;
        let snapshot = entry
            .snapshot
            .take()
            .expect("optimistic entry always holds its snapshot");
        self.state = snapshot;
        Ok(())
    }

    /// Settles a mutation from a request result, guaranteeing a terminal
    /// phase on both paths, and hands the result back to the caller.
    pub fn settle<A, E>(
        &mut self,
        id: ClientRequestId,
        result: Result<A, E>,
        reconcile: impl FnOnce(&mut S, &A),
    ) -> Result<Result<A, E>, ReconcileError> {
        match result {
            Ok(value) => {
                self.commit(id, |state| reconcile(state, &value))?;
                Ok(Ok(value))
            }
            Err(err) => {
                self.reject(id)?;
                Ok(Err(err))
            }
        }
    }

    /// Rolls back every unsettled mutation, most recent first.
    ///
    /// This is the client-side exception path: when a request neither
    /// succeeded nor failed cleanly, nothing may stay `Optimistic`.
    /// Returns the number of mutations rolled back.
    pub fn rollback_unsettled(&mut self) -> usize {
        let mut pending: Vec<(ClientRequestId, u64)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.phase == MutationPhase::Optimistic)
            .map(|(id, e)| (*id, e.seq))
            .collect();
        // LIFO: restoring newest-first ends at the earliest snapshot.
        pending.sort_by(|a, b| b.1.cmp(&a.1));

        let count = pending.len();
        for (id, _) in pending {
            self.reject(id)
                .expect("entry was observed optimistic above");
        }

        debug_assert!(!self.has_unsettled());
        count
    }

    /// Drops settled bookkeeping, keeping in-flight entries.
    pub fn compact(&mut self) {
        self.entries
            .retain(|_, e| e.phase == MutationPhase::Optimistic);
    }

    fn unsettled_entry(&mut self, id: ClientRequestId) -> Result<&mut Entry<S>, ReconcileError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(ReconcileError::UnknownMutation(id))?;
        if entry.phase.is_settled() {
            return Err(ReconcileError::AlreadySettled {
                id,
                phase: entry.phase,
            });
        }
        Ok(entry)
    }
}
