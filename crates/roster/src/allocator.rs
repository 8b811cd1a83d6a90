//! Identifier allocation.

use std::collections::BTreeMap;

use roster_kernel::{CodeTemplate, next_sequence};
use roster_store::Transaction;
use roster_types::{Code, EntityKind, Scope};

use crate::error::{Result, RosterError};

/// Allocates a guaranteed-unique code inside the caller's transaction.
///
/// The algorithm is scan-then-increment: one scope scan for the initial
/// sequence, then a candidate pre-check per attempt. On a collision the
/// local counter is incremented and the next candidate tried **without
/// re-scanning** — database round-trips are bounded by the number of
/// genuine collisions, not by the gap between scan and collision.
///
/// # Concurrency
///
/// The scan and the final insert are not one atomic read-modify-write:
/// two concurrent allocations in the same scope can legitimately race to
/// the same candidate, and both can pass the pre-check here. The store's
/// commit-time uniqueness constraint is the authority; the loser's commit
/// fails retryably and the enclosing unit re-runs. The allocator is
/// correct even though its scan step is not linearizable.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierAllocator {
    max_attempts: u32,
}

impl IdentifierAllocator {
    /// Creates an allocator with the given attempt bound.
    pub fn new(max_attempts: u32) -> Self {
        debug_assert!(max_attempts > 0, "allocator needs at least one attempt");
        Self { max_attempts }
    }

    /// Allocates a unique code for `scope` using `template`.
    ///
    /// `metadata` supplies scope tokens (e.g. `dept` → `CS`) substituted
    /// before the generic tokens.
    ///
    /// # Errors
    ///
    /// [`RosterError::ExhaustedRetries`] after `max_attempts` taken
    /// candidates.
    pub fn allocate(
        &self,
        tx: &Transaction,
        scope: Scope,
        template: &CodeTemplate,
        metadata: &BTreeMap<String, String>,
    ) -> Result<Code> {
        let latest = tx.latest_in_scope(&scope);
        let mut sequence = next_sequence(latest.as_ref(), template.pad_width());

        for _ in 0..self.max_attempts {
            let rendered = template.render(sequence, scope.year, metadata);
            let candidate = Code::new(&rendered)?;

            if !tx.code_exists(scope.kind, &candidate) {
                return Ok(candidate);
            }

            tracing::debug!(
                scope = %scope,
                candidate = %candidate,
                "code candidate taken, trying next sequence"
            );
            sequence = sequence.next();
        }

        Err(RosterError::ExhaustedRetries {
            scope,
            attempts: self.max_attempts,
        })
    }

    /// Validates a caller-supplied code instead of allocating one.
    ///
    /// The code has already been normalized by [`Code::new`]; this only
    /// checks uniqueness, the same check an allocated candidate gets.
    pub fn validate_supplied(
        &self,
        tx: &Transaction,
        kind: EntityKind,
        code: Code,
    ) -> Result<Code> {
        if tx.code_exists(kind, &code) {
            return Err(RosterError::Validation {
                field: "code".to_string(),
                message: format!("{kind} code '{code}' is already in use"),
            });
        }
        Ok(code)
    }
}
