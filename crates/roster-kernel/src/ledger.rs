//! Enrollment ledger rules.
//!
//! Pure capacity-checked transitions on [`EnrollmentCounter`] values. The
//! store applies the returned counters inside the caller's transaction;
//! any error here must propagate and abort that transaction so the seat
//! count and the entity write never diverge.

use roster_types::{ClassId, EnrollmentCounter};

/// Errors from enrollment counter transitions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The class is at capacity; the admission (and its enclosing
    /// transaction) must fail.
    #[error("class {class_id} is full ({limit} seats)")]
    CapacityExceeded { class_id: ClassId, limit: u32 },

    /// A release would drop enrollment below zero. This is a logic-error
    /// signal — it means a decrement was lost elsewhere — and is never
    /// silently clamped.
    #[error("enrollment for class {class_id} would drop below zero")]
    NegativeEnrollment { class_id: ClassId },
}

/// Admits one student: increments the counter if capacity allows.
pub fn admit(class_id: ClassId, counter: EnrollmentCounter) -> Result<EnrollmentCounter, LedgerError> {
    if !counter.capacity.admits(counter.enrolled) {
        return Err(LedgerError::CapacityExceeded {
            class_id,
            limit: counter.capacity.limit().unwrap_or(0),
        });
    }

    let admitted = EnrollmentCounter {
        enrolled: counter.enrolled + 1,
        capacity: counter.capacity,
    };

    // Postcondition: the invariant holds after every successful admit.
    debug_assert!(
        admitted
            .capacity
            .limit()
            .is_none_or(|max| admitted.enrolled <= max),
        "admit produced a counter above capacity"
    );

    Ok(admitted)
}

/// Releases one seat: decrements the counter.
pub fn release(
    class_id: ClassId,
    counter: EnrollmentCounter,
) -> Result<EnrollmentCounter, LedgerError> {
    let Some(enrolled) = counter.enrolled.checked_sub(1) else {
        return Err(LedgerError::NegativeEnrollment { class_id });
    };

    Ok(EnrollmentCounter {
        enrolled,
        capacity: counter.capacity,
    })
}

/// Moves one student between classes.
///
/// The capacity check on the destination runs before any mutation: if it
/// fails, neither counter changes. On success both counters move within
/// the same transaction.
pub fn transfer(
    from: (ClassId, EnrollmentCounter),
    to: (ClassId, EnrollmentCounter),
) -> Result<(EnrollmentCounter, EnrollmentCounter), LedgerError> {
    let (from_id, from_counter) = from;
    let (to_id, to_counter) = to;

    // Destination first: a full destination leaves both sides untouched.
    let admitted = admit(to_id, to_counter)?;
    let released = release(from_id, from_counter)?;

    debug_assert_eq!(
        released.enrolled + admitted.enrolled,
        from_counter.enrolled + to_counter.enrolled,
        "transfer must preserve total enrollment"
    );

    Ok((released, admitted))
}
