//! Effects produced by registrar units.
//!
//! Effects represent side effects that cannot be transactionally rolled
//! back. A unit returns them alongside its staged writes; the shell
//! dispatches them only after the transaction commits, never before or
//! during it. A failed dispatch degrades the outcome but cannot undo the
//! committed entity or counter state.

use bytes::Bytes;
use roster_types::AuditAction;
use serde::{Deserialize, Serialize};

/// An effect to be executed by the shell after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Hand a job to the deferred side-effect dispatcher (e.g. a welcome
    /// notification).
    EnqueueNotification(NotificationJob),

    /// Append an entry to the audit log.
    AuditAppend(AuditAction),
}

/// A job payload for the external notification dispatcher.
///
/// The payload is opaque serialized bytes; the dispatcher reports its
/// outcome to the callback URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationJob {
    pub payload: Bytes,
    pub callback_url: String,
}

impl NotificationJob {
    pub fn new(payload: impl Into<Bytes>, callback_url: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            callback_url: callback_url.into(),
        }
    }
}
