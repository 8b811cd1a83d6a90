//! Deferred side-effect dispatch.
//!
//! Side effects that cannot be transactionally rolled back (welcome
//! notifications) are only handed to the dispatcher after the enclosing
//! transaction commits. A dispatch failure must not retroactively undo
//! committed state: it is logged and surfaced as a degraded — not failed
//! — outcome.

use std::fmt::Debug;

use roster_kernel::NotificationJob;

/// Abstraction over the external notification/email queue.
pub trait SideEffectDispatcher: Send + Sync + Debug {
    /// Enqueues a job. The dispatcher reports completion out-of-band via
    /// the job's callback URL.
    fn dispatch(&self, job: NotificationJob) -> Result<(), DispatchError>;
}

/// Error from the dispatcher boundary.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Default dispatcher: logs the job and succeeds.
///
/// Deployments plug a real queue in behind [`SideEffectDispatcher`]; the
/// logging fallback keeps single-process setups observable.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

impl SideEffectDispatcher for LoggingDispatcher {
    fn dispatch(&self, job: NotificationJob) -> Result<(), DispatchError> {
        tracing::info!(
            callback_url = %job.callback_url,
            payload_len = job.payload.len(),
            "notification job enqueued"
        );
        Ok(())
    }
}
