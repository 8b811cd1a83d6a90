//! Main entry point for the Roster SDK.

use std::sync::Arc;

use chrono::Datelike;
use roster_config::RosterConfig;
use roster_directory::{AccountDirectory, InMemoryDirectory};
use roster_kernel::Effect;
use roster_store::{DepartmentRecord, EntityStore};
use roster_types::AdmissionYear;

use crate::dispatch::{LoggingDispatcher, SideEffectDispatcher};
use crate::registrar::RegistrarHandle;

/// Outcome of a committed unit.
///
/// `Degraded` means the entity and counter state committed durably but a
/// deferred side effect failed to enqueue afterwards. The commit is never
/// undone for a dispatch failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Commit and every deferred side effect succeeded.
    Clean,
    /// Commit succeeded; a deferred side effect did not.
    Degraded { reason: String },
}

impl Outcome {
    /// Returns true if every deferred side effect succeeded.
    pub fn is_clean(&self) -> bool {
        matches!(self, Outcome::Clean)
    }
}

/// Handle to a Roster deployment.
///
/// Owns the entity store and the two external collaborator boundaries:
/// the account directory and the side-effect dispatcher. Cloning is
/// cheap; all clones share the same state.
///
/// # Example
///
/// ```
/// use roster::Roster;
///
/// let roster = Roster::in_memory();
/// let cs = roster.create_department("Computer Science", "CS");
/// assert_eq!(cs.code_prefix, "CS");
/// ```
#[derive(Clone)]
pub struct Roster {
    pub(crate) store: EntityStore,
    pub(crate) directory: Arc<dyn AccountDirectory>,
    pub(crate) dispatcher: Arc<dyn SideEffectDispatcher>,
    pub(crate) config: Arc<RosterConfig>,
}

impl Roster {
    /// Creates a deployment with the given configuration and the default
    /// in-memory collaborators.
    pub fn new(config: RosterConfig) -> Self {
        Self {
            store: EntityStore::new(),
            directory: Arc::new(InMemoryDirectory::new()),
            dispatcher: Arc::new(LoggingDispatcher),
            config: Arc::new(config),
        }
    }

    /// Creates an ephemeral deployment with default configuration.
    pub fn in_memory() -> Self {
        Self::new(RosterConfig::default())
    }

    /// Replaces the account directory boundary.
    pub fn with_directory(mut self, directory: Arc<dyn AccountDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Replaces the side-effect dispatcher boundary.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn SideEffectDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Returns a registrar handle for transactional entity writes.
    pub fn registrar(&self) -> RegistrarHandle {
        RegistrarHandle::new(self.clone())
    }

    /// Creates a department.
    ///
    /// Departments are reference data: they carry the `{dept}` prefix
    /// scoped codes are built from and are created outside the
    /// transactional write path.
    pub fn create_department(
        &self,
        name: impl Into<String>,
        code_prefix: impl Into<String>,
    ) -> DepartmentRecord {
        self.store.insert_department(name, code_prefix)
    }

    /// Returns the entity store for direct reads.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    /// The admission year for "now", for callers that don't carry one.
    pub fn current_admission_year() -> AdmissionYear {
        AdmissionYear::new(chrono::Utc::now().year() as u16)
    }

    /// Executes deferred effects after a successful commit.
    ///
    /// This is the imperative shell: audit entries are logged, jobs are
    /// handed to the dispatcher. A dispatch failure degrades the outcome
    /// and is logged; it never unwinds the committed transaction.
    pub(crate) fn execute_effects(&self, effects: Vec<Effect>) -> Outcome {
        let mut outcome = Outcome::Clean;

        for effect in effects {
            match effect {
                Effect::AuditAppend(action) => {
                    tracing::info!(?action, "audit");
                }
                Effect::EnqueueNotification(job) => {
                    if let Err(err) = self.dispatcher.dispatch(job) {
                        tracing::warn!(error = %err, "deferred notification failed to enqueue");
                        if outcome.is_clean() {
                            outcome = Outcome::Degraded {
                                reason: err.to_string(),
                            };
                        }
                    }
                }
            }
        }

        outcome
    }
}
