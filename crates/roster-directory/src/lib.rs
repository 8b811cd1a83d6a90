//! roster-directory: Identity and account service boundary for Roster
//!
//! Student registration creates a login account before linking the
//! student record to it; the account service is an external collaborator
//! consumed only through the [`AccountDirectory`] trait. A failure here
//! aborts the whole registration unit — a student row must never exist
//! without its account.
//!
//! # Example
//!
//! ```
//! use roster_directory::{AccountDirectory, InMemoryDirectory};
//!
//! let directory = InMemoryDirectory::new();
//! let account = directory
//!     .create_account("ada@example.edu", "correct horse", "Ada Lovelace")
//!     .unwrap();
//! assert_eq!(directory.account_count(), 1);
//! let _ = account;
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

use roster_types::AccountId;
use uuid::Uuid;

/// Abstraction over the external identity service.
///
/// Implementations must be callable from concurrent registration workers.
/// The call happens inside the registration unit: returning `Err` aborts
/// the whole unit before any entity write commits.
pub trait AccountDirectory: Send + Sync + Debug {
    /// Creates a login account and returns its id.
    ///
    /// # Errors
    ///
    /// * [`DirectoryError::DuplicateEmail`] — an account with this email
    ///   already exists
    /// * [`DirectoryError::InvalidEmail`] — the email fails the
    ///   directory's own validation
    /// * [`DirectoryError::Unavailable`] — the service cannot be reached
    fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AccountId, DirectoryError>;
}

/// Errors from the account directory.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("an account with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("invalid email address: '{0}'")]
    InvalidEmail(String),

    #[error("account directory unavailable: {0}")]
    Unavailable(String),
}

/// In-memory account directory.
///
/// Suitable for tests and single-process deployments; a production
/// deployment plugs its identity provider in behind [`AccountDirectory`].
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    accounts: Mutex<HashMap<String, AccountId>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of accounts created so far.
    pub fn account_count(&self) -> usize {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Looks up an account id by email.
    pub fn account_by_email(&self, email: &str) -> Option<AccountId> {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&email.to_ascii_lowercase())
            .copied()
    }
}

impl AccountDirectory for InMemoryDirectory {
    fn create_account(
        &self,
        email: &str,
        _password: &str,
        _display_name: &str,
    ) -> Result<AccountId, DirectoryError> {
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DirectoryError::InvalidEmail(email));
        }

        let mut accounts = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if accounts.contains_key(&email) {
            return Err(DirectoryError::DuplicateEmail(email));
        }

        let id = AccountId::new(Uuid::new_v4());
        accounts.insert(email, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests;
