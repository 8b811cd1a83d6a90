//! # roster-kernel: Functional core of Roster
//!
//! The kernel is the pure, deterministic heart of the system. It decides
//! what the next sequence number is, how a code is rendered, and whether an
//! enrollment change preserves the capacity invariant — and nothing else.
//!
//! ## Key Principles
//!
//! - **No IO**: The kernel never touches disk, network, or any external resource
//! - **No clocks**: Creation timestamps are assigned by the store, not the kernel
//! - **No randomness**: Same input always produces same output
//!
//! ## Architecture
//!
//! - [`sequence`]: Derives the next sequence number from the latest code in a scope
//! - [`template`]: The code placeholder language (`{dept}{year}{sequence:3}`)
//! - [`ledger`]: Capacity-checked admit/release/transfer rules
//! - [`command`]: Commands the registrar accepts (`RegisterStudent`, ...)
//! - [`effects`]: Deferred side effects returned to the shell for post-commit dispatch

pub mod command;
pub mod effects;
pub mod ledger;
pub mod sequence;
pub mod template;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use command::Command;
pub use effects::{Effect, NotificationJob};
pub use ledger::LedgerError;
pub use sequence::next_sequence;
pub use template::CodeTemplate;
