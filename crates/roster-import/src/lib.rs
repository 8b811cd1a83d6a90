//! roster-import: Bulk admission batches for Roster
//!
//! Drives the registrar over an ordered list of rows with per-row
//! isolation and partial-success accounting:
//!
//! 1. **Upfront pass** — schema validation plus duplicate detection
//!    within the batch (emails, supplied codes). Any failure here rejects
//!    the entire batch before a single commit, so an internally
//!    inconsistent batch can never half-land.
//! 2. **Per-row processing** — each row runs through its own registrar
//!    transaction. One row's failure (duplicate code, missing reference,
//!    full class) never aborts its siblings.
//!
//! Rows are processed in fixed-size sub-batches to bound peak resource
//! usage; sub-batch boundaries carry no transactional meaning.
//!
//! Row-level errors are returned as positional `{row, field, message}`
//! tuples so a caller can render them against the original input. Row
//! numbers are 1-based.

mod error;
mod importer;
mod report;
mod row;

pub use error::ImportError;
pub use importer::BatchImporter;
pub use report::{BatchReport, CommittedRow};
pub use row::{RowFailure, RowState, StudentRow};
