//! The batch importer.

use std::collections::HashMap;

use chrono::Utc;
use roster::{
    AdmissionYear, Code, Command, RegistrarHandle, Roster, RosterError,
};

use crate::error::ImportError;
use crate::report::{BatchReport, CommittedRow};
use crate::row::{RowFailure, RowState, StudentRow};

/// Drives the registrar over a batch of admission rows.
pub struct BatchImporter {
    registrar: RegistrarHandle,
    roster: Roster,
    sub_batch_size: usize,
}

impl BatchImporter {
    /// Creates an importer using the deployment's configured sub-batch
    /// size.
    pub fn new(roster: &Roster) -> Self {
        Self {
            registrar: roster.registrar(),
            roster: roster.clone(),
            sub_batch_size: roster.config().import.sub_batch_size.max(1),
        }
    }

    /// Overrides the sub-batch size (minimum 1).
    pub fn with_sub_batch_size(mut self, size: usize) -> Self {
        self.sub_batch_size = size.max(1);
        self
    }

    /// Processes a batch.
    ///
    /// # Errors
    ///
    /// [`ImportError::BatchRejected`] if the upfront validation pass
    /// fails — in that case nothing was committed. Once per-row
    /// processing starts, failures are reported in the returned
    /// [`BatchReport`], never as an `Err`.
    pub fn process(&self, rows: Vec<StudentRow>) -> Result<BatchReport, ImportError> {
        let upfront = upfront_failures(&rows);
        if !upfront.is_empty() {
            tracing::warn!(
                rows = rows.len(),
                failures = upfront.len(),
                "batch rejected by upfront validation"
            );
            return Err(ImportError::BatchRejected { failures: upfront });
        }

        let mut states: Vec<RowState> = rows
            .iter()
            .map(|_| RowState::Pending.advance(RowState::Validated))
            .collect();

        let mut committed = Vec::new();
        let mut failed = Vec::new();

        tracing::info!(
            rows = rows.len(),
            sub_batch_size = self.sub_batch_size,
            "processing admission batch"
        );

        for (chunk_index, chunk) in rows.chunks(self.sub_batch_size).enumerate() {
            for (offset, row) in chunk.iter().enumerate() {
                let index = chunk_index * self.sub_batch_size + offset;
                let row_number = index + 1;

                match self.process_row(row_number, row, &mut states[index]) {
                    Ok(done) => {
                        states[index] = states[index].advance(RowState::Committed);
                        committed.push(done);
                    }
                    Err(failure) => {
                        states[index] = states[index].advance(RowState::Failed);
                        tracing::debug!(
                            row = failure.row,
                            field = %failure.field,
                            message = %failure.message,
                            "batch row failed"
                        );
                        failed.push(failure);
                    }
                }
            }
        }

        debug_assert!(
            states.iter().all(|s| s.is_terminal()),
            "every row must settle in a terminal state"
        );

        tracing::info!(
            committed = committed.len(),
            failed = failed.len(),
            "admission batch finished"
        );

        Ok(BatchReport {
            committed,
            failed,
            completed_at: Utc::now(),
        })
    }

    /// Resolves one row's references and runs it through the registrar in
    /// its own transaction.
    fn process_row(
        &self,
        row_number: usize,
        row: &StudentRow,
        state: &mut RowState,
    ) -> Result<CommittedRow, RowFailure> {
        // Resolution: look up the human-readable references.
        let dept = self
            .roster
            .store()
            .department_by_prefix(row.department.trim())
            .ok_or_else(|| {
                RowFailure::new(
                    row_number,
                    "department",
                    format!("department '{}' does not exist", row.department),
                )
            })?;

        let class_code = Code::new(&row.class).map_err(|e| {
            RowFailure::new(row_number, "class", e.to_string())
        })?;
        let class = self
            .roster
            .store()
            .class_by_code(&class_code)
            .ok_or_else(|| {
                RowFailure::new(
                    row_number,
                    "class",
                    format!("class '{}' does not exist", row.class),
                )
            })?;

        let supplied_code = match &row.code {
            Some(raw) => Some(
                Code::new(raw)
                    .map_err(|e| RowFailure::new(row_number, "code", e.to_string()))?,
            ),
            None => None,
        };

        *state = state.advance(RowState::Resolved);

        let mut cmd = Command::register_student(
            row.name.clone(),
            row.email.clone(),
            row.password.clone(),
            dept.id,
            class.id,
            AdmissionYear::new(row.year),
        );
        if let Some(code) = supplied_code {
            cmd = cmd.with_code(code);
        }

        match self.registrar.register_student(cmd) {
            Ok(registered) => Ok(CommittedRow {
                row: row_number,
                student: registered.student,
                code: registered.code,
            }),
            Err(err) => Err(row_failure(row_number, &err)),
        }
    }
}

/// Upfront pass: per-row schema checks plus duplicate detection for
/// fields that must be globally unique (email, supplied code).
fn upfront_failures(rows: &[StudentRow]) -> Vec<RowFailure> {
    let mut failures = Vec::new();
    let mut emails: HashMap<String, usize> = HashMap::new();
    let mut codes: HashMap<String, usize> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 1;

        if row.name.trim().is_empty() {
            failures.push(RowFailure::new(row_number, "name", "must not be empty"));
        }
        if !row.email.contains('@') {
            failures.push(RowFailure::new(
                row_number,
                "email",
                "must be an email address",
            ));
        }
        if row.password.is_empty() {
            failures.push(RowFailure::new(row_number, "password", "must not be empty"));
        }
        if row.department.trim().is_empty() {
            failures.push(RowFailure::new(row_number, "department", "must not be empty"));
        }
        if row.class.trim().is_empty() {
            failures.push(RowFailure::new(row_number, "class", "must not be empty"));
        }

        let email_key = row.email.trim().to_ascii_lowercase();
        if let Some(first) = emails.insert(email_key, row_number) {
            failures.push(RowFailure::new(
                row_number,
                "email",
                format!("duplicate of row {first}"),
            ));
        }

        if let Some(raw) = &row.code {
            // Normalize so `cs24001` and ` CS24001 ` collide here, not in
            // the store.
            if let Ok(code) = Code::new(raw) {
                if let Some(first) = codes.insert(code.as_str().to_string(), row_number) {
                    failures.push(RowFailure::new(
                        row_number,
                        "code",
                        format!("duplicate of row {first}"),
                    ));
                }
            }
        }
    }

    failures
}

/// Attributes a registrar error to the row field a caller would fix.
fn row_failure(row_number: usize, err: &RosterError) -> RowFailure {
    let field = match err {
        RosterError::Validation { field, .. } => field.clone(),
        RosterError::CapacityExceeded { .. } => "class".to_string(),
        RosterError::NegativeEnrollment { .. } => "class".to_string(),
        RosterError::ExhaustedRetries { .. } | RosterError::InvalidCode(_) => "code".to_string(),
        RosterError::DependencyMissing { kind, .. } => (*kind).to_string(),
        RosterError::Directory(_) => "email".to_string(),
        RosterError::Store(_) => "row".to_string(),
    };
    RowFailure::new(row_number, field, err.to_string())
}
