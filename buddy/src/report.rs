//! Validation report types.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::validator::Check;

/// A check that ran and disagreed with its expectation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct FailureRecord {
    pub test_name: String,
    pub test_type: String,
    pub input_file: PathBuf,
}

impl FailureRecord {
    /// `test_name:<name>\ttest_type:<type>\tinput_file:<path>`
    #[must_use]
    pub fn format_line(&self) -> String {
        failure_line(&self.test_name, &self.test_type, &self.input_file)
    }
}

/// A check that could not be evaluated at all (missing input, unreadable file).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct CheckErrorRecord {
    pub test_name: String,
    pub test_type: String,
    pub input_file: PathBuf,
    /// Human-readable description of the failure.
    pub message: String,
}

impl CheckErrorRecord {
    /// Format the error for human-readable output.
    #[must_use]
    pub fn format_human_readable(&self) -> String {
        format!(
            "{}: [{}] {} ({})",
            self.test_name,
            self.test_type,
            self.message,
            self.input_file.display()
        )
    }
}

/// Result of running every check of a workflow once.
///
/// Both `failures` and `check_errors` make the run unsuccessful. A check error
/// means the check never produced an answer; it is never counted as a pass.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct ValidationReport {
    /// Number of checks executed.
    pub checked: usize,
    /// Number of checks that passed.
    pub passed: usize,
    /// Whether every check passed.
    pub ok: bool,
    /// Checks that ran and failed, in test-name order.
    pub failures: Vec<FailureRecord>,
    /// Checks that could not run, in test-name order.
    pub check_errors: Vec<CheckErrorRecord>,
}

impl ValidationReport {
    /// Number of failing checks.
    #[must_use]
    pub fn failures_count(&self) -> usize {
        self.failures.len()
    }

    /// Number of checks that could not run.
    #[must_use]
    pub fn errors_count(&self) -> usize {
        self.check_errors.len()
    }

    /// One line per failing check, joined by `\n`; empty when nothing failed.
    #[must_use]
    pub fn failure_report(&self) -> String {
        self.failures
            .iter()
            .map(FailureRecord::format_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[must_use]
pub fn failure_record<C: Check + ?Sized>(name: &str, check: &C) -> FailureRecord {
    FailureRecord {
        test_name: name.to_owned(),
        test_type: check.test_type().to_owned(),
        input_file: check.input_file().to_path_buf(),
    }
}

#[must_use]
pub fn failure_line(test_name: &str, test_type: &str, input_file: &Path) -> String {
    format!(
        "test_name:{test_name}\ttest_type:{test_type}\tinput_file:{}",
        input_file.display()
    )
}
