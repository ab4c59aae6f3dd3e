//! Run a fixed set of checks and report the failing ones.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::error::CheckError;
use crate::report::{CheckErrorRecord, ValidationReport, failure_record};
use crate::validator::{Check, Validator};

/// A named set of checks, fixed at construction.
///
/// Nothing is cached: every query re-runs every check against the live
/// filesystem. Iteration, and therefore report order, is by test name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWorkflow<V = Validator> {
    validators: BTreeMap<String, V>,
}

impl<V: Check> ValidationWorkflow<V> {
    #[must_use]
    pub fn new(validators: BTreeMap<String, V>) -> Self {
        Self { validators }
    }

    #[must_use]
    pub fn validators(&self) -> &BTreeMap<String, V> {
        &self.validators
    }

    /// Checks whose `is_valid` returned `false`.
    ///
    /// Every check runs exactly once per call, whatever the others return.
    ///
    /// # Errors
    ///
    /// If any check could not be evaluated, returns the error of the first such
    /// check in name order, after all checks have run.
    pub fn get_failing_validators(&self) -> Result<BTreeMap<&str, &V>, CheckError> {
        let outcomes: Vec<(&str, &V, Result<bool, CheckError>)> = self
            .validators
            .iter()
            .map(|(name, validator)| (name.as_str(), validator, validator.is_valid()))
            .collect();

        let mut failing = BTreeMap::new();
        let mut first_error = None;
        for (name, validator, outcome) in outcomes {
            match outcome {
                Ok(true) => {}
                Ok(false) => {
                    failing.insert(name, validator);
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(failing),
        }
    }

    /// One `test_name:..\ttest_type:..\tinput_file:..` line per failing check,
    /// joined by `\n`. Empty when nothing fails.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_failing_validators`].
    pub fn format_failure_report(&self) -> Result<String, CheckError> {
        let failing = self.get_failing_validators()?;
        Ok(failing
            .into_iter()
            .map(|(name, validator)| failure_record(name, validator).format_line())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Run every check once and record each outcome, including checks that
    /// could not be evaluated.
    #[must_use]
    pub fn run(&self) -> ValidationReport {
        let mut passed = 0;
        let mut failures = Vec::new();
        let mut check_errors = Vec::new();

        for (name, validator) in &self.validators {
            match validator.is_valid() {
                Ok(true) => passed += 1,
                Ok(false) => {
                    debug!(test_name = %name, "check failed");
                    failures.push(failure_record(name, validator));
                }
                Err(e) => {
                    warn!(test_name = %name, error = %e, "check could not run");
                    check_errors.push(CheckErrorRecord {
                        test_name: name.clone(),
                        test_type: validator.test_type().to_owned(),
                        input_file: validator.input_file().to_path_buf(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let checked = self.validators.len();
        info!(
            checked,
            passed,
            failed = failures.len(),
            errors = check_errors.len(),
            "validation finished"
        );

        ValidationReport {
            checked,
            passed,
            ok: failures.is_empty() && check_errors.is_empty(),
            failures,
            check_errors,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::path::{Path, PathBuf};

    use buddy_digest::DigestError;

    use super::*;

    /// A check with a canned answer that counts how often it ran.
    #[derive(Debug)]
    struct StubCheck {
        name: String,
        input: PathBuf,
        answer: Option<bool>,
        calls: Cell<usize>,
    }

    impl StubCheck {
        fn new(name: &str, answer: Option<bool>) -> Self {
            Self {
                name: name.to_owned(),
                input: PathBuf::from("some_file"),
                answer,
                calls: Cell::new(0),
            }
        }
    }

    impl PartialEq for StubCheck {
        fn eq(&self, other: &Self) -> bool {
            self.name == other.name && self.input == other.input && self.answer == other.answer
        }
    }

    impl Check for StubCheck {
        fn test_name(&self) -> &str {
            &self.name
        }

        fn test_type(&self) -> &str {
            "md5sum"
        }

        fn input_file(&self) -> &Path {
            &self.input
        }

        fn is_valid(&self) -> Result<bool, CheckError> {
            self.calls.set(self.calls.get() + 1);
            self.answer.ok_or_else(|| {
                CheckError::Digest(DigestError::FileNotFound {
                    path: self.input.clone(),
                })
            })
        }
    }

    fn stub_workflow(checks: &[(&str, Option<bool>)]) -> ValidationWorkflow<StubCheck> {
        ValidationWorkflow::new(
            checks
                .iter()
                .map(|(name, answer)| ((*name).to_owned(), StubCheck::new(name, *answer)))
                .collect(),
        )
    }

    #[test]
    fn test_trivial_workflow_constructor() {
        let workflow: ValidationWorkflow<StubCheck> = ValidationWorkflow::new(BTreeMap::new());
        assert!(workflow.validators().is_empty());
    }

    #[test]
    fn test_no_validators_means_no_failures() {
        let workflow = stub_workflow(&[]);
        assert!(workflow.get_failing_validators().unwrap().is_empty());
        assert_eq!(workflow.format_failure_report().unwrap(), "");
    }

    #[test]
    fn test_all_passing_validators_means_no_failures() {
        let workflow = stub_workflow(&[("my_test", Some(true)), ("other", Some(true))]);
        assert!(workflow.get_failing_validators().unwrap().is_empty());
        assert_eq!(workflow.format_failure_report().unwrap(), "");
    }

    #[test]
    fn test_all_failing_validators_returns_full_set() {
        let workflow = stub_workflow(&[("my_test", Some(false)), ("other", Some(false))]);
        let failing = workflow.get_failing_validators().unwrap();

        let all: BTreeMap<&str, &StubCheck> = workflow
            .validators()
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        assert_eq!(failing, all);
    }

    #[test]
    fn test_single_failing_validator_report() {
        let workflow = stub_workflow(&[("my_test", Some(false))]);
        assert_eq!(
            workflow.format_failure_report().unwrap(),
            "test_name:my_test\ttest_type:md5sum\tinput_file:some_file"
        );
    }

    #[test]
    fn test_report_lines_are_sorted_by_test_name() {
        let workflow = stub_workflow(&[
            ("zeta", Some(false)),
            ("alpha", Some(false)),
            ("mid", Some(true)),
        ]);
        let report = workflow.format_failure_report().unwrap();
        let names: Vec<&str> = report
            .lines()
            .map(|line| line.split('\t').next().unwrap())
            .collect();
        assert_eq!(names, vec!["test_name:alpha", "test_name:zeta"]);
    }

    #[test]
    fn test_every_check_runs_once_per_call() {
        let workflow = stub_workflow(&[("a", Some(false)), ("b", None), ("c", Some(true))]);

        assert!(workflow.get_failing_validators().is_err());
        for check in workflow.validators().values() {
            assert_eq!(check.calls.get(), 1, "{} ran {} times", check.name, check.calls.get());
        }

        let _ = workflow.run();
        for check in workflow.validators().values() {
            assert_eq!(check.calls.get(), 2);
        }
    }

    #[test]
    fn test_check_error_is_propagated() {
        let workflow = stub_workflow(&[("missing", None)]);
        let err = workflow.format_failure_report().unwrap_err();
        assert!(matches!(
            err,
            CheckError::Digest(DigestError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_run_records_every_outcome() {
        let workflow = stub_workflow(&[
            ("fail", Some(false)),
            ("missing", None),
            ("pass", Some(true)),
        ]);
        let report = workflow.run();

        assert_eq!(report.checked, 3);
        assert_eq!(report.passed, 1);
        assert!(!report.ok);
        assert_eq!(report.failures_count(), 1);
        assert_eq!(report.failures[0].test_name, "fail");
        assert_eq!(report.errors_count(), 1);
        assert_eq!(report.check_errors[0].test_name, "missing");
        assert_eq!(
            report.failure_report(),
            "test_name:fail\ttest_type:md5sum\tinput_file:some_file"
        );
    }

    #[test]
    fn test_run_on_empty_workflow_is_ok() {
        let report = stub_workflow(&[]).run();
        assert!(report.ok);
        assert_eq!(report.checked, 0);
    }
}
