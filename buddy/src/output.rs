//! Shared output formatting for validation reports.
//!
//! Provides JSON, tab-separated and plain-text formatters for
//! `ValidationReport`. Color/terminal formatting is left to the CLI layer.

use std::io::{self, Write};

use crate::report::ValidationReport;

/// Format a `ValidationReport` as JSON to a writer.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json(report: &ValidationReport, writer: &mut dyn Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    writeln!(writer, "{json}")
}

/// Write the failure report: one tab-separated line per failing check, nothing
/// when every check passed. Checks that could not run are not part of it.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_tsv(report: &ValidationReport, writer: &mut dyn Write) -> io::Result<()> {
    for failure in &report.failures {
        writeln!(writer, "{}", failure.format_line())?;
    }
    Ok(())
}

/// Write one line per check that could not run, naming its input file.
///
/// The failure report written by [`write_tsv`] leaves these out, so callers
/// using it send these lines to a separate stream.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_check_errors(report: &ValidationReport, writer: &mut dyn Write) -> io::Result<()> {
    for check_err in &report.check_errors {
        writeln!(writer, "{}", check_err.format_human_readable())?;
    }
    Ok(())
}

/// Format a `ValidationReport` as human-readable plain text to a writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human(report: &ValidationReport, writer: &mut dyn Write) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "=".repeat(80))?;
    writeln!(writer, "  FILE VALIDATION")?;
    writeln!(writer, "{}", "=".repeat(80))?;
    writeln!(writer)?;
    writeln!(writer, "  Checks run:     {}", report.checked)?;
    writeln!(writer, "  Passed:         {}", report.passed)?;
    writeln!(writer, "  Failed:         {}", report.failures_count())?;
    writeln!(writer, "  Could not run:  {}", report.errors_count())?;
    writeln!(writer)?;

    if !report.check_errors.is_empty() {
        writeln!(writer, "{}", "-".repeat(80))?;
        writeln!(writer, "  CHECK ERRORS (checks that could not be evaluated)")?;
        writeln!(writer, "{}", "-".repeat(80))?;
        for check_err in &report.check_errors {
            writeln!(writer, "{}", check_err.format_human_readable())?;
        }
        writeln!(writer)?;
    }

    if !report.failures.is_empty() {
        writeln!(writer, "{}", "-".repeat(80))?;
        writeln!(writer, "  FAILING CHECKS")?;
        writeln!(writer, "{}", "-".repeat(80))?;
        for failure in &report.failures {
            writeln!(writer, "{}", failure.format_line())?;
        }
        writeln!(writer)?;
    }

    writeln!(writer, "{}", "=".repeat(80))?;
    if report.ok {
        writeln!(writer, "\u{2713} All {} checks passed", report.checked)?;
    } else {
        if !report.check_errors.is_empty() {
            writeln!(
                writer,
                "\u{2717} {} check(s) could not run; fix the inputs and re-run",
                report.errors_count()
            )?;
        }
        if !report.failures.is_empty() {
            writeln!(
                writer,
                "\u{2717} {} check(s) failed",
                report.failures_count()
            )?;
            writeln!(writer)?;
            writeln!(writer, "  To fix:")?;
            writeln!(
                writer,
                "    - Restore the listed files from a trusted copy, or"
            )?;
            writeln!(
                writer,
                "    - Update expected_md5sum in the manifest if the change is intended"
            )?;
        }
    }
    writeln!(writer, "{}", "=".repeat(80))?;

    Ok(())
}
