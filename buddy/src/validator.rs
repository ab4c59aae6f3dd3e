//! Validators and the factory that builds them from a manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use buddy_digest::{is_md5_hex, md5_file, md5_file_uncommented};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{CheckError, ManifestError};
use crate::manifest::{RawManifest, read_manifest, value_kind};

/// Test type reported for checksum-equality checks.
pub const MD5SUM_TEST_TYPE: &str = "md5sum";

/// One pass/fail condition evaluated against the filesystem.
///
/// The workflow only relies on this trait, so new kinds of check (row-subset or
/// column-subset file comparisons, for instance) plug in without touching it.
pub trait Check {
    /// Name of the check; equal to its key in the owning collection.
    fn test_name(&self) -> &str;

    /// Short kind tag printed in reports (e.g. `md5sum`).
    fn test_type(&self) -> &str;

    /// The file the check inspects.
    fn input_file(&self) -> &Path;

    /// Evaluate the check against the live filesystem.
    ///
    /// # Errors
    ///
    /// Returns an error when the check cannot be evaluated at all, e.g. the
    /// input file is missing. A check that ran and disagreed returns `Ok(false)`.
    fn is_valid(&self) -> Result<bool, CheckError>;
}

/// Checks that the MD5 of a file equals an expected lowercase hex value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Md5sumValidator {
    test_name: String,
    input_file: PathBuf,
    expected_md5sum: String,
    comment_prefix: Option<char>,
}

impl Md5sumValidator {
    #[must_use]
    pub fn new(
        test_name: impl Into<String>,
        input_file: impl Into<PathBuf>,
        expected_md5sum: impl Into<String>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            input_file: input_file.into(),
            expected_md5sum: expected_md5sum.into(),
            comment_prefix: None,
        }
    }

    /// Hash only the lines that do not start with `prefix`.
    #[must_use]
    pub fn with_comment_prefix(mut self, prefix: char) -> Self {
        self.comment_prefix = Some(prefix);
        self
    }

    #[must_use]
    pub fn expected_md5sum(&self) -> &str {
        &self.expected_md5sum
    }

    #[must_use]
    pub fn comment_prefix(&self) -> Option<char> {
        self.comment_prefix
    }

    /// The MD5 of the input file as it is on disk now.
    ///
    /// # Errors
    ///
    /// Propagates digest failures (missing file, unreadable file, bad path).
    pub fn actual_md5sum(&self) -> Result<String, CheckError> {
        let digest = match self.comment_prefix {
            Some(prefix) => md5_file_uncommented(&self.input_file, prefix)?,
            None => md5_file(&self.input_file)?,
        };
        Ok(digest)
    }
}

impl Check for Md5sumValidator {
    fn test_name(&self) -> &str {
        &self.test_name
    }

    fn test_type(&self) -> &str {
        MD5SUM_TEST_TYPE
    }

    fn input_file(&self) -> &Path {
        &self.input_file
    }

    fn is_valid(&self) -> Result<bool, CheckError> {
        let actual = self.actual_md5sum()?;
        let valid = actual == self.expected_md5sum;
        debug!(
            test_name = %self.test_name,
            input_file = %self.input_file.display(),
            expected = %self.expected_md5sum,
            actual = %actual,
            valid,
            "md5sum check"
        );
        Ok(valid)
    }
}

/// Every kind of check a manifest can declare.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Validator {
    Md5sum(Md5sumValidator),
}

impl From<Md5sumValidator> for Validator {
    fn from(value: Md5sumValidator) -> Self {
        Self::Md5sum(value)
    }
}

impl Check for Validator {
    fn test_name(&self) -> &str {
        match self {
            Self::Md5sum(v) => v.test_name(),
        }
    }

    fn test_type(&self) -> &str {
        match self {
            Self::Md5sum(v) => v.test_type(),
        }
    }

    fn input_file(&self) -> &Path {
        match self {
            Self::Md5sum(v) => v.input_file(),
        }
    }

    fn is_valid(&self) -> Result<bool, CheckError> {
        match self {
            Self::Md5sum(v) => v.is_valid(),
        }
    }
}

/// One entry of a validation manifest, as written by the user.
///
/// ```yaml
/// raw_counts:
///   input_file: data/raw/counts.tsv
///   expected_md5sum: 0123456789abcdef0123456789abcdef
///   comment_prefix: "#"   # optional
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct ValidationManifestEntry {
    /// Entry key; filled in from the manifest, not from the fields.
    #[serde(skip)]
    pub identifier: String,
    pub input_file: PathBuf,
    pub expected_md5sum: String,
    /// Optional; must be `md5sum` when present.
    #[serde(default)]
    pub test_type: Option<String>,
    /// Optional single character; lines starting with it are not hashed.
    #[serde(default)]
    pub comment_prefix: Option<char>,
}

impl ValidationManifestEntry {
    /// Build an entry from its raw manifest value, applying the strict schema.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Schema`] if the value is not a mapping, misses
    /// a required field, carries an unknown field, names an unsupported test
    /// type, or holds an expected checksum that is not 32 lowercase hex chars.
    pub fn from_value(identifier: &str, value: &Value) -> Result<Self, ManifestError> {
        let schema_error = |message: String| ManifestError::Schema {
            entry: identifier.to_owned(),
            message,
        };

        if !value.is_object() {
            return Err(schema_error(format!(
                "expected a mapping with `input_file` and `expected_md5sum`, found {}",
                value_kind(value)
            )));
        }

        let mut entry = Self::deserialize(value).map_err(|e| schema_error(e.to_string()))?;
        entry.identifier = identifier.to_owned();

        if let Some(test_type) = entry.test_type.as_deref()
            && test_type != MD5SUM_TEST_TYPE
        {
            return Err(schema_error(format!(
                "unsupported test_type '{test_type}' (supported: {MD5SUM_TEST_TYPE})"
            )));
        }

        if !is_md5_hex(&entry.expected_md5sum) {
            return Err(schema_error(format!(
                "expected_md5sum '{}' is not a 32-character lowercase hex string",
                entry.expected_md5sum
            )));
        }

        if entry.input_file.as_os_str().is_empty() {
            return Err(schema_error("input_file must not be empty".to_owned()));
        }

        Ok(entry)
    }

    /// Turn the entry into the validator it describes.
    #[must_use]
    pub fn into_validator(self) -> Validator {
        let validator =
            Md5sumValidator::new(self.identifier, self.input_file, self.expected_md5sum);
        match self.comment_prefix {
            Some(prefix) => validator.with_comment_prefix(prefix).into(),
            None => validator.into(),
        }
    }
}

/// Build validators from a parsed validation manifest.
///
/// The whole manifest is rejected on the first invalid entry, so no check ever
/// runs against a partially understood manifest.
///
/// # Errors
///
/// Returns [`ManifestError::Schema`] for the first entry (in name order) that
/// does not satisfy [`ValidationManifestEntry::from_value`].
pub fn parse_validator_details(
    manifest: &RawManifest,
) -> Result<BTreeMap<String, Validator>, ManifestError> {
    manifest
        .iter()
        .map(|(name, value)| {
            let entry = ValidationManifestEntry::from_value(name, value)?;
            Ok((name.clone(), entry.into_validator()))
        })
        .collect()
}

/// Read a validation manifest from disk and build its validators.
///
/// # Errors
///
/// Any [`ManifestError`] from reading or parsing the manifest.
pub fn load_validators(path: &Path) -> Result<BTreeMap<String, Validator>, ManifestError> {
    let manifest = read_manifest(path)?;
    let validators = parse_validator_details(&manifest)?;
    debug!(path = %path.display(), count = validators.len(), "loaded validators");
    Ok(validators)
}
