//! YAML manifest reader.
//!
//! Manifests are mappings from an entry name to a mapping of scalar fields.
//! Field values are kept as the text written in the document, so an unquoted
//! `commit: 0000000` or `expected_md5sum: 1234...` stays a string. Turning
//! entries into validators or repositories is left to the callers so each can
//! apply its own schema.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ManifestError;

/// Top-level manifest: entry name to its fields, every field a `Value::String`.
pub type RawManifest = BTreeMap<String, Value>;

/// Key used in schema errors that concern the whole document.
const DOCUMENT_ENTRY: &str = "<document>";

/// Read a manifest from disk.
///
/// A missing file, an empty file, or a document holding only comments or
/// `null` all yield an empty manifest.
///
/// # Errors
///
/// - [`ManifestError::Io`] if the file exists but cannot be read.
/// - [`ManifestError::Parse`] if the content is not valid YAML.
/// - [`ManifestError::Schema`] if the top level is not a mapping, or an entry
///   is not a mapping of scalar fields.
pub fn read_manifest(path: &Path) -> Result<RawManifest, ManifestError> {
    match read_text(path)? {
        Some(content) => parse_manifest(&content, path),
        None => Ok(RawManifest::new()),
    }
}

/// Parse manifest text that was already loaded. `path` is only used in errors.
///
/// # Errors
///
/// Same conditions as [`read_manifest`], except for I/O.
pub fn parse_manifest(content: &str, path: &Path) -> Result<RawManifest, ManifestError> {
    let entries = match parse_document(content, path)? {
        Value::Null => return Ok(RawManifest::new()),
        Value::Object(entries) => entries,
        other => {
            return Err(ManifestError::Schema {
                entry: DOCUMENT_ENTRY.to_owned(),
                message: format!(
                    "top level of {} must be a mapping, found {}",
                    path.display(),
                    value_kind(&other)
                ),
            });
        }
    };
    for (name, entry) in &entries {
        check_entry_shape(name, entry)?;
    }

    // The shape is known to fit; read it again with every field typed as text.
    let fields: BTreeMap<String, BTreeMap<String, String>> =
        serde_saphyr::from_str(content).map_err(|e| ManifestError::Schema {
            entry: DOCUMENT_ENTRY.to_owned(),
            message: e.to_string(),
        })?;
    Ok(fields
        .into_iter()
        .map(|(name, fields)| {
            let fields: Map<String, Value> = fields
                .into_iter()
                .map(|(key, text)| (key, Value::String(text)))
                .collect();
            (name, Value::Object(fields))
        })
        .collect())
}

/// Read a list of paths from disk.
///
/// Accepts a YAML sequence of scalars or a mapping (its keys are used). Missing
/// and empty files yield an empty list.
///
/// # Errors
///
/// Same conditions as [`read_manifest`]; additionally any sequence item that
/// is not a scalar is a [`ManifestError::Schema`].
pub fn read_path_list(path: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    let Some(content) = read_text(path)? else {
        return Ok(Vec::new());
    };
    match parse_document(&content, path)? {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map.keys().map(PathBuf::from).collect()),
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                if !is_scalar(item) {
                    return Err(ManifestError::Schema {
                        entry: format!("#{}", idx + 1),
                        message: format!("expected a path, found {}", value_kind(item)),
                    });
                }
            }
            let paths: Vec<String> =
                serde_saphyr::from_str(&content).map_err(|e| ManifestError::Schema {
                    entry: DOCUMENT_ENTRY.to_owned(),
                    message: e.to_string(),
                })?;
            Ok(paths.into_iter().map(PathBuf::from).collect())
        }
        other => Err(ManifestError::Schema {
            entry: DOCUMENT_ENTRY.to_owned(),
            message: format!(
                "{} must hold a list of paths, found {}",
                path.display(),
                value_kind(&other)
            ),
        }),
    }
}

/// An entry must be a mapping whose fields each hold one scalar.
fn check_entry_shape(name: &str, entry: &Value) -> Result<(), ManifestError> {
    let schema_error = |message: String| ManifestError::Schema {
        entry: name.to_owned(),
        message,
    };
    let Value::Object(fields) = entry else {
        return Err(schema_error(format!(
            "expected a mapping, found {}",
            value_kind(entry)
        )));
    };
    for (field, value) in fields {
        if !is_scalar(value) {
            return Err(schema_error(format!(
                "field `{field}` must hold a single value, found {}",
                value_kind(value)
            )));
        }
    }
    Ok(())
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::Bool(_) | Value::Number(_) | Value::String(_))
}

/// Parse any YAML document into an untyped tree. `path` is only used in errors.
///
/// Unquoted scalars are typed by their look (`0000000` becomes a number), so
/// use [`parse_manifest`] for anything whose fields are read as text.
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] if `content` is not valid YAML.
pub fn parse_document(content: &str, path: &Path) -> Result<Value, ManifestError> {
    if is_blank_document(content) {
        return Ok(Value::Null);
    }
    serde_saphyr::from_str::<Value>(content).map_err(|e| ManifestError::Parse {
        path: path.to_owned(),
        message: e.to_string(),
    })
}

/// File content, or `None` when the file does not exist.
fn read_text(path: &Path) -> Result<Option<String>, ManifestError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), bytes = content.len(), "read manifest");
            Ok(Some(content))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "manifest not found, treating as empty");
            Ok(None)
        }
        Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(ManifestError::Parse {
            path: path.to_owned(),
            message: "manifest is not valid UTF-8".to_owned(),
        }),
        Err(source) => Err(ManifestError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}

/// A document with nothing but whitespace, comments and document markers.
fn is_blank_document(content: &str) -> bool {
    content.lines().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with('#') || trimmed == "---" || trimmed == "..."
    })
}

#[must_use]
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
