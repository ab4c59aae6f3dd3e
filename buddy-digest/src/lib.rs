//! File checksum primitives.
//!
//! This crate is the single place where file digests are computed, used by the
//! `buddy` validators and by anything else that needs to compare a file on disk
//! against a recorded checksum.
//!
//! Digests are computed over the raw bytes of a file (no text decoding) and
//! rendered as lowercase hex.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use thiserror::Error;

/// Length of an MD5 digest rendered as hex.
pub const MD5_HEX_LEN: usize = 32;

/// MD5 of the empty byte sequence.
pub const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

/// Paths that name an already-open descriptor rather than a file on disk.
const DESCRIPTOR_PREFIXES: &[&str] = &["/dev/fd/", "/proc/self/fd/"];
const DESCRIPTOR_PATHS: &[&str] = &["-", "/dev/stdin", "/dev/stdout", "/dev/stderr"];

/// Errors from computing a file digest.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DigestError {
    /// The input file does not exist.
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The input exists but could not be read (permissions, directory, ...).
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The caller passed something that is not a path to a file on disk.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Human-readable description of the misuse.
        reason: String,
    },
}

/// Returns `true` if `value` is a 32-character lowercase hex string.
#[inline]
#[must_use]
pub fn is_md5_hex(value: &str) -> bool {
    value.len() == MD5_HEX_LEN && is_lower_hex(value)
}

/// Returns `true` if `value` is non-empty and only contains `[0-9a-f]`.
#[inline]
#[must_use]
pub fn is_lower_hex(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// MD5 of an in-memory byte slice, as lowercase hex.
#[must_use]
pub fn md5_bytes(bytes: &[u8]) -> String {
    let digest = Md5::digest(bytes);
    format!("{digest:x}")
}

/// MD5 of the file at `path`, streamed byte-for-byte.
///
/// # Errors
///
/// - [`DigestError::FileNotFound`] if nothing exists at `path`.
/// - [`DigestError::Io`] if `path` exists but cannot be read as a file.
/// - [`DigestError::InvalidArgument`] if `path` is empty or names an open descriptor.
pub fn md5_file(path: &Path) -> Result<String, DigestError> {
    let mut file = open_regular(path)?;
    let mut hasher = Md5::new();
    io::copy(&mut file, &mut hasher).map_err(|source| DigestError::Io {
        path: path.to_owned(),
        source,
    })?;
    let digest = hasher.finalize();
    Ok(format!("{digest:x}"))
}

/// MD5 of the file at `path`, skipping every line that starts with `comment_prefix`.
///
/// Kept lines are hashed verbatim, including their line terminator. A file made
/// only of comment lines hashes to [`EMPTY_MD5`].
///
/// # Errors
///
/// Same conditions as [`md5_file`].
pub fn md5_file_uncommented(path: &Path, comment_prefix: char) -> Result<String, DigestError> {
    let file = open_regular(path)?;
    let mut reader = BufReader::new(file);
    let mut prefix = [0u8; 4];
    let prefix = comment_prefix.encode_utf8(&mut prefix).as_bytes();

    let mut hasher = Md5::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|source| DigestError::Io {
                path: path.to_owned(),
                source,
            })?;
        if read == 0 {
            break;
        }
        if !line.starts_with(prefix) {
            hasher.update(&line);
        }
    }
    let digest = hasher.finalize();
    Ok(format!("{digest:x}"))
}

fn open_regular(path: &Path) -> Result<File, DigestError> {
    reject_descriptor_path(path)?;

    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DigestError::FileNotFound {
                path: path.to_owned(),
            });
        }
        Err(source) => {
            return Err(DigestError::Io {
                path: path.to_owned(),
                source,
            });
        }
    };

    if metadata.is_dir() {
        return Err(DigestError::Io {
            path: path.to_owned(),
            source: io::Error::from(io::ErrorKind::IsADirectory),
        });
    }

    File::open(path).map_err(|source| DigestError::Io {
        path: path.to_owned(),
        source,
    })
}

fn reject_descriptor_path(path: &Path) -> Result<(), DigestError> {
    let lossy = path.to_string_lossy();
    let raw: &str = &lossy;
    if raw.is_empty() {
        return Err(DigestError::InvalidArgument {
            reason: "checksum requires a file path, got an empty path".to_owned(),
        });
    }
    if DESCRIPTOR_PATHS.contains(&raw)
        || DESCRIPTOR_PREFIXES.iter().any(|p| raw.starts_with(p))
    {
        return Err(DigestError::InvalidArgument {
            reason: format!("checksum requires a file path, not an open handle ({raw})"),
        });
    }
    Ok(())
}
