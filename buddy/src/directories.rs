//! Required-directory checks.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SetupError;
use crate::manifest::read_path_list;

/// Entries of `dirs` that do not exist as directories, in input order.
#[must_use]
pub fn missing_dirs(dirs: &[PathBuf]) -> Vec<PathBuf> {
    dirs.iter().filter(|d| !d.is_dir()).cloned().collect()
}

/// Every entry of `dirs` must exist as a directory.
///
/// # Errors
///
/// Returns [`SetupError::MissingDirectories`] naming all missing entries.
pub fn check_required_dirs(dirs: &[PathBuf]) -> Result<(), SetupError> {
    let missing = missing_dirs(dirs);
    if missing.is_empty() {
        debug!(count = dirs.len(), "all required directories exist");
        Ok(())
    } else {
        Err(SetupError::MissingDirectories(missing))
    }
}

/// Read a YAML list of directories and check them. Returns how many were checked.
///
/// # Errors
///
/// [`SetupError::Manifest`] if the list cannot be read, otherwise as
/// [`check_required_dirs`].
pub fn check_required_dirs_from(path: &Path) -> Result<usize, SetupError> {
    let dirs = read_path_list(path)?;
    check_required_dirs(&dirs)?;
    Ok(dirs.len())
}
