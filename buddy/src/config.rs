//! Configuration types for setup.
//!
//! Validation needs no configuration beyond its manifest path. Setup is split
//! into the clone options (how pinned commits are matched) and the overall
//! setup plan (which checks run, which manifests are read).

use std::path::PathBuf;

/// Shortest commit identifier accepted anywhere, regardless of configuration.
pub const MIN_COMMIT_LEN: usize = 7;

/// Options for cloning and verifying pinned repositories.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CloneConfig {
    /// Minimum length of a pinned commit identifier (default: 7).
    ///
    /// Values below [`MIN_COMMIT_LEN`] are raised to it. A pinned commit
    /// matches a checkout when it is a prefix of the checked-out SHA.
    pub min_commit_len: usize,
}

impl CloneConfig {
    /// The minimum commit length actually enforced.
    #[must_use]
    pub fn effective_min_commit_len(&self) -> usize {
        self.min_commit_len.max(MIN_COMMIT_LEN)
    }
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            min_commit_len: MIN_COMMIT_LEN,
        }
    }
}

/// What `sidekick setup` should check and materialise.
///
/// Every step is optional; an all-default config does nothing and succeeds.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct SetupConfig {
    /// Expected prefix of the active conda environment. Environment checks are
    /// skipped when unset.
    pub conda_prefix: Option<String>,
    /// Also require `Rscript` from the environment.
    pub require_r: bool,
    /// YAML list of directories that must exist.
    pub required_dirs: Option<PathBuf>,
    /// YAML manifest of pinned repositories to clone.
    pub repositories: Option<PathBuf>,
    /// Clone options.
    pub clone: CloneConfig,
}
