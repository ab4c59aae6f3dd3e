//! Pinned git repositories: descriptors, manifest parsing and the clone state
//! machine.
//!
//! An external repository is either **absent** (its output path does not
//! exist) or **present**. Cloning an absent repository stages the clone in a
//! temporary directory next to the output, checks out the pinned commit and
//! renames the result into place. A present repository is only verified: a
//! checkout at another commit is reported, never overwritten.

pub mod git;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

pub use git::{Git, SystemGit};

use crate::config::{CloneConfig, MIN_COMMIT_LEN};
use crate::error::{GitError, ManifestError, RepositoryError};
use crate::manifest::{RawManifest, read_manifest, value_kind};

const STAGING_PREFIX: &str = ".sidekick-clone-";

/// What [`ExternalRepository::clone_repo`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    /// The repository was cloned and checked out at the pinned commit.
    Cloned,
    /// The output already existed at the pinned commit; nothing was changed.
    AlreadyPresent,
}

/// A repository that already lives on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    path: PathBuf,
    commit: String,
}

impl LocalRepository {
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidCommit`] if `commit` is shorter than
    /// seven characters or not hexadecimal.
    pub fn new(
        path: impl Into<PathBuf>,
        commit: impl Into<String>,
    ) -> Result<Self, RepositoryError> {
        let commit = commit.into();
        validate_commit(&commit, MIN_COMMIT_LEN)?;
        Ok(Self {
            path: path.into(),
            commit,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }

    #[must_use]
    pub fn local_exists(&self) -> bool {
        self.path.exists()
    }

    /// Check that the repository is checked out at its pinned commit.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::LocalMissing`] if the path does not exist.
    /// - [`RepositoryError::CommitMismatch`] if another commit is checked out.
    /// - [`RepositoryError::InvalidCommit`] if the commit is shorter than the
    ///   configured minimum.
    pub fn verify(&self, git: &dyn Git, config: &CloneConfig) -> Result<(), RepositoryError> {
        validate_commit(&self.commit, config.effective_min_commit_len())?;
        if !self.local_exists() {
            return Err(RepositoryError::LocalMissing {
                path: self.path.clone(),
            });
        }
        verify_head(git, &self.path, &self.commit)
    }
}

/// A repository to clone from a URL or path into a local output path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRepository {
    source: String,
    commit: String,
    output: PathBuf,
}

impl ExternalRepository {
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidCommit`] if `commit` is shorter than
    /// seven characters or not hexadecimal.
    pub fn new(
        source: impl Into<String>,
        commit: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> Result<Self, RepositoryError> {
        let commit = commit.into();
        validate_commit(&commit, MIN_COMMIT_LEN)?;
        Ok(Self {
            source: source.into(),
            commit,
            output: output.into(),
        })
    }

    /// URL or path the repository is cloned from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }

    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Whether the output path exists. Says nothing about its contents.
    #[must_use]
    pub fn local_exists(&self) -> bool {
        self.output.exists()
    }

    /// Materialise the output path at the pinned commit, or verify an existing one.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::InvalidCommit`] if the commit is shorter than the
    ///   configured minimum.
    /// - [`RepositoryError::SourceUnavailable`] if the source cannot be cloned.
    /// - [`RepositoryError::CommitNotFound`] if the pinned commit cannot be checked out.
    /// - [`RepositoryError::CommitMismatch`] if the output exists at another commit.
    /// - [`RepositoryError::Io`] if staging or moving the clone fails.
    pub fn clone_repo(
        &self,
        git: &dyn Git,
        config: &CloneConfig,
    ) -> Result<CloneOutcome, RepositoryError> {
        validate_commit(&self.commit, config.effective_min_commit_len())?;

        if self.local_exists() {
            verify_head(git, &self.output, &self.commit)?;
            info!(
                output = %self.output.display(),
                commit = %self.commit,
                "repository already at pinned commit"
            );
            return Ok(CloneOutcome::AlreadyPresent);
        }

        let parent = staging_parent(&self.output);
        fs::create_dir_all(parent).map_err(|source| RepositoryError::Io {
            path: parent.to_owned(),
            source,
        })?;
        // Removed on drop, taking any partial clone with it.
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent)
            .map_err(|source| RepositoryError::Io {
                path: parent.to_owned(),
                source,
            })?;
        let checkout_dir = staging.path().join("repo");

        info!(url = %self.source, dest = %checkout_dir.display(), "cloning repository");
        git.clone_into(&self.source, &checkout_dir)
            .map_err(|e| match e {
                e @ GitError::Failed { .. } => RepositoryError::SourceUnavailable {
                    url: self.source.clone(),
                    detail: e.to_string(),
                },
                other => other.into(),
            })?;

        git.checkout(&checkout_dir, &self.commit)
            .map_err(|e| match e {
                e @ GitError::Failed { .. } => RepositoryError::CommitNotFound {
                    url: self.source.clone(),
                    commit: self.commit.clone(),
                    detail: e.to_string(),
                },
                other => other.into(),
            })?;

        fs::rename(&checkout_dir, &self.output).map_err(|source| RepositoryError::Io {
            path: self.output.clone(),
            source,
        })?;
        info!(
            output = %self.output.display(),
            commit = %self.commit,
            "repository cloned"
        );
        Ok(CloneOutcome::Cloned)
    }
}

/// Either kind of repository a manifest can declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryDescriptor {
    Local(LocalRepository),
    External(ExternalRepository),
}

impl RepositoryDescriptor {
    #[must_use]
    pub fn commit(&self) -> &str {
        match self {
            Self::Local(r) => r.commit(),
            Self::External(r) => r.commit(),
        }
    }

    /// Path the repository lives at locally.
    #[must_use]
    pub fn local_path(&self) -> &Path {
        match self {
            Self::Local(r) => r.path(),
            Self::External(r) => r.output(),
        }
    }

    #[must_use]
    pub fn local_exists(&self) -> bool {
        self.local_path().exists()
    }

    /// Clone an external repository, or verify a local one.
    ///
    /// # Errors
    ///
    /// See [`ExternalRepository::clone_repo`] and [`LocalRepository::verify`].
    pub fn ensure(
        &self,
        git: &dyn Git,
        config: &CloneConfig,
    ) -> Result<CloneOutcome, RepositoryError> {
        match self {
            Self::Local(r) => r.verify(git, config).map(|()| CloneOutcome::AlreadyPresent),
            Self::External(r) => r.clone_repo(git, config),
        }
    }
}

impl From<LocalRepository> for RepositoryDescriptor {
    fn from(value: LocalRepository) -> Self {
        Self::Local(value)
    }
}

impl From<ExternalRepository> for RepositoryDescriptor {
    fn from(value: ExternalRepository) -> Self {
        Self::External(value)
    }
}

/// Raw fields of one repository manifest entry.
///
/// External: `url`, `commit`, `output`. Local: `path`, `commit`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RepositoryEntry {
    url: Option<String>,
    path: Option<PathBuf>,
    commit: String,
    output: Option<PathBuf>,
}

impl RepositoryEntry {
    fn into_descriptor(self, name: &str) -> Result<RepositoryDescriptor, ManifestError> {
        let schema_error = |message: String| ManifestError::Schema {
            entry: name.to_owned(),
            message,
        };

        let descriptor: Result<RepositoryDescriptor, RepositoryError> =
            match (self.url, self.path, self.output) {
                (Some(url), None, Some(output)) => {
                    ExternalRepository::new(url, self.commit, output).map(Into::into)
                }
                (None, Some(path), None) => {
                    LocalRepository::new(path, self.commit).map(Into::into)
                }
                (Some(_), None, None) => {
                    return Err(schema_error("missing field `output`".to_owned()));
                }
                _ => {
                    return Err(schema_error(
                        "expected either `url` + `output` or `path`, together with `commit`"
                            .to_owned(),
                    ));
                }
            };
        descriptor.map_err(|e| schema_error(e.to_string()))
    }
}

/// Read a repository manifest from disk.
///
/// # Errors
///
/// See [`read_manifest`].
pub fn read_repository_details(path: &Path) -> Result<RawManifest, ManifestError> {
    read_manifest(path)
}

/// Build repository descriptors from a parsed repository manifest.
///
/// # Errors
///
/// Returns [`ManifestError::Schema`] for the first entry (in name order) that is
/// not a mapping, has unknown or missing fields, or pins a malformed commit.
pub fn parse_repository_details(
    manifest: &RawManifest,
) -> Result<BTreeMap<String, RepositoryDescriptor>, ManifestError> {
    manifest
        .iter()
        .map(|(name, value)| {
            if !value.is_object() {
                return Err(ManifestError::Schema {
                    entry: name.clone(),
                    message: format!("expected a mapping, found {}", value_kind(value)),
                });
            }
            let entry = RepositoryEntry::deserialize(value).map_err(|e| ManifestError::Schema {
                entry: name.clone(),
                message: e.to_string(),
            })?;
            Ok((name.clone(), entry.into_descriptor(name)?))
        })
        .collect()
}

/// Read and parse a repository manifest.
///
/// # Errors
///
/// Any [`ManifestError`] from reading or parsing the manifest.
pub fn import_repository_details(
    path: &Path,
) -> Result<BTreeMap<String, RepositoryDescriptor>, ManifestError> {
    let manifest = read_repository_details(path)?;
    parse_repository_details(&manifest)
}

/// Commit identifiers are hexadecimal, at least `min_len` characters long.
///
/// # Errors
///
/// Returns [`RepositoryError::InvalidCommit`] otherwise.
pub fn validate_commit(commit: &str, min_len: usize) -> Result<(), RepositoryError> {
    let min_len = min_len.max(MIN_COMMIT_LEN);
    if commit.len() < min_len || !commit.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(RepositoryError::InvalidCommit {
            commit: commit.to_owned(),
            min_len,
        });
    }
    Ok(())
}

/// A pinned commit matches when it is a prefix of the observed SHA, ignoring case.
#[must_use]
pub fn commit_matches(pinned: &str, observed: &str) -> bool {
    !pinned.is_empty()
        && observed
            .to_ascii_lowercase()
            .starts_with(&pinned.to_ascii_lowercase())
}

fn verify_head(git: &dyn Git, repo: &Path, pinned: &str) -> Result<(), RepositoryError> {
    let observed = git.head_commit(repo)?;
    if commit_matches(pinned, &observed) {
        Ok(())
    } else {
        Err(RepositoryError::CommitMismatch {
            output: repo.to_owned(),
            expected: pinned.to_owned(),
            observed,
        })
    }
}

fn staging_parent(output: &Path) -> &Path {
    output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
