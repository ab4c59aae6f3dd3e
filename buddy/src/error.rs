//! Error types for manifests, checks, repositories and setup.

use std::io;
use std::path::{Path, PathBuf};

use buddy_digest::DigestError;
use thiserror::Error;

/// A manifest could not be turned into validators or repository descriptors.
///
/// Any of these aborts the whole workflow before a single check runs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// The manifest exists but could not be read.
    #[error("Failed to read manifest {}: {source}", path.display())]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The manifest is not valid YAML.
    #[error("Malformed manifest {}: {message}", path.display())]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The manifest is valid YAML but an entry does not have the expected shape.
    #[error("Invalid manifest entry '{entry}': {message}")]
    Schema {
        /// Key of the offending entry (or `<document>` for the top level).
        entry: String,
        /// What is wrong with it.
        message: String,
    },
}

/// A check could not produce a pass/fail answer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CheckError {
    /// Computing the checksum of the input failed.
    #[error(transparent)]
    Digest(#[from] DigestError),
}

/// Failure reported by the `git` adapter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GitError {
    /// `git` could not be started at all.
    #[error("failed to run `git {command}`: {source}")]
    Spawn {
        /// Sub-command and arguments.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// `git` ran and exited unsuccessfully.
    #[error("`git {command}` exited with {status}: {stderr}")]
    Failed {
        /// Sub-command and arguments.
        command: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Trimmed standard error.
        stderr: String,
    },
}

/// A pinned repository could not be materialised or verified.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepositoryError {
    /// The pinned commit identifier is malformed.
    #[error("Invalid commit '{commit}': expected at least {min_len} hexadecimal characters")]
    InvalidCommit {
        /// The rejected identifier.
        commit: String,
        /// Minimum accepted length.
        min_len: usize,
    },

    /// The source location could not be cloned.
    #[error("Source unavailable: {url}: {detail}")]
    SourceUnavailable {
        /// URL or path of the source repository.
        url: String,
        /// Output of the failed clone.
        detail: String,
    },

    /// The pinned commit does not exist in the fetched history.
    #[error("Commit {commit} not found in {url}: {detail}")]
    CommitNotFound {
        /// URL or path of the source repository.
        url: String,
        /// The pinned commit.
        commit: String,
        /// Output of the failed checkout.
        detail: String,
    },

    /// The local copy is checked out at a different commit than the pinned one.
    #[error(
        "Commit mismatch at {}: expected {expected}, found {observed}",
        output.display()
    )]
    CommitMismatch {
        /// Local path of the checkout.
        output: PathBuf,
        /// The pinned commit.
        expected: String,
        /// The commit currently checked out.
        observed: String,
    },

    /// A local repository path does not exist.
    #[error("Local repository not found: {}", path.display())]
    LocalMissing {
        /// The missing path.
        path: PathBuf,
    },

    /// Any other `git` failure.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Staging or moving the clone on the local filesystem failed.
    #[error("Filesystem error at {}: {source}", path.display())]
    Io {
        /// Path being created, moved or inspected.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// The active environment is not the one the project expects.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnvironmentError {
    /// No isolated environment is active.
    #[error("project should be running in a conda environment (CONDA_PREFIX is not set)")]
    NotActivated,

    /// An environment is active, but at a different prefix.
    #[error("path to the conda environment should be {expected}, found {observed}")]
    PrefixMismatch {
        /// Expected prefix.
        expected: String,
        /// Active prefix.
        observed: String,
    },

    /// An interpreter on `PATH` does not belong to the active environment.
    #[error(
        "`{program}` should be present in the conda environment at {}, found {}",
        expected.display(),
        display_optional_path(observed.as_deref())
    )]
    InterpreterMismatch {
        /// Program name (`python`, `Rscript`).
        program: String,
        /// Where the environment provides it.
        expected: PathBuf,
        /// What `PATH` resolves it to, if anything.
        observed: Option<PathBuf>,
    },
}

/// The setup procedure stopped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SetupError {
    /// Environment checks failed.
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    /// A setup manifest could not be read.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// One or more required directories do not exist.
    #[error("Missing required directories: {}", join_paths(.0))]
    MissingDirectories(Vec<PathBuf>),

    /// A repository could not be cloned or verified.
    #[error("Repository '{name}': {source}")]
    Repository {
        /// Key of the repository in its manifest.
        name: String,
        /// What went wrong.
        #[source]
        source: RepositoryError,
    },
}

fn display_optional_path(path: Option<&Path>) -> String {
    path.map_or_else(|| "nothing".to_owned(), |p| p.display().to_string())
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
