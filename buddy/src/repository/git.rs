//! Access to `git`.
//!
//! The clone state machine only talks to the [`Git`] trait; [`SystemGit`]
//! shells out to the `git` executable on `PATH`.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::GitError;

/// The `git` operations needed to materialise and verify a pinned repository.
pub trait Git {
    /// Clone `url` (a URL or a local path) into `dest`, which must not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`GitError`] if `git` cannot run or the clone fails.
    fn clone_into(&self, url: &str, dest: &Path) -> Result<(), GitError>;

    /// Check out `commit` (full or abbreviated) in the repository at `repo`.
    ///
    /// # Errors
    ///
    /// Returns a [`GitError`] if `git` cannot run or the commit is unknown.
    fn checkout(&self, repo: &Path, commit: &str) -> Result<(), GitError>;

    /// Full SHA of the commit checked out at `repo`.
    ///
    /// # Errors
    ///
    /// Returns a [`GitError`] if `git` cannot run or `repo` is not a repository.
    fn head_commit(&self, repo: &Path) -> Result<String, GitError>;
}

/// [`Git`] backed by the `git` executable.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemGit;

impl SystemGit {
    fn run(args: &[&str], current_dir: Option<&Path>) -> Result<String, GitError> {
        let command = args.join(" ");
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = current_dir {
            cmd.current_dir(dir);
        }
        debug!(command = %command, "running git");

        let output = cmd.output().map_err(|source| GitError::Spawn {
            command: command.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(GitError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }
}

impl Git for SystemGit {
    fn clone_into(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        let dest = dest.to_string_lossy();
        Self::run(&clone_args(url, &dest), None).map(|_| ())
    }

    fn checkout(&self, repo: &Path, commit: &str) -> Result<(), GitError> {
        Self::run(&["checkout", "--quiet", "--detach", commit], Some(repo)).map(|_| ())
    }

    fn head_commit(&self, repo: &Path) -> Result<String, GitError> {
        Self::run(&["rev-parse", "HEAD"], Some(repo))
    }
}

/// Arguments for `git clone`. Everything after `--` is positional, so a `url`
/// starting with `-` is never read as an option.
fn clone_args<'a>(url: &'a str, dest: &'a str) -> [&'a str; 5] {
    ["clone", "--quiet", "--", url, dest]
}
