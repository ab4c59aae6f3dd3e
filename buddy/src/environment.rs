//! Checks on the active conda environment.

use std::path::PathBuf;

use tracing::debug;

use crate::error::EnvironmentError;

/// Environment variable set by `conda activate`.
pub const CONDA_PREFIX_VAR: &str = "CONDA_PREFIX";

/// Where environment facts come from.
pub trait EnvSource {
    /// Value of an environment variable, if set and valid Unicode.
    fn var(&self, key: &str) -> Option<String>;

    /// First executable named `program` on `PATH`.
    fn which(&self, program: &str) -> Option<PathBuf>;
}

/// [`EnvSource`] backed by the current process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnv;

impl EnvSource for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}

/// Queries about the active conda environment.
#[derive(Clone, Copy)]
pub struct EnvironmentCheck<'a> {
    source: &'a dyn EnvSource,
}

impl<'a> EnvironmentCheck<'a> {
    #[must_use]
    pub fn new(source: &'a dyn EnvSource) -> Self {
        Self { source }
    }

    /// Prefix of the active environment, if any.
    #[must_use]
    pub fn active_prefix(&self) -> Option<String> {
        self.source.var(CONDA_PREFIX_VAR)
    }

    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.active_prefix().is_some()
    }

    #[must_use]
    pub fn matches_expected(&self, prefix: &str) -> bool {
        self.active_prefix().as_deref() == Some(prefix)
    }

    /// Whether `program` on `PATH` is the one installed in the active environment.
    ///
    /// # Errors
    ///
    /// - [`EnvironmentError::NotActivated`] if no environment is active.
    /// - [`EnvironmentError::InterpreterMismatch`] if `PATH` resolves `program`
    ///   elsewhere, or not at all.
    pub fn interpreter_matches(&self, program: &str) -> Result<(), EnvironmentError> {
        let prefix = self.active_prefix().ok_or(EnvironmentError::NotActivated)?;
        let expected = PathBuf::from(prefix).join("bin").join(program);
        let observed = self.source.which(program);
        debug!(
            program,
            expected = %expected.display(),
            observed = ?observed,
            "interpreter lookup"
        );
        if observed.as_ref() == Some(&expected) {
            Ok(())
        } else {
            Err(EnvironmentError::InterpreterMismatch {
                program: program.to_owned(),
                expected,
                observed,
            })
        }
    }

    #[must_use]
    pub fn python_matches(&self) -> bool {
        self.interpreter_matches("python").is_ok()
    }

    #[must_use]
    pub fn rscript_matches(&self) -> bool {
        self.interpreter_matches("Rscript").is_ok()
    }

    /// Every environment requirement of the project.
    ///
    /// # Errors
    ///
    /// The first unmet requirement, checked in order: activated, expected
    /// prefix, `python`, then `Rscript` when `require_r` is set.
    pub fn verify(&self, expected_prefix: &str, require_r: bool) -> Result<(), EnvironmentError> {
        let active = self.active_prefix().ok_or(EnvironmentError::NotActivated)?;
        if active != expected_prefix {
            return Err(EnvironmentError::PrefixMismatch {
                expected: expected_prefix.to_owned(),
                observed: active,
            });
        }
        self.interpreter_matches("python")?;
        if require_r {
            self.interpreter_matches("Rscript")?;
        }
        Ok(())
    }
}
