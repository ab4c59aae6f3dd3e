//! The setup procedure: environment, directories, then pinned repositories.

use tracing::info;

use crate::config::SetupConfig;
use crate::directories::check_required_dirs_from;
use crate::environment::{EnvSource, EnvironmentCheck};
use crate::error::SetupError;
use crate::repository::{CloneOutcome, Git, import_repository_details};

/// What a successful setup did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct SetupSummary {
    /// Whether the environment was checked (a prefix was configured).
    pub environment_checked: bool,
    /// Number of required directories checked.
    pub dirs_checked: usize,
    /// Repositories cloned by this run, in name order.
    pub cloned: Vec<String>,
    /// Repositories that were already at their pinned commit, in name order.
    pub already_present: Vec<String>,
}

/// Run every configured setup step; the first failure stops the run.
///
/// # Errors
///
/// - [`SetupError::Environment`] if the environment is not the expected one.
/// - [`SetupError::Manifest`] if a setup manifest cannot be read.
/// - [`SetupError::MissingDirectories`] if required directories are missing.
/// - [`SetupError::Repository`] if a repository cannot be cloned or verified.
pub fn run_setup(
    config: &SetupConfig,
    env: &dyn EnvSource,
    git: &dyn Git,
) -> Result<SetupSummary, SetupError> {
    let mut summary = SetupSummary::default();

    if let Some(prefix) = config.conda_prefix.as_deref() {
        EnvironmentCheck::new(env).verify(prefix, config.require_r)?;
        summary.environment_checked = true;
        info!(prefix, "environment ok");
    }

    if let Some(path) = config.required_dirs.as_deref() {
        summary.dirs_checked = check_required_dirs_from(path)?;
        info!(count = summary.dirs_checked, "required directories ok");
    }

    if let Some(path) = config.repositories.as_deref() {
        let repositories = import_repository_details(path)?;
        for (name, repo) in &repositories {
            let outcome = repo
                .ensure(git, &config.clone)
                .map_err(|source| SetupError::Repository {
                    name: name.clone(),
                    source,
                })?;
            match outcome {
                CloneOutcome::Cloned => summary.cloned.push(name.clone()),
                CloneOutcome::AlreadyPresent => summary.already_present.push(name.clone()),
            }
        }
    }

    Ok(summary)
}
