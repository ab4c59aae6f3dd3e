#![allow(clippy::unwrap_used)]
//! Integration tests for the setup procedure.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use buddy::{
    CONDA_PREFIX_VAR, CloneConfig, CloneOutcome, EnvSource, EnvironmentError, ExternalRepository,
    Git, GitError, RepositoryDescriptor, RepositoryError, SetupConfig, SetupError, SystemGit,
    import_repository_details, run_setup,
};
use tempfile::TempDir;

const HEAD: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";

#[derive(Default)]
struct FakeEnv {
    vars: HashMap<String, String>,
    programs: HashMap<String, PathBuf>,
}

impl EnvSource for FakeEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        self.programs.get(program).cloned()
    }
}

/// Records clones and materialises them as plain directories.
#[derive(Default)]
struct RecordingGit {
    cloned: RefCell<Vec<String>>,
}

impl Git for RecordingGit {
    fn clone_into(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        self.cloned.borrow_mut().push(url.to_owned());
        fs::create_dir_all(dest).unwrap();
        Ok(())
    }

    fn checkout(&self, _repo: &Path, _commit: &str) -> Result<(), GitError> {
        Ok(())
    }

    fn head_commit(&self, _repo: &Path) -> Result<String, GitError> {
        Ok(HEAD.to_owned())
    }
}

fn conda_env(prefix: &str) -> FakeEnv {
    let mut env = FakeEnv::default();
    env.vars.insert(CONDA_PREFIX_VAR.to_owned(), prefix.to_owned());
    env.programs
        .insert("python".to_owned(), PathBuf::from(prefix).join("bin").join("python"));
    env
}

#[test]
fn test_default_setup_does_nothing() {
    let summary = run_setup(
        &SetupConfig::default(),
        &FakeEnv::default(),
        &RecordingGit::default(),
    )
    .unwrap();
    assert!(!summary.environment_checked);
    assert_eq!(summary.dirs_checked, 0);
    assert!(summary.cloned.is_empty());
}

#[test]
fn test_full_setup() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    fs::create_dir(&data).unwrap();
    let dirs = tmp.path().join("dirs.yaml");
    fs::write(&dirs, format!("- {}\n", data.display())).unwrap();

    let present = tmp.path().join("lib").join("present");
    fs::create_dir_all(&present).unwrap();
    let repos = tmp.path().join("repos.yaml");
    fs::write(
        &repos,
        format!(
            concat!(
                "fresh:\n  url: https://some_url.org/fresh.git\n  commit: a1b2c3d\n  output: {}\n",
                "present:\n  url: https://some_url.org/present.git\n",
                "  commit: a1b2c3d4\n  output: {}\n",
            ),
            tmp.path().join("lib").join("fresh").display(),
            present.display(),
        ),
    )
    .unwrap();

    let mut config = SetupConfig::default();
    config.conda_prefix = Some("/opt/env".to_owned());
    config.required_dirs = Some(dirs);
    config.repositories = Some(repos);
    let git = RecordingGit::default();

    let summary = run_setup(&config, &conda_env("/opt/env"), &git).unwrap();

    assert!(summary.environment_checked);
    assert_eq!(summary.dirs_checked, 1);
    assert_eq!(summary.cloned, vec!["fresh"]);
    assert_eq!(summary.already_present, vec!["present"]);
    assert_eq!(*git.cloned.borrow(), vec!["https://some_url.org/fresh.git"]);
    assert!(tmp.path().join("lib").join("fresh").is_dir());
}

#[test]
fn test_setup_stops_on_wrong_environment() {
    let tmp = TempDir::new().unwrap();
    let mut config = SetupConfig::default();
    config.conda_prefix = Some("/opt/env".to_owned());
    config.required_dirs = Some(tmp.path().join("dirs.yaml"));

    let err = run_setup(&config, &FakeEnv::default(), &RecordingGit::default()).unwrap_err();
    assert!(matches!(
        err,
        SetupError::Environment(EnvironmentError::NotActivated)
    ));
}

#[test]
fn test_setup_names_failing_repository() {
    let tmp = TempDir::new().unwrap();
    let diverged = tmp.path().join("diverged");
    fs::create_dir(&diverged).unwrap();
    let repos = tmp.path().join("repos.yaml");
    fs::write(
        &repos,
        format!(
            "diverged:\n  url: https://some_url.org\n  commit: 0000000\n  output: {}\n",
            diverged.display()
        ),
    )
    .unwrap();
    let mut config = SetupConfig::default();
    config.repositories = Some(repos);

    let err = run_setup(&config, &FakeEnv::default(), &RecordingGit::default()).unwrap_err();
    match err {
        SetupError::Repository { name, source } => {
            assert_eq!(name, "diverged");
            assert!(matches!(source, RepositoryError::CommitMismatch { .. }));
        }
        other => panic!("expected repository error, got {other:?}"),
    }
}

#[test]
fn test_import_repository_details_from_yaml() {
    let tmp = TempDir::new().unwrap();
    let repos = tmp.path().join("repos.yaml");
    fs::write(
        &repos,
        "
repo1:
    url: https://some_url.org
    commit: a1b2c3d
    output: ./store/me/here/repo_name
repo2:
    url: git@github.com:user/my_package.git
    commit: fedcba9876
    output: my_local_package
",
    )
    .unwrap();

    let parsed = import_repository_details(&repos).unwrap();
    let repo1: RepositoryDescriptor =
        ExternalRepository::new("https://some_url.org", "a1b2c3d", "./store/me/here/repo_name")
            .unwrap()
            .into();
    let repo2: RepositoryDescriptor = ExternalRepository::new(
        "git@github.com:user/my_package.git",
        "fedcba9876",
        "my_local_package",
    )
    .unwrap()
    .into();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed["repo1"], repo1);
    assert_eq!(parsed["repo2"], repo2);
}

#[test]
fn test_unquoted_numeric_commits_are_accepted() {
    let tmp = TempDir::new().unwrap();
    let repos = tmp.path().join("repos.yaml");
    fs::write(
        &repos,
        concat!(
            "digits:\n  url: https://some_url.org\n  commit: 1234567\n  output: a\n",
            "exponent:\n  url: https://some_url.org\n  commit: 12e4567\n  output: b\n",
            "zeros:\n  url: https://some_url.org\n  commit: 0000000\n  output: c\n",
        ),
    )
    .unwrap();

    let parsed = import_repository_details(&repos).unwrap();

    assert_eq!(parsed["digits"].commit(), "1234567");
    assert_eq!(parsed["exponent"].commit(), "12e4567");
    assert_eq!(parsed["zeros"].commit(), "0000000");
}

// ---- real git ----

fn git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=sidekick",
            "-c",
            "user.email=sidekick@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

#[test]
fn test_system_git_clones_pinned_commit() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    fs::create_dir(&source).unwrap();
    if git(&source, &["init", "--quiet"]).is_none() {
        eprintln!("git unavailable; skipping");
        return;
    }
    fs::write(source.join("file.txt"), "first\n").unwrap();
    git(&source, &["add", "file.txt"]).unwrap();
    git(&source, &["commit", "--quiet", "-m", "first"]).unwrap();
    let first = git(&source, &["rev-parse", "HEAD"]).unwrap();
    fs::write(source.join("file.txt"), "second\n").unwrap();
    git(&source, &["commit", "--quiet", "-am", "second"]).unwrap();

    let output = tmp.path().join("clones").join("pinned");
    let repo =
        ExternalRepository::new(source.to_string_lossy(), &first[..10], &output).unwrap();
    let config = CloneConfig::default();

    assert!(!repo.local_exists());
    assert_eq!(repo.clone_repo(&SystemGit, &config).unwrap(), CloneOutcome::Cloned);
    assert!(repo.local_exists());
    assert_eq!(fs::read_to_string(output.join("file.txt")).unwrap(), "first\n");
    assert_eq!(
        repo.clone_repo(&SystemGit, &config).unwrap(),
        CloneOutcome::AlreadyPresent
    );

    let missing = ExternalRepository::new(
        source.to_string_lossy(),
        "0123456789abcdef",
        tmp.path().join("clones").join("missing"),
    )
    .unwrap();
    assert!(matches!(
        missing.clone_repo(&SystemGit, &config),
        Err(RepositoryError::CommitNotFound { .. })
    ));

    let unreachable = ExternalRepository::new(
        tmp.path().join("no_such_repo").to_string_lossy(),
        "a1b2c3d",
        tmp.path().join("clones").join("unreachable"),
    )
    .unwrap();
    assert!(matches!(
        unreachable.clone_repo(&SystemGit, &config),
        Err(RepositoryError::SourceUnavailable { .. })
    ));
}
