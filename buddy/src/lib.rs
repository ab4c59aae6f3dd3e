//! # buddy
//!
//! Helpers behind `sidekick`: manifest-driven file validation and the setup
//! procedure for a data-analysis project.
//!
//! Validation reads a YAML manifest of expected checksums, builds one
//! validator per entry, runs every validator and reports the failing ones.
//! Setup checks the active environment and required directories, then clones
//! pinned git repositories.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use buddy::{ValidationWorkflow, load_validators};
//!
//! let validators = load_validators(Path::new("validation.yaml")).unwrap();
//! let workflow = ValidationWorkflow::new(validators);
//!
//! let report = workflow.run();
//! println!("Checks run: {}", report.checked);
//! println!("{}", report.failure_report());
//! println!("OK: {}", report.ok);
//! ```

mod config;
mod directories;
mod environment;
mod error;
mod manifest;
pub mod output;
mod report;
pub mod repository;
mod setup;
mod validator;
mod workflow;

pub use config::{CloneConfig, MIN_COMMIT_LEN, SetupConfig};
pub use directories::{check_required_dirs, check_required_dirs_from, missing_dirs};
pub use environment::{CONDA_PREFIX_VAR, EnvSource, EnvironmentCheck, SystemEnv};
pub use error::{
    CheckError, EnvironmentError, GitError, ManifestError, RepositoryError, SetupError,
};
pub use manifest::{RawManifest, parse_document, parse_manifest, read_manifest, read_path_list};
pub use report::{CheckErrorRecord, FailureRecord, ValidationReport};
pub use repository::{
    CloneOutcome, ExternalRepository, Git, LocalRepository, RepositoryDescriptor, SystemGit,
    import_repository_details, parse_repository_details, read_repository_details,
};
pub use setup::{SetupSummary, run_setup};
pub use validator::{
    Check, MD5SUM_TEST_TYPE, Md5sumValidator, ValidationManifestEntry, Validator,
    load_validators, parse_validator_details,
};
pub use workflow::ValidationWorkflow;
