use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::PackageStatus;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Graph(#[from] ripple_graph::GraphError),

    #[error(transparent)]
    Git(#[from] ripple_git::GitError),

    #[error(transparent)]
    Project(#[from] ripple_project::ProjectError),

    #[error(transparent)]
    Manifest(#[from] ripple_manifest::ManifestError),

    #[error("version calculation failed")]
    VersionCalculation(#[from] ripple_version::VersionError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    #[error(
        "run state was recorded at commit {recorded} but HEAD is {current}; pass --fresh to start over"
    )]
    StaleRunState { recorded: String, current: String },

    #[error("unknown package '{name}'")]
    UnknownPackage { name: String },

    #[error("package '{package}' cannot move from {from} to {to}")]
    InvalidTransition {
        package: String,
        from: PackageStatus,
        to: PackageStatus,
    },

    #[error("build of '{package}' failed: {message}")]
    BuildFailed { package: String, message: String },

    #[error("'{package}@{version}' did not appear in the registry within {timeout:?}")]
    PublishTimeout {
        package: String,
        version: String,
        timeout: Duration,
    },

    #[error("publishing '{package}' failed: {message}")]
    PublishFailed { package: String, message: String },

    #[error("failed to run '{command}'")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("registry request failed")]
    Registry(#[from] reqwest::Error),

    #[error("failed to read run state file '{path}'")]
    RunStateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write run state file '{path}'")]
    RunStateWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse run state file '{path}'")]
    RunStateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize run state for '{path}'")]
    RunStateSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl OperationError {
    /// Folds any error raised inside a package pipeline into one of the
    /// per-package failure kinds, keeping the ones that already are.
    #[must_use]
    pub fn into_package_failure(self, package: &str) -> Self {
        match self {
            Self::BuildFailed { .. } | Self::PublishTimeout { .. } | Self::PublishFailed { .. } => {
                self
            }
            other => Self::PublishFailed {
                package: package.to_string(),
                message: display_chain(&other),
            },
        }
    }
}

/// The error message followed by each `source()` on the same line.
pub(crate) fn display_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub type Result<T> = std::result::Result<T, OperationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_run_state_names_both_commits() {
        let err = OperationError::StaleRunState {
            recorded: "abc123".to_string(),
            current: "def456".to_string(),
        };

        let msg = err.to_string();

        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }

    #[test]
    fn pipeline_failures_are_kept() {
        let err = OperationError::BuildFailed {
            package: "core".to_string(),
            message: "linker error".to_string(),
        };

        let folded = err.into_package_failure("core");

        assert!(matches!(folded, OperationError::BuildFailed { ref message, .. } if message == "linker error"));
    }

    #[test]
    fn unexpected_errors_become_publish_failures_with_causes() {
        let err = OperationError::RunStateWrite {
            path: PathBuf::from("/state.json"),
            source: std::io::Error::other("disk full"),
        };

        let folded = err.into_package_failure("core");

        let OperationError::PublishFailed { package, message } = folded else {
            panic!("expected PublishFailed");
        };
        assert_eq!(package, "core");
        assert!(message.contains("/state.json"));
        assert!(message.contains("disk full"));
    }

    #[test]
    fn publish_timeout_message() {
        let err = OperationError::PublishTimeout {
            package: "core".to_string(),
            version: "1.0.0".to_string(),
            timeout: Duration::from_secs(30),
        };

        assert_eq!(
            err.to_string(),
            "'core@1.0.0' did not appear in the registry within 30s"
        );
    }
}
