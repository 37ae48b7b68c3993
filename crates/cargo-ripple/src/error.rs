use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to determine current directory")]
    CurrentDir(#[source] std::io::Error),

    #[error(transparent)]
    Operation(#[from] ripple_operations::OperationError),

    #[error("project error")]
    Project(#[from] ripple_project::ProjectError),

    #[error("version error")]
    Version(#[from] ripple_version::VersionError),

    #[error("failed to start the async runtime")]
    Runtime(#[source] std::io::Error),

    #[error("publish incomplete: {failed} failed, {pending} not attempted")]
    PublishIncomplete { failed: usize, pending: usize },

    #[error("failed to restore {0} pinned manifest(s) after interrupt")]
    RestoreFailed(usize),
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::CliError;

    #[test]
    fn publish_incomplete_counts_both_kinds() {
        let err = CliError::PublishIncomplete {
            failed: 1,
            pending: 3,
        };

        let msg = err.to_string();

        assert!(msg.contains("1 failed"));
        assert!(msg.contains("3 not attempted"));
    }

    #[test]
    fn project_error_has_source_chain() {
        let project_err = ripple_project::ProjectError::NotFound {
            start_dir: PathBuf::from("/test"),
        };
        let cli_err: CliError = project_err.into();

        let source = std::error::Error::source(&cli_err);

        assert!(source.is_some());
        assert!(source.expect("source").to_string().contains("/test"));
    }

    #[test]
    fn operation_errors_are_shown_directly() {
        let err: CliError = ripple_operations::OperationError::InvalidConcurrency.into();

        assert_eq!(err.to_string(), "concurrency must be at least 1");
    }

    #[test]
    fn version_error_converts_via_from() {
        let err: CliError = ripple_version::VersionError::NotPrerelease("1.0.0".to_string()).into();

        assert!(matches!(err, CliError::Version(_)));
    }
}
