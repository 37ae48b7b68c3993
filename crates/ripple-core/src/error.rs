use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown pre-release label '{0}' (expected one of: dev, alpha, beta, rc)")]
    UnknownLabel(String),

    #[error("unknown version scheme '{0}' (expected 'semver' or 'compact')")]
    UnknownScheme(String),

    #[error("unknown bump type '{0}'")]
    UnknownBump(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
