use ripple_core::PrereleaseLabel;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version '{0}'")]
    Unparseable(String),

    #[error("version '{0}' is not a pre-release")]
    NotPrerelease(String),

    #[error("invalid pre-release label '{0}' (expected one of: dev, alpha, beta, rc)")]
    InvalidLabel(String),

    #[error("cannot escalate '{version}' from {from} to {to}: label must move forward")]
    NotEscalation {
        version: String,
        from: PrereleaseLabel,
        to: PrereleaseLabel,
    },

    #[error("pre-release counter must be at least 1, got {0}")]
    InvalidCounter(u64),

    #[error("cannot advance '{0}': a version component would overflow")]
    Overflow(String),
}

impl VersionError {
    /// True for every variant describing an unusable version or transition.
    #[must_use]
    pub fn is_invalid_version(&self) -> bool {
        matches!(
            self,
            Self::Unparseable(_)
                | Self::NotPrerelease(_)
                | Self::NotEscalation { .. }
                | Self::Overflow(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VersionError>;
