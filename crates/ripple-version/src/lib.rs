mod bump;
mod error;
mod prerelease;

pub use bump::{bump_info, bump_version, next_release_version};
pub use error::{Result, VersionError};
pub use prerelease::{
    PrereleaseInfo, apply_prerelease, compare_versions, escalate_prerelease, increment_prerelease,
    is_prerelease, parse, promote_to_stable,
};
