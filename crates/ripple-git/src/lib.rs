mod error;
mod repository;
mod types;

pub use error::GitError;
pub use repository::Repository;
pub use types::{CommitInfo, ReleaseTag, TagInfo};

use std::path::Path;

pub type Result<T> = std::result::Result<T, GitError>;

/// # Errors
///
/// Returns an error if the path is not a git repository or HEAD has no commit.
pub fn head_commit(path: &Path) -> Result<String> {
    Repository::open(path)?.head_commit()
}
