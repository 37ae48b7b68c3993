use std::path::Path;

use ripple_core::TagFormat;
use ripple_git::{CommitInfo, ReleaseTag, TagInfo};

use crate::Result;

pub trait VcsProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the repository cannot be opened or has no commits.
    fn head_commit(&self, project_root: &Path) -> Result<String>;

    /// # Errors
    ///
    /// Returns an error if the repository cannot be opened or tags cannot be listed.
    fn last_release_tag(
        &self,
        project_root: &Path,
        package: &str,
        format: TagFormat,
    ) -> Result<Option<ReleaseTag>>;

    /// Commits after `since` (or all history), newest first, optionally only
    /// those touching `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be opened or `since` does not resolve.
    fn commits_since(
        &self,
        project_root: &Path,
        since: Option<&str>,
        scope: Option<&Path>,
    ) -> Result<Vec<CommitInfo>>;

    /// # Errors
    ///
    /// Returns an error if the tag cannot be created or already exists.
    fn create_tag(&self, project_root: &Path, tag_name: &str, message: &str) -> Result<TagInfo>;
}
