use std::path::Path;

use ripple_core::TagFormat;
use ripple_git::{CommitInfo, ReleaseTag, Repository, TagInfo};

use crate::Result;
use crate::traits::VcsProvider;

pub struct Git2Provider;

impl Git2Provider {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for Git2Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl VcsProvider for Git2Provider {
    fn head_commit(&self, project_root: &Path) -> Result<String> {
        let repo = Repository::open(project_root)?;
        Ok(repo.head_commit()?)
    }

    fn last_release_tag(
        &self,
        project_root: &Path,
        package: &str,
        format: TagFormat,
    ) -> Result<Option<ReleaseTag>> {
        let repo = Repository::open(project_root)?;
        Ok(repo.last_release_tag(package, format)?)
    }

    fn commits_since(
        &self,
        project_root: &Path,
        since: Option<&str>,
        scope: Option<&Path>,
    ) -> Result<Vec<CommitInfo>> {
        let repo = Repository::open(project_root)?;
        Ok(repo.commits_since(since, scope)?)
    }

    fn create_tag(&self, project_root: &Path, tag_name: &str, message: &str) -> Result<TagInfo> {
        let repo = Repository::open(project_root)?;
        Ok(repo.create_tag(tag_name, message)?)
    }
}
