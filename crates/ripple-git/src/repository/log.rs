use std::path::Path;

use tracing::debug;

use crate::{CommitInfo, GitError, Result};

use super::Repository;

impl Repository {
    /// Commits reachable from HEAD but not from `since`, newest first.
    ///
    /// With `scope`, only commits whose diff against their first parent
    /// touches a file below that directory are returned. A scope equal to the
    /// repository root matches everything.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::RefNotFound`] if `since` does not resolve to a commit.
    pub fn commits_since(&self, since: Option<&str>, scope: Option<&Path>) -> Result<Vec<CommitInfo>> {
        let mut walk = self.inner.revwalk()?;
        walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        walk.push(self.head()?.id())?;

        if let Some(refspec) = since {
            walk.hide(self.resolve_commit(refspec)?)?;
        }

        let scope = scope
            .map(|path| self.to_relative_path(path))
            .filter(|relative| !relative.as_os_str().is_empty());

        let mut commits = Vec::new();
        for oid in walk {
            let commit = self.inner.find_commit(oid?)?;
            if let Some(relative) = &scope {
                if !self.touches(&commit, relative)? {
                    continue;
                }
            }
            commits.push(CommitInfo {
                sha: commit.id().to_string(),
                message: commit.message().unwrap_or_default().to_string(),
            });
        }

        debug!(
            since = since.unwrap_or("<root>"),
            scope = ?scope,
            count = commits.len(),
            "collected commits"
        );
        Ok(commits)
    }

    /// Resolves a tag name first, then any other revision spec.
    pub(super) fn resolve_commit(&self, refspec: &str) -> Result<git2::Oid> {
        let not_found = || GitError::RefNotFound {
            refspec: refspec.to_string(),
        };

        if let Ok(reference) = self.inner.find_reference(&format!("refs/tags/{refspec}")) {
            return Ok(reference.peel_to_commit().map_err(|_| not_found())?.id());
        }

        let object = self.inner.revparse_single(refspec).map_err(|_| not_found())?;
        Ok(object.peel_to_commit().map_err(|_| not_found())?.id())
    }

    fn touches(&self, commit: &git2::Commit<'_>, relative: &Path) -> Result<bool> {
        let tree = commit.tree()?;
        let parent_tree = match commit.parents().next() {
            Some(parent) => Some(parent.tree()?),
            None => None,
        };

        let diff = self
            .inner
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

        Ok(diff.deltas().any(|delta| {
            [delta.new_file().path(), delta.old_file().path()]
                .into_iter()
                .flatten()
                .any(|path| path.starts_with(relative))
        }))
    }
}
