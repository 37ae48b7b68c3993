use ripple_core::TagFormat;
use ripple_version::compare_versions;
use tracing::debug;

use crate::{GitError, ReleaseTag, Result, TagInfo};

use super::Repository;

impl Repository {
    /// Creates an annotated tag on HEAD.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::TagExists`] if the name is taken, or a git error if
    /// the tag cannot be written.
    pub fn create_tag(&self, name: &str, message: &str) -> Result<TagInfo> {
        if self
            .inner
            .find_reference(&format!("refs/tags/{name}"))
            .is_ok()
        {
            return Err(GitError::TagExists {
                name: name.to_string(),
            });
        }

        let head = self.head()?;
        let sig = self.inner.signature()?;

        self.inner.tag(name, head.as_object(), &sig, message, false)?;
        debug!(tag = name, target = %head.id(), "created tag");

        Ok(TagInfo {
            name: name.to_string(),
            target_sha: head.id().to_string(),
        })
    }

    /// The highest-versioned release tag of `package` that HEAD contains.
    ///
    /// Tags whose version does not parse are ignored, as are tags on commits
    /// that are not ancestors of HEAD.
    ///
    /// # Errors
    ///
    /// Returns an error if tags cannot be listed or HEAD cannot be resolved.
    pub fn last_release_tag(&self, package: &str, format: TagFormat) -> Result<Option<ReleaseTag>> {
        let head = self.head()?.id();
        let pattern = format!("{}*", format.prefix(package));
        let names = self.inner.tag_names(Some(&pattern))?;

        let mut best: Option<ReleaseTag> = None;
        for name in names.iter().flatten() {
            let Some(version) = format.version_of(name, package) else {
                continue;
            };
            let Ok(target) = self.resolve_commit(name) else {
                continue;
            };
            if target != head && !self.inner.graph_descendant_of(head, target)? {
                continue;
            }

            let is_higher = match &best {
                None => compare_versions(version, version).is_ok(),
                Some(current) => compare_versions(version, &current.version)
                    .is_ok_and(std::cmp::Ordering::is_gt),
            };
            if is_higher {
                best = Some(ReleaseTag {
                    tag: TagInfo {
                        name: name.to_string(),
                        target_sha: target.to_string(),
                    },
                    version: version.to_string(),
                });
            }
        }

        debug!(package, tag = ?best.as_ref().map(|t| &t.tag.name), "resolved last release tag");
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{commit_file, setup_test_repo};
    use super::*;

    #[test]
    fn create_annotated_tag() -> anyhow::Result<()> {
        let (_dir, repo) = setup_test_repo()?;

        let tag_info = repo.create_tag("core@v1.0.0", "core 1.0.0")?;

        assert_eq!(tag_info.name, "core@v1.0.0");
        assert_eq!(tag_info.target_sha, repo.head_commit()?);

        let tag = repo.inner.find_reference("refs/tags/core@v1.0.0")?;
        assert!(tag.peel_to_tag().is_ok());

        Ok(())
    }

    #[test]
    fn duplicate_tag_fails() -> anyhow::Result<()> {
        let (_dir, repo) = setup_test_repo()?;

        repo.create_tag("v1.0.0", "First tag")?;
        let result = repo.create_tag("v1.0.0", "Duplicate tag");

        assert!(matches!(result, Err(GitError::TagExists { .. })));

        Ok(())
    }

    #[test]
    fn no_tags_means_no_release() -> anyhow::Result<()> {
        let (_dir, repo) = setup_test_repo()?;

        assert_eq!(repo.last_release_tag("core", TagFormat::CratePrefixed)?, None);

        Ok(())
    }

    #[test]
    fn picks_highest_version_not_latest_tag() -> anyhow::Result<()> {
        let (_dir, repo) = setup_test_repo()?;
        repo.create_tag("core@v1.10.0", "core")?;
        commit_file(&repo, "a.txt", "a", "fix: a")?;
        repo.create_tag("core@v1.9.0", "core backport")?;
        repo.create_tag("core@vgarbage", "ignored")?;

        let tag = repo
            .last_release_tag("core", TagFormat::CratePrefixed)?
            .expect("tag should exist");

        assert_eq!(tag.version, "1.10.0");
        assert_eq!(tag.tag.name, "core@v1.10.0");

        Ok(())
    }

    #[test]
    fn prefixed_tags_of_other_packages_are_ignored() -> anyhow::Result<()> {
        let (_dir, repo) = setup_test_repo()?;
        repo.create_tag("core-extra@v9.0.0", "other")?;
        repo.create_tag("core@v0.2.0", "core")?;

        let tag = repo
            .last_release_tag("core", TagFormat::CratePrefixed)?
            .expect("tag should exist");

        assert_eq!(tag.version, "0.2.0");

        Ok(())
    }

    #[test]
    fn version_only_tags() -> anyhow::Result<()> {
        let (_dir, repo) = setup_test_repo()?;
        repo.create_tag("v0.1.0", "release")?;
        commit_file(&repo, "a.txt", "a", "feat: a")?;
        repo.create_tag("v0.2.0-rc.1", "release candidate")?;

        let tag = repo
            .last_release_tag("anything", TagFormat::VersionOnly)?
            .expect("tag should exist");

        assert_eq!(tag.version, "0.2.0-rc.1");

        Ok(())
    }

    #[test]
    fn tags_off_the_head_history_are_ignored() -> anyhow::Result<()> {
        let (_dir, repo) = setup_test_repo()?;
        repo.create_tag("core@v1.0.0", "core")?;
        let base = repo.head()?;

        let sig = git2::Signature::now("Test", "test@example.com")?;
        let tree = base.tree()?;
        let side = repo
            .inner
            .commit(None, &sig, &sig, "side branch", &tree, &[&base])?;
        let side_commit = repo.inner.find_commit(side)?;
        repo.inner
            .tag("core@v2.0.0", side_commit.as_object(), &sig, "side", false)?;

        let tag = repo
            .last_release_tag("core", TagFormat::CratePrefixed)?
            .expect("tag should exist");

        assert_eq!(tag.version, "1.0.0");

        Ok(())
    }
}
