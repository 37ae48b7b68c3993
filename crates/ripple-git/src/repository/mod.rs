mod log;
mod tag;

use std::path::{Path, PathBuf};

use crate::{GitError, Result};

pub struct Repository {
    pub(crate) inner: git2::Repository,
    root: PathBuf,
}

impl Repository {
    /// # Errors
    ///
    /// Returns [`GitError::NotARepository`] if the path is not inside a git repository.
    pub fn open(path: &Path) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|_| GitError::NotARepository {
            path: path.to_path_buf(),
        })?;

        let root = inner.workdir().ok_or_else(|| GitError::NotARepository {
            path: path.to_path_buf(),
        })?;

        // strip the \\?\ prefix on Windows
        let root = dunce::simplified(root).to_path_buf();

        Ok(Self { inner, root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full SHA of the commit HEAD points at.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::NoCommits`] for an unborn HEAD.
    pub fn head_commit(&self) -> Result<String> {
        Ok(self.head()?.id().to_string())
    }

    pub(crate) fn head(&self) -> Result<git2::Commit<'_>> {
        let head = self.inner.head().map_err(|_| GitError::NoCommits)?;
        Ok(head.peel_to_commit()?)
    }

    pub(crate) fn to_relative_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            let normalized = dunce::simplified(path);
            let root = dunce::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
            let normalized = dunce::canonicalize(normalized).unwrap_or_else(|_| normalized.to_path_buf());
            normalized
                .strip_prefix(&root)
                .map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
        } else {
            path.to_path_buf()
        }
    }
}
