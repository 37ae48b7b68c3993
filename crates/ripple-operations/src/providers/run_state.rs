use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;
use crate::error::OperationError;
use crate::traits::RunStateStore;
use crate::types::RunState;

/// JSON run-state ledger at a fixed path.
///
/// Writes go to a sibling temp file that is renamed over the ledger, so a
/// crash mid-write leaves the previous snapshot intact.
pub struct FileSystemRunStateStore {
    path: PathBuf,
}

impl FileSystemRunStateStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store for `state_file` below `project_root`; absolute paths are
    /// used as given.
    #[must_use]
    pub fn for_project(project_root: &Path, state_file: &Path) -> Self {
        Self::new(project_root.join(state_file))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> OperationError {
        OperationError::RunStateWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl RunStateStore for FileSystemRunStateStore {
    fn load(&self) -> Result<Option<RunState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(OperationError::RunStateRead {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let state = serde_json::from_str(&content).map_err(|source| OperationError::RunStateParse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(state))
    }

    fn save(&self, state: &RunState) -> Result<()> {
        let content =
            serde_json::to_string_pretty(state).map_err(|source| OperationError::RunStateSerialize {
                path: self.path.clone(),
                source,
            })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.write_error(source))?;
        }

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        fs::write(&temp, content).map_err(|source| self.write_error(source))?;
        fs::rename(&temp, &self.path).map_err(|source| self.write_error(source))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.write_error(source)),
        }
    }
}
