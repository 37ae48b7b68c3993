use crate::Result;
use crate::types::RunState;

/// Persistence for the run-state ledger. Calls are serialized by the
/// orchestrator.
pub trait RunStateStore: Send + Sync {
    /// Returns `Ok(None)` if no run has been recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if a recorded run exists but cannot be read or parsed.
    fn load(&self) -> Result<Option<RunState>>;

    /// # Errors
    ///
    /// Returns an error if the ledger cannot be written.
    fn save(&self, state: &RunState) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if a recorded run exists but cannot be removed.
    fn clear(&self) -> Result<()>;
}
