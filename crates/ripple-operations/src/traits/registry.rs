use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

#[async_trait]
pub trait Registry: Send + Sync {
    /// Waits until `name@version` is visible, checking every `interval` for at
    /// most `timeout`. Returns `false` on timeout.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that retrying cannot fix.
    async fn poll_available(
        &self,
        name: &str,
        version: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Result<bool>;

    /// A single visibility check.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    async fn is_published(&self, name: &str, version: &str) -> Result<bool>;

    /// Resolves `name@version` from the registry as a consumer would.
    ///
    /// # Errors
    ///
    /// Returns an error if the published version cannot be used.
    async fn smoke_test(&self, name: &str, version: &str) -> Result<()>;
}
