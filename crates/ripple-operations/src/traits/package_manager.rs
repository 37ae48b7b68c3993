use std::path::Path;

use async_trait::async_trait;
use ripple_core::Package;

use crate::Result;
use crate::types::PublishOptions;

/// Builds and uploads one package. Both calls run while the package manifest
/// is pinned.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Builds `package` into `output_dir`, which is empty and private to this call.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OperationError::BuildFailed`] when the build tool fails.
    async fn build(&self, package: &Package, output_dir: &Path) -> Result<()>;

    /// # Errors
    ///
    /// Returns [`crate::OperationError::PublishFailed`] when the upload is rejected.
    async fn publish(&self, package: &Package, dist_dir: &Path, options: &PublishOptions) -> Result<()>;
}
