use ripple_core::Package;
use ripple_manifest::{verify_version, write_version};
use tracing::info;

use crate::Result;
use crate::error::OperationError;
use crate::types::{PackageStatus, RunState};

/// Writes every non-skipped release version from `state` into its package
/// manifest. Returns the names whose manifest changed; rewriting an already
/// written version is a no-op, so a resumed run can call this again.
///
/// # Errors
///
/// Returns an error if a ledger entry has no package or a manifest cannot be
/// written or does not read back the written version.
pub fn write_release_versions(packages: &[Package], state: &RunState) -> Result<Vec<String>> {
    let mut changed = Vec::new();
    for (name, entry) in state.entries() {
        if entry.status == PackageStatus::Skipped {
            continue;
        }
        let package = packages
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| OperationError::UnknownPackage {
                name: name.to_string(),
            })?;

        if write_version(&package.manifest_path, &entry.version)? {
            info!(package = %name, version = %entry.version, "wrote manifest version");
            changed.push(name.to_string());
        }
        verify_version(&package.manifest_path, &entry.version)?;
    }
    Ok(changed)
}
