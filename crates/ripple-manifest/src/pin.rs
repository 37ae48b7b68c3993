//! Scoped pinning of internal dependencies
//!
//! A build must see exact versions for sibling crates while the working tree
//! keeps its `path`/`workspace` references. [`PinGuard`] rewrites a manifest
//! and puts the original bytes back when it goes out of scope, including
//! during unwinding. [`PinLedger`] tracks every live pin so a signal handler
//! can restore manifests whose guards will never run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use ripple_core::VersionMap;
use toml_edit::{DocumentMut, Item, TableLike, value};
use tracing::{debug, error, warn};

use crate::error::ManifestError;
use crate::writer::{validate_version, write_document};

const PINNED_SECTIONS: [&str; 2] = ["dependencies", "build-dependencies"];
const SOURCE_KEYS: [&str; 2] = ["path", "workspace"];

/// Original contents of every manifest currently pinned.
#[derive(Debug, Clone, Default)]
pub struct PinLedger {
    entries: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
}

impl PinLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, path: &Path, original: &[u8]) {
        self.lock().insert(path.to_path_buf(), original.to_vec());
    }

    fn release(&self, path: &Path) {
        self.lock().remove(path);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Manifests currently pinned.
    #[must_use]
    pub fn pinned_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Writes back the original bytes of every pinned manifest.
    ///
    /// Entries that were restored are removed from the ledger; failures stay
    /// registered and are returned.
    pub fn restore_all(&self) -> Vec<ManifestError> {
        let mut entries = self.lock();
        let mut failures = Vec::new();

        entries.retain(|path, original| match std::fs::write(path, original.as_slice()) {
            Ok(()) => {
                debug!(path = %path.display(), "restored pinned manifest");
                false
            }
            Err(source) => {
                failures.push(ManifestError::Restore {
                    path: path.clone(),
                    source,
                });
                true
            }
        });

        failures
    }
}

/// RAII guard over a manifest whose internal dependencies are pinned.
///
/// Dropping the guard restores the original bytes.
#[derive(Debug)]
pub struct PinGuard {
    path: PathBuf,
    original: Vec<u8>,
    pinned: Vec<String>,
    ledger: Option<PinLedger>,
    dirty: bool,
}

impl PinGuard {
    /// Pins `manifest_path` against `versions`.
    ///
    /// # Errors
    ///
    /// Returns an error when the manifest cannot be read or parsed, when a
    /// resolved version is not valid semver, or when the pinned manifest cannot
    /// be written. The original bytes are restored before the error returns.
    pub fn pin(manifest_path: &Path, versions: &VersionMap) -> Result<Self, ManifestError> {
        Self::pin_with_ledger(manifest_path, versions, None)
    }

    /// Like [`PinGuard::pin`], recording the original bytes in `ledger` for the
    /// lifetime of the guard.
    ///
    /// # Errors
    ///
    /// See [`PinGuard::pin`].
    pub fn pin_with_ledger(
        manifest_path: &Path,
        versions: &VersionMap,
        ledger: Option<&PinLedger>,
    ) -> Result<Self, ManifestError> {
        let original = std::fs::read(manifest_path).map_err(|source| ManifestError::Read {
            path: manifest_path.to_path_buf(),
            source,
        })?;
        let mut doc = String::from_utf8_lossy(&original)
            .parse::<DocumentMut>()
            .map_err(|source| ManifestError::Parse {
                path: manifest_path.to_path_buf(),
                source,
            })?;

        let pinned = pin_document(&mut doc, manifest_path, versions)?;

        let mut guard = Self {
            path: manifest_path.to_path_buf(),
            original,
            pinned,
            ledger: ledger.cloned(),
            dirty: false,
        };

        if guard.pinned.is_empty() {
            return Ok(guard);
        }

        if let Some(ledger) = &guard.ledger {
            ledger.register(&guard.path, &guard.original);
        }
        guard.dirty = true;
        write_document(&guard.path, &doc)?;

        debug!(
            path = %guard.path.display(),
            pinned = ?guard.pinned,
            "pinned internal dependencies"
        );
        Ok(guard)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Internal dependency entries that were rewritten.
    #[must_use]
    pub fn pinned(&self) -> &[String] {
        &self.pinned
    }

    /// Restores the original manifest now, reporting any failure.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Restore` if the original bytes cannot be written.
    pub fn restore(mut self) -> Result<(), ManifestError> {
        self.restore_in_place()
    }

    fn restore_in_place(&mut self) -> Result<(), ManifestError> {
        if !self.dirty {
            return Ok(());
        }
        std::fs::write(&self.path, &self.original).map_err(|source| ManifestError::Restore {
            path: self.path.clone(),
            source,
        })?;
        self.dirty = false;
        if let Some(ledger) = &self.ledger {
            ledger.release(&self.path);
        }
        debug!(path = %self.path.display(), "restored manifest");
        Ok(())
    }
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        if let Err(err) = self.restore_in_place() {
            error!(
                path = %self.path.display(),
                error = %err,
                "manifest left pinned; restore it from version control"
            );
        }
    }
}

/// Runs `f` while `manifest_path` is pinned, restoring it on every exit path.
///
/// # Errors
///
/// Returns the pin error, the error produced by `f`, or the restore error when
/// `f` succeeded but the original could not be written back.
pub fn with_pin<T, E, F>(manifest_path: &Path, versions: &VersionMap, f: F) -> Result<T, E>
where
    F: FnOnce(&[String]) -> Result<T, E>,
    E: From<ManifestError>,
{
    let guard = PinGuard::pin(manifest_path, versions)?;
    let outcome = f(guard.pinned());
    match (outcome, guard.restore()) {
        (Ok(result), Ok(())) => Ok(result),
        (Ok(_), Err(restore_err)) => Err(restore_err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(restore_err)) => {
            warn!(error = %restore_err, "restore failed after scoped error");
            Err(err)
        }
    }
}

/// Rewrites internal dependency entries of `doc` to exact versions.
///
/// Returns the dependency keys that were pinned, in document order.
///
/// # Errors
///
/// Returns `ManifestError::InvalidVersion` for a resolved version that Cargo
/// cannot accept.
pub fn pin_document(
    doc: &mut DocumentMut,
    manifest_path: &Path,
    versions: &VersionMap,
) -> Result<Vec<String>, ManifestError> {
    let mut pinned = Vec::new();

    for section in PINNED_SECTIONS {
        if let Some(deps) = doc.get_mut(section).and_then(Item::as_table_like_mut) {
            pin_section(deps, manifest_path, versions, &mut pinned)?;
        }
    }

    if let Some(targets) = doc.get_mut("target").and_then(Item::as_table_like_mut) {
        for (_, target) in targets.iter_mut() {
            for section in PINNED_SECTIONS {
                if let Some(deps) = target.get_mut(section).and_then(Item::as_table_like_mut) {
                    pin_section(deps, manifest_path, versions, &mut pinned)?;
                }
            }
        }
    }

    Ok(pinned)
}

fn pin_section(
    deps: &mut dyn TableLike,
    manifest_path: &Path,
    versions: &VersionMap,
    pinned: &mut Vec<String>,
) -> Result<(), ManifestError> {
    for (key, entry) in deps.iter_mut() {
        let package_name = entry
            .get("package")
            .and_then(Item::as_str)
            .unwrap_or(key.get())
            .to_string();
        let Some(version) = versions.get(&package_name) else {
            continue;
        };
        validate_version(manifest_path, version)?;
        let requirement = format!("={version}");

        if let Some(table) = entry.as_table_like_mut() {
            for source_key in SOURCE_KEYS {
                table.remove(source_key);
            }
            table.insert("version", value(requirement));
        } else {
            *entry = value(requirement);
        }
        pinned.push(key.get().to_string());
    }
    Ok(())
}
