use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use ripple_core::{Package, VersionMap};
use ripple_manifest::{PinGuard, PinLedger};
use tracing::{debug, error, info};

use super::checksum::checksum_dir;
use crate::Result;
use crate::error::OperationError;
use crate::traits::{PackageManager, Registry, RunStateStore};
use crate::types::{PackageStatus, PublishOptions, PublishSettings, RunState};

/// The run-state ledger shared by every pipeline of a run.
///
/// Each update happens under one lock and is persisted before the lock is
/// released, so the store only ever sees one writer.
pub(crate) struct SharedState<S> {
    state: Mutex<RunState>,
    store: Arc<S>,
    persist: bool,
}

impl<S> SharedState<S>
where
    S: RunStateStore,
{
    pub(crate) fn new(state: RunState, store: Arc<S>, persist: bool) -> Self {
        Self {
            state: Mutex::new(state),
            store,
            persist,
        }
    }

    pub(crate) fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut RunState) -> Result<()>,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)?;
        if self.persist {
            self.store.save(&state)?;
        }
        Ok(())
    }

    pub(crate) fn save(&self) -> Result<()> {
        self.update(|_| Ok(()))
    }

    pub(crate) fn transition(&self, name: &str, next: PackageStatus) -> Result<()> {
        self.update(|state| state.transition(name, next))?;
        debug!(package = %name, status = %next, "status changed");
        Ok(())
    }

    pub(crate) fn fail(&self, name: &str, message: String) -> Result<()> {
        self.update(|state| state.fail(name, message))
    }

    pub(crate) fn status(&self, name: &str) -> Option<PackageStatus> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status(name)
    }

    pub(crate) fn snapshot(&self) -> RunState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Everything one package needs to go from `pending` to `published`.
pub(crate) struct Pipeline<M, R, S> {
    pub(crate) package: Package,
    pub(crate) version: String,
    pub(crate) versions: Arc<VersionMap>,
    pub(crate) manager: Arc<M>,
    pub(crate) registry: Arc<R>,
    pub(crate) shared: Arc<SharedState<S>>,
    pub(crate) ledger: PinLedger,
    pub(crate) settings: Arc<PublishSettings>,
}

impl<M, R, S> Pipeline<M, R, S>
where
    M: PackageManager,
    R: Registry,
    S: RunStateStore,
{
    /// Drives the package to a terminal status. On failure the error is
    /// recorded in the ledger before it is returned.
    pub(crate) async fn run(self) -> Result<()> {
        let name = self.package.name.clone();
        match self.execute().await {
            Ok(()) => Ok(()),
            Err(err) => {
                let err = err.into_package_failure(&name);
                error!(package = %name, error = %err, "pipeline failed");
                if let Err(record_err) = self.shared.fail(&name, err.to_string()) {
                    error!(package = %name, error = %record_err, "failed to record failure");
                }
                Err(err)
            }
        }
    }

    async fn execute(&self) -> Result<()> {
        let name = self.package.name.as_str();
        let status = self
            .shared
            .status(name)
            .ok_or_else(|| OperationError::UnknownPackage {
                name: name.to_string(),
            })?;

        let already_published = status == PackageStatus::Publishing
            && self.registry.is_published(name, &self.version).await?;

        match status {
            PackageStatus::Verifying => {
                info!(package = %name, version = %self.version, "upload already done, verifying only");
            }
            PackageStatus::Publishing if already_published => {
                info!(package = %name, version = %self.version, "already in registry, not publishing again");
                self.shared.transition(name, PackageStatus::Verifying)?;
            }
            PackageStatus::Publishing => self.build_and_publish(false).await?,
            _ => {
                self.shared.transition(name, PackageStatus::Building)?;
                self.build_and_publish(true).await?;
            }
        }

        self.verify().await?;
        self.shared.transition(name, PackageStatus::Published)?;
        info!(package = %name, version = %self.version, "published");
        Ok(())
    }

    /// Pins, builds and uploads the package, leaving it in `verifying`.
    async fn build_and_publish(&self, enter_publishing: bool) -> Result<()> {
        let name = self.package.name.as_str();
        let staging = self.prepare_staging().await?;

        let guard = PinGuard::pin_with_ledger(
            &self.package.manifest_path,
            &self.versions,
            Some(&self.ledger),
        )?;

        self.manager.build(&self.package, &staging).await?;

        let dir = staging.clone();
        let checksums = tokio::task::spawn_blocking(move || checksum_dir(&dir))
            .await
            .map_err(|err| OperationError::PublishFailed {
                package: name.to_string(),
                message: format!("checksum task failed: {err}"),
            })??;
        for (file, digest) in &checksums {
            debug!(package = %name, %file, sha256 = %digest, "artifact checksum");
        }

        if enter_publishing {
            self.shared.transition(name, PackageStatus::Publishing)?;
        }

        let options = PublishOptions {
            version: self.version.clone(),
            dry_run: self.settings.dry_run,
            registry: self.settings.registry.clone(),
            checksums,
        };
        self.manager.publish(&self.package, &staging, &options).await?;
        self.shared.transition(name, PackageStatus::Verifying)?;

        guard.restore()?;
        Ok(())
    }

    async fn verify(&self) -> Result<()> {
        if self.settings.dry_run {
            return Ok(());
        }
        let name = self.package.name.as_str();

        let visible = self
            .registry
            .poll_available(
                name,
                &self.version,
                self.settings.poll_timeout,
                self.settings.poll_interval,
            )
            .await?;
        if !visible {
            return Err(OperationError::PublishTimeout {
                package: name.to_string(),
                version: self.version.clone(),
                timeout: self.settings.poll_timeout,
            });
        }

        if self.settings.smoke_test {
            self.registry.smoke_test(name, &self.version).await?;
            debug!(package = %name, "smoke test passed");
        }
        Ok(())
    }

    async fn prepare_staging(&self) -> Result<PathBuf> {
        let dir = self
            .settings
            .staging_dir
            .join(format!("{}-{}", self.package.name, self.version));

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}
