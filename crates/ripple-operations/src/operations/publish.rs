use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use ripple_core::{Package, TagFormat};
use ripple_git::TagInfo;
use ripple_manifest::PinLedger;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::pipeline::{Pipeline, SharedState};
use crate::Result;
use crate::error::OperationError;
use crate::traits::{PackageManager, Registry, RunStateStore, VcsProvider};
use crate::types::{PackageStatus, PublishResult, PublishSettings, RunState};

/// Publishes a workspace level by level with bounded concurrency.
pub struct PublishOrchestrator<M, R, S> {
    manager: Arc<M>,
    registry: Arc<R>,
    store: Arc<S>,
    ledger: PinLedger,
    settings: Arc<PublishSettings>,
}

impl<M, R, S> PublishOrchestrator<M, R, S>
where
    M: PackageManager + 'static,
    R: Registry + 'static,
    S: RunStateStore + 'static,
{
    pub fn new(manager: M, registry: R, store: S, settings: PublishSettings) -> Self {
        Self {
            manager: Arc::new(manager),
            registry: Arc::new(registry),
            store: Arc::new(store),
            ledger: PinLedger::new(),
            settings: Arc::new(settings.clamped()),
        }
    }

    /// Uses `ledger` to record pinned manifests, so another owner (a signal
    /// handler) can restore them.
    #[must_use]
    pub fn with_ledger(mut self, ledger: PinLedger) -> Self {
        self.ledger = ledger;
        self
    }

    #[must_use]
    pub fn ledger(&self) -> &PinLedger {
        &self.ledger
    }

    #[must_use]
    pub fn manager(&self) -> &M {
        &self.manager
    }

    #[must_use]
    pub fn registry(&self) -> &R {
        &self.registry
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The persisted ledger of an interrupted run at `commit`, if any.
    ///
    /// Dry runs never resume. A ledger recorded at another commit is
    /// discarded when `fresh` is set.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::StaleRunState`] for a ledger recorded at
    /// another commit, or an error from the store.
    pub fn resumable_state(&self, commit: &str) -> Result<Option<RunState>> {
        if self.settings.dry_run {
            return Ok(None);
        }

        match self.store.load()? {
            None => Ok(None),
            Some(state) if state.commit() == commit => Ok(Some(state)),
            Some(state) if self.settings.fresh => {
                warn!(recorded = %state.commit(), current = %commit, "discarding run state from another commit");
                Ok(None)
            }
            Some(state) => Err(OperationError::StaleRunState {
                recorded: state.commit().to_string(),
                current: commit.to_string(),
            }),
        }
    }

    /// Runs every pending package to a terminal status, resuming a persisted
    /// run at the same commit instead of `initial` when one exists.
    ///
    /// Levels run strictly in order. Within a level at most `concurrency`
    /// pipelines are in flight; a failure lets its siblings finish and then
    /// stops before the next level.
    ///
    /// # Errors
    ///
    /// Returns configuration errors (invalid concurrency, stale run state, a
    /// ledger entry without a package) and store errors. Per-package failures
    /// are reported in the result, not as an error.
    pub async fn run(&self, packages: &[Package], initial: RunState) -> Result<PublishResult> {
        if self.settings.concurrency == 0 {
            return Err(OperationError::InvalidConcurrency);
        }

        let state = match self.resumable_state(initial.commit())? {
            Some(mut previous) => {
                let reset = previous.reset_interrupted();
                info!(commit = %previous.commit(), ?reset, "resuming run");
                previous
            }
            None => initial,
        };

        let lookup: HashMap<&str, &Package> =
            packages.iter().map(|p| (p.name.as_str(), p)).collect();
        if let Some((name, _)) = state.entries().find(|(name, _)| !lookup.contains_key(name)) {
            return Err(OperationError::UnknownPackage {
                name: name.to_string(),
            });
        }

        let levels = state.levels();
        let versions = Arc::new(state.version_map());
        let shared = Arc::new(SharedState::new(
            state,
            Arc::clone(&self.store),
            !self.settings.dry_run,
        ));
        shared.save()?;

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));

        for (index, level) in levels.iter().enumerate() {
            let candidates: Vec<&str> = level
                .iter()
                .map(String::as_str)
                .filter(|name| {
                    !matches!(
                        shared.status(name),
                        Some(PackageStatus::Published | PackageStatus::Skipped) | None
                    )
                })
                .collect();
            if candidates.is_empty() {
                continue;
            }
            info!(level = index, packages = ?candidates, dry_run = self.settings.dry_run, "publishing level");

            let mut tasks = JoinSet::new();
            let mut names = HashMap::new();
            for name in candidates {
                let mut package = lookup[name].clone();
                if let Some(version) = versions.get(name) {
                    package.version.clone_from(version);
                }
                let pipeline = Pipeline {
                    version: package.version.clone(),
                    package,
                    versions: Arc::clone(&versions),
                    manager: Arc::clone(&self.manager),
                    registry: Arc::clone(&self.registry),
                    shared: Arc::clone(&shared),
                    ledger: self.ledger.clone(),
                    settings: Arc::clone(&self.settings),
                };
                let semaphore = Arc::clone(&semaphore);
                let task_name = name.to_string();
                let handle = tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|_| {
                        OperationError::PublishFailed {
                            package: task_name,
                            message: "concurrency pool closed".to_string(),
                        }
                    })?;
                    pipeline.run().await
                });
                names.insert(handle.id(), name.to_string());
            }

            let mut level_failed = false;
            while let Some(joined) = tasks.join_next_with_id().await {
                match joined {
                    Ok((_, Ok(()))) => {}
                    Ok((_, Err(_))) => level_failed = true,
                    Err(join_err) => {
                        level_failed = true;
                        let name = names.get(&join_err.id()).cloned().unwrap_or_default();
                        let err = OperationError::PublishFailed {
                            package: name.clone(),
                            message: format!("pipeline task aborted: {join_err}"),
                        };
                        error!(package = %name, error = %err, "pipeline task panicked");
                        if let Err(record_err) = shared.fail(&name, err.to_string()) {
                            error!(package = %name, error = %record_err, "failed to record failure");
                        }
                    }
                }
            }

            if level_failed {
                warn!(level = index, "level failed, later levels are not started");
                break;
            }
        }

        let result = PublishResult::from_state(shared.snapshot());
        info!(
            published = result.published.len(),
            skipped = result.skipped.len(),
            failed = result.failed.len(),
            pending = result.pending.len(),
            "publish run finished"
        );
        Ok(result)
    }
}

/// Creates one annotated release tag per distinct tag name among the
/// packages published in `result`.
///
/// # Errors
///
/// Returns an error if a tag cannot be created.
pub fn tag_published<V: VcsProvider>(
    vcs: &V,
    project_root: &Path,
    format: TagFormat,
    result: &PublishResult,
) -> Result<Vec<TagInfo>> {
    let mut seen = BTreeSet::new();
    let mut tags = Vec::new();
    for name in &result.published {
        let Some(entry) = result.state.entry(name) else {
            continue;
        };
        let tag_name = format.tag_name(name, &entry.version);
        if !seen.insert(tag_name.clone()) {
            continue;
        }
        let message = format!("{name} {}", entry.version);
        tags.push(vcs.create_tag(project_root, &tag_name, &message)?);
        info!(tag = %tag_name, "created release tag");
    }
    Ok(tags)
}
