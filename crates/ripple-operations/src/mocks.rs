use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ripple_core::{Package, TagFormat};
use ripple_git::{CommitInfo, ReleaseTag, TagInfo};
use ripple_project::{CargoProject, ProjectKind, RippleConfig};

use crate::Result;
use crate::error::OperationError;
use crate::traits::{PackageManager, ProjectProvider, Registry, RunStateStore, VcsProvider};
use crate::types::{Checksums, PublishOptions, RunState};

pub struct MockVcsProvider {
    head: String,
    commits: Vec<(PathBuf, CommitInfo)>,
    tags: HashMap<String, ReleaseTag>,
    since_requests: Mutex<Vec<Option<String>>>,
    scope_requests: Mutex<Vec<Option<PathBuf>>>,
    created_tags: Mutex<Vec<TagInfo>>,
}

impl MockVcsProvider {
    #[must_use]
    pub fn new(head: &str) -> Self {
        Self {
            head: head.to_string(),
            commits: Vec::new(),
            tags: HashMap::new(),
            since_requests: Mutex::new(Vec::new()),
            scope_requests: Mutex::new(Vec::new()),
            created_tags: Mutex::new(Vec::new()),
        }
    }

    /// Commits touching `path`, returned for any scope that contains it.
    #[must_use]
    pub fn with_commits(mut self, path: &str, messages: &[&str]) -> Self {
        for (index, message) in messages.iter().enumerate() {
            self.commits.push((
                PathBuf::from(path),
                CommitInfo {
                    sha: format!("{path}#{index}"),
                    message: (*message).to_string(),
                },
            ));
        }
        self
    }

    #[must_use]
    pub fn with_release_tag(mut self, package: &str, tag_name: &str, version: &str) -> Self {
        self.tags.insert(
            package.to_string(),
            ReleaseTag {
                tag: TagInfo {
                    name: tag_name.to_string(),
                    target_sha: format!("sha-of-{tag_name}"),
                },
                version: version.to_string(),
            },
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn since_requests(&self) -> Vec<Option<String>> {
        self.since_requests.lock().expect("lock poisoned").clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn scope_requests(&self) -> Vec<Option<PathBuf>> {
        self.scope_requests.lock().expect("lock poisoned").clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn created_tags(&self) -> Vec<TagInfo> {
        self.created_tags.lock().expect("lock poisoned").clone()
    }
}

impl VcsProvider for MockVcsProvider {
    fn head_commit(&self, _project_root: &Path) -> Result<String> {
        Ok(self.head.clone())
    }

    fn last_release_tag(
        &self,
        _project_root: &Path,
        package: &str,
        _format: TagFormat,
    ) -> Result<Option<ReleaseTag>> {
        Ok(self.tags.get(package).cloned())
    }

    fn commits_since(
        &self,
        _project_root: &Path,
        since: Option<&str>,
        scope: Option<&Path>,
    ) -> Result<Vec<CommitInfo>> {
        self.since_requests
            .lock()
            .expect("lock poisoned")
            .push(since.map(str::to_string));
        self.scope_requests
            .lock()
            .expect("lock poisoned")
            .push(scope.map(Path::to_path_buf));

        Ok(self
            .commits
            .iter()
            .filter(|(path, _)| scope.is_none_or(|s| path.starts_with(s)))
            .map(|(_, commit)| commit.clone())
            .collect())
    }

    fn create_tag(&self, _project_root: &Path, tag_name: &str, _message: &str) -> Result<TagInfo> {
        let mut created = self.created_tags.lock().expect("lock poisoned");
        if created.iter().any(|t| t.name == tag_name) {
            return Err(OperationError::Git(ripple_git::GitError::TagExists {
                name: tag_name.to_string(),
            }));
        }
        let tag = TagInfo {
            name: tag_name.to_string(),
            target_sha: self.head.clone(),
        };
        created.push(tag.clone());
        Ok(tag)
    }
}

pub struct MockProjectProvider {
    project: CargoProject,
    config: RippleConfig,
}

impl MockProjectProvider {
    #[must_use]
    pub fn new(project: CargoProject) -> Self {
        Self {
            project,
            config: RippleConfig::default(),
        }
    }

    /// A virtual workspace rooted at `/mock/workspace`.
    #[must_use]
    pub fn workspace(packages: Vec<Package>) -> Self {
        Self::new(CargoProject {
            root: PathBuf::from("/mock/workspace"),
            kind: ProjectKind::VirtualWorkspace,
            packages,
        })
    }

    #[must_use]
    pub fn with_config(mut self, config: RippleConfig) -> Self {
        self.config = config;
        self
    }
}

impl ProjectProvider for MockProjectProvider {
    fn discover_project(&self, _start_path: &Path) -> Result<CargoProject> {
        Ok(self.project.clone())
    }

    fn load_config(&self, _project: &CargoProject) -> Result<RippleConfig> {
        Ok(self.config.clone())
    }
}

/// Records builds and uploads. A build writes `{name}-{version}.crate` into
/// the output directory and captures the manifest as it looked at that moment.
#[derive(Default)]
pub struct MockPackageManager {
    failing_builds: HashSet<String>,
    failing_publishes: HashSet<String>,
    delay: Option<Duration>,
    built: Mutex<Vec<String>>,
    published: Mutex<Vec<(String, PublishOptions)>>,
    manifests: Mutex<HashMap<String, String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockPackageManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing_build(mut self, name: &str) -> Self {
        self.failing_builds.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn failing_publish(mut self, name: &str) -> Self {
        self.failing_publishes.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn built(&self) -> Vec<String> {
        self.built.lock().expect("lock poisoned").clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published(&self) -> Vec<String> {
        self.published
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The `dry_run` flag of every publish call, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn dry_runs(&self) -> Vec<bool> {
        self.published
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|(_, options)| options.dry_run)
            .collect()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn checksums_for(&self, name: &str) -> Option<Checksums> {
        self.published
            .lock()
            .expect("lock poisoned")
            .iter()
            .find(|(published, _)| published == name)
            .map(|(_, options)| options.checksums.clone())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn manifest_seen_at_build(&self, name: &str) -> Option<String> {
        self.manifests.lock().expect("lock poisoned").get(name).cloned()
    }

    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn occupy(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PackageManager for MockPackageManager {
    async fn build(&self, package: &Package, output_dir: &Path) -> Result<()> {
        self.occupy().await;
        self.built
            .lock()
            .expect("lock poisoned")
            .push(package.name.clone());
        if let Ok(manifest) = std::fs::read_to_string(&package.manifest_path) {
            self.manifests
                .lock()
                .expect("lock poisoned")
                .insert(package.name.clone(), manifest);
        }

        if self.failing_builds.contains(&package.name) {
            return Err(OperationError::BuildFailed {
                package: package.name.clone(),
                message: "mock build failure".to_string(),
            });
        }

        let artifact = output_dir.join(format!("{}-{}.crate", package.name, package.version));
        std::fs::write(artifact, package.name.as_bytes())?;
        Ok(())
    }

    async fn publish(&self, package: &Package, _dist_dir: &Path, options: &PublishOptions) -> Result<()> {
        self.occupy().await;
        if self.failing_publishes.contains(&package.name) {
            return Err(OperationError::PublishFailed {
                package: package.name.clone(),
                message: "mock upload rejected".to_string(),
            });
        }
        self.published
            .lock()
            .expect("lock poisoned")
            .push((package.name.clone(), options.clone()));
        Ok(())
    }
}

/// Every package is visible unless marked otherwise; `is_published` only
/// reports versions registered up front.
#[derive(Default)]
pub struct MockRegistry {
    published: HashSet<(String, String)>,
    never_visible: HashSet<String>,
    failing_smoke_tests: HashSet<String>,
    smoke_tested: Mutex<Vec<String>>,
}

impl MockRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_published(mut self, name: &str, version: &str) -> Self {
        self.published.insert((name.to_string(), version.to_string()));
        self
    }

    #[must_use]
    pub fn never_visible(mut self, name: &str) -> Self {
        self.never_visible.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn failing_smoke_test(mut self, name: &str) -> Self {
        self.failing_smoke_tests.insert(name.to_string());
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn smoke_tested(&self) -> Vec<String> {
        self.smoke_tested.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn poll_available(
        &self,
        name: &str,
        _version: &str,
        _timeout: Duration,
        _interval: Duration,
    ) -> Result<bool> {
        Ok(!self.never_visible.contains(name))
    }

    async fn is_published(&self, name: &str, version: &str) -> Result<bool> {
        Ok(self
            .published
            .contains(&(name.to_string(), version.to_string())))
    }

    async fn smoke_test(&self, name: &str, version: &str) -> Result<()> {
        self.smoke_tested
            .lock()
            .expect("lock poisoned")
            .push(name.to_string());
        if self.failing_smoke_tests.contains(name) {
            return Err(OperationError::PublishFailed {
                package: name.to_string(),
                message: format!("smoke test of {version} failed"),
            });
        }
        Ok(())
    }
}

/// Keeps the ledger in memory and a copy of every saved snapshot.
#[derive(Default)]
pub struct MockRunStateStore {
    current: Mutex<Option<RunState>>,
    history: Mutex<Vec<RunState>>,
    cleared: AtomicUsize,
}

impl MockRunStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_state(state: RunState) -> Self {
        Self {
            current: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn history(&self) -> Vec<RunState> {
        self.history.lock().expect("lock poisoned").clone()
    }

    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.cleared.load(Ordering::SeqCst)
    }
}

impl RunStateStore for MockRunStateStore {
    fn load(&self) -> Result<Option<RunState>> {
        Ok(self.current.lock().expect("lock poisoned").clone())
    }

    fn save(&self, state: &RunState) -> Result<()> {
        *self.current.lock().expect("lock poisoned") = Some(state.clone());
        self.history
            .lock()
            .expect("lock poisoned")
            .push(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.current.lock().expect("lock poisoned") = None;
        self.cleared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
