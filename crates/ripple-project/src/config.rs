use std::path::{Path, PathBuf};
use std::time::Duration;

use ripple_core::{TagFormat, VersionScheme};
use serde::Deserialize;

use crate::error::ProjectError;
use crate::manifest::read_manifest;
use crate::project::{CargoProject, ProjectKind};

pub const DEFAULT_STATE_FILE: &str = ".ripple/run-state.json";
pub const DEFAULT_STAGING_DIR: &str = "target/ripple";

const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 300;
const POLL_INTERVAL_BOUNDS: (u64, u64) = (1, 60);
const POLL_TIMEOUT_BOUNDS: (u64, u64) = (30, 3600);

/// Keeps a registry poll interval within 1s..=60s.
#[must_use]
pub fn clamp_poll_interval(interval: Duration) -> Duration {
    clamp_duration(interval, POLL_INTERVAL_BOUNDS)
}

/// Keeps a total registry poll timeout within 30s..=3600s.
#[must_use]
pub fn clamp_poll_timeout(timeout: Duration) -> Duration {
    clamp_duration(timeout, POLL_TIMEOUT_BOUNDS)
}

/// Raw `[workspace.metadata.ripple]` table as written by the user.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct RippleMetadata {
    concurrency: Option<usize>,
    propagate: Option<bool>,
    synchronize: Option<bool>,
    smoke_test: Option<bool>,
    poll_interval_secs: Option<u64>,
    poll_timeout_secs: Option<u64>,
    state_file: Option<PathBuf>,
    staging_dir: Option<PathBuf>,
    tag_format: Option<TagFormat>,
    version_scheme: Option<VersionScheme>,
    registry: Option<String>,
    major_types: Option<Vec<String>>,
    minor_types: Option<Vec<String>>,
    patch_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RippleConfig {
    concurrency: usize,
    propagate: bool,
    synchronize: bool,
    smoke_test: bool,
    poll_interval: Duration,
    poll_timeout: Duration,
    state_file: PathBuf,
    staging_dir: PathBuf,
    tag_format: TagFormat,
    version_scheme: VersionScheme,
    registry: Option<String>,
    major_types: Vec<String>,
    minor_types: Vec<String>,
    patch_types: Vec<String>,
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            propagate: true,
            synchronize: false,
            smoke_test: false,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            tag_format: TagFormat::default(),
            version_scheme: VersionScheme::default(),
            registry: None,
            major_types: Vec::new(),
            minor_types: vec!["feat".to_string()],
            patch_types: vec!["fix".to_string(), "perf".to_string()],
        }
    }
}

impl RippleConfig {
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub fn propagate(&self) -> bool {
        self.propagate
    }

    #[must_use]
    pub fn synchronize(&self) -> bool {
        self.synchronize
    }

    #[must_use]
    pub fn smoke_test(&self) -> bool {
        self.smoke_test
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Run-state file, relative to the project root unless absolute.
    #[must_use]
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    #[must_use]
    pub fn tag_format(&self) -> TagFormat {
        self.tag_format
    }

    #[must_use]
    pub fn version_scheme(&self) -> VersionScheme {
        self.version_scheme
    }

    #[must_use]
    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    #[must_use]
    pub fn major_types(&self) -> &[String] {
        &self.major_types
    }

    #[must_use]
    pub fn minor_types(&self) -> &[String] {
        &self.minor_types
    }

    #[must_use]
    pub fn patch_types(&self) -> &[String] {
        &self.patch_types
    }

    /// A concurrency of zero is kept as-is so the orchestrator can reject it.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_propagate(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    #[must_use]
    pub fn with_synchronize(mut self, synchronize: bool) -> Self {
        self.synchronize = synchronize;
        self
    }

    #[must_use]
    pub fn with_smoke_test(mut self, smoke_test: bool) -> Self {
        self.smoke_test = smoke_test;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = clamp_poll_interval(interval);
        self
    }

    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = clamp_poll_timeout(timeout);
        self
    }

    #[must_use]
    pub fn with_state_file(mut self, state_file: impl Into<PathBuf>) -> Self {
        self.state_file = state_file.into();
        self
    }

    #[must_use]
    pub fn with_staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }

    #[must_use]
    pub fn with_tag_format(mut self, tag_format: TagFormat) -> Self {
        self.tag_format = tag_format;
        self
    }

    #[must_use]
    pub fn with_version_scheme(mut self, version_scheme: VersionScheme) -> Self {
        self.version_scheme = version_scheme;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Option<String>) -> Self {
        self.registry = registry;
        self
    }

    fn from_metadata(metadata: RippleMetadata) -> Self {
        let defaults = Self::default();
        Self {
            concurrency: metadata.concurrency.unwrap_or(defaults.concurrency),
            propagate: metadata.propagate.unwrap_or(defaults.propagate),
            synchronize: metadata.synchronize.unwrap_or(defaults.synchronize),
            smoke_test: metadata.smoke_test.unwrap_or(defaults.smoke_test),
            poll_interval: metadata
                .poll_interval_secs
                .map_or(defaults.poll_interval, |secs| {
                    clamp_poll_interval(Duration::from_secs(secs))
                }),
            poll_timeout: metadata
                .poll_timeout_secs
                .map_or(defaults.poll_timeout, |secs| {
                    clamp_poll_timeout(Duration::from_secs(secs))
                }),
            state_file: metadata.state_file.unwrap_or(defaults.state_file),
            staging_dir: metadata.staging_dir.unwrap_or(defaults.staging_dir),
            tag_format: metadata.tag_format.unwrap_or(defaults.tag_format),
            version_scheme: metadata.version_scheme.unwrap_or(defaults.version_scheme),
            registry: metadata.registry,
            major_types: metadata.major_types.unwrap_or(defaults.major_types),
            minor_types: metadata.minor_types.unwrap_or(defaults.minor_types),
            patch_types: metadata.patch_types.unwrap_or(defaults.patch_types),
        }
    }
}

fn clamp_duration(value: Duration, (min, max): (u64, u64)) -> Duration {
    value.clamp(Duration::from_secs(min), Duration::from_secs(max))
}

/// Reads the ripple configuration of a project.
///
/// Single-package projects use `[package.metadata.ripple]`; workspaces use
/// `[workspace.metadata.ripple]`. A missing table yields the defaults.
///
/// # Errors
///
/// Returns an error if the root manifest cannot be read or parsed.
pub fn parse_config(project: &CargoProject) -> Result<RippleConfig, ProjectError> {
    let manifest = read_manifest(&project.root.join("Cargo.toml"))?;

    let metadata = match project.kind {
        ProjectKind::SinglePackage => manifest.package.and_then(|pkg| pkg.metadata),
        ProjectKind::VirtualWorkspace | ProjectKind::WorkspaceWithRoot => {
            manifest.workspace.and_then(|ws| ws.metadata)
        }
    }
    .and_then(|meta| meta.ripple);

    Ok(metadata.map_or_else(RippleConfig::default, RippleConfig::from_metadata))
}
