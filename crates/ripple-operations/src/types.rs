use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ripple_core::{Package, PackageVersion, VersionMap};
use ripple_graph::Levels;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::OperationError;

/// Relative file path inside a staging directory to its SHA-256 hex digest.
pub type Checksums = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Pending,
    Building,
    Publishing,
    Verifying,
    Published,
    Failed,
    Skipped,
}

impl PackageStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Failed | Self::Skipped)
    }

    /// `failed` is reachable from every non-terminal status; otherwise only
    /// the next step of the pipeline is.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Self::Failed) => true,
            (Self::Pending, Self::Building)
            | (Self::Building, Self::Publishing)
            | (Self::Publishing, Self::Verifying)
            | (Self::Verifying, Self::Published) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Building => "building",
            Self::Publishing => "publishing",
            Self::Verifying => "verifying",
            Self::Published => "published",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageEntry {
    pub version: String,
    pub level: usize,
    pub status: PackageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Status the package was in when it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<PackageStatus>,
}

/// Resumable ledger of one publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    commit: String,
    started_at: DateTime<Utc>,
    packages: BTreeMap<String, PackageEntry>,
}

impl RunState {
    /// Initializes a ledger for a fresh run.
    ///
    /// Packages without a bump, and packages that cannot be published, start
    /// as `skipped` at their current version; everything else is `pending` at
    /// its new version.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::UnknownPackage`] if a computed version refers
    /// to a package that has no level or is missing from `packages`.
    pub fn new(
        commit: impl Into<String>,
        packages: &[Package],
        versions: &[PackageVersion],
        levels: &Levels,
    ) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for version in versions {
            let unknown = || OperationError::UnknownPackage {
                name: version.name.clone(),
            };
            let package = packages
                .iter()
                .find(|p| p.name == version.name)
                .ok_or_else(unknown)?;
            let level = levels.level_of(&version.name).ok_or_else(unknown)?;

            let entry = if version.skipped || !package.publishable {
                PackageEntry {
                    version: version.old_version.clone(),
                    level,
                    status: PackageStatus::Skipped,
                    error: None,
                    failed_at: None,
                }
            } else {
                PackageEntry {
                    version: version.new_version.clone(),
                    level,
                    status: PackageStatus::Pending,
                    error: None,
                    failed_at: None,
                }
            };
            entries.insert(version.name.clone(), entry);
        }

        Ok(Self {
            commit: commit.into(),
            started_at: Utc::now(),
            packages: entries,
        })
    }

    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&PackageEntry> {
        self.packages.get(name)
    }

    #[must_use]
    pub fn status(&self, name: &str) -> Option<PackageStatus> {
        self.packages.get(name).map(|e| e.status)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &PackageEntry)> {
        self.packages.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Names with `status`, sorted.
    #[must_use]
    pub fn with_status(&self, status: PackageStatus) -> Vec<String> {
        self.packages
            .iter()
            .filter(|(_, e)| e.status == status)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Package names grouped by recorded level, each group sorted.
    #[must_use]
    pub fn levels(&self) -> Vec<Vec<String>> {
        let depth = self.packages.values().map(|e| e.level + 1).max().unwrap_or(0);
        let mut levels = vec![Vec::new(); depth];
        for (name, entry) in &self.packages {
            levels[entry.level].push(name.clone());
        }
        levels
    }

    /// Every package mapped to the version it is released at in this run.
    /// Skipped packages map to their current version.
    #[must_use]
    pub fn version_map(&self) -> VersionMap {
        self.packages
            .iter()
            .map(|(name, entry)| (name.clone(), entry.version.clone()))
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`OperationError::InvalidTransition`] if the move is not
    /// forward, or [`OperationError::UnknownPackage`].
    pub fn transition(&mut self, name: &str, next: PackageStatus) -> Result<()> {
        let entry = self
            .packages
            .get_mut(name)
            .ok_or_else(|| OperationError::UnknownPackage {
                name: name.to_string(),
            })?;

        if !entry.status.can_transition_to(next) {
            return Err(OperationError::InvalidTransition {
                package: name.to_string(),
                from: entry.status,
                to: next,
            });
        }
        entry.status = next;
        Ok(())
    }

    /// Marks `name` failed with `message`, remembering the status it failed
    /// in.
    ///
    /// # Errors
    ///
    /// See [`RunState::transition`].
    pub fn fail(&mut self, name: &str, message: impl Into<String>) -> Result<()> {
        let failed_at = self.status(name);
        self.transition(name, PackageStatus::Failed)?;
        if let Some(entry) = self.packages.get_mut(name) {
            entry.error = Some(message.into());
            entry.failed_at = failed_at;
        }
        Ok(())
    }

    /// Prepares a loaded ledger for another attempt and returns the names
    /// that were reset.
    ///
    /// `building` packages go back to `pending`. A `failed` package resumes
    /// where its upload stands: before the upload it starts over, during the
    /// upload it goes back to `publishing` (the registry decides whether to
    /// upload again) and after the upload it goes back to `verifying`.
    pub fn reset_interrupted(&mut self) -> Vec<String> {
        let mut reset = Vec::new();
        for (name, entry) in &mut self.packages {
            let resume_at = match (entry.status, entry.failed_at) {
                (PackageStatus::Building, _) => PackageStatus::Pending,
                (
                    PackageStatus::Failed,
                    Some(stage @ (PackageStatus::Publishing | PackageStatus::Verifying)),
                ) => stage,
                (PackageStatus::Failed, _) => PackageStatus::Pending,
                _ => continue,
            };
            entry.status = resume_at;
            entry.error = None;
            entry.failed_at = None;
            reset.push(name.clone());
        }
        reset
    }
}

/// Capability-neutral options handed to [`crate::traits::PackageManager::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub version: String,
    pub dry_run: bool,
    pub registry: Option<String>,
    pub checksums: Checksums,
}

/// Run-wide knobs of the publish orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub concurrency: usize,
    pub dry_run: bool,
    pub smoke_test: bool,
    /// Discard a ledger recorded at another commit instead of failing.
    pub fresh: bool,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub staging_dir: PathBuf,
    pub registry: Option<String>,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            dry_run: false,
            smoke_test: false,
            fresh: false,
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(300),
            staging_dir: PathBuf::from(ripple_project::DEFAULT_STAGING_DIR),
            registry: None,
        }
    }
}

impl PublishSettings {
    /// Bounds the registry polling knobs to the same range the workspace
    /// configuration allows.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            poll_interval: ripple_project::clamp_poll_interval(self.poll_interval),
            poll_timeout: ripple_project::clamp_poll_timeout(self.poll_timeout),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub published: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: BTreeMap<String, String>,
    /// Packages never attempted because an earlier level failed.
    pub pending: Vec<String>,
    pub state: RunState,
}

impl PublishResult {
    pub(crate) fn from_state(state: RunState) -> Self {
        let failed = state
            .entries()
            .filter(|(_, e)| e.status == PackageStatus::Failed)
            .map(|(name, e)| (name.to_string(), e.error.clone().unwrap_or_default()))
            .collect();

        let mut pending = state.with_status(PackageStatus::Pending);
        for interrupted in [
            PackageStatus::Building,
            PackageStatus::Publishing,
            PackageStatus::Verifying,
        ] {
            pending.extend(state.with_status(interrupted));
        }
        pending.sort();

        Self {
            published: state.with_status(PackageStatus::Published),
            skipped: state.with_status(PackageStatus::Skipped),
            failed,
            pending,
            state,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::BumpType;

    fn fixture() -> (Vec<Package>, Vec<PackageVersion>, Levels) {
        let packages = vec![
            Package::new("core", "1.0.0", "/ws/core"),
            Package::new("cli", "0.3.0", "/ws/cli").with_internal_dependencies(["core"]),
            Package::new("internal", "0.1.0", "/ws/internal").with_publishable(false),
        ];
        let versions = vec![
            PackageVersion {
                name: "core".to_string(),
                old_version: "1.0.0".to_string(),
                new_version: "1.1.0".to_string(),
                bump_type: BumpType::Minor,
                skipped: false,
            },
            PackageVersion::skipped("cli", "0.3.0"),
            PackageVersion {
                name: "internal".to_string(),
                old_version: "0.1.0".to_string(),
                new_version: "0.1.1".to_string(),
                bump_type: BumpType::Patch,
                skipped: false,
            },
        ];
        let levels = Levels::new(vec![
            vec!["core".to_string(), "internal".to_string()],
            vec!["cli".to_string()],
        ]);
        (packages, versions, levels)
    }

    fn state() -> RunState {
        let (packages, versions, levels) = fixture();
        RunState::new("abc", &packages, &versions, &levels).expect("valid state")
    }

    mod status {
        use super::*;

        #[test]
        fn forward_steps_are_legal() {
            assert!(PackageStatus::Pending.can_transition_to(PackageStatus::Building));
            assert!(PackageStatus::Building.can_transition_to(PackageStatus::Publishing));
            assert!(PackageStatus::Publishing.can_transition_to(PackageStatus::Verifying));
            assert!(PackageStatus::Verifying.can_transition_to(PackageStatus::Published));
        }

        #[test]
        fn failed_is_reachable_from_non_terminal() {
            for from in [
                PackageStatus::Pending,
                PackageStatus::Building,
                PackageStatus::Publishing,
                PackageStatus::Verifying,
            ] {
                assert!(from.can_transition_to(PackageStatus::Failed), "{from}");
            }
        }

        #[test]
        fn terminal_statuses_never_move() {
            for from in [
                PackageStatus::Published,
                PackageStatus::Failed,
                PackageStatus::Skipped,
            ] {
                assert!(!from.can_transition_to(PackageStatus::Failed), "{from}");
                assert!(!from.can_transition_to(PackageStatus::Pending), "{from}");
            }
        }

        #[test]
        fn skipping_ahead_or_back_is_illegal() {
            assert!(!PackageStatus::Pending.can_transition_to(PackageStatus::Published));
            assert!(!PackageStatus::Publishing.can_transition_to(PackageStatus::Building));
            assert!(!PackageStatus::Pending.can_transition_to(PackageStatus::Skipped));
        }

        #[test]
        fn serializes_lowercase() {
            let json = serde_json::to_string(&PackageStatus::Verifying).expect("serialize");
            assert_eq!(json, "\"verifying\"");
        }
    }

    mod run_state {
        use super::*;

        #[test]
        fn initial_statuses() {
            let state = state();

            assert_eq!(state.status("core"), Some(PackageStatus::Pending));
            assert_eq!(state.status("cli"), Some(PackageStatus::Skipped));
            assert_eq!(state.status("internal"), Some(PackageStatus::Skipped));
        }

        #[test]
        fn version_map_covers_every_package() {
            let map = state().version_map();

            assert_eq!(map.get("core").map(String::as_str), Some("1.1.0"));
            assert_eq!(map.get("cli").map(String::as_str), Some("0.3.0"));
            assert_eq!(map.get("internal").map(String::as_str), Some("0.1.0"));
        }

        #[test]
        fn levels_follow_recorded_assignment() {
            assert_eq!(
                state().levels(),
                vec![
                    vec!["core".to_string(), "internal".to_string()],
                    vec!["cli".to_string()]
                ]
            );
        }

        #[test]
        fn illegal_transition_is_rejected() {
            let mut state = state();

            let result = state.transition("core", PackageStatus::Published);

            assert!(matches!(
                result,
                Err(OperationError::InvalidTransition {
                    from: PackageStatus::Pending,
                    to: PackageStatus::Published,
                    ..
                })
            ));
            assert_eq!(state.status("core"), Some(PackageStatus::Pending));
        }

        #[test]
        fn skipped_cannot_be_failed() {
            let mut state = state();

            assert!(state.fail("cli", "boom").is_err());
        }

        #[test]
        fn fail_records_message() {
            let mut state = state();
            state
                .transition("core", PackageStatus::Building)
                .expect("pending -> building");

            state.fail("core", "compile error").expect("building -> failed");

            let entry = state.entry("core").expect("core entry");
            assert_eq!(entry.status, PackageStatus::Failed);
            assert_eq!(entry.error.as_deref(), Some("compile error"));
        }

        #[test]
        fn fail_records_stage() {
            let mut state = state();
            for step in [PackageStatus::Building, PackageStatus::Publishing] {
                state.transition("core", step).expect("forward step");
            }

            state.fail("core", "upload rejected").expect("publishing -> failed");

            let entry = state.entry("core").expect("core entry");
            assert_eq!(entry.failed_at, Some(PackageStatus::Publishing));
        }

        #[test]
        fn reset_interrupted_returns_failed_and_building_to_pending() {
            let mut state = state();
            state
                .transition("core", PackageStatus::Building)
                .expect("pending -> building");
            state.fail("core", "compile error").expect("fail");

            let reset = state.reset_interrupted();

            assert_eq!(reset, vec!["core"]);
            let entry = state.entry("core").expect("core entry");
            assert_eq!(entry.status, PackageStatus::Pending);
            assert!(entry.error.is_none());
        }

        #[test]
        fn reset_interrupted_keeps_uploads_done() {
            let mut state = state();
            for step in [
                PackageStatus::Building,
                PackageStatus::Publishing,
                PackageStatus::Verifying,
            ] {
                state.transition("core", step).expect("forward step");
            }
            state.fail("core", "not visible in time").expect("verifying -> failed");

            let reset = state.reset_interrupted();

            assert_eq!(reset, vec!["core"]);
            let entry = state.entry("core").expect("core entry");
            assert_eq!(entry.status, PackageStatus::Verifying);
            assert!(entry.error.is_none());
            assert!(entry.failed_at.is_none());
        }

        #[test]
        fn reset_interrupted_rechecks_failed_uploads() {
            let mut state = state();
            for step in [PackageStatus::Building, PackageStatus::Publishing] {
                state.transition("core", step).expect("forward step");
            }
            state.fail("core", "connection reset").expect("publishing -> failed");

            state.reset_interrupted();

            assert_eq!(state.status("core"), Some(PackageStatus::Publishing));
        }

        #[test]
        fn ledger_without_failure_stage_starts_over() {
            let json = r#"{
                "commit": "abc",
                "started_at": "2026-01-01T00:00:00Z",
                "packages": {
                    "core": { "version": "1.1.0", "level": 0, "status": "failed", "error": "boom" }
                }
            }"#;
            let mut state: RunState = serde_json::from_str(json).expect("deserialize");

            state.reset_interrupted();

            assert_eq!(state.status("core"), Some(PackageStatus::Pending));
        }

        #[test]
        fn unknown_version_entry_is_rejected() {
            let (packages, mut versions, levels) = fixture();
            versions.push(PackageVersion::skipped("ghost", "0.0.1"));

            let result = RunState::new("abc", &packages, &versions, &levels);

            assert!(matches!(result, Err(OperationError::UnknownPackage { name }) if name == "ghost"));
        }

        #[test]
        fn json_round_trip_keeps_ledger() {
            let mut state = state();
            state
                .transition("core", PackageStatus::Building)
                .expect("pending -> building");

            let json = serde_json::to_string_pretty(&state).expect("serialize");
            let loaded: RunState = serde_json::from_str(&json).expect("deserialize");

            assert_eq!(loaded, state);
            assert!(json.contains("\"commit\": \"abc\""));
            assert!(!json.contains("\"error\""));
            assert!(!json.contains("\"failed_at\""));
        }
    }

    #[test]
    fn result_partitions_statuses() {
        let mut state = state();
        state
            .transition("core", PackageStatus::Building)
            .expect("pending -> building");
        state.fail("core", "boom").expect("fail");

        let result = PublishResult::from_state(state);

        assert!(result.published.is_empty());
        assert_eq!(result.skipped, vec!["cli", "internal"]);
        assert_eq!(result.failed.get("core").map(String::as_str), Some("boom"));
        assert!(result.pending.is_empty());
        assert!(!result.is_success());
    }

    mod settings {
        use super::*;

        #[test]
        fn clamped_raises_zero_interval_to_the_minimum() {
            let settings = PublishSettings {
                poll_interval: Duration::ZERO,
                poll_timeout: Duration::ZERO,
                ..PublishSettings::default()
            }
            .clamped();

            assert_eq!(settings.poll_interval, Duration::from_secs(1));
            assert_eq!(settings.poll_timeout, Duration::from_secs(30));
        }

        #[test]
        fn clamped_caps_large_values() {
            let settings = PublishSettings {
                poll_interval: Duration::from_secs(3600),
                poll_timeout: Duration::from_secs(86_400),
                ..PublishSettings::default()
            }
            .clamped();

            assert_eq!(settings.poll_interval, Duration::from_secs(60));
            assert_eq!(settings.poll_timeout, Duration::from_secs(3600));
        }

        #[test]
        fn clamped_keeps_defaults() {
            assert_eq!(
                PublishSettings::default().clamped(),
                PublishSettings::default()
            );
        }
    }
}
