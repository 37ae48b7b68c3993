use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// How far a package version moves in one release.
///
/// Variants are declared in precedence order so `max()` over a set of
/// bumps yields the one that wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BumpType {
    #[default]
    None,
    Patch,
    Minor,
    Major,
}

impl BumpType {
    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

impl fmt::Display for BumpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        };
        write!(f, "{s}")
    }
}

impl FromStr for BumpType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            _ => Err(CoreError::UnknownBump(s.to_string())),
        }
    }
}

/// Pre-release channel. Ordering is the escalation order; a stable
/// version ranks above all of them and is modelled as the absence of a label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PrereleaseLabel {
    Dev,
    Alpha,
    Beta,
    Rc,
}

impl PrereleaseLabel {
    pub const ALL: [Self; 4] = [Self::Dev, Self::Alpha, Self::Beta, Self::Rc];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Rc => "rc",
        }
    }

    /// Single-token spelling used by the compact scheme (`1.2.0a1`).
    #[must_use]
    pub fn compact_tag(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::Rc => "rc",
        }
    }
}

impl fmt::Display for PrereleaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrereleaseLabel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Dev),
            "alpha" => Ok(Self::Alpha),
            "beta" => Ok(Self::Beta),
            "rc" => Ok(Self::Rc),
            _ => Err(CoreError::UnknownLabel(s.to_string())),
        }
    }
}

/// Textual convention for the pre-release suffix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum VersionScheme {
    /// `1.2.0-rc.1`
    #[default]
    Semver,
    /// `1.2.0rc1`, `1.2.0a1`, `1.2.0.dev1`
    Compact,
}

impl fmt::Display for VersionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semver => f.write_str("semver"),
            Self::Compact => f.write_str("compact"),
        }
    }
}

impl FromStr for VersionScheme {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "semver" => Ok(Self::Semver),
            "compact" => Ok(Self::Compact),
            _ => Err(CoreError::UnknownScheme(s.to_string())),
        }
    }
}

/// Naming convention for release tags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TagFormat {
    /// `{name}@v{version}`
    #[default]
    CratePrefixed,
    /// `v{version}`
    VersionOnly,
}

impl TagFormat {
    #[must_use]
    pub fn tag_name(self, package: &str, version: &str) -> String {
        match self {
            Self::CratePrefixed => format!("{package}@v{version}"),
            Self::VersionOnly => format!("v{version}"),
        }
    }

    /// Prefix every release tag of `package` starts with.
    #[must_use]
    pub fn prefix(self, package: &str) -> String {
        match self {
            Self::CratePrefixed => format!("{package}@v"),
            Self::VersionOnly => "v".to_string(),
        }
    }

    /// Version part of `tag` if it is a release tag of `package`.
    #[must_use]
    pub fn version_of<'a>(self, tag: &'a str, package: &str) -> Option<&'a str> {
        tag.strip_prefix(&self.prefix(package))
            .filter(|version| !version.is_empty())
    }
}

impl fmt::Display for TagFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CratePrefixed => f.write_str("crate-prefixed"),
            Self::VersionOnly => f.write_str("version-only"),
        }
    }
}

/// One release-able unit of the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    pub manifest_path: PathBuf,
    pub internal_dependencies: Vec<String>,
    pub external_dependencies: Vec<String>,
    pub publishable: bool,
}

impl Package {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            version: version.into(),
            manifest_path: path.join("Cargo.toml"),
            path,
            internal_dependencies: Vec::new(),
            external_dependencies: Vec::new(),
            publishable: true,
        }
    }

    #[must_use]
    pub fn with_internal_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.internal_dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_publishable(mut self, publishable: bool) -> Self {
        self.publishable = publishable;
        self
    }
}

/// Package name to the exact version resolved for the current run.
pub type VersionMap = BTreeMap<String, String>;

/// Computed outcome for one package in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersion {
    pub name: String,
    pub old_version: String,
    pub new_version: String,
    pub bump_type: BumpType,
    pub skipped: bool,
}

impl PackageVersion {
    #[must_use]
    pub fn skipped(name: impl Into<String>, version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            name: name.into(),
            old_version: version.clone(),
            new_version: version,
            bump_type: BumpType::None,
            skipped: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod bump_type {
        use super::*;

        #[test]
        fn ordering_follows_precedence() {
            assert!(BumpType::None < BumpType::Patch);
            assert!(BumpType::Patch < BumpType::Minor);
            assert!(BumpType::Minor < BumpType::Major);
        }

        #[test]
        fn max_returns_largest() {
            let bumps = [BumpType::Patch, BumpType::None, BumpType::Minor];
            assert_eq!(bumps.iter().max(), Some(&BumpType::Minor));
        }

        #[test]
        fn default_is_none() {
            assert!(BumpType::default().is_none());
        }

        #[test]
        fn parses_case_insensitively() {
            assert_eq!("MAJOR".parse::<BumpType>(), Ok(BumpType::Major));
            assert!("huge".parse::<BumpType>().is_err());
        }
    }

    mod prerelease_label {
        use super::*;

        #[test]
        fn escalation_order() {
            assert!(PrereleaseLabel::Dev < PrereleaseLabel::Alpha);
            assert!(PrereleaseLabel::Alpha < PrereleaseLabel::Beta);
            assert!(PrereleaseLabel::Beta < PrereleaseLabel::Rc);
        }

        #[test]
        fn parse_roundtrips_display() {
            for label in PrereleaseLabel::ALL {
                assert_eq!(label.to_string().parse::<PrereleaseLabel>(), Ok(label));
            }
        }

        #[test]
        fn rejects_unknown_label() {
            let err = "gamma".parse::<PrereleaseLabel>().expect_err("gamma is not a label");
            assert!(err.to_string().contains("gamma"));
        }

        #[test]
        fn serializes_lowercase() {
            let json = serde_json::to_string(&PrereleaseLabel::Rc).expect("serialize");
            assert_eq!(json, "\"rc\"");
        }
    }

    mod tag_format {
        use super::*;

        #[test]
        fn crate_prefixed_roundtrip() {
            let tag = TagFormat::CratePrefixed.tag_name("ripple-core", "1.2.0-rc.1");

            assert_eq!(tag, "ripple-core@v1.2.0-rc.1");
            assert_eq!(TagFormat::CratePrefixed.version_of(&tag, "ripple-core"), Some("1.2.0-rc.1"));
        }

        #[test]
        fn crate_prefixed_ignores_other_packages() {
            assert_eq!(TagFormat::CratePrefixed.version_of("ripple@v1.0.0", "ripple-core"), None);
            assert_eq!(TagFormat::CratePrefixed.version_of("ripple-core@v", "ripple-core"), None);
        }

        #[test]
        fn version_only_ignores_package() {
            assert_eq!(TagFormat::VersionOnly.tag_name("anything", "0.3.0"), "v0.3.0");
            assert_eq!(TagFormat::VersionOnly.version_of("v0.3.0", "other"), Some("0.3.0"));
        }

        #[test]
        fn deserializes_kebab_case() {
            let format: TagFormat = serde_json::from_str("\"version-only\"").expect("deserialize");

            assert_eq!(format, TagFormat::VersionOnly);
        }
    }

    #[test]
    fn package_new_derives_manifest_path() {
        let pkg = Package::new("core", "1.0.0", "/ws/crates/core");

        assert_eq!(pkg.manifest_path, PathBuf::from("/ws/crates/core/Cargo.toml"));
        assert!(pkg.publishable);
        assert!(pkg.internal_dependencies.is_empty());
    }

    #[test]
    fn skipped_package_version_keeps_version() {
        let v = PackageVersion::skipped("core", "1.0.0");

        assert!(v.skipped);
        assert_eq!(v.old_version, v.new_version);
        assert_eq!(v.bump_type, BumpType::None);
    }
}
