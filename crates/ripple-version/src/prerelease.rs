//! Pre-release suffix parsing and transitions
//!
//! Two spellings are understood. The semver spelling attaches
//! `-{label}.{counter}` (`1.2.0-rc.1`); the compact spelling glues a short
//! tag and the counter onto the patch number (`1.2.0rc1`, `1.2.0a1`,
//! `1.2.0b1`, `1.2.0.dev1`).

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use ripple_core::{PrereleaseLabel, VersionScheme};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VersionError};

static SEMVER_PRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)-(dev|alpha|beta|rc)\.(\d+)$")
        .expect("semver pre-release pattern is valid")
});

static COMPACT_PRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:(a|b|rc)(\d+)|\.?dev(\d+))$")
        .expect("compact pre-release pattern is valid")
});

static STABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").expect("stable version pattern is valid")
});

/// A version string broken into its numeric base and optional pre-release.
///
/// `counter` is 0 whenever `label` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrereleaseInfo {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub label: Option<PrereleaseLabel>,
    pub counter: u64,
    pub scheme: VersionScheme,
}

impl PrereleaseInfo {
    #[must_use]
    pub fn stable(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            label: None,
            counter: 0,
            scheme: VersionScheme::Semver,
        }
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.label.is_some()
    }

    /// The same numeric base without any pre-release suffix.
    #[must_use]
    pub fn base(&self) -> Self {
        Self {
            label: None,
            counter: 0,
            ..*self
        }
    }

    #[must_use]
    pub fn with_scheme(self, scheme: VersionScheme) -> Self {
        Self { scheme, ..self }
    }

    /// Replaces any existing suffix with `label` and `counter`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidCounter`] when `counter` is 0.
    pub fn with_prerelease(self, label: PrereleaseLabel, counter: u64) -> Result<Self> {
        if counter == 0 {
            return Err(VersionError::InvalidCounter(counter));
        }
        Ok(Self {
            label: Some(label),
            counter,
            ..self
        })
    }

    /// The same pre-release with its counter advanced by one.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Overflow`] when the counter is already at its
    /// maximum.
    pub fn next_counter(self) -> Result<Self> {
        let counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| VersionError::Overflow(self.to_string()))?;
        Ok(Self { counter, ..self })
    }

    /// Release precedence: numeric base first, then pre-releases in label
    /// order below the stable release of the same base.
    #[must_use]
    pub fn precedence(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.label, other.label) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(&b).then(self.counter.cmp(&other.counter)),
            })
    }
}

impl fmt::Display for PrereleaseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        let Some(label) = self.label else {
            return Ok(());
        };
        match (self.scheme, label) {
            (VersionScheme::Semver, _) => write!(f, "-{label}.{}", self.counter),
            (VersionScheme::Compact, PrereleaseLabel::Dev) => write!(f, ".dev{}", self.counter),
            (VersionScheme::Compact, _) => write!(f, "{}{}", label.compact_tag(), self.counter),
        }
    }
}

/// Parses `version` into its components.
///
/// With no scheme both pre-release spellings are tried (semver first), then a
/// bare stable version.
///
/// # Errors
///
/// Returns [`VersionError::Unparseable`] if nothing matches.
pub fn parse(version: &str, scheme: Option<VersionScheme>) -> Result<PrereleaseInfo> {
    let version = version.trim();
    let attempts: &[VersionScheme] = match scheme {
        Some(VersionScheme::Semver) => &[VersionScheme::Semver],
        Some(VersionScheme::Compact) => &[VersionScheme::Compact],
        None => &[VersionScheme::Semver, VersionScheme::Compact],
    };

    for attempt in attempts {
        let parsed = match attempt {
            VersionScheme::Semver => parse_semver_pre(version),
            VersionScheme::Compact => parse_compact_pre(version),
        };
        if let Some(info) = parsed {
            return info;
        }
    }

    let caps = STABLE
        .captures(version)
        .ok_or_else(|| VersionError::Unparseable(version.to_string()))?;
    let (major, minor, patch) = numeric_base(version, &caps)?;
    Ok(PrereleaseInfo {
        scheme: scheme.unwrap_or_default(),
        ..PrereleaseInfo::stable(major, minor, patch)
    })
}

fn parse_semver_pre(version: &str) -> Option<Result<PrereleaseInfo>> {
    let caps = SEMVER_PRE.captures(version)?;
    Some(build_info(version, &caps, &caps[4], &caps[5], VersionScheme::Semver))
}

fn parse_compact_pre(version: &str) -> Option<Result<PrereleaseInfo>> {
    let caps = COMPACT_PRE.captures(version)?;
    let (label, counter) = match (caps.get(4), caps.get(5), caps.get(6)) {
        (Some(tag), Some(counter), _) => (compact_label(tag.as_str()), counter.as_str()),
        (_, _, Some(counter)) => ("dev", counter.as_str()),
        _ => return Some(Err(VersionError::Unparseable(version.to_string()))),
    };
    Some(build_info(version, &caps, label, counter, VersionScheme::Compact))
}

fn compact_label(tag: &str) -> &'static str {
    match tag {
        "a" => "alpha",
        "b" => "beta",
        _ => "rc",
    }
}

fn build_info(
    version: &str,
    caps: &Captures<'_>,
    label: &str,
    counter: &str,
    scheme: VersionScheme,
) -> Result<PrereleaseInfo> {
    let (major, minor, patch) = numeric_base(version, caps)?;
    let label: PrereleaseLabel = label
        .parse()
        .map_err(|_| VersionError::Unparseable(version.to_string()))?;
    let counter = parse_number(version, counter)?;
    if counter == 0 {
        return Err(VersionError::Unparseable(version.to_string()));
    }
    Ok(PrereleaseInfo {
        major,
        minor,
        patch,
        label: Some(label),
        counter,
        scheme,
    })
}

fn numeric_base(version: &str, caps: &Captures<'_>) -> Result<(u64, u64, u64)> {
    Ok((
        parse_number(version, &caps[1])?,
        parse_number(version, &caps[2])?,
        parse_number(version, &caps[3])?,
    ))
}

fn parse_number(version: &str, digits: &str) -> Result<u64> {
    digits
        .parse()
        .map_err(|_| VersionError::Unparseable(version.to_string()))
}

fn parse_label(label: &str) -> Result<PrereleaseLabel> {
    label
        .parse()
        .map_err(|_| VersionError::InvalidLabel(label.to_string()))
}

fn require_prerelease(version: &str, scheme: Option<VersionScheme>) -> Result<(PrereleaseInfo, PrereleaseLabel)> {
    let info = parse(version, scheme)?;
    match info.label {
        Some(label) => Ok((info, label)),
        None => Err(VersionError::NotPrerelease(version.to_string())),
    }
}

/// Replaces any pre-release suffix of `version` with `{label}.{counter}` in
/// the requested scheme.
///
/// # Errors
///
/// Returns [`VersionError::InvalidLabel`] for labels outside dev/alpha/beta/rc,
/// [`VersionError::InvalidCounter`] for a zero counter, and
/// [`VersionError::Unparseable`] if `version` cannot be read.
pub fn apply_prerelease(
    version: &str,
    label: &str,
    scheme: VersionScheme,
    counter: u64,
) -> Result<String> {
    let label = parse_label(label)?;
    let info = parse(version, None)?
        .with_scheme(scheme)
        .with_prerelease(label, counter)?;
    Ok(info.to_string())
}

/// Advances the counter of an existing pre-release by one.
///
/// # Errors
///
/// Returns [`VersionError::NotPrerelease`] for stable versions and
/// [`VersionError::Overflow`] when the counter cannot grow.
pub fn increment_prerelease(version: &str, scheme: Option<VersionScheme>) -> Result<String> {
    let (info, _) = require_prerelease(version, scheme)?;
    Ok(info.next_counter()?.to_string())
}

/// Moves a pre-release to a strictly higher label, restarting the counter at 1.
///
/// # Errors
///
/// Returns [`VersionError::NotPrerelease`] for stable versions and
/// [`VersionError::NotEscalation`] unless `new_label` ranks above the current
/// label.
pub fn escalate_prerelease(
    version: &str,
    new_label: &str,
    scheme: Option<VersionScheme>,
) -> Result<String> {
    let to = parse_label(new_label)?;
    let (info, from) = require_prerelease(version, scheme)?;
    if to <= from {
        return Err(VersionError::NotEscalation {
            version: version.to_string(),
            from,
            to,
        });
    }
    Ok(info.with_prerelease(to, 1)?.to_string())
}

/// Strips the pre-release suffix, yielding the stable release it leads to.
///
/// # Errors
///
/// Returns [`VersionError::NotPrerelease`] if `version` is already stable.
pub fn promote_to_stable(version: &str, scheme: Option<VersionScheme>) -> Result<String> {
    let (info, _) = require_prerelease(version, scheme)?;
    Ok(info.base().to_string())
}

/// Reports whether `version` carries a pre-release suffix in either scheme.
#[must_use]
pub fn is_prerelease(version: &str) -> bool {
    parse(version, None).is_ok_and(|info| info.is_prerelease())
}

/// Orders two version strings by release precedence.
///
/// # Errors
///
/// Returns [`VersionError::Unparseable`] if either side cannot be read.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
    Ok(parse(a, None)?.precedence(&parse(b, None)?))
}
