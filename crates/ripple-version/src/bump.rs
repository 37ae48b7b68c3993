use ripple_core::{BumpType, PrereleaseLabel, VersionScheme};

use crate::error::{Result, VersionError};
use crate::prerelease::{PrereleaseInfo, parse};

/// Applies `bump_type` to the numeric base of `info`, dropping any suffix.
///
/// # Errors
///
/// Returns [`VersionError::Overflow`] if the bumped component does not fit.
pub fn bump_info(info: &PrereleaseInfo, bump_type: BumpType) -> Result<PrereleaseInfo> {
    let base = info.base();
    let overflow = || VersionError::Overflow(info.to_string());
    let bumped = match bump_type {
        BumpType::None => base,
        BumpType::Patch => PrereleaseInfo {
            patch: base.patch.checked_add(1).ok_or_else(overflow)?,
            ..base
        },
        BumpType::Minor => PrereleaseInfo {
            minor: base.minor.checked_add(1).ok_or_else(overflow)?,
            patch: 0,
            ..base
        },
        BumpType::Major => PrereleaseInfo {
            major: base.major.checked_add(1).ok_or_else(overflow)?,
            minor: 0,
            patch: 0,
            ..base
        },
    };
    Ok(bumped)
}

/// Bumps a version string. A `None` bump leaves the version untouched.
///
/// # Errors
///
/// Returns [`VersionError::Unparseable`] if `version` cannot be read and
/// [`VersionError::Overflow`] if the bumped component does not fit.
pub fn bump_version(version: &str, bump_type: BumpType) -> Result<String> {
    if bump_type.is_none() {
        return Ok(version.to_string());
    }
    let info = parse(version, None)?;
    Ok(bump_info(&info, bump_type)?.to_string())
}

/// The component a pre-release base already reserves.
///
/// `2.0.0-rc.1` reserves a major release, `1.3.0-rc.1` a minor one and
/// `1.2.4-rc.1` a patch.
fn reserved_bump(info: &PrereleaseInfo) -> BumpType {
    if info.minor == 0 && info.patch == 0 {
        BumpType::Major
    } else if info.patch == 0 {
        BumpType::Minor
    } else {
        BumpType::Patch
    }
}

/// Computes the next release version for a package.
///
/// Without a pre-release label a current pre-release is promoted when the
/// bump fits inside the component its base already reserves, otherwise the
/// base is bumped. With a label the current pre-release is incremented (same
/// label), escalated (higher label) or a fresh `{label}.1` is started on the
/// bumped base.
///
/// # Errors
///
/// Returns [`VersionError::Unparseable`] if `current` cannot be read and
/// [`VersionError::Overflow`] if a component or counter cannot grow.
pub fn next_release_version(
    current: &str,
    bump_type: BumpType,
    label: Option<PrereleaseLabel>,
    scheme: VersionScheme,
) -> Result<String> {
    if bump_type.is_none() {
        return Ok(current.to_string());
    }
    let info = parse(current, None)?;

    let next = match (info.label, label) {
        (Some(current_label), Some(requested)) if current_label == requested => {
            info.next_counter()?
        }
        (Some(current_label), Some(requested)) if current_label < requested => {
            info.with_prerelease(requested, 1)?
        }
        (_, Some(requested)) => bump_info(&info, bump_type)?.with_prerelease(requested, 1)?,
        (Some(_), None) if bump_type <= reserved_bump(&info) => info.base(),
        (_, None) => bump_info(&info, bump_type)?,
    };

    Ok(next.with_scheme(scheme).to_string())
}
