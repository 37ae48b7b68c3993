use std::path::Path;

use semver::Version;
use toml_edit::{DocumentMut, value};

use crate::error::ManifestError;
use crate::reader::{read_document, read_version};

pub(crate) fn write_document(path: &Path, doc: &DocumentMut) -> Result<(), ManifestError> {
    std::fs::write(path, doc.to_string()).map_err(|source| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn validate_version(path: &Path, version: &str) -> Result<(), ManifestError> {
    Version::parse(version)
        .map(|_| ())
        .map_err(|source| ManifestError::InvalidVersion {
            path: path.to_path_buf(),
            version: version.to_string(),
            source,
        })
}

/// Sets `package.version`, replacing an inherited `version.workspace = true`
/// with a literal. Returns `false` when the manifest already holds `version`.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read, parsed, or written, or if
/// `version` is not valid semver.
pub fn write_version(path: &Path, version: &str) -> Result<bool, ManifestError> {
    validate_version(path, version)?;
    let mut doc = read_document(path)?;

    let package = doc
        .get_mut("package")
        .and_then(|item| item.as_table_like_mut())
        .ok_or_else(|| ManifestError::MissingField {
            path: path.to_path_buf(),
            field: "package".to_string(),
        })?;

    if package.get("version").and_then(|item| item.as_str()) == Some(version) {
        return Ok(false);
    }
    package.insert("version", value(version));

    write_document(path, &doc)?;
    Ok(true)
}

/// # Errors
///
/// Returns `ManifestError::VerificationFailed` if the version in the manifest
/// does not match the expected version.
pub fn verify_version(path: &Path, expected: &str) -> Result<(), ManifestError> {
    let actual = read_version(path)?;

    if actual != expected {
        return Err(ManifestError::VerificationFailed {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }

    Ok(())
}
