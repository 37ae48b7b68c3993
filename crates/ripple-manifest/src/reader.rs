use std::path::Path;

use toml_edit::{DocumentMut, Item};

use crate::error::ManifestError;

/// # Errors
///
/// Returns `ManifestError::Read` if the file cannot be read, or
/// `ManifestError::Parse` if the TOML is malformed.
pub fn read_document(path: &Path) -> Result<DocumentMut, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    content
        .parse::<DocumentMut>()
        .map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn string_at(doc: &DocumentMut, path: &Path, keys: &[&str]) -> Result<String, ManifestError> {
    let mut item: &Item = doc.as_item();
    for (depth, key) in keys.iter().enumerate() {
        item = item.get(*key).ok_or_else(|| ManifestError::MissingField {
            path: path.to_path_buf(),
            field: keys[..=depth].join("."),
        })?;
    }

    item.as_str()
        .map(str::to_string)
        .ok_or_else(|| ManifestError::MissingField {
            path: path.to_path_buf(),
            field: format!("{} (as string)", keys.join(".")),
        })
}

/// Reads the literal `package.version` of a manifest.
///
/// # Errors
///
/// Returns `ManifestError::MissingField` when the version is absent or
/// inherited from the workspace.
pub fn read_version(path: &Path) -> Result<String, ManifestError> {
    let doc = read_document(path)?;
    string_at(&doc, path, &["package", "version"])
}

/// Reads `workspace.package.version` from a root manifest.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or the field is missing.
pub fn read_workspace_version(path: &Path) -> Result<String, ManifestError> {
    let doc = read_document(path)?;
    string_at(&doc, path, &["workspace", "package", "version"])
}

/// # Errors
///
/// Returns an error if the manifest cannot be read or parsed.
pub fn has_inherited_version(path: &Path) -> Result<bool, ManifestError> {
    let doc = read_document(path)?;

    Ok(doc
        .get("package")
        .and_then(|package| package.get("version"))
        .and_then(|version| version.get("workspace"))
        .and_then(Item::as_bool)
        .unwrap_or(false))
}
