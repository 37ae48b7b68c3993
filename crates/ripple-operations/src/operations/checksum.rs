use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::types::Checksums;

/// SHA-256 of every regular file below `dir`, keyed by `/`-separated path
/// relative to `dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be walked or a file cannot be read.
pub fn checksum_dir(dir: &Path) -> io::Result<Checksums> {
    let mut checksums = Checksums::new();
    walk(dir, dir, &mut checksums)?;
    Ok(checksums)
}

fn walk(base: &Path, current: &Path, checksums: &mut Checksums) -> io::Result<()> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk(base, &path, checksums)?;
        } else if file_type.is_file() {
            let digest = Sha256::digest(fs::read(&path)?);
            let relative = path
                .strip_prefix(base)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            checksums.insert(relative, format!("{digest:x}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_nested_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("package"))?;
        fs::write(dir.path().join("package/core-1.0.0.crate"), b"abc")?;
        fs::write(dir.path().join("notes.txt"), b"")?;

        let checksums = checksum_dir(dir.path())?;

        assert_eq!(checksums.len(), 2);
        assert_eq!(
            checksums["package/core-1.0.0.crate"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            checksums["notes.txt"],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        Ok(())
    }

    #[test]
    fn empty_directory_has_no_checksums() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;

        assert!(checksum_dir(dir.path())?.is_empty());
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(checksum_dir(Path::new("/definitely/not/here")).is_err());
    }
}
