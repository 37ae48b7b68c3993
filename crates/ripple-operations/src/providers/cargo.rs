use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use ripple_core::Package;
use tokio::process::Command;
use tracing::debug;

use crate::Result;
use crate::error::OperationError;
use crate::traits::PackageManager;
use crate::types::PublishOptions;

/// Packages and uploads crates by shelling out to `cargo`.
pub struct CargoPackageManager {
    cargo: String,
}

impl CargoPackageManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cargo: std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string()),
        }
    }

    #[must_use]
    pub fn with_cargo(cargo: impl Into<String>) -> Self {
        Self {
            cargo: cargo.into(),
        }
    }
}

impl Default for CargoPackageManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageManager for CargoPackageManager {
    /// Runs `cargo package` against a scratch target dir and copies only the
    /// resulting `.crate` archive into `output_dir`.
    async fn build(&self, package: &Package, output_dir: &Path) -> Result<()> {
        let target_dir = scratch_target_dir(output_dir);
        match tokio::fs::remove_dir_all(target_dir.join("package")).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let args: Vec<&OsStr> = vec![
            "package".as_ref(),
            "--manifest-path".as_ref(),
            package.manifest_path.as_os_str(),
            "--allow-dirty".as_ref(),
            "--target-dir".as_ref(),
            target_dir.as_os_str(),
        ];
        let output = run_cargo(&self.cargo, &args, None).await?;

        if !output.status.success() {
            return Err(OperationError::BuildFailed {
                package: package.name.clone(),
                message: failure_message(&output),
            });
        }
        collect_archives(&package.name, &target_dir, output_dir).await?;
        Ok(())
    }

    async fn publish(&self, package: &Package, dist_dir: &Path, options: &PublishOptions) -> Result<()> {
        let target_dir = scratch_target_dir(dist_dir);
        let mut args: Vec<&OsStr> = vec![
            "publish".as_ref(),
            "--manifest-path".as_ref(),
            package.manifest_path.as_os_str(),
            "--allow-dirty".as_ref(),
            "--no-verify".as_ref(),
            "--target-dir".as_ref(),
            target_dir.as_os_str(),
        ];
        if let Some(registry) = &options.registry {
            args.push("--registry".as_ref());
            args.push(registry.as_ref());
        }
        if options.dry_run {
            args.push("--dry-run".as_ref());
        }

        let output = run_cargo(&self.cargo, &args, None).await?;
        if !output.status.success() {
            return Err(OperationError::PublishFailed {
                package: package.name.clone(),
                message: failure_message(&output),
            });
        }
        debug!(package = %package.name, version = %options.version, dry_run = options.dry_run, "cargo publish succeeded");
        Ok(())
    }
}

/// Cargo's build directory for a staging dir, kept beside it so verify-build
/// artifacts never land in the checksummed staging dir.
fn scratch_target_dir(staging: &Path) -> PathBuf {
    let mut dir = staging.as_os_str().to_owned();
    dir.push(".target");
    PathBuf::from(dir)
}

/// Copies `{name}-*.crate` from `target_dir/package` into `output_dir`.
async fn collect_archives(name: &str, target_dir: &Path, output_dir: &Path) -> Result<()> {
    let prefix = format!("{name}-");
    let mut copied = 0usize;

    let mut entries = match tokio::fs::read_dir(target_dir.join("package")).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(missing_archive(name, target_dir));
        }
        Err(err) => return Err(err.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if !entry.file_type().await?.is_file()
            || !file_name.starts_with(&prefix)
            || !file_name.ends_with(".crate")
        {
            continue;
        }
        tokio::fs::copy(entry.path(), output_dir.join(file_name.as_ref())).await?;
        copied += 1;
    }

    if copied == 0 {
        return Err(missing_archive(name, target_dir));
    }
    Ok(())
}

fn missing_archive(name: &str, target_dir: &Path) -> OperationError {
    OperationError::BuildFailed {
        package: name.to_string(),
        message: format!("no .crate archive under {}", target_dir.join("package").display()),
    }
}

/// Runs `cargo` with captured output, optionally inside `cwd`.
pub(crate) async fn run_cargo(cargo: &str, args: &[&OsStr], cwd: Option<&Path>) -> Result<Output> {
    let mut command = Command::new(cargo);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let rendered = render_command(cargo, args);
    debug!(command = %rendered, "running");
    command
        .output()
        .await
        .map_err(|source| OperationError::CommandSpawn {
            command: rendered,
            source,
        })
}

/// Trimmed stderr, or the exit status when cargo printed nothing.
pub(crate) fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("cargo exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

fn render_command(cargo: &str, args: &[&OsStr]) -> String {
    std::iter::once(cargo.into())
        .chain(args.iter().map(|a| a.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}
