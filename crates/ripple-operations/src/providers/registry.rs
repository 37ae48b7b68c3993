use std::ffi::OsStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use super::cargo::{failure_message, run_cargo};
use crate::Result;
use crate::error::OperationError;
use crate::traits::Registry;

pub const CRATES_IO_INDEX: &str = "https://index.crates.io";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct IndexEntry {
    vers: String,
}

/// Checks version visibility through a Cargo sparse index and smoke-tests
/// published crates with a throwaway consumer crate.
pub struct SparseIndexRegistry {
    client: Client,
    index_url: String,
    registry: Option<String>,
    cargo: String,
}

impl SparseIndexRegistry {
    /// A client for the crates.io sparse index.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        Self::with_index(CRATES_IO_INDEX, None)
    }

    /// A client for the sparse index at `index_url`. `registry` is the name
    /// Cargo knows that index by, used for smoke tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_index(index_url: &str, registry: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("cargo-ripple/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            index_url: index_url.trim_end_matches('/').to_string(),
            registry,
            cargo: std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string()),
        })
    }

    fn entry_url(&self, name: &str) -> String {
        format!("{}/{}", self.index_url, index_path(name))
    }
}

/// Location of a crate's entry inside a Cargo index.
#[must_use]
pub fn index_path(name: &str) -> String {
    let name = name.to_lowercase();
    match name.len() {
        1 => format!("1/{name}"),
        2 => format!("2/{name}"),
        3 => format!("3/{}/{name}", &name[..1]),
        _ => format!("{}/{}/{name}", &name[..2], &name[2..4]),
    }
}

/// Whether an index file lists `version`. Unparseable lines are ignored.
fn index_lists(body: &str, version: &str) -> bool {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<IndexEntry>(line).ok())
        .any(|entry| entry.vers == version)
}

fn smoke_manifest(name: &str, version: &str, registry: Option<&str>) -> String {
    let dependency = match registry {
        Some(registry) => format!("{{ version = \"={version}\", registry = \"{registry}\" }}"),
        None => format!("\"={version}\""),
    };
    format!(
        "[package]\nname = \"ripple-smoke-test\"\nversion = \"0.0.0\"\nedition = \"2021\"\npublish = false\n\n[dependencies]\n{name} = {dependency}\n\n[workspace]\n"
    )
}

#[async_trait]
impl Registry for SparseIndexRegistry {
    async fn poll_available(
        &self,
        name: &str,
        version: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.is_published(name, version).await {
                Ok(true) => return Ok(true),
                Ok(false) => debug!(package = %name, %version, "not visible yet"),
                Err(err) => warn!(package = %name, %version, error = %err, "registry check failed, retrying"),
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            sleep(interval.min(deadline - now)).await;
        }
    }

    async fn is_published(&self, name: &str, version: &str) -> Result<bool> {
        let response = self.client.get(self.entry_url(name)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let body = response.error_for_status()?.text().await?;
        Ok(index_lists(&body, version))
    }

    async fn smoke_test(&self, name: &str, version: &str) -> Result<()> {
        let scratch = tempfile::tempdir()?;
        std::fs::create_dir_all(scratch.path().join("src"))?;
        std::fs::write(scratch.path().join("src/lib.rs"), "")?;
        let manifest = scratch.path().join("Cargo.toml");
        std::fs::write(
            &manifest,
            smoke_manifest(name, version, self.registry.as_deref()),
        )?;

        let args: Vec<&OsStr> = vec![
            "generate-lockfile".as_ref(),
            "--manifest-path".as_ref(),
            manifest.as_os_str(),
        ];
        let output = run_cargo(&self.cargo, &args, Some(scratch.path())).await?;
        if !output.status.success() {
            return Err(OperationError::PublishFailed {
                package: name.to_string(),
                message: format!("smoke test could not resolve {version}: {}", failure_message(&output)),
            });
        }
        Ok(())
    }
}
