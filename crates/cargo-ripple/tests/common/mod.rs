#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

pub fn ripple() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cargo-ripple");
    cmd.env_remove("RIPPLE_LOG");
    cmd
}

pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_crate(root: &Path, name: &str, deps: &str) {
    let dir = root.join("crates").join(name);
    fs::create_dir_all(dir.join("src")).expect("create crate dir");
    fs::write(
        dir.join("Cargo.toml"),
        format!(
            "[package]\nname = \"{name}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n{deps}"
        ),
    )
    .expect("write crate manifest");
    fs::write(dir.join("src/lib.rs"), "").expect("write lib.rs");
}

/// `core` <- `app` plus an unrelated `docs`, all tagged at 0.1.0 on HEAD.
pub fn tagged_workspace() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    let root = dir.path();
    fs::write(
        root.join("Cargo.toml"),
        "[workspace]\nmembers = [\"crates/*\"]\nresolver = \"2\"\n",
    )
    .expect("write workspace manifest");
    write_crate(root, "core", "");
    write_crate(root, "app", "core = { path = \"../core\" }\n");
    write_crate(root, "docs", "");

    git(root, &["init", "--quiet"]);
    git(root, &["config", "user.email", "test@example.com"]);
    git(root, &["config", "user.name", "Test User"]);
    git(root, &["add", "-A"]);
    git(root, &["commit", "--quiet", "-m", "chore: initial import"]);
    for name in ["core", "app", "docs"] {
        git(root, &["tag", "-a", &format!("{name}@v0.1.0"), "-m", "release"]);
    }
    dir
}

/// [`tagged_workspace`] followed by a feature commit touching `core`.
pub fn released_workspace() -> TempDir {
    let dir = tagged_workspace();
    let root = dir.path();
    fs::write(root.join("crates/core/src/lib.rs"), "pub fn answer() -> u8 { 42 }\n")
        .expect("write feature");
    git(root, &["add", "-A"]);
    git(root, &["commit", "--quiet", "-m", "feat: expose the answer"]);
    dir
}
