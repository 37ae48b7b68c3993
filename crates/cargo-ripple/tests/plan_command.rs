mod common;

use common::{released_workspace, ripple};
use predicates::prelude::*;
use predicates::str::contains;

#[test]
fn lists_levels_and_computed_versions() {
    let dir = released_workspace();

    ripple()
        .arg("plan")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(contains("Level 0:"))
        .stdout(contains("  core 0.1.0 -> 0.2.0 (minor)"))
        .stdout(contains("  docs 0.1.0 (unchanged)"))
        .stdout(contains("Level 1:\n  app 0.1.0 -> 0.1.1 (patch)"))
        .stdout(contains("2 of 3 crates will be released."));
}

#[test]
fn no_propagate_leaves_dependents_alone() {
    let dir = released_workspace();

    ripple()
        .args(["plan", "--no-propagate"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(contains("  app 0.1.0 (unchanged)"))
        .stdout(contains("1 of 3 crates will be released."));
}

#[test]
fn path_flag_selects_the_workspace() {
    let dir = released_workspace();
    let elsewhere = tempfile::tempdir().expect("create temp dir");

    ripple()
        .arg("plan")
        .arg("-C")
        .arg(dir.path())
        .current_dir(elsewhere.path())
        .assert()
        .success()
        .stdout(contains("core 0.1.0 -> 0.2.0"));
}

#[test]
fn prerelease_plan_suffixes_every_release() {
    let dir = released_workspace();

    ripple()
        .args(["plan", "--prerelease", "alpha"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(contains("core 0.1.0 -> 0.2.0-alpha.1"))
        .stdout(contains("docs 0.1.0 (unchanged)").and(contains("docs 0.1.0 ->").not()));
}

#[test]
fn fails_outside_a_cargo_project() {
    let dir = tempfile::tempdir().expect("create temp dir");

    ripple()
        .arg("plan")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn nothing_changed_since_the_tags() {
    let dir = common::tagged_workspace();

    ripple()
        .arg("plan")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout("No crates to release.\n");
}
