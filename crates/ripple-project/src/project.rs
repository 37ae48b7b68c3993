use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use ripple_core::Package;
use tracing::debug;

use crate::error::ProjectError;
use crate::manifest::{CargoManifest, DependencyTable, PublishField, VersionField, read_manifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    VirtualWorkspace,
    WorkspaceWithRoot,
    SinglePackage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CargoProject {
    pub root: PathBuf,
    pub kind: ProjectKind,
    /// Sorted by name.
    pub packages: Vec<Package>,
}

impl CargoProject {
    #[must_use]
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }
}

/// A member manifest that has been read but whose dependencies are not yet
/// classified.
struct Member {
    dir: PathBuf,
    manifest_path: PathBuf,
    manifest: CargoManifest,
}

/// # Errors
///
/// Returns `ProjectError` if no project root can be found or if manifest parsing fails.
pub fn discover_project(start_dir: &Path) -> Result<CargoProject, ProjectError> {
    let start_dir = start_dir
        .canonicalize()
        .map_err(|source| ProjectError::ManifestRead {
            path: start_dir.to_path_buf(),
            source,
        })?;

    let (root, manifest) = find_project_root(&start_dir)?;
    let kind = determine_project_kind(&manifest);
    let members = collect_members(&root, manifest, kind)?;
    let packages = build_packages(&root, members)?;

    debug!(root = %root.display(), ?kind, packages = packages.len(), "discovered project");

    Ok(CargoProject {
        root,
        kind,
        packages,
    })
}

/// # Errors
///
/// Returns `ProjectError` if no project root can be found or if manifest parsing fails.
pub fn discover_project_from_cwd() -> Result<CargoProject, ProjectError> {
    let cwd = std::env::current_dir()?;
    discover_project(&cwd)
}

fn find_project_root(start_dir: &Path) -> Result<(PathBuf, CargoManifest), ProjectError> {
    let mut current = start_dir.to_path_buf();
    let mut fallback_single_package: Option<(PathBuf, CargoManifest)> = None;

    loop {
        let manifest_path = current.join("Cargo.toml");

        if manifest_path.exists() {
            let manifest = read_manifest(&manifest_path)?;

            if manifest.workspace.is_some() {
                return Ok((current, manifest));
            }

            if manifest.package.is_some() && fallback_single_package.is_none() {
                fallback_single_package = Some((current.clone(), manifest));
            }
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => {
                return fallback_single_package.ok_or_else(|| ProjectError::NotFound {
                    start_dir: start_dir.to_path_buf(),
                });
            }
        }
    }
}

fn determine_project_kind(manifest: &CargoManifest) -> ProjectKind {
    match (&manifest.workspace, &manifest.package) {
        (Some(_), Some(_)) => ProjectKind::WorkspaceWithRoot,
        (None, Some(_)) => ProjectKind::SinglePackage,
        (Some(_) | None, None) => ProjectKind::VirtualWorkspace,
    }
}

fn collect_members(
    root: &Path,
    manifest: CargoManifest,
    kind: ProjectKind,
) -> Result<(CargoManifest, Vec<Member>), ProjectError> {
    let mut members = Vec::new();
    let mut seen_dirs = BTreeSet::new();

    if let Some(workspace) = &manifest.workspace {
        let patterns = workspace.members.as_deref().unwrap_or(&[]);
        let excludes = workspace.exclude.as_deref().unwrap_or(&[]);

        for pattern in patterns {
            for member_dir in expand_glob_pattern(root, pattern, excludes)? {
                let manifest_path = member_dir.join("Cargo.toml");
                if !manifest_path.exists() || !seen_dirs.insert(member_dir.clone()) {
                    continue;
                }

                let member_manifest = read_manifest(&manifest_path)?;
                if member_manifest.package.is_some() {
                    members.push(Member {
                        dir: member_dir,
                        manifest_path,
                        manifest: member_manifest,
                    });
                }
            }
        }
    }

    if kind != ProjectKind::VirtualWorkspace && seen_dirs.insert(root.to_path_buf()) {
        // the root manifest is both the workspace table and a package; re-read
        // it so the workspace section stays available for inheritance
        members.push(Member {
            dir: root.to_path_buf(),
            manifest_path: root.join("Cargo.toml"),
            manifest: read_manifest(&root.join("Cargo.toml"))?,
        });
    }

    Ok((manifest, members))
}

fn build_packages(
    root: &Path,
    (root_manifest, members): (CargoManifest, Vec<Member>),
) -> Result<Vec<Package>, ProjectError> {
    let empty = DependencyTable::new();
    let workspace = root_manifest.workspace.as_ref();
    let workspace_version = workspace
        .and_then(|ws| ws.package.as_ref())
        .and_then(|pkg| pkg.version.as_deref());
    let inherited = workspace.map_or(&empty, |ws| &ws.dependencies);

    let mut by_name: BTreeMap<String, &Member> = BTreeMap::new();
    for member in &members {
        let Some(pkg) = &member.manifest.package else {
            continue;
        };
        if let Some(previous) = by_name.insert(pkg.name.clone(), member) {
            return Err(ProjectError::DuplicatePackage {
                name: pkg.name.clone(),
                first: previous.dir.clone(),
                second: member.dir.clone(),
            });
        }
    }

    let mut packages = Vec::with_capacity(by_name.len());
    for (name, member) in &by_name {
        let Some(pkg) = &member.manifest.package else {
            continue;
        };
        let version = resolve_version(pkg.version.as_ref(), workspace_version, &member.manifest_path)?;

        let mut internal = BTreeSet::new();
        let mut external = BTreeSet::new();
        for (key, spec) in member.manifest.build_order_dependencies() {
            let dependency = spec.package_name(key, inherited);
            if dependency == name {
                continue;
            }
            if by_name.contains_key(dependency) {
                internal.insert(dependency.to_string());
            } else {
                external.insert(dependency.to_string());
            }
        }

        let publishable = pkg.publish.as_ref().is_none_or(PublishField::allows_publishing);

        debug!(
            package = %name,
            %version,
            internal = internal.len(),
            external = external.len(),
            publishable,
            path = %member.dir.strip_prefix(root).unwrap_or(&member.dir).display(),
            "read package"
        );

        packages.push(Package {
            name: name.clone(),
            version,
            path: member.dir.clone(),
            manifest_path: member.manifest_path.clone(),
            internal_dependencies: internal.into_iter().collect(),
            external_dependencies: external.into_iter().collect(),
            publishable,
        });
    }

    Ok(packages)
}

fn resolve_version(
    version_field: Option<&VersionField>,
    workspace_version: Option<&str>,
    manifest_path: &Path,
) -> Result<String, ProjectError> {
    match version_field {
        Some(VersionField::Literal(v)) => Ok(v.clone()),
        Some(VersionField::Inherited(inherited)) if inherited.workspace => workspace_version
            .map(str::to_string)
            .ok_or_else(|| ProjectError::MissingField {
                path: manifest_path.to_path_buf(),
                field: "workspace.package.version",
            }),
        Some(VersionField::Inherited(_)) | None => Err(ProjectError::MissingField {
            path: manifest_path.to_path_buf(),
            field: "package.version",
        }),
    }
}

fn expand_glob_pattern(
    root: &Path,
    pattern: &str,
    excludes: &[String],
) -> Result<Vec<PathBuf>, ProjectError> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| ProjectError::GlobPattern {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    let exclude_matchers = excludes
        .iter()
        .map(|ex| {
            GlobBuilder::new(ex)
                .literal_separator(true)
                .build()
                .map(|g| g.compile_matcher())
                .map_err(|source| ProjectError::GlobPattern {
                    pattern: ex.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut dirs = Vec::new();
    collect_matching_dirs(root, root, &glob, &exclude_matchers, &mut dirs)?;
    dirs.sort();

    Ok(dirs)
}

fn collect_matching_dirs(
    base: &Path,
    current: &Path,
    glob: &globset::GlobMatcher,
    excludes: &[globset::GlobMatcher],
    results: &mut Vec<PathBuf>,
) -> Result<(), ProjectError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_dir() || is_ignored_dir(&path) {
            continue;
        }

        let relative = path.strip_prefix(base).unwrap_or(&path);

        if excludes.iter().any(|ex| ex.is_match(relative)) {
            continue;
        }

        if glob.is_match(relative) {
            results.push(path.clone());
        }

        collect_matching_dirs(base, &path, glob, excludes, results)?;
    }

    Ok(())
}

fn is_ignored_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name == "target" || name.starts_with('.'))
}
