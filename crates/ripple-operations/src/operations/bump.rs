use std::collections::BTreeMap;
use std::path::Path;

use ripple_commit::BumpRules;
use ripple_core::{BumpType, Package, PackageVersion, PrereleaseLabel, TagFormat, VersionScheme};
use ripple_graph::Levels;
use ripple_version::next_release_version;
use tracing::{debug, info};

use crate::Result;
use crate::traits::VcsProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpOptions {
    pub propagate: bool,
    /// Lockstep mode: every package gets the highest bump seen anywhere.
    pub synchronize: bool,
    pub prerelease: Option<PrereleaseLabel>,
    pub scheme: VersionScheme,
    pub tag_format: TagFormat,
    pub rules: BumpRules,
}

impl Default for BumpOptions {
    fn default() -> Self {
        Self {
            propagate: true,
            synchronize: false,
            prerelease: None,
            scheme: VersionScheme::default(),
            tag_format: TagFormat::default(),
            rules: BumpRules::default(),
        }
    }
}

/// Computes the version every package is released at from its commit log.
pub struct BumpCalculator<'a, V> {
    vcs: &'a V,
    options: BumpOptions,
}

impl<'a, V> BumpCalculator<'a, V>
where
    V: VcsProvider,
{
    pub fn new(vcs: &'a V, options: BumpOptions) -> Self {
        Self { vcs, options }
    }

    /// Returns one [`PackageVersion`] per package, in level order.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit history cannot be read or a current
    /// version cannot be bumped.
    pub fn calculate(
        &self,
        project_root: &Path,
        packages: &[Package],
        levels: &Levels,
    ) -> Result<Vec<PackageVersion>> {
        let mut direct = BTreeMap::new();
        for package in packages {
            direct.insert(package.name.clone(), self.direct_bump(project_root, package)?);
        }

        let bumps = resolve_bumps(
            &direct,
            packages,
            levels,
            self.options.propagate,
            self.options.synchronize,
        );

        let mut versions = Vec::with_capacity(packages.len());
        for name in levels.flatten() {
            let Some(package) = packages.iter().find(|p| p.name == name) else {
                continue;
            };
            let bump_type = bumps.get(name).copied().unwrap_or_default();
            versions.push(self.version_for(package, bump_type)?);
        }

        Ok(versions)
    }

    fn direct_bump(&self, project_root: &Path, package: &Package) -> Result<BumpType> {
        let tag = self
            .vcs
            .last_release_tag(project_root, &package.name, self.options.tag_format)?;
        let since = tag.as_ref().map(|t| t.tag.name.as_str());
        let scope = (!self.options.synchronize).then_some(package.path.as_path());

        let commits = self.vcs.commits_since(project_root, since, scope)?;
        let bump = self
            .options
            .rules
            .bump_for(commits.iter().map(|c| c.message.as_str()));

        debug!(
            package = %package.name,
            since = since.unwrap_or("<root>"),
            commits = commits.len(),
            %bump,
            "classified commits"
        );
        Ok(bump)
    }

    fn version_for(&self, package: &Package, bump_type: BumpType) -> Result<PackageVersion> {
        if bump_type.is_none() {
            return Ok(PackageVersion::skipped(&package.name, &package.version));
        }

        let new_version = next_release_version(
            &package.version,
            bump_type,
            self.options.prerelease,
            self.options.scheme,
        )?;
        info!(package = %package.name, from = %package.version, to = %new_version, %bump_type, "planned release");

        Ok(PackageVersion {
            name: package.name.clone(),
            old_version: package.version.clone(),
            new_version,
            bump_type,
            skipped: false,
        })
    }
}

/// Final bump per package from the bumps its own commits warrant.
///
/// In lockstep mode every package receives the highest direct bump. Otherwise,
/// with propagation, a package whose internal dependency is bumped gets at
/// least a patch; levels are walked in order so this carries transitively.
#[must_use]
pub fn resolve_bumps(
    direct: &BTreeMap<String, BumpType>,
    packages: &[Package],
    levels: &Levels,
    propagate: bool,
    synchronize: bool,
) -> BTreeMap<String, BumpType> {
    if synchronize {
        let highest = direct.values().copied().max().unwrap_or_default();
        return packages
            .iter()
            .map(|p| (p.name.clone(), highest))
            .collect();
    }

    let mut resolved = direct.clone();
    if !propagate {
        return resolved;
    }

    for level in levels {
        for name in level {
            let Some(package) = packages.iter().find(|p| &p.name == name) else {
                continue;
            };
            let dependency_bumped = package
                .internal_dependencies
                .iter()
                .any(|dep| resolved.get(dep).is_some_and(|b| !b.is_none()));

            let entry = resolved.entry(name.clone()).or_default();
            if dependency_bumped && *entry < BumpType::Patch {
                debug!(package = %name, "propagated patch bump from dependency");
                *entry = BumpType::Patch;
            }
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockVcsProvider;
    use ripple_graph::{build_graph, topo_sort};

    fn chain() -> Vec<Package> {
        vec![
            Package::new("core", "1.0.0", "/ws/crates/core"),
            Package::new("mid", "0.4.2", "/ws/crates/mid").with_internal_dependencies(["core"]),
            Package::new("top", "2.1.0", "/ws/crates/top").with_internal_dependencies(["mid"]),
            Package::new("lone", "0.1.0", "/ws/crates/lone"),
        ]
    }

    fn levels_of(packages: &[Package]) -> Levels {
        topo_sort(&build_graph(packages).expect("graph")).expect("acyclic")
    }

    fn direct(bumps: &[(&str, BumpType)]) -> BTreeMap<String, BumpType> {
        bumps.iter().map(|(n, b)| ((*n).to_string(), *b)).collect()
    }

    mod resolve {
        use super::*;

        #[test]
        fn propagation_is_transitive_and_patch_only() {
            let packages = chain();
            let levels = levels_of(&packages);
            let direct = direct(&[
                ("core", BumpType::Major),
                ("mid", BumpType::None),
                ("top", BumpType::None),
                ("lone", BumpType::None),
            ]);

            let resolved = resolve_bumps(&direct, &packages, &levels, true, false);

            assert_eq!(resolved["core"], BumpType::Major);
            assert_eq!(resolved["mid"], BumpType::Patch);
            assert_eq!(resolved["top"], BumpType::Patch);
            assert_eq!(resolved["lone"], BumpType::None);
        }

        #[test]
        fn propagation_never_lowers_a_direct_bump() {
            let packages = chain();
            let levels = levels_of(&packages);
            let direct = direct(&[
                ("core", BumpType::Patch),
                ("mid", BumpType::Minor),
                ("top", BumpType::None),
                ("lone", BumpType::None),
            ]);

            let resolved = resolve_bumps(&direct, &packages, &levels, true, false);

            assert_eq!(resolved["mid"], BumpType::Minor);
            assert_eq!(resolved["top"], BumpType::Patch);
        }

        #[test]
        fn disabled_propagation_keeps_direct_bumps() {
            let packages = chain();
            let levels = levels_of(&packages);
            let direct = direct(&[("core", BumpType::Minor)]);

            let resolved = resolve_bumps(&direct, &packages, &levels, false, false);

            assert_eq!(resolved.get("mid"), None);
            assert_eq!(resolved["core"], BumpType::Minor);
        }

        #[test]
        fn lockstep_applies_highest_bump_everywhere() {
            let packages = chain();
            let levels = levels_of(&packages);
            let direct = direct(&[
                ("core", BumpType::Patch),
                ("lone", BumpType::Minor),
                ("mid", BumpType::None),
                ("top", BumpType::None),
            ]);

            let resolved = resolve_bumps(&direct, &packages, &levels, true, true);

            assert!(resolved.values().all(|b| *b == BumpType::Minor));
            assert_eq!(resolved.len(), 4);
        }

        #[test]
        fn lockstep_without_changes_skips_everything() {
            let packages = chain();
            let levels = levels_of(&packages);

            let resolved = resolve_bumps(&BTreeMap::new(), &packages, &levels, true, true);

            assert!(resolved.values().all(|b| b.is_none()));
        }
    }

    mod calculate {
        use super::*;

        #[test]
        fn fix_and_feat_give_minor_and_breaking_gives_major() -> anyhow::Result<()> {
            let packages = vec![Package::new("core", "1.2.3", "/ws/crates/core")];
            let levels = levels_of(&packages);

            let vcs = MockVcsProvider::new("head")
                .with_commits("/ws/crates/core", &["fix: x", "feat: y"]);
            let calculator = BumpCalculator::new(&vcs, BumpOptions::default());
            let versions = calculator.calculate(Path::new("/ws"), &packages, &levels)?;
            assert_eq!(versions[0].bump_type, BumpType::Minor);
            assert_eq!(versions[0].new_version, "1.3.0");

            let vcs = MockVcsProvider::new("head").with_commits(
                "/ws/crates/core",
                &["fix: x", "feat: y", "refactor!: drop legacy api"],
            );
            let calculator = BumpCalculator::new(&vcs, BumpOptions::default());
            let versions = calculator.calculate(Path::new("/ws"), &packages, &levels)?;
            assert_eq!(versions[0].bump_type, BumpType::Major);
            assert_eq!(versions[0].new_version, "2.0.0");

            Ok(())
        }

        #[test]
        fn commits_are_read_since_the_last_release_tag() -> anyhow::Result<()> {
            let packages = vec![Package::new("core", "1.0.0", "/ws/crates/core")];
            let levels = levels_of(&packages);
            let vcs = MockVcsProvider::new("head")
                .with_release_tag("core", "core@v1.0.0", "1.0.0")
                .with_commits("/ws/crates/core", &["fix: x"]);

            let calculator = BumpCalculator::new(&vcs, BumpOptions::default());
            calculator.calculate(Path::new("/ws"), &packages, &levels)?;

            assert_eq!(vcs.since_requests(), vec![Some("core@v1.0.0".to_string())]);
            Ok(())
        }

        #[test]
        fn untouched_packages_are_skipped_and_dependents_propagate() -> anyhow::Result<()> {
            let packages = chain();
            let levels = levels_of(&packages);
            let vcs = MockVcsProvider::new("head")
                .with_commits("/ws/crates/core", &["feat: new api"])
                .with_commits("/ws/crates/lone", &["docs: readme", "chore: deps"]);

            let calculator = BumpCalculator::new(&vcs, BumpOptions::default());
            let versions = calculator.calculate(Path::new("/ws"), &packages, &levels)?;

            let names: Vec<_> = versions.iter().map(|v| v.name.as_str()).collect();
            assert_eq!(names, vec!["core", "lone", "mid", "top"]);

            let by_name = |n: &str| versions.iter().find(|v| v.name == n).expect("version");
            assert_eq!(by_name("core").new_version, "1.1.0");
            assert_eq!(by_name("mid").new_version, "0.4.3");
            assert_eq!(by_name("top").new_version, "2.1.1");
            assert!(by_name("lone").skipped);
            assert_eq!(by_name("lone").new_version, "0.1.0");
            Ok(())
        }

        #[test]
        fn lockstep_reads_unscoped_history() -> anyhow::Result<()> {
            let packages = chain();
            let levels = levels_of(&packages);
            let vcs = MockVcsProvider::new("head").with_commits("/ws/crates/lone", &["feat: x"]);
            let options = BumpOptions {
                synchronize: true,
                ..BumpOptions::default()
            };

            let versions =
                BumpCalculator::new(&vcs, options).calculate(Path::new("/ws"), &packages, &levels)?;

            assert!(versions.iter().all(|v| v.bump_type == BumpType::Minor));
            assert!(vcs.scope_requests().iter().all(Option::is_none));
            Ok(())
        }

        #[test]
        fn prerelease_mode_applies_label() -> anyhow::Result<()> {
            let packages = vec![Package::new("core", "1.2.0", "/ws/crates/core")];
            let levels = levels_of(&packages);
            let vcs = MockVcsProvider::new("head").with_commits("/ws/crates/core", &["feat: x"]);
            let options = BumpOptions {
                prerelease: Some(PrereleaseLabel::Rc),
                ..BumpOptions::default()
            };

            let versions =
                BumpCalculator::new(&vcs, options).calculate(Path::new("/ws"), &packages, &levels)?;

            assert_eq!(versions[0].new_version, "1.3.0-rc.1");
            Ok(())
        }

        #[test]
        fn prerelease_mode_increments_same_label() -> anyhow::Result<()> {
            let packages = vec![Package::new("core", "1.3.0-rc.1", "/ws/crates/core")];
            let levels = levels_of(&packages);
            let vcs = MockVcsProvider::new("head").with_commits("/ws/crates/core", &["fix: x"]);
            let options = BumpOptions {
                prerelease: Some(PrereleaseLabel::Rc),
                ..BumpOptions::default()
            };

            let versions =
                BumpCalculator::new(&vcs, options).calculate(Path::new("/ws"), &packages, &levels)?;

            assert_eq!(versions[0].new_version, "1.3.0-rc.2");
            Ok(())
        }

        #[test]
        fn custom_rules_are_honored() -> anyhow::Result<()> {
            let packages = vec![Package::new("core", "1.0.0", "/ws/crates/core")];
            let levels = levels_of(&packages);
            let vcs = MockVcsProvider::new("head").with_commits("/ws/crates/core", &["docs: x"]);
            let options = BumpOptions {
                rules: BumpRules::new(vec![], vec![], vec!["docs".to_string()]),
                ..BumpOptions::default()
            };

            let versions =
                BumpCalculator::new(&vcs, options).calculate(Path::new("/ws"), &packages, &levels)?;

            assert_eq!(versions[0].new_version, "1.0.1");
            Ok(())
        }
    }
}
