use std::path::Path;

use ripple_commit::BumpRules;
use ripple_core::{PackageVersion, PrereleaseLabel, VersionMap, VersionScheme};
use ripple_graph::{Levels, build_graph, topo_sort};
use ripple_project::{CargoProject, RippleConfig};
use tracing::info;

use super::bump::{BumpCalculator, BumpOptions};
use crate::Result;
use crate::traits::{ProjectProvider, VcsProvider};

/// Overrides from the command line, applied on top of the loaded config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanInput {
    pub prerelease: Option<PrereleaseLabel>,
    pub scheme: Option<VersionScheme>,
    pub no_propagate: bool,
    pub synchronize: bool,
}

#[derive(Debug, Clone)]
pub struct ReleasePlan {
    pub project: CargoProject,
    pub config: RippleConfig,
    pub commit: String,
    pub levels: Levels,
    /// One entry per package, in level order.
    pub versions: Vec<PackageVersion>,
}

impl ReleasePlan {
    /// Packages that will actually be released.
    pub fn releases(&self) -> impl Iterator<Item = &PackageVersion> {
        self.versions.iter().filter(|v| !v.skipped)
    }

    #[must_use]
    pub fn version_map(&self) -> VersionMap {
        self.versions
            .iter()
            .map(|v| (v.name.clone(), v.new_version.clone()))
            .collect()
    }
}

pub struct PlanOperation<P, V> {
    project_provider: P,
    vcs: V,
}

impl<P, V> PlanOperation<P, V>
where
    P: ProjectProvider,
    V: VcsProvider,
{
    pub fn new(project_provider: P, vcs: V) -> Self {
        Self {
            project_provider,
            vcs,
        }
    }

    #[must_use]
    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Discovers the project, orders it into levels and computes every
    /// package's next version.
    ///
    /// # Errors
    ///
    /// Returns a configuration error (discovery, unknown dependency, cycle)
    /// before any history is read, or an error from reading history.
    pub fn execute(&self, start_path: &Path, input: &PlanInput) -> Result<ReleasePlan> {
        let project = self.project_provider.discover_project(start_path)?;
        let mut config = self.project_provider.load_config(&project)?;
        if input.no_propagate {
            config = config.with_propagate(false);
        }
        if input.synchronize {
            config = config.with_synchronize(true);
        }
        if let Some(scheme) = input.scheme {
            config = config.with_version_scheme(scheme);
        }

        let graph = build_graph(&project.packages)?;
        let levels = topo_sort(&graph)?;
        let commit = self.vcs.head_commit(&project.root)?;

        let options = BumpOptions {
            propagate: config.propagate(),
            synchronize: config.synchronize(),
            prerelease: input.prerelease,
            scheme: config.version_scheme(),
            tag_format: config.tag_format(),
            rules: BumpRules::new(
                config.major_types().to_vec(),
                config.minor_types().to_vec(),
                config.patch_types().to_vec(),
            ),
        };
        let versions =
            BumpCalculator::new(&self.vcs, options).calculate(&project.root, &project.packages, &levels)?;

        info!(
            packages = project.packages.len(),
            levels = levels.len(),
            releases = versions.iter().filter(|v| !v.skipped).count(),
            "computed release plan"
        );

        Ok(ReleasePlan {
            project,
            config,
            commit,
            levels,
            versions,
        })
    }
}
