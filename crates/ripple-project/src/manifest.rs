use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::config::RippleMetadata;
use crate::error::ProjectError;

pub(crate) type DependencyTable = BTreeMap<String, DependencySpec>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CargoManifest {
    pub(crate) package: Option<PackageSection>,
    pub(crate) workspace: Option<WorkspaceSection>,
    #[serde(default)]
    pub(crate) dependencies: DependencyTable,
    #[serde(default, rename = "build-dependencies")]
    pub(crate) build_dependencies: DependencyTable,
    #[serde(default, rename = "dev-dependencies")]
    pub(crate) dev_dependencies: DependencyTable,
    #[serde(default)]
    pub(crate) target: BTreeMap<String, TargetSection>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TargetSection {
    #[serde(default)]
    pub(crate) dependencies: DependencyTable,
    #[serde(default, rename = "build-dependencies")]
    pub(crate) build_dependencies: DependencyTable,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PackageSection {
    pub(crate) name: String,
    pub(crate) version: Option<VersionField>,
    pub(crate) publish: Option<PublishField>,
    pub(crate) metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum VersionField {
    Literal(String),
    Inherited(Inherited),
}

#[derive(Debug, Deserialize)]
pub(crate) struct Inherited {
    pub(crate) workspace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PublishField {
    Flag(bool),
    Registries(Vec<String>),
}

impl PublishField {
    pub(crate) fn allows_publishing(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Registries(registries) => !registries.is_empty(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DependencySpec {
    Version(String),
    Detailed(DetailedDependency),
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DetailedDependency {
    pub(crate) package: Option<String>,
    #[serde(default)]
    pub(crate) workspace: bool,
}

impl DependencySpec {
    /// Name of the package this entry resolves to, following `package = "…"`
    /// renames here or in `[workspace.dependencies]`.
    pub(crate) fn package_name<'a>(&'a self, key: &'a str, inherited: &'a DependencyTable) -> &'a str {
        match self {
            Self::Version(_) => key,
            Self::Detailed(detail) => {
                if let Some(package) = &detail.package {
                    return package;
                }
                if detail.workspace {
                    if let Some(Self::Detailed(DetailedDependency {
                        package: Some(package),
                        ..
                    })) = inherited.get(key)
                    {
                        return package;
                    }
                }
                key
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkspaceSection {
    pub(crate) members: Option<Vec<String>>,
    pub(crate) exclude: Option<Vec<String>>,
    pub(crate) package: Option<WorkspacePackage>,
    pub(crate) metadata: Option<Metadata>,
    #[serde(default)]
    pub(crate) dependencies: DependencyTable,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkspacePackage {
    pub(crate) version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Metadata {
    pub(crate) ripple: Option<RippleMetadata>,
}

impl CargoManifest {
    /// Every dependency that can create a build-order edge, as
    /// `(key, spec)` pairs. Dev-dependencies are excluded.
    pub(crate) fn build_order_dependencies(&self) -> impl Iterator<Item = (&String, &DependencySpec)> {
        self.dependencies
            .iter()
            .chain(self.build_dependencies.iter())
            .chain(
                self.target
                    .values()
                    .flat_map(|t| t.dependencies.iter().chain(t.build_dependencies.iter())),
            )
    }
}

pub(crate) fn read_manifest(path: &Path) -> Result<CargoManifest, ProjectError> {
    let content = std::fs::read_to_string(path).map_err(|source| ProjectError::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ProjectError::ManifestParse {
        path: path.to_path_buf(),
        source,
    })
}
