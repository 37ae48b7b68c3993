mod plan;
mod prerelease;
mod publish;
mod status;

use std::path::Path;

use clap::{Args, Subcommand};
use ripple_core::{PrereleaseLabel, VersionScheme};
use ripple_operations::operations::PlanInput;

use crate::error::Result;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Show dependency levels and the versions the next release would use
    Plan(PlanArgs),
    /// Build, publish and verify every changed crate, level by level
    Publish(PublishArgs),
    /// Show the recorded state of the last publish run
    Status,
    /// Pre-release version arithmetic
    #[command(subcommand)]
    Prerelease(PrereleaseCommand),
}

/// Options that change which versions are computed.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct VersioningArgs {
    /// Release as a pre-release with this label
    #[arg(long, value_enum)]
    pub prerelease: Option<PrereleaseLabel>,

    /// Do not give dependents of bumped crates a patch bump
    #[arg(long)]
    pub no_propagate: bool,

    /// Release every crate with the highest bump found anywhere
    #[arg(long)]
    pub synchronize: bool,
}

impl VersioningArgs {
    pub(crate) fn plan_input(&self) -> PlanInput {
        PlanInput {
            prerelease: self.prerelease,
            scheme: None,
            no_propagate: self.no_propagate,
            synchronize: self.synchronize,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct PlanArgs {
    #[command(flatten)]
    pub versioning: VersioningArgs,
}

#[derive(Args, Debug)]
pub(crate) struct PublishArgs {
    #[command(flatten)]
    pub versioning: VersioningArgs,

    /// Build and run `cargo publish --dry-run` without uploading or recording state
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum number of crates processed at once within a level
    #[arg(long, short = 'j')]
    pub concurrency: Option<usize>,

    /// Resolve each published crate from the registry before continuing
    #[arg(long)]
    pub smoke_test: bool,

    /// Discard a recorded run from another commit instead of failing
    #[arg(long)]
    pub fresh: bool,

    /// Create a release tag for every published crate
    #[arg(long)]
    pub tag: bool,

    /// Sparse index used to check that uploads are visible
    #[arg(long, default_value = ripple_operations::providers::CRATES_IO_INDEX)]
    pub index_url: String,
}

#[derive(Subcommand, Debug)]
pub(crate) enum PrereleaseCommand {
    /// Replace any pre-release suffix with `<label>.<counter>`
    Apply {
        version: String,
        #[arg(value_enum)]
        label: PrereleaseLabel,
        #[arg(long, default_value_t = 1)]
        counter: u64,
        #[arg(long, value_enum, default_value_t = VersionScheme::Semver)]
        scheme: VersionScheme,
    },
    /// Bump the pre-release counter
    Increment {
        version: String,
        #[arg(long, value_enum)]
        scheme: Option<VersionScheme>,
    },
    /// Move to a later label, resetting the counter
    Escalate {
        version: String,
        #[arg(value_enum)]
        label: PrereleaseLabel,
        #[arg(long, value_enum)]
        scheme: Option<VersionScheme>,
    },
    /// Drop the pre-release suffix
    Promote {
        version: String,
        #[arg(long, value_enum)]
        scheme: Option<VersionScheme>,
    },
}

impl Commands {
    pub(crate) async fn execute(self, start_path: &Path) -> Result<()> {
        match self {
            Self::Plan(args) => plan::run(&args, start_path),
            Self::Publish(args) => publish::run(args, start_path).await,
            Self::Status => status::run(start_path),
            Self::Prerelease(command) => prerelease::run(command),
        }
    }
}
