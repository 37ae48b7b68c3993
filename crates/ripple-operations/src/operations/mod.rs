mod apply;
mod bump;
mod checksum;
mod pipeline;
mod plan;
mod publish;

pub use apply::write_release_versions;
pub use bump::{BumpCalculator, BumpOptions, resolve_bumps};
pub use checksum::checksum_dir;
pub use plan::{PlanInput, PlanOperation, ReleasePlan};
pub use publish::{PublishOrchestrator, tag_published};
