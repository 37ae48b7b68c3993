mod cargo;
mod git;
mod project;
mod registry;
mod run_state;

pub use cargo::CargoPackageManager;
pub use git::Git2Provider;
pub use project::FileSystemProjectProvider;
pub use registry::{CRATES_IO_INDEX, SparseIndexRegistry, index_path};
pub use run_state::FileSystemRunStateStore;
