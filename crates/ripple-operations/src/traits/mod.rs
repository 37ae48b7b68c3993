mod package_manager;
mod project_provider;
mod registry;
mod run_state_store;
mod vcs_provider;

pub use package_manager::PackageManager;
pub use project_provider::ProjectProvider;
pub use registry::Registry;
pub use run_state_store::RunStateStore;
pub use vcs_provider::VcsProvider;
