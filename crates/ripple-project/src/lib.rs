mod config;
mod error;
mod manifest;
mod project;

pub use config::{
    DEFAULT_STAGING_DIR, DEFAULT_STATE_FILE, RippleConfig, clamp_poll_interval, clamp_poll_timeout,
    parse_config,
};
pub use error::ProjectError;
pub use project::{CargoProject, ProjectKind, discover_project, discover_project_from_cwd};

pub type Result<T> = std::result::Result<T, ProjectError>;
