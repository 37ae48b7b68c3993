use std::path::Path;

use ripple_project::{CargoProject, RippleConfig};

use crate::Result;

pub trait ProjectProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if no project can be found from the given path.
    fn discover_project(&self, start_path: &Path) -> Result<CargoProject>;

    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    fn load_config(&self, project: &CargoProject) -> Result<RippleConfig>;
}
