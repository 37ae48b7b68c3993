use std::path::Path;

use ripple_operations::providers::{FileSystemProjectProvider, FileSystemRunStateStore};
use ripple_operations::traits::{ProjectProvider, RunStateStore};

use crate::error::Result;
use crate::output::{PlainTextFormatter, ReportFormatter};

pub(crate) fn run(start_path: &Path) -> Result<()> {
    let provider = FileSystemProjectProvider::new();
    let project = provider.discover_project(start_path)?;
    let config = provider.load_config(&project)?;
    let store = FileSystemRunStateStore::for_project(&project.root, config.state_file());

    match store.load()? {
        Some(state) => print!("{}", PlainTextFormatter.format_state(&state)),
        None => println!("No publish run recorded."),
    }
    Ok(())
}
