use std::path::Path;

use ripple_operations::operations::PlanOperation;
use ripple_operations::providers::{FileSystemProjectProvider, Git2Provider};

use super::PlanArgs;
use crate::error::Result;
use crate::output::{PlainTextFormatter, ReportFormatter};

pub(crate) fn run(args: &PlanArgs, start_path: &Path) -> Result<()> {
    let operation = PlanOperation::new(FileSystemProjectProvider::new(), Git2Provider::new());
    let plan = operation.execute(start_path, &args.versioning.plan_input())?;

    print!("{}", PlainTextFormatter.format_plan(&plan));
    Ok(())
}
