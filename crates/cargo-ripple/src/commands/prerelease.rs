use ripple_version::{apply_prerelease, escalate_prerelease, increment_prerelease, promote_to_stable};

use super::PrereleaseCommand;
use crate::error::Result;

pub(crate) fn run(command: PrereleaseCommand) -> Result<()> {
    println!("{}", compute(&command)?);
    Ok(())
}

fn compute(command: &PrereleaseCommand) -> Result<String> {
    let version = match command {
        PrereleaseCommand::Apply {
            version,
            label,
            counter,
            scheme,
        } => apply_prerelease(version, label.as_str(), *scheme, *counter)?,
        PrereleaseCommand::Increment { version, scheme } => increment_prerelease(version, *scheme)?,
        PrereleaseCommand::Escalate {
            version,
            label,
            scheme,
        } => escalate_prerelease(version, label.as_str(), *scheme)?,
        PrereleaseCommand::Promote { version, scheme } => promote_to_stable(version, *scheme)?,
    };
    Ok(version)
}
