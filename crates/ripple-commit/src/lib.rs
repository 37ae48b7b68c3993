mod classify;
mod parse;

pub use classify::BumpRules;
pub use parse::{ConventionalCommit, has_breaking_footer};
