use ripple_core::BumpType;
use tracing::trace;

use crate::parse::{ConventionalCommit, has_breaking_footer};

/// Maps conventional commit types onto bump kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpRules {
    pub major_types: Vec<String>,
    pub minor_types: Vec<String>,
    pub patch_types: Vec<String>,
}

impl Default for BumpRules {
    fn default() -> Self {
        Self {
            major_types: Vec::new(),
            minor_types: vec!["feat".to_string()],
            patch_types: vec!["fix".to_string(), "perf".to_string()],
        }
    }
}

fn contains_kind(types: &[String], kind: &str) -> bool {
    types.iter().any(|t| t.eq_ignore_ascii_case(kind))
}

impl BumpRules {
    #[must_use]
    pub fn new(major_types: Vec<String>, minor_types: Vec<String>, patch_types: Vec<String>) -> Self {
        Self {
            major_types,
            minor_types,
            patch_types,
        }
    }

    /// Bump kind for one parsed commit. Breaking markers win over the type.
    #[must_use]
    pub fn classify(&self, commit: &ConventionalCommit) -> BumpType {
        if commit.breaking || contains_kind(&self.major_types, &commit.kind) {
            BumpType::Major
        } else if contains_kind(&self.minor_types, &commit.kind) {
            BumpType::Minor
        } else if contains_kind(&self.patch_types, &commit.kind) {
            BumpType::Patch
        } else {
            BumpType::None
        }
    }

    /// Bump kind for a raw commit message.
    ///
    /// A message without a conventional header only counts when it carries a
    /// breaking-change footer.
    #[must_use]
    pub fn classify_message(&self, message: &str) -> BumpType {
        match ConventionalCommit::parse(message) {
            Some(commit) => self.classify(&commit),
            None if has_breaking_footer(message) => BumpType::Major,
            None => BumpType::None,
        }
    }

    /// Highest bump across `messages`.
    pub fn bump_for<'a, I>(&self, messages: I) -> BumpType
    where
        I: IntoIterator<Item = &'a str>,
    {
        messages
            .into_iter()
            .map(|message| {
                let bump = self.classify_message(message);
                trace!(bump = %bump, header = message.lines().next().unwrap_or_default(), "classified commit");
                bump
            })
            .max()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules() {
        let rules = BumpRules::default();

        assert_eq!(rules.classify_message("feat: x"), BumpType::Minor);
        assert_eq!(rules.classify_message("fix: x"), BumpType::Patch);
        assert_eq!(rules.classify_message("perf: x"), BumpType::Patch);
        assert_eq!(rules.classify_message("docs: x"), BumpType::None);
        assert_eq!(rules.classify_message("random text"), BumpType::None);
    }

    #[test]
    fn fix_and_feat_reduce_to_minor() {
        let rules = BumpRules::default();

        assert_eq!(rules.bump_for(["fix: x", "feat: y"]), BumpType::Minor);
    }

    #[test]
    fn breaking_marker_forces_major() {
        let rules = BumpRules::default();

        assert_eq!(rules.bump_for(["fix: x", "feat: y", "chore!: drop msrv"]), BumpType::Major);
        assert_eq!(
            rules.bump_for(["fix: x", "docs: y\n\nBREAKING CHANGE: renamed"]),
            BumpType::Major
        );
    }

    #[test]
    fn breaking_footer_counts_without_conventional_header() {
        let rules = BumpRules::default();

        assert_eq!(
            rules.classify_message("Rework storage\n\nBREAKING CHANGE: new format"),
            BumpType::Major
        );
    }

    #[test]
    fn configured_major_types() {
        let rules = BumpRules {
            major_types: vec!["epoch".to_string()],
            ..BumpRules::default()
        };

        assert_eq!(rules.classify_message("epoch: 2024 edition"), BumpType::Major);
    }

    #[test]
    fn custom_type_lists_are_case_insensitive() {
        let rules = BumpRules::new(vec![], vec!["Feature".to_string()], vec!["BUG".to_string()]);

        assert_eq!(rules.classify_message("feature: x"), BumpType::Minor);
        assert_eq!(rules.classify_message("bug: x"), BumpType::Patch);
        assert_eq!(rules.classify_message("feat: x"), BumpType::None);
    }

    #[test]
    fn no_messages_is_none() {
        assert_eq!(BumpRules::default().bump_for([]), BumpType::None);
    }
}
