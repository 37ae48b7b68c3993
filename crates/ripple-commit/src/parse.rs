use std::sync::LazyLock;

use regex::Regex;

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>[A-Za-z][A-Za-z0-9_-]*)(?:\((?P<scope>[^()\r\n]*)\))?(?P<bang>!)?: (?P<description>\S.*)$")
        .expect("commit header pattern is valid")
});

const BREAKING_FOOTERS: [&str; 2] = ["BREAKING CHANGE:", "BREAKING-CHANGE:"];

/// Header and breaking marker of a conventional commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalCommit {
    /// Lowercased commit type (`feat`, `fix`, ...).
    pub kind: String,
    pub scope: Option<String>,
    pub description: String,
    pub breaking: bool,
}

impl ConventionalCommit {
    /// Parses the first line of `message` as `type(scope)!: description`.
    ///
    /// Returns `None` when the header does not follow the convention.
    #[must_use]
    pub fn parse(message: &str) -> Option<Self> {
        let header = message.lines().next()?.trim_end();
        let caps = HEADER.captures(header)?;

        let scope = caps
            .name("scope")
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());

        Some(Self {
            kind: caps["kind"].to_ascii_lowercase(),
            scope,
            description: caps["description"].trim().to_string(),
            breaking: caps.name("bang").is_some() || has_breaking_footer(message),
        })
    }
}

/// Reports whether any line after the header starts with a breaking-change footer token.
#[must_use]
pub fn has_breaking_footer(message: &str) -> bool {
    message
        .lines()
        .skip(1)
        .any(|line| BREAKING_FOOTERS.iter().any(|token| line.starts_with(token)))
}
