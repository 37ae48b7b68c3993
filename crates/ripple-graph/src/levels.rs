use serde::{Deserialize, Serialize};

/// Packages grouped by topological level.
///
/// Level 0 holds packages without internal dependencies. Every package in
/// level `k` depends only on packages from levels below `k`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Levels(Vec<Vec<String>>);

impl Levels {
    #[must_use]
    pub fn new(levels: Vec<Vec<String>>) -> Self {
        Self(levels)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Vec<String>] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<String>> {
        self.0.iter()
    }

    /// Index of the level containing `name`.
    #[must_use]
    pub fn level_of(&self, name: &str) -> Option<usize> {
        self.0
            .iter()
            .position(|level| level.iter().any(|n| n == name))
    }

    /// All packages in level order.
    pub fn flatten(&self) -> impl Iterator<Item = &str> {
        self.0.iter().flatten().map(String::as_str)
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Vec<String>> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Levels {
    type Item = &'a Vec<String>;
    type IntoIter = std::slice::Iter<'a, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
