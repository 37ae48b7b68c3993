use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("dependency cycle detected between packages: {}", participants.join(" -> "))]
    Cycle { participants: Vec<String> },

    #[error("package '{package}' declares internal dependency '{dependency}' which is not in the workspace")]
    UnknownDependency { package: String, dependency: String },

    #[error("package '{0}' appears more than once in the workspace")]
    DuplicatePackage(String),
}
