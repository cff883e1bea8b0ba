//! Error types for project generation

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{OperatingSystemType, TargetType, ToolchainType};

/// Result type alias for generator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Generator errors. Every variant aborts the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("duplicate project names: {}", .0.join(" "))]
    DuplicateProjectNames(Vec<String>),

    #[error("unresolved dependencies: {}", format_unresolved(.0))]
    UnresolvedDependencies(BTreeMap<String, Vec<String>>),

    #[error("dependency cycle detected at '{0}'")]
    DependencyCycle(String),

    #[error("target type {target_type} is not supported on {operating_system}")]
    UnsupportedTargetType {
        target_type: TargetType,
        operating_system: OperatingSystemType,
    },

    #[error("toolchain {0} is not supported")]
    UnsupportedToolchain(ToolchainType),

    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("source ambiguity: {0}")]
    SourceAmbiguity(String),

    #[error("invalid option key '{key}': {reason}")]
    InvalidOptionKey { key: String, reason: String },

    #[error("invalid define '{0}'")]
    InvalidDefine(String),

    #[error("unknown {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("failed to parse {}: {source}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn format_unresolved(unresolved: &BTreeMap<String, Vec<String>>) -> String {
    unresolved
        .iter()
        .map(|(project, missing)| format!("{} -> {}", project, missing.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_lists_every_project() {
        let mut unresolved = BTreeMap::new();
        unresolved.insert("hello".to_string(), vec!["math".to_string()]);
        unresolved.insert("tool".to_string(), vec!["core".to_string(), "net".to_string()]);
        let message = Error::UnresolvedDependencies(unresolved).to_string();
        assert_eq!(
            message,
            "unresolved dependencies: hello -> math; tool -> core net"
        );
    }

    #[test]
    fn duplicate_names_are_space_separated() {
        let message =
            Error::DuplicateProjectNames(vec!["foo".to_string(), "bar".to_string()]).to_string();
        assert_eq!(message, "duplicate project names: foo bar");
    }
}
