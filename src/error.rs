use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A single structural problem found while checking a suite definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Absolute path of the offending node.
    pub node_path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(node_path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue { node_path: node_path.into(), message: message.into() }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.node_path, self.message)
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues.iter().map(|issue| format!("  - {}", issue)).collect::<Vec<_>>().join("\n")
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O failure on '{}': {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration at '{key}': {reason}")]
    ConfigError { key: String, reason: String },

    #[error("A node named '{name}' already exists below '{parent}'")]
    DuplicateNameError { parent: String, name: String },

    #[error("Invalid node hierarchy: {0}")]
    HierarchyError(String),

    #[error("Suite definition failed validation with {} issue(s):\n{}", .0.len(), format_issues(.0))]
    ValidationError(Vec<ValidationIssue>),

    #[error("Job '{0}' not found in job table")]
    JobNotFoundError(String),

    #[error("Cannot derive an ensemble number from runoff file '{}'", .0.display())]
    RunoffFileError(PathBuf),

    #[error("Invalid file pattern: {0}")]
    PatternError(#[from] glob::PatternError),
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::IoError { path: path.as_ref().to_path_buf(), source }
    }

    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ConfigError { key: key.into(), reason: reason.into() }
    }
}

impl From<glob::GlobError> for Error {
    fn from(e: glob::GlobError) -> Self {
        let path = e.path().to_path_buf();
        Error::IoError { path, source: e.into_error() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
