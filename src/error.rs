//! Error taxonomy
//!
//! Fatal-for-run errors stop the whole batch. Everything else is scoped to a
//! single artefact, and content-level problems never reach this type at all:
//! they are collected as validation violations instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid artefact {path}: {}", .problems.join("; "))]
    InvalidArtefact { path: PathBuf, problems: Vec<String> },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Template {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Register error: {0}")]
    Register(#[from] csv::Error),
}

impl PipelineError {
    /// Errors that abort the whole run rather than a single artefact.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            PipelineError::Config(_)
                | PipelineError::Template(_)
                | PipelineError::EngineVersionMismatch(..)
                | PipelineError::Yaml(_)
        )
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        PipelineError::Parse {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
