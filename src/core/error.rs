//! Error taxonomy for the governance layer.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Invalid path pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to read rule document {}: {source}", path.display())]
    RuleDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Staging area was modified during validation (before: {before}, after: {after}). \
         Validation must run in read-only mode and never modify staged changes."
    )]
    StagingAreaModified { before: String, after: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for governance operations.
pub type Result<T> = std::result::Result<T, GovernanceError>;
