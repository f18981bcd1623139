//! Error types for keg

use std::path::PathBuf;
use thiserror::Error;

use crate::storage::NodeId;

#[derive(Error, Debug)]
pub enum KegError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("no nodes to choose from")]
    NoCandidates,

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A derived dex artifact is missing, truncated, or unparsable.
    /// Repaired by a full rebuild, never by patching.
    #[error("inconsistent dex artifact {path}: {reason}")]
    Inconsistent { path: PathBuf, reason: String },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("no kegs found")]
    NoKeg,

    #[error("{0}")]
    Collaborator(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl KegError {
    pub fn inconsistent(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        KegError::Inconsistent { path: path.into(), reason: reason.into() }
    }

    /// True when the failure can be repaired by recomputing the dex from the
    /// node directories.
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, KegError::Inconsistent { .. })
    }
}

pub type Result<T> = std::result::Result<T, KegError>;
