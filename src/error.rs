//! Domain error taxonomy
//!
//! Boundary code (file storage, config, CLI) uses `anyhow`; everything the
//! editor itself can reject is expressed here so callers can match on it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    /// Persisted blob failed structural validation
    #[error("stored presets are corrupt: {0}")]
    StorageCorrupt(String),

    /// Import payload matched none of the known shapes
    #[error("unrecognized import format: {0}")]
    ImportFormatUnrecognized(String),

    /// Edit referenced a slot that no longer exists
    #[error("index {index} out of range for section '{section}'")]
    InvalidIndex { section: String, index: usize },

    #[error("unknown section '{0}'")]
    UnknownSection(String),

    #[error("preset '{0}' does not exist")]
    UnknownPreset(String),

    #[error("preset '{0}' already exists")]
    PresetExists(String),

    #[error("preset name must not be empty")]
    EmptyPresetName,

    #[error("cannot delete the last remaining preset")]
    LastPreset,

    #[error("invalid role '{0}' (expected system, user or assistant)")]
    InvalidRole(String),

    #[error("storage backend failed: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("failed to encode presets: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T, E = ChainError> = std::result::Result<T, E>;
