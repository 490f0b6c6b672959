//! Error types for the export pipeline.
//!
//! Three layers of failure, one top-level umbrella:
//!
//! - [`ValidationError`]: a descriptor field or a configuration value is
//!   outside its documented domain. Raised at the point of entry, before
//!   anything is buffered or written.
//! - [`GraphError`]: a token-graph operation was called in the wrong
//!   lifecycle state (no open scene, already finalized, unknown category).
//! - [`StoreError`]: the persistence layer failed (filesystem, JSON).
//!
//! [`ExportError`] wraps all three so the orchestration layer can return a
//! single [`Result`] type.

use thiserror::Error;

/// Crate-wide result alias used by the orchestration layer.
pub type Result<T> = std::result::Result<T, ExportError>;

/// A value fell outside its documented domain.
///
/// These are raised eagerly by descriptor setters and by
/// [`ExportConfig::validate`](crate::config::ExportConfig::validate) so a
/// bad record can never reach the output files.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid truncation {0}: must be within [0, 1]")]
    InvalidTruncation(f64),

    #[error("invalid occlusion tier {0}: must be within 0..=3")]
    InvalidOcclusion(u8),

    #[error("invalid alpha {0}: must be within [-pi, pi]")]
    InvalidAlpha(f64),

    #[error("invalid rotation_y {0}: must be within [-pi, pi]")]
    InvalidRotationY(f64),

    #[error("invalid sensor '{channel}': {reason}")]
    InvalidSensor { channel: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("depth buffer holds {len} values for a {width}x{height} canvas")]
    DepthBufferSize { width: u32, height: u32, len: usize },

    #[error("depth visibility policy requires a depth buffer in the frame")]
    MissingDepthBuffer,
}

/// A token-graph operation was attempted in the wrong lifecycle state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("a scene is already open")]
    SceneAlreadyOpen,

    #[error("no open scene for {0}")]
    NoOpenScene(&'static str),

    #[error("no sample appended yet in the open scene")]
    NoCurrentSample,

    #[error("recording is finalized, no further appends accepted")]
    Finalized,

    #[error("unknown annotation category '{0}'")]
    UnknownCategory(String),
}

/// Persistence failure in the JSON collection store or the label tree.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("collection not initialized: {path}")]
    MissingCollection { path: String },
}

impl StoreError {
    /// Whether retrying the operation can plausibly succeed.
    ///
    /// IO failures are often transient and a missing collection can be
    /// initialized; a malformed JSON document on disk cannot be retried
    /// into correctness.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StoreError::Io(_) => true,
            StoreError::Json(_) => false,
            StoreError::MissingCollection { .. } => true,
        }
    }
}

/// Top-level error for the export pipeline.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

// ===== Tests =====
