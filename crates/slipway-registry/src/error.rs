//! Error types for the Slipway version registry.

use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A version with the same (service, version) pair already exists.
    #[error("version {version} already exists for service {service}")]
    VersionConflict { service: String, version: String },

    /// The active version changed under the caller; the flip was rejected.
    #[error("active version conflict for service {service}: expected {expected:?}, found {actual:?}")]
    ActiveConflict {
        service: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// Operation status may only move forward and never leaves a terminal
    /// state.
    #[error("invalid operation status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}
