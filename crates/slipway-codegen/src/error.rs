//! Error types for code generation.

use thiserror::Error;

/// Result type alias for generator operations.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// Errors that can occur while generating worker source.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// The service definition is malformed or incomplete. Fatal before any
    /// deploy attempt.
    #[error("invalid service configuration: {0}")]
    Config(String),
}
