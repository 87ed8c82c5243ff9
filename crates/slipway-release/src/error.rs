//! Error taxonomy for release operations.
//!
//! Every variant is fatal for its operation: the captured message lands in
//! the operation record and is broadcast to progress subscribers. Nothing
//! here is retried automatically; the operator re-invokes explicitly.

use slipway_registry::RegistryError;
use thiserror::Error;

/// Result type alias for release operations.
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Errors that can terminate a publish or rollback.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// Malformed service definition. Fatal before any deploy attempt.
    #[error("invalid service configuration: {0}")]
    Config(String),

    /// The version's source snapshot is missing. Fatal before deploy.
    #[error("bundle not found: {0}")]
    BundleNotFound(String),

    /// The bundle store rejected a read or write.
    #[error("bundle store error: {0}")]
    Bundle(String),

    /// The hosting platform rejected the worker. The prior active version
    /// keeps serving.
    #[error("deploy failed: {0}")]
    Deploy(String),

    /// The registry update after a successful deploy failed: the platform
    /// now serves code the registry does not reflect. Surfaced distinctly
    /// so operators can reconcile.
    #[error("registry write failed after deploy: {0}")]
    RegistryWrite(String),

    /// Duplicate version string, rejected before bundle creation.
    #[error("version {version} already exists for service {service}")]
    VersionConflict { service: String, version: String },

    /// Rollback target is already the active version.
    #[error("rollback is a no-op: {0}")]
    NoOp(String),

    #[error("invalid version string {version}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// An external call outlived its per-step timeout.
    #[error("step {step} timed out after {seconds}s")]
    Timeout { step: &'static str, seconds: u64 },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
