//! slipway-bundle — content-addressed storage for source snapshots.
//!
//! Every published version freezes its source snapshot into a bundle keyed
//! by `{service_id}/{version}/{sha256}`. Writes are idempotent per content
//! hash; deletes are best-effort cleanup after failed registry writes.
//!
//! Two backends share one API: a filesystem store for the daemon and an
//! in-memory store for tests.

mod store;

pub use store::{BundleReceipt, BundleStore};

use thiserror::Error;

/// Result type alias for bundle store operations.
pub type BundleResult<T> = Result<T, BundleError>;

/// Errors that can occur during bundle store operations.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle not found: {0}")]
    NotFound(String),

    #[error("invalid bundle key: {0}")]
    InvalidKey(String),

    #[error("io error: {0}")]
    Io(String),
}
