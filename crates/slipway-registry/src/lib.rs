//! slipway-registry — the authoritative record of services, versions, and
//! operations.
//!
//! Backed by redb with JSON-serialized values. The registry owns the
//! single-active-version invariant: the deactivate-current + activate-target
//! pair is applied inside one write transaction, conditioned on the version
//! the caller believes is active (compare-and-swap). A racing flip is
//! rejected with [`RegistryError::ActiveConflict`] instead of corrupting
//! the invariant.

mod error;
mod store;
mod tables;
mod types;

pub use error::{RegistryError, RegistryResult};
pub use store::Registry;
pub use types::*;
