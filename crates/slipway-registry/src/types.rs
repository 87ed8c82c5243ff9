//! Domain types for the Slipway version registry.

use serde::{Deserialize, Serialize};
use slipway_core::{AuthConfig, BindingSet, ServiceConfig};

/// A logical service being versioned and deployed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    /// Version string of the currently active version, if any.
    pub current_version: Option<String>,
    /// Public endpoint of the currently active worker, if deployed.
    pub endpoint: Option<String>,
    /// The service's current binding configuration (merged with version
    /// snapshots on rollback).
    #[serde(default)]
    pub bindings: BindingSet,
    pub created_at: u64,
    pub updated_at: u64,
}

/// One published version of a service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceVersion {
    pub id: String,
    pub service_id: String,
    /// Semantic version string, unique per service.
    pub version: String,
    /// Content-addressed bundle key of the frozen source snapshot.
    pub bundle_key: String,
    /// Config snapshot the version was published with.
    pub config: ServiceConfig,
    pub is_active: bool,
    /// Set when the version was last activated by a deploy or rollback.
    pub deployed_at: Option<u64>,
    pub created_at: u64,
}

impl ServiceVersion {
    pub fn table_key(&self) -> String {
        version_key(&self.service_id, &self.version)
    }
}

/// Composite key for the versions table.
pub fn version_key(service_id: &str, version: &str) -> String {
    format!("{service_id}:{version}")
}

/// What a recorded operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Publish,
    Rollback,
}

/// Lifecycle status of an operation. Transitions are monotonic and
/// terminal once completed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: OperationStatus) -> bool {
        use OperationStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress) | (Pending, Failed) | (InProgress, Completed) | (InProgress, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "pending",
            OperationStatus::InProgress => "in_progress",
            OperationStatus::Completed => "completed",
            OperationStatus::Failed => "failed",
        }
    }
}

/// One publish or rollback attempt. The operation id doubles as the
/// deployment id used to address its live progress channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationRecord {
    pub id: String,
    pub service_id: String,
    pub version_id: String,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub error: Option<String>,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
}

/// Stored auth configuration for a service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfigRecord {
    pub service_id: String,
    pub config: AuthConfig,
    pub updated_at: u64,
}

/// Result of an atomic active-version flip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationOutcome {
    /// Version id that was active before the flip, if any.
    pub previous: Option<String>,
    /// Version id now active.
    pub activated: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_are_monotonic() {
        use OperationStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Failed));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(InProgress));
    }

    #[test]
    fn kind_and_status_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&OperationKind::Rollback).unwrap(),
            "\"rollback\""
        );
        assert_eq!(
            serde_json::to_string(&OperationStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
