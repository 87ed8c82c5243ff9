//! slipway-release — the release orchestration engine.
//!
//! The [`Orchestrator`] is the invocation surface consumed by the REST
//! layer: `publish` freezes a config snapshot into a bundle, records the
//! version and operation, and spawns a [`ReleaseCoordinator`] to drive the
//! deploy pipeline; `rollback` runs a [`RollbackCoordinator`] to
//! completion. Both report live progress through the [`ProgressHub`],
//! addressed by operation id.

pub mod coordinator;
pub mod deploy;
pub mod error;
pub mod guard;
pub mod rollback;

pub use coordinator::{PublishPhase, ReleaseCoordinator};
pub use deploy::{DeployApi, DeployFailure, DeployRequest, HttpDeployApi, secrets_for, worker_name};
pub use error::{ReleaseError, ReleaseResult};
pub use guard::ServiceGuards;
pub use rollback::{RollbackCoordinator, RollbackPhase};

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use slipway_bundle::BundleStore;
use slipway_core::{AuthConfig, ServiceConfig, now_epoch};
use slipway_progress::ProgressHub;
use slipway_registry::{
    OperationKind, OperationRecord, OperationStatus, Registry, RegistryError, ServiceRecord,
    ServiceVersion,
};

/// Input to a publish: the declarative definition of one new version.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub service_id: String,
    pub version: String,
    pub config: ServiceConfig,
    /// Replaces the service's stored auth config when present.
    pub auth: Option<AuthConfig>,
}

/// Entry point for all mutating release operations.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Registry,
    bundles: BundleStore,
    deploy: Arc<dyn DeployApi>,
    hub: ProgressHub,
    guards: ServiceGuards,
    step_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: Registry,
        bundles: BundleStore,
        deploy: Arc<dyn DeployApi>,
        hub: ProgressHub,
        step_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            bundles,
            deploy,
            hub,
            guards: ServiceGuards::new(),
            step_timeout,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn hub(&self) -> &ProgressHub {
        &self.hub
    }

    /// Submit a publish. Returns the operation id (which doubles as the
    /// deployment id for live progress) once the version, bundle, and
    /// operation records exist; the pipeline itself runs in the
    /// background.
    pub async fn publish(&self, request: PublishRequest) -> ReleaseResult<String> {
        semver::Version::parse(&request.version).map_err(|e| ReleaseError::InvalidVersion {
            version: request.version.clone(),
            reason: e.to_string(),
        })?;

        // Duplicate versions are rejected before any bundle is created.
        if self
            .registry
            .find_version(&request.service_id, &request.version)?
            .is_some()
        {
            return Err(ReleaseError::VersionConflict {
                service: request.service_id,
                version: request.version,
            });
        }

        let now = now_epoch();
        if self.registry.get_service(&request.service_id)?.is_none() {
            self.registry.put_service(&ServiceRecord {
                id: request.service_id.clone(),
                name: request.service_id.clone(),
                current_version: None,
                endpoint: None,
                bindings: request.config.bindings.clone(),
                created_at: now,
                updated_at: now,
            })?;
        }
        if let Some(auth) = &request.auth {
            self.registry
                .put_auth_config(&slipway_registry::AuthConfigRecord {
                    service_id: request.service_id.clone(),
                    config: auth.clone(),
                    updated_at: now,
                })?;
        }

        let snapshot = request
            .config
            .canonical_bytes()
            .map_err(|e| ReleaseError::Config(format!("config snapshot: {e}")))?;
        let receipt = self
            .bundles
            .put(&request.service_id, &request.version, &snapshot)
            .map_err(|e| ReleaseError::Bundle(e.to_string()))?;

        let version = ServiceVersion {
            id: Uuid::new_v4().to_string(),
            service_id: request.service_id.clone(),
            version: request.version.clone(),
            bundle_key: receipt.key.clone(),
            config: request.config.clone(),
            is_active: false,
            deployed_at: None,
            created_at: now,
        };
        match self.registry.create_version(&version) {
            Ok(()) => {}
            Err(RegistryError::VersionConflict { service, version }) => {
                let _ = self.bundles.delete(&receipt.key);
                return Err(ReleaseError::VersionConflict { service, version });
            }
            Err(err) => return Err(err.into()),
        }

        let operation = OperationRecord {
            id: Uuid::new_v4().to_string(),
            service_id: request.service_id.clone(),
            version_id: version.id.clone(),
            kind: OperationKind::Publish,
            status: OperationStatus::Pending,
            error: None,
            created_at: now,
            started_at: None,
            finished_at: None,
        };
        self.registry.create_operation(&operation)?;

        let coordinator = ReleaseCoordinator {
            registry: self.registry.clone(),
            bundles: self.bundles.clone(),
            deploy: self.deploy.clone(),
            progress: self.hub.handle(&operation.id).await,
            guards: self.guards.clone(),
            step_timeout: self.step_timeout,
            operation_id: operation.id.clone(),
            service_id: request.service_id.clone(),
            version_id: version.id,
        };
        tokio::spawn(coordinator.run());

        info!(
            operation = %operation.id,
            service = %request.service_id,
            version = %request.version,
            "publish submitted"
        );
        Ok(operation.id)
    }

    /// Roll a service back to a prior version. Runs to completion before
    /// returning; the operation id is returned for the audit trail.
    pub async fn rollback(&self, service_id: &str, target_version: &str) -> ReleaseResult<String> {
        // Best-effort preflight lookup for the audit record; the
        // coordinator re-checks preconditions under the service guard.
        let version_id = self
            .registry
            .find_version(service_id, target_version)?
            .map(|v| v.id)
            .unwrap_or_default();
        let operation = OperationRecord {
            id: Uuid::new_v4().to_string(),
            service_id: service_id.to_string(),
            version_id,
            kind: OperationKind::Rollback,
            status: OperationStatus::Pending,
            error: None,
            created_at: now_epoch(),
            started_at: None,
            finished_at: None,
        };
        self.registry.create_operation(&operation)?;

        let coordinator = RollbackCoordinator {
            registry: self.registry.clone(),
            deploy: self.deploy.clone(),
            progress: self.hub.handle(&operation.id).await,
            guards: self.guards.clone(),
            step_timeout: self.step_timeout,
            operation_id: operation.id.clone(),
            service_id: service_id.to_string(),
            target_version: target_version.to_string(),
        };
        coordinator.run().await?;
        Ok(operation.id)
    }
}
