//! Rollback coordinator — reactivates a prior version of a service.
//!
//! Rollback never reuses a previously deployed artifact verbatim: the
//! worker source is regenerated from the target version's stored config
//! snapshot, with the snapshot's bindings merged over the service's
//! current binding configuration. It speaks the same live-progress
//! protocol as publish, with its own step ladder.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use slipway_codegen::GeneratorInput;
use slipway_core::{AuthConfig, ServiceConfig};
use slipway_progress::{BroadcasterHandle, DeploymentStatus, LogLevel};
use slipway_registry::{OperationStatus, Registry};

use crate::deploy::{DeployApi, DeployFailure, DeployRequest, secrets_for, worker_name};
use crate::error::{ReleaseError, ReleaseResult};
use crate::guard::ServiceGuards;

/// Phases of a rollback, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackPhase {
    Initializing,
    PreparingWorker,
    Deploying,
    UpdatingRouting,
    Completed,
}

impl RollbackPhase {
    pub fn percent(&self) -> u8 {
        match self {
            RollbackPhase::Initializing => 5,
            RollbackPhase::PreparingWorker => 30,
            RollbackPhase::Deploying => 60,
            RollbackPhase::UpdatingRouting => 85,
            RollbackPhase::Completed => 100,
        }
    }

    pub fn step(&self) -> &'static str {
        match self {
            RollbackPhase::Initializing => "initializing",
            RollbackPhase::PreparingWorker => "preparing_worker",
            RollbackPhase::Deploying => "deploying",
            RollbackPhase::UpdatingRouting => "updating_routing",
            RollbackPhase::Completed => "completed",
        }
    }
}

/// One rollback operation in flight.
pub struct RollbackCoordinator {
    pub(crate) registry: Registry,
    pub(crate) deploy: Arc<dyn DeployApi>,
    pub(crate) progress: BroadcasterHandle,
    pub(crate) guards: ServiceGuards,
    pub(crate) step_timeout: Duration,
    pub(crate) operation_id: String,
    pub(crate) service_id: String,
    pub(crate) target_version: String,
}

impl RollbackCoordinator {
    /// Run the rollback to completion or failure.
    pub async fn run(self) -> ReleaseResult<()> {
        let result = self.execute().await;
        if let Err(err) = &result {
            error!(
                operation = %self.operation_id,
                service = %self.service_id,
                target = %self.target_version,
                %err,
                "rollback failed"
            );
            let message = err.to_string();
            let _ = self.registry.update_operation_status(
                &self.operation_id,
                OperationStatus::Failed,
                Some(&message),
            );
            self.progress.log(LogLevel::Error, message.clone());
            self.progress.status(DeploymentStatus::Failed, Some(message));
        }
        result
    }

    async fn execute(&self) -> ReleaseResult<()> {
        let _guard = self.guards.lock(&self.service_id).await;

        // Preconditions are checked under the service guard so a racing
        // publish cannot invalidate them mid-flight.
        let target = self
            .registry
            .find_version(&self.service_id, &self.target_version)?
            .ok_or_else(|| {
                ReleaseError::NotFound(format!(
                    "version {} for service {}",
                    self.target_version, self.service_id
                ))
            })?;
        if target.is_active {
            return Err(ReleaseError::NoOp(format!(
                "version {} is already active for service {}",
                self.target_version, self.service_id
            )));
        }
        let service = self
            .registry
            .get_service(&self.service_id)?
            .ok_or_else(|| ReleaseError::NotFound(format!("service {}", self.service_id)))?;

        self.registry.update_operation_status(
            &self.operation_id,
            OperationStatus::InProgress,
            None,
        )?;
        self.progress.status(DeploymentStatus::InProgress, None);
        self.report(RollbackPhase::Initializing, "rollback started");

        let auth = self
            .registry
            .get_auth_config(&self.service_id)?
            .map(|record| record.config)
            .unwrap_or_else(AuthConfig::public);

        // ── Regenerate from the snapshot ───────────────────────────
        // Snapshot bindings take precedence; current service bindings
        // fill the gaps. The regenerated source therefore matches the
        // *current* auth/binding configuration, not a stale artifact.
        self.report(RollbackPhase::PreparingWorker, "regenerating worker source");
        let bindings = target.config.bindings.merged_over(&service.bindings);
        let config = ServiceConfig {
            tools: target.config.tools.clone(),
            bindings,
            // The stored auth config wins over the snapshot's mode: the
            // redeployed worker must honor whatever auth the service uses
            // *now*.
            auth_mode: auth.mode,
        };
        let source = slipway_codegen::generate(&GeneratorInput {
            service_name: &self.service_id,
            version: &target.version,
            config: &config,
            auth: &auth,
        })
        .map_err(|e| ReleaseError::Config(e.to_string()))?;
        self.progress.log(
            LogLevel::Info,
            format!("worker source regenerated for {}", target.version),
        );

        // ── Redeploy under the deterministic worker name ───────────
        let name = worker_name(&self.service_id, &target.version);
        self.report(RollbackPhase::Deploying, "redeploying worker");
        self.progress
            .log(LogLevel::Info, format!("deploying worker {name}"));
        let request = DeployRequest {
            worker_name: name.clone(),
            source,
            bindings: config.bindings.clone(),
            secrets: secrets_for(&auth),
        };
        self.with_timeout("deploying", self.deploy.deploy(&request))
            .await?;
        self.progress.log(LogLevel::Info, "worker deployed");

        self.report(RollbackPhase::UpdatingRouting, "resolving endpoint");
        let endpoint = self
            .with_timeout("updating_routing", self.deploy.endpoint_for(&name))
            .await?;
        self.progress
            .log(LogLevel::Info, format!("endpoint resolved: {endpoint}"));

        // ── Flip the active version (atomic, CAS-guarded) ──────────
        let expected = self
            .registry
            .active_version(&self.service_id)?
            .map(|v| v.id);
        if let Err(err) = self.registry.activate_version(
            &self.service_id,
            &target.id,
            expected.as_deref(),
            Some(&endpoint),
        ) {
            return Err(ReleaseError::RegistryWrite(err.to_string()));
        }

        self.registry.update_operation_status(
            &self.operation_id,
            OperationStatus::Completed,
            None,
        )?;
        self.report(RollbackPhase::Completed, "rollback completed");
        self.progress.status(DeploymentStatus::Completed, None);
        info!(
            operation = %self.operation_id,
            service = %self.service_id,
            version = %target.version,
            "rollback completed"
        );
        Ok(())
    }

    fn report(&self, phase: RollbackPhase, message: &str) {
        self.progress.progress(phase.step(), phase.percent(), message);
    }

    async fn with_timeout<T>(
        &self,
        step: &'static str,
        call: impl Future<Output = Result<T, DeployFailure>>,
    ) -> ReleaseResult<T> {
        match tokio::time::timeout(self.step_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(failure)) => Err(ReleaseError::Deploy(failure.to_string())),
            Err(_) => Err(ReleaseError::Timeout {
                step,
                seconds: self.step_timeout.as_secs(),
            }),
        }
    }
}
