//! Release coordinator — drives the publish pipeline for one operation.
//!
//! The pipeline is a linear state machine; any step short-circuits to
//! `Failed` with the captured error. Every step reports progress before
//! suspending on an external call and logs after resuming, so observers
//! see clean step boundaries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use slipway_bundle::{BundleError, BundleStore};
use slipway_codegen::GeneratorInput;
use slipway_core::{AuthConfig, ServiceConfig};
use slipway_progress::{BroadcasterHandle, DeploymentStatus, LogLevel};
use slipway_registry::{OperationStatus, Registry};

use crate::deploy::{DeployApi, DeployFailure, DeployRequest, secrets_for, worker_name};
use crate::error::{ReleaseError, ReleaseResult};
use crate::guard::ServiceGuards;

/// Phases of a publish, in order. Each reports exactly one progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPhase {
    Initializing,
    FetchingBundle,
    PreparingWorker,
    Deploying,
    UpdatingRouting,
    Completed,
}

impl PublishPhase {
    pub fn percent(&self) -> u8 {
        match self {
            PublishPhase::Initializing => 5,
            PublishPhase::FetchingBundle => 20,
            PublishPhase::PreparingWorker => 40,
            PublishPhase::Deploying => 70,
            PublishPhase::UpdatingRouting => 85,
            PublishPhase::Completed => 100,
        }
    }

    pub fn step(&self) -> &'static str {
        match self {
            PublishPhase::Initializing => "initializing",
            PublishPhase::FetchingBundle => "fetching_bundle",
            PublishPhase::PreparingWorker => "preparing_worker",
            PublishPhase::Deploying => "deploying",
            PublishPhase::UpdatingRouting => "updating_routing",
            PublishPhase::Completed => "completed",
        }
    }
}

/// One publish operation in flight.
pub struct ReleaseCoordinator {
    pub(crate) registry: Registry,
    pub(crate) bundles: BundleStore,
    pub(crate) deploy: Arc<dyn DeployApi>,
    pub(crate) progress: BroadcasterHandle,
    pub(crate) guards: ServiceGuards,
    pub(crate) step_timeout: Duration,
    pub(crate) operation_id: String,
    pub(crate) service_id: String,
    pub(crate) version_id: String,
}

impl ReleaseCoordinator {
    /// Run the pipeline to completion or failure. Failures are recorded on
    /// the operation and broadcast before this returns.
    pub async fn run(self) -> ReleaseResult<()> {
        let result = self.execute().await;
        if let Err(err) = &result {
            error!(
                operation = %self.operation_id,
                service = %self.service_id,
                %err,
                "publish failed"
            );
            let message = err.to_string();
            // Best-effort: the operation may already be terminal if the
            // failure raced a concurrent status write.
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

        self.registry.update_operation_status(
            &self.operation_id,
            OperationStatus::InProgress,
            None,
        )?;
        self.progress.status(DeploymentStatus::InProgress, None);
        self.report(PublishPhase::Initializing, "publish started");

        let version = self
            .registry
            .version_by_id(&self.version_id)?
            .ok_or_else(|| ReleaseError::NotFound(format!("version {}", self.version_id)))?;
        let auth = self
            .registry
            .get_auth_config(&self.service_id)?
            .map(|record| record.config)
            .unwrap_or_else(AuthConfig::public);

        // ── Fetch the frozen source snapshot ───────────────────────
        self.report(PublishPhase::FetchingBundle, "fetching source bundle");
        let bundle = match self.bundles.get(&version.bundle_key) {
            Ok(bytes) => bytes,
            Err(BundleError::NotFound(key)) => return Err(ReleaseError::BundleNotFound(key)),
            Err(err) => return Err(ReleaseError::Bundle(err.to_string())),
        };
        let config: ServiceConfig = serde_json::from_slice(&bundle)
            .map_err(|e| ReleaseError::Config(format!("bundle is not a config snapshot: {e}")))?;
        self.progress.log(
            LogLevel::Info,
            format!("bundle fetched ({} bytes)", bundle.len()),
        );

        // ── Generate worker source ─────────────────────────────────
        self.report(PublishPhase::PreparingWorker, "generating worker source");
        let source = slipway_codegen::generate(&GeneratorInput {
            service_name: &self.service_id,
            version: &version.version,
            config: &config,
            auth: &auth,
        })
        .map_err(|e| ReleaseError::Config(e.to_string()))?;
        self.progress.log(
            LogLevel::Info,
            format!("worker source generated ({} tools)", config.tools.len()),
        );

        // ── Deploy ─────────────────────────────────────────────────
        let name = worker_name(&self.service_id, &version.version);
        self.report(PublishPhase::Deploying, "deploying worker");
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

        // ── Resolve the public endpoint ────────────────────────────
        self.report(PublishPhase::UpdatingRouting, "resolving endpoint");
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
            &self.version_id,
            expected.as_deref(),
            Some(&endpoint),
        ) {
            // The platform serves the new worker but the registry does
            // not reflect it. Clean up the bundle and surface distinctly.
            let _ = self.bundles.delete(&version.bundle_key);
            return Err(ReleaseError::RegistryWrite(err.to_string()));
        }

        self.registry.update_operation_status(
            &self.operation_id,
            OperationStatus::Completed,
            None,
        )?;
        self.report(PublishPhase::Completed, "publish completed");
        self.progress.status(DeploymentStatus::Completed, None);
        info!(
            operation = %self.operation_id,
            service = %self.service_id,
            version = %version.version,
            %endpoint,
            "publish completed"
        );
        Ok(())
    }

    fn report(&self, phase: PublishPhase, message: &str) {
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
