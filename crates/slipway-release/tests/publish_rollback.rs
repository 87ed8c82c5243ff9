//! End-to-end publish/rollback behavior over an in-memory registry and
//! bundle store, with a scripted deploy API.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use slipway_bundle::BundleStore;
use slipway_core::{AuthConfig, AuthMode, BindingSet, ParamSchema, Parameter, ServiceConfig,
    ToolDefinition};
use slipway_progress::{ChannelMessage, DeploymentStatus, ProgressHub, ProgressSettings};
use slipway_registry::{OperationKind, OperationRecord, OperationStatus, Registry};
use slipway_release::{
    DeployApi, DeployFailure, DeployRequest, Orchestrator, PublishRequest, ReleaseError,
};

/// Scripted deploy API: records successful calls, optionally fails the
/// next deploy.
#[derive(Default)]
struct MockDeploy {
    calls: Mutex<Vec<DeployRequest>>,
    fail_next: AtomicBool,
}

impl MockDeploy {
    fn fail_next_deploy(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn calls(&self) -> Vec<DeployRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeployApi for MockDeploy {
    async fn deploy(&self, request: &DeployRequest) -> Result<(), DeployFailure> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DeployFailure("platform returned 502".to_string()));
        }
        self.calls.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn endpoint_for(&self, worker_name: &str) -> Result<String, DeployFailure> {
        Ok(format!("https://{worker_name}.workers.example.test"))
    }
}

struct Harness {
    orchestrator: Orchestrator,
    registry: Registry,
    bundles: BundleStore,
    deploy: Arc<MockDeploy>,
}

fn harness() -> Harness {
    let registry = Registry::open_in_memory().unwrap();
    let bundles = BundleStore::open_in_memory();
    let deploy = Arc::new(MockDeploy::default());
    let orchestrator = Orchestrator::new(
        registry.clone(),
        bundles.clone(),
        deploy.clone(),
        ProgressHub::new(ProgressSettings::default()),
        Duration::from_secs(5),
    );
    Harness {
        orchestrator,
        registry,
        bundles,
        deploy,
    }
}

fn weather_config(auth_mode: AuthMode) -> ServiceConfig {
    ServiceConfig {
        tools: vec![ToolDefinition {
            name: "get_weather".to_string(),
            description: "Current weather for a city".to_string(),
            input: vec![Parameter {
                name: "city".to_string(),
                description: String::new(),
                required: true,
                schema: ParamSchema::String {
                    enum_values: None,
                    pattern: None,
                    min_length: None,
                    max_length: None,
                },
            }],
            handler_source: "return { city: input.city, temp: 21 };".to_string(),
        }],
        bindings: BindingSet::default(),
        auth_mode,
    }
}

fn publish_request(service: &str, version: &str) -> PublishRequest {
    PublishRequest {
        service_id: service.to_string(),
        version: version.to_string(),
        config: weather_config(AuthMode::Public),
        auth: Some(AuthConfig::public()),
    }
}

async fn wait_terminal(registry: &Registry, operation_id: &str) -> OperationRecord {
    for _ in 0..500 {
        let record = registry.get_operation(operation_id).unwrap().unwrap();
        if record.status.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("operation {operation_id} never reached a terminal status");
}

#[tokio::test]
async fn publish_activates_the_new_version() {
    let h = harness();
    let op = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.0"))
        .await
        .unwrap();

    let record = wait_terminal(&h.registry, &op).await;
    assert_eq!(record.status, OperationStatus::Completed);
    assert_eq!(record.kind, OperationKind::Publish);

    let service = h.registry.get_service("svc1").unwrap().unwrap();
    assert_eq!(service.current_version.as_deref(), Some("1.0.0"));
    assert_eq!(
        service.endpoint.as_deref(),
        Some("https://slipway-svc1-1-0-0.workers.example.test")
    );
    let active = h.registry.active_version("svc1").unwrap().unwrap();
    assert_eq!(active.version, "1.0.0");
    assert!(active.deployed_at.is_some());
}

#[tokio::test]
async fn publish_then_rollback_restores_the_previous_version() {
    let h = harness();
    let first = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.0"))
        .await
        .unwrap();
    wait_terminal(&h.registry, &first).await;
    let second = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.1"))
        .await
        .unwrap();
    wait_terminal(&h.registry, &second).await;
    assert_eq!(
        h.registry
            .get_service("svc1")
            .unwrap()
            .unwrap()
            .current_version
            .as_deref(),
        Some("1.0.1")
    );

    let rollback_op = h.orchestrator.rollback("svc1", "1.0.0").await.unwrap();

    let record = h.registry.get_operation(&rollback_op).unwrap().unwrap();
    assert_eq!(record.kind, OperationKind::Rollback);
    assert_eq!(record.status, OperationStatus::Completed);

    let service = h.registry.get_service("svc1").unwrap().unwrap();
    assert_eq!(service.current_version.as_deref(), Some("1.0.0"));

    // Exactly one version is active, and it is the rollback target.
    let versions = h.registry.list_versions("svc1").unwrap();
    let active: Vec<_> = versions.iter().filter(|v| v.is_active).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].version, "1.0.0");
}

#[tokio::test]
async fn rollback_to_the_active_version_is_rejected_without_state_change() {
    let h = harness();
    let op = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.0"))
        .await
        .unwrap();
    wait_terminal(&h.registry, &op).await;
    let before = h.registry.get_service("svc1").unwrap().unwrap();
    let deploys_before = h.deploy.calls().len();

    let err = h.orchestrator.rollback("svc1", "1.0.0").await.unwrap_err();
    assert!(matches!(err, ReleaseError::NoOp(_)));

    // No redeploy happened and the registry is untouched.
    assert_eq!(h.deploy.calls().len(), deploys_before);
    let after = h.registry.get_service("svc1").unwrap().unwrap();
    assert_eq!(after.current_version, before.current_version);
    assert_eq!(after.endpoint, before.endpoint);
    let active = h.registry.active_version("svc1").unwrap().unwrap();
    assert_eq!(active.version, "1.0.0");
}

#[tokio::test]
async fn rollback_to_an_unknown_version_is_not_found() {
    let h = harness();
    let op = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.0"))
        .await
        .unwrap();
    wait_terminal(&h.registry, &op).await;

    let err = h.orchestrator.rollback("svc1", "9.9.9").await.unwrap_err();
    assert!(matches!(err, ReleaseError::NotFound(_)));
}

#[tokio::test]
async fn deploy_error_leaves_the_prior_active_version_untouched() {
    let h = harness();
    let first = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.0"))
        .await
        .unwrap();
    wait_terminal(&h.registry, &first).await;

    h.deploy.fail_next_deploy();
    let second = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.1"))
        .await
        .unwrap();
    let record = wait_terminal(&h.registry, &second).await;

    assert_eq!(record.status, OperationStatus::Failed);
    assert!(record.error.as_deref().unwrap().contains("deploy failed"));

    // The prior version keeps serving: active flag and service pointer
    // are unchanged.
    let service = h.registry.get_service("svc1").unwrap().unwrap();
    assert_eq!(service.current_version.as_deref(), Some("1.0.0"));
    let active = h.registry.active_version("svc1").unwrap().unwrap();
    assert_eq!(active.version, "1.0.0");
    let failed = h.registry.find_version("svc1", "1.0.1").unwrap().unwrap();
    assert!(!failed.is_active);
}

#[tokio::test]
async fn duplicate_version_is_rejected_before_bundle_creation() {
    let h = harness();
    let op = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.0"))
        .await
        .unwrap();
    wait_terminal(&h.registry, &op).await;
    let bundles_before = h.bundles.list("svc1/").unwrap();

    let err = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::VersionConflict { .. }));
    assert_eq!(h.bundles.list("svc1/").unwrap(), bundles_before);
}

#[tokio::test]
async fn malformed_version_strings_are_rejected() {
    let h = harness();
    let err = h
        .orchestrator
        .publish(publish_request("svc1", "not-a-version"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::InvalidVersion { .. }));
}

#[tokio::test]
async fn progress_replay_contains_the_full_percent_ladder() {
    let h = harness();
    let op = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.0"))
        .await
        .unwrap();
    wait_terminal(&h.registry, &op).await;

    // A late subscriber's first frame is a state replay with every event
    // emitted so far.
    let handle = h.orchestrator.hub().handle(&op).await;
    let mut rx = handle.subscribe().await.unwrap();
    let Some(ChannelMessage::State(snapshot)) = rx.recv().await else {
        panic!("expected a state frame first");
    };

    let percents: Vec<u8> = snapshot.progress.iter().map(|p| p.percent).collect();
    assert_eq!(percents, vec![5, 20, 40, 70, 85, 100]);
    assert_eq!(snapshot.status, DeploymentStatus::Completed);
    assert!(!snapshot.logs.is_empty());
}

#[tokio::test]
async fn failed_publish_broadcasts_the_captured_error() {
    let h = harness();
    h.deploy.fail_next_deploy();
    let op = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.0"))
        .await
        .unwrap();
    wait_terminal(&h.registry, &op).await;

    let handle = h.orchestrator.hub().handle(&op).await;
    let mut rx = handle.subscribe().await.unwrap();
    let Some(ChannelMessage::State(snapshot)) = rx.recv().await else {
        panic!("expected a state frame first");
    };
    assert_eq!(snapshot.status, DeploymentStatus::Failed);
    assert!(snapshot.error.as_deref().unwrap().contains("deploy failed"));
    // The pipeline stopped at the deploy step.
    let last = snapshot.progress.last().unwrap();
    assert_eq!(last.step, "deploying");
}

#[tokio::test]
async fn worked_example_publish_with_api_key_auth() {
    let h = harness();
    let api_key_hash = hex::encode(Sha256::digest(b"test-key"));
    let request = PublishRequest {
        service_id: "svc1".to_string(),
        version: "1.0.1".to_string(),
        config: weather_config(AuthMode::ApiKey),
        auth: Some(AuthConfig {
            mode: AuthMode::ApiKey,
            api_key_hash: Some(api_key_hash.clone()),
            oauth: None,
        }),
    };

    let op = h.orchestrator.publish(request).await.unwrap();
    let record = wait_terminal(&h.registry, &op).await;
    assert_eq!(record.status, OperationStatus::Completed);

    // Exactly one deploy call, under the worker name derived from the
    // service id and version.
    let calls = h.deploy.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.worker_name, "slipway-svc1-1-0-1");

    // Generated source: sanitized handler, a validator requiring `city`
    // as a string, and the auth block reading the stored hash binding.
    assert!(call.source.contains("async function __handler_get_weather(input, env)"));
    assert!(call.source.contains("\"city\": z.string()"));
    assert!(call.source.contains("env.SLIPWAY_API_KEY_HASH"));
    assert!(
        call.secrets
            .contains(&("SLIPWAY_API_KEY_HASH".to_string(), api_key_hash))
    );
}

#[tokio::test]
async fn rollback_merges_snapshot_bindings_over_current_service_bindings() {
    let h = harness();

    // v1 binds a database; v2 binds nothing.
    let mut v1 = publish_request("svc1", "1.0.0");
    v1.config.bindings.database = Some(slipway_core::Binding {
        name: "DB".to_string(),
        resource_id: Some("db-old".to_string()),
    });
    let op = h.orchestrator.publish(v1).await.unwrap();
    wait_terminal(&h.registry, &op).await;

    let op = h
        .orchestrator
        .publish(publish_request("svc1", "1.0.1"))
        .await
        .unwrap();
    wait_terminal(&h.registry, &op).await;

    // The service meanwhile grew a kv binding in its current config.
    let mut service = h.registry.get_service("svc1").unwrap().unwrap();
    service.bindings.kv_namespace = Some(slipway_core::Binding {
        name: "KV".to_string(),
        resource_id: Some("kv-1".to_string()),
    });
    h.registry.put_service(&service).unwrap();

    h.orchestrator.rollback("svc1", "1.0.0").await.unwrap();

    // The redeploy used snapshot bindings first, current ones as filler.
    let calls = h.deploy.calls();
    let last = calls.last().unwrap();
    assert_eq!(last.worker_name, "slipway-svc1-1-0-0");
    assert_eq!(last.bindings.database.as_ref().unwrap().name, "DB");
    assert_eq!(last.bindings.kv_namespace.as_ref().unwrap().name, "KV");
}
