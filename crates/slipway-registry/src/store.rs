//! Registry — redb-backed persistence for services, versions, operations,
//! and auth configs.
//!
//! All values are JSON-serialized into redb's `&[u8]` value columns. The
//! store supports both on-disk and in-memory backends (the latter for
//! testing). The active-version flip is one write transaction guarded by a
//! compare-and-swap on the caller's expected active version id.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use slipway_core::now_epoch;

use crate::error::{RegistryError, RegistryResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `RegistryError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| RegistryError::$variant(e.to_string())
    };
}

/// Thread-safe registry backed by redb.
#[derive(Clone)]
pub struct Registry {
    db: Arc<Database>,
}

impl Registry {
    /// Open (or create) a persistent registry at the given path.
    pub fn open(path: &Path) -> RegistryResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let registry = Self { db: Arc::new(db) };
        registry.ensure_tables()?;
        debug!(?path, "registry opened");
        Ok(registry)
    }

    /// Create an ephemeral in-memory registry (for testing).
    pub fn open_in_memory() -> RegistryResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let registry = Self { db: Arc::new(db) };
        registry.ensure_tables()?;
        Ok(registry)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> RegistryResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(SERVICES).map_err(map_err!(Table))?;
        txn.open_table(VERSIONS).map_err(map_err!(Table))?;
        txn.open_table(OPERATIONS).map_err(map_err!(Table))?;
        txn.open_table(AUTH_CONFIGS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Services ───────────────────────────────────────────────────

    /// Insert or update a service record.
    pub fn put_service(&self, service: &ServiceRecord) -> RegistryResult<()> {
        let value = serde_json::to_vec(service).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
            table
                .insert(service.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(service = %service.id, "service stored");
        Ok(())
    }

    /// Get a service by id.
    pub fn get_service(&self, service_id: &str) -> RegistryResult<Option<ServiceRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
        match table.get(service_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: ServiceRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List all services.
    pub fn list_services(&self) -> RegistryResult<Vec<ServiceRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: ServiceRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    // ── Versions ───────────────────────────────────────────────────

    /// Insert a new version. Rejects a duplicate (service, version) pair
    /// before any bundle or deploy work happens.
    pub fn create_version(&self, version: &ServiceVersion) -> RegistryResult<()> {
        let key = version.table_key();
        let value = serde_json::to_vec(version).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(VERSIONS).map_err(map_err!(Table))?;
            if table.get(key.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(RegistryError::VersionConflict {
                    service: version.service_id.clone(),
                    version: version.version.clone(),
                });
            }
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "version created");
        Ok(())
    }

    /// Get a version by its (service, version) pair.
    pub fn find_version(
        &self,
        service_id: &str,
        version: &str,
    ) -> RegistryResult<Option<ServiceVersion>> {
        let key = version_key(service_id, version);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(VERSIONS).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: ServiceVersion =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Get a version by its id (scan).
    pub fn version_by_id(&self, version_id: &str) -> RegistryResult<Option<ServiceVersion>> {
        Ok(self
            .scan_versions(|v| v.id == version_id)?
            .into_iter()
            .next())
    }

    /// List all versions of a service.
    pub fn list_versions(&self, service_id: &str) -> RegistryResult<Vec<ServiceVersion>> {
        self.scan_versions(|v| v.service_id == service_id)
    }

    /// The currently active version of a service, if any.
    pub fn active_version(&self, service_id: &str) -> RegistryResult<Option<ServiceVersion>> {
        Ok(self
            .scan_versions(|v| v.service_id == service_id && v.is_active)?
            .into_iter()
            .next())
    }

    /// The active version, or the most recently created one if none is
    /// active yet.
    pub fn active_or_latest(&self, service_id: &str) -> RegistryResult<Option<ServiceVersion>> {
        let mut versions = self.list_versions(service_id)?;
        if let Some(active) = versions.iter().find(|v| v.is_active) {
            return Ok(Some(active.clone()));
        }
        versions.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.version.cmp(&b.version))
        });
        Ok(versions.pop())
    }

    fn scan_versions(
        &self,
        pred: impl Fn(&ServiceVersion) -> bool,
    ) -> RegistryResult<Vec<ServiceVersion>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(VERSIONS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: ServiceVersion =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if pred(&record) {
                results.push(record);
            }
        }
        Ok(results)
    }

    /// Atomically deactivate the current active version and activate the
    /// target, updating the service's current-version/endpoint pointers in
    /// the same transaction.
    ///
    /// `expect_active` is the version id the caller believes is active
    /// (`None` = believes none is). A mismatch aborts with
    /// [`RegistryError::ActiveConflict`] and writes nothing.
    pub fn activate_version(
        &self,
        service_id: &str,
        target_version_id: &str,
        expect_active: Option<&str>,
        endpoint: Option<&str>,
    ) -> RegistryResult<ActivationOutcome> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let outcome;
        {
            let mut versions = txn.open_table(VERSIONS).map_err(map_err!(Table))?;

            // Snapshot this service's versions inside the transaction.
            let prefix = format!("{service_id}:");
            let mut entries: Vec<(String, ServiceVersion)> = Vec::new();
            for entry in versions.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                if key.value().starts_with(&prefix) {
                    let record: ServiceVersion =
                        serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                    entries.push((key.value().to_string(), record));
                }
            }

            let actual_active = entries.iter().find(|(_, v)| v.is_active);
            let actual_active_id = actual_active.map(|(_, v)| v.id.clone());
            if actual_active_id.as_deref() != expect_active {
                return Err(RegistryError::ActiveConflict {
                    service: service_id.to_string(),
                    expected: expect_active.map(String::from),
                    actual: actual_active_id,
                });
            }

            let Some((target_key, target)) =
                entries.iter().find(|(_, v)| v.id == target_version_id)
            else {
                return Err(RegistryError::NotFound(format!(
                    "version {target_version_id} for service {service_id}"
                )));
            };
            let target_key = target_key.clone();
            let mut target = target.clone();

            // Deactivate the old active version, if it is a different one.
            if let Some((old_key, old)) = actual_active
                && old.id != target_version_id
            {
                let mut old = old.clone();
                let old_key = old_key.clone();
                old.is_active = false;
                let value = serde_json::to_vec(&old).map_err(map_err!(Serialize))?;
                versions
                    .insert(old_key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }

            target.is_active = true;
            target.deployed_at = Some(now_epoch());
            let target_version = target.version.clone();
            let previous = actual_active_id.filter(|id| id.as_str() != target_version_id);
            let value = serde_json::to_vec(&target).map_err(map_err!(Serialize))?;
            versions
                .insert(target_key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;

            // Service pointers move in the same transaction.
            let mut services = txn.open_table(SERVICES).map_err(map_err!(Table))?;
            let service_value = services
                .get(service_id)
                .map_err(map_err!(Read))?
                .map(|g| g.value().to_vec());
            if let Some(bytes) = service_value {
                let mut service: ServiceRecord =
                    serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;
                service.current_version = Some(target_version);
                if let Some(endpoint) = endpoint {
                    service.endpoint = Some(endpoint.to_string());
                }
                service.updated_at = now_epoch();
                let value = serde_json::to_vec(&service).map_err(map_err!(Serialize))?;
                services
                    .insert(service_id, value.as_slice())
                    .map_err(map_err!(Write))?;
            }

            outcome = ActivationOutcome {
                previous,
                activated: target_version_id.to_string(),
            };
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            %service_id,
            activated = %outcome.activated,
            previous = ?outcome.previous,
            "active version flipped"
        );
        Ok(outcome)
    }

    // ── Operations ─────────────────────────────────────────────────

    /// Insert a new operation record.
    pub fn create_operation(&self, op: &OperationRecord) -> RegistryResult<()> {
        let value = serde_json::to_vec(op).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(OPERATIONS).map_err(map_err!(Table))?;
            table
                .insert(op.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get an operation by id.
    pub fn get_operation(&self, id: &str) -> RegistryResult<Option<OperationRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(OPERATIONS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: OperationRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List operations for a service, newest first.
    pub fn list_operations(&self, service_id: &str) -> RegistryResult<Vec<OperationRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(OPERATIONS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: OperationRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if record.service_id == service_id {
                results.push(record);
            }
        }
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    /// Advance an operation's status, enforcing monotonic transitions.
    ///
    /// `started_at` is stamped on entry to `InProgress`; `finished_at` on a
    /// terminal status.
    pub fn update_operation_status(
        &self,
        id: &str,
        next: OperationStatus,
        error: Option<&str>,
    ) -> RegistryResult<OperationRecord> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let updated;
        {
            let mut table = txn.open_table(OPERATIONS).map_err(map_err!(Table))?;
            let bytes = table
                .get(id)
                .map_err(map_err!(Read))?
                .map(|g| g.value().to_vec())
                .ok_or_else(|| RegistryError::NotFound(format!("operation {id}")))?;
            let mut record: OperationRecord =
                serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;

            if !record.status.can_transition_to(next) {
                return Err(RegistryError::InvalidTransition {
                    from: record.status.as_str().to_string(),
                    to: next.as_str().to_string(),
                });
            }

            record.status = next;
            if next == OperationStatus::InProgress {
                record.started_at = Some(now_epoch());
            }
            if next.is_terminal() {
                record.finished_at = Some(now_epoch());
            }
            if let Some(error) = error {
                record.error = Some(error.to_string());
            }

            let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
            table
                .insert(id, value.as_slice())
                .map_err(map_err!(Write))?;
            updated = record;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(operation = %id, status = updated.status.as_str(), "operation updated");
        Ok(updated)
    }

    // ── Auth configs ───────────────────────────────────────────────

    /// Insert or update a service's auth configuration.
    pub fn put_auth_config(&self, record: &AuthConfigRecord) -> RegistryResult<()> {
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(AUTH_CONFIGS).map_err(map_err!(Table))?;
            table
                .insert(record.service_id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get a service's auth configuration.
    pub fn get_auth_config(&self, service_id: &str) -> RegistryResult<Option<AuthConfigRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(AUTH_CONFIGS).map_err(map_err!(Table))?;
        match table.get(service_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: AuthConfigRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipway_core::{AuthConfig, AuthMode, BindingSet, ServiceConfig};

    fn test_service(id: &str) -> ServiceRecord {
        ServiceRecord {
            id: id.to_string(),
            name: id.to_string(),
            current_version: None,
            endpoint: None,
            bindings: BindingSet::default(),
            created_at: 1000,
            updated_at: 1000,
        }
    }

    fn test_version(service_id: &str, version: &str, id: &str) -> ServiceVersion {
        ServiceVersion {
            id: id.to_string(),
            service_id: service_id.to_string(),
            version: version.to_string(),
            bundle_key: format!("{service_id}/{version}/abc"),
            config: ServiceConfig {
                tools: vec![],
                bindings: BindingSet::default(),
                auth_mode: AuthMode::Public,
            },
            is_active: false,
            deployed_at: None,
            created_at: 1000,
        }
    }

    fn test_operation(id: &str, service_id: &str) -> OperationRecord {
        OperationRecord {
            id: id.to_string(),
            service_id: service_id.to_string(),
            version_id: "v-1".to_string(),
            kind: OperationKind::Publish,
            status: OperationStatus::Pending,
            error: None,
            created_at: 1000,
            started_at: None,
            finished_at: None,
        }
    }

    // ── Service CRUD ───────────────────────────────────────────────

    #[test]
    fn service_put_and_get() {
        let registry = Registry::open_in_memory().unwrap();
        let service = test_service("svc1");

        registry.put_service(&service).unwrap();
        assert_eq!(registry.get_service("svc1").unwrap(), Some(service));
        assert!(registry.get_service("nope").unwrap().is_none());
    }

    #[test]
    fn service_list_all() {
        let registry = Registry::open_in_memory().unwrap();
        registry.put_service(&test_service("a")).unwrap();
        registry.put_service(&test_service("b")).unwrap();
        assert_eq!(registry.list_services().unwrap().len(), 2);
    }

    // ── Versions ───────────────────────────────────────────────────

    #[test]
    fn version_create_and_find() {
        let registry = Registry::open_in_memory().unwrap();
        let version = test_version("svc1", "1.0.0", "v-1");

        registry.create_version(&version).unwrap();
        let found = registry.find_version("svc1", "1.0.0").unwrap();
        assert_eq!(found, Some(version.clone()));
        assert_eq!(registry.version_by_id("v-1").unwrap(), Some(version));
    }

    #[test]
    fn duplicate_version_is_a_conflict() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .create_version(&test_version("svc1", "1.0.0", "v-1"))
            .unwrap();

        let err = registry
            .create_version(&test_version("svc1", "1.0.0", "v-2"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::VersionConflict { .. }));

        // The same version string on another service is fine.
        registry
            .create_version(&test_version("svc2", "1.0.0", "v-3"))
            .unwrap();
    }

    #[test]
    fn activation_flips_exactly_one_active() {
        let registry = Registry::open_in_memory().unwrap();
        registry.put_service(&test_service("svc1")).unwrap();
        registry
            .create_version(&test_version("svc1", "1.0.0", "v-1"))
            .unwrap();
        registry
            .create_version(&test_version("svc1", "1.0.1", "v-2"))
            .unwrap();

        let outcome = registry
            .activate_version("svc1", "v-1", None, Some("https://svc1.example.com"))
            .unwrap();
        assert_eq!(outcome.previous, None);
        assert_eq!(outcome.activated, "v-1");

        let outcome = registry
            .activate_version("svc1", "v-2", Some("v-1"), None)
            .unwrap();
        assert_eq!(outcome.previous, Some("v-1".to_string()));

        let versions = registry.list_versions("svc1").unwrap();
        let active: Vec<_> = versions.iter().filter(|v| v.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "v-2");
        assert!(active[0].deployed_at.is_some());

        let service = registry.get_service("svc1").unwrap().unwrap();
        assert_eq!(service.current_version.as_deref(), Some("1.0.1"));
        assert_eq!(
            service.endpoint.as_deref(),
            Some("https://svc1.example.com")
        );
    }

    #[test]
    fn activation_cas_rejects_stale_expectations() {
        let registry = Registry::open_in_memory().unwrap();
        registry.put_service(&test_service("svc1")).unwrap();
        registry
            .create_version(&test_version("svc1", "1.0.0", "v-1"))
            .unwrap();
        registry
            .create_version(&test_version("svc1", "1.0.1", "v-2"))
            .unwrap();
        registry.activate_version("svc1", "v-1", None, None).unwrap();

        // A caller that still believes nothing is active loses the race.
        let err = registry
            .activate_version("svc1", "v-2", None, None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::ActiveConflict { .. }));

        // State is untouched by the rejected flip.
        let active = registry.active_version("svc1").unwrap().unwrap();
        assert_eq!(active.id, "v-1");
    }

    #[test]
    fn activation_of_unknown_version_is_not_found() {
        let registry = Registry::open_in_memory().unwrap();
        registry.put_service(&test_service("svc1")).unwrap();
        let err = registry
            .activate_version("svc1", "ghost", None, None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn active_or_latest_prefers_active() {
        let registry = Registry::open_in_memory().unwrap();
        registry.put_service(&test_service("svc1")).unwrap();
        let mut v1 = test_version("svc1", "1.0.0", "v-1");
        v1.created_at = 1000;
        let mut v2 = test_version("svc1", "1.0.1", "v-2");
        v2.created_at = 2000;
        registry.create_version(&v1).unwrap();
        registry.create_version(&v2).unwrap();

        // No active yet: latest by creation time wins.
        let latest = registry.active_or_latest("svc1").unwrap().unwrap();
        assert_eq!(latest.id, "v-2");

        registry.activate_version("svc1", "v-1", None, None).unwrap();
        let active = registry.active_or_latest("svc1").unwrap().unwrap();
        assert_eq!(active.id, "v-1");
    }

    // ── Operations ─────────────────────────────────────────────────

    #[test]
    fn operation_lifecycle_happy_path() {
        let registry = Registry::open_in_memory().unwrap();
        registry.create_operation(&test_operation("op-1", "svc1")).unwrap();

        let record = registry
            .update_operation_status("op-1", OperationStatus::InProgress, None)
            .unwrap();
        assert!(record.started_at.is_some());

        let record = registry
            .update_operation_status("op-1", OperationStatus::Completed, None)
            .unwrap();
        assert!(record.finished_at.is_some());
        assert_eq!(record.status, OperationStatus::Completed);
    }

    #[test]
    fn operation_failure_captures_the_error() {
        let registry = Registry::open_in_memory().unwrap();
        registry.create_operation(&test_operation("op-1", "svc1")).unwrap();
        registry
            .update_operation_status("op-1", OperationStatus::InProgress, None)
            .unwrap();

        let record = registry
            .update_operation_status("op-1", OperationStatus::Failed, Some("deploy rejected"))
            .unwrap();
        assert_eq!(record.error.as_deref(), Some("deploy rejected"));
    }

    #[test]
    fn terminal_operations_reject_further_transitions() {
        let registry = Registry::open_in_memory().unwrap();
        registry.create_operation(&test_operation("op-1", "svc1")).unwrap();
        registry
            .update_operation_status("op-1", OperationStatus::InProgress, None)
            .unwrap();
        registry
            .update_operation_status("op-1", OperationStatus::Completed, None)
            .unwrap();

        let err = registry
            .update_operation_status("op-1", OperationStatus::Failed, None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { .. }));
    }

    #[test]
    fn operations_list_newest_first() {
        let registry = Registry::open_in_memory().unwrap();
        let mut older = test_operation("op-1", "svc1");
        older.created_at = 1000;
        let mut newer = test_operation("op-2", "svc1");
        newer.created_at = 2000;
        registry.create_operation(&older).unwrap();
        registry.create_operation(&newer).unwrap();
        registry.create_operation(&test_operation("op-3", "svc2")).unwrap();

        let ops = registry.list_operations("svc1").unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].id, "op-2");
    }

    // ── Auth configs ───────────────────────────────────────────────

    #[test]
    fn auth_config_put_and_get() {
        let registry = Registry::open_in_memory().unwrap();
        let record = AuthConfigRecord {
            service_id: "svc1".to_string(),
            config: AuthConfig::public(),
            updated_at: 1000,
        };
        registry.put_auth_config(&record).unwrap();
        assert_eq!(registry.get_auth_config("svc1").unwrap(), Some(record));
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("registry.redb");

        {
            let registry = Registry::open(&db_path).unwrap();
            registry.put_service(&test_service("svc1")).unwrap();
            registry
                .create_version(&test_version("svc1", "1.0.0", "v-1"))
                .unwrap();
            registry.activate_version("svc1", "v-1", None, None).unwrap();
        }

        let registry = Registry::open(&db_path).unwrap();
        let active = registry.active_version("svc1").unwrap().unwrap();
        assert_eq!(active.id, "v-1");
    }
}
