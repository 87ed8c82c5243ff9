//! ProgressHub — addresses broadcaster tasks by deployment id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use crate::broadcaster::{self, BroadcasterHandle};

/// Tuning for broadcaster tasks.
#[derive(Debug, Clone)]
pub struct ProgressSettings {
    /// Interval between keepalive frames.
    pub keepalive: Duration,
    /// Maximum lifetime of one subscriber session.
    pub max_session: Duration,
    /// How long a terminal broadcaster lingers for late subscribers.
    pub linger: Duration,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            keepalive: Duration::from_secs(15),
            max_session: Duration::from_secs(600),
            linger: Duration::from_secs(300),
        }
    }
}

/// Lazily spawns and tracks one broadcaster per deployment id.
#[derive(Clone)]
pub struct ProgressHub {
    slots: Arc<RwLock<HashMap<String, BroadcasterHandle>>>,
    settings: ProgressSettings,
}

impl ProgressHub {
    pub fn new(settings: ProgressSettings) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            settings,
        }
    }

    /// The handle for a deployment's broadcaster, spawning the task on
    /// first use. Exited broadcasters (post-linger) are replaced; their
    /// history lives on in the operation record, not the live channel.
    pub async fn handle(&self, deployment_id: &str) -> BroadcasterHandle {
        {
            let slots = self.slots.read().await;
            if let Some(handle) = slots.get(deployment_id)
                && !handle.is_closed()
            {
                return handle.clone();
            }
        }

        let mut slots = self.slots.write().await;
        // Re-check under the write lock; another caller may have won.
        if let Some(handle) = slots.get(deployment_id)
            && !handle.is_closed()
        {
            return handle.clone();
        }
        let handle = broadcaster::spawn(deployment_id, self.settings.clone());
        slots.insert(deployment_id.to_string(), handle.clone());
        debug!(%deployment_id, "broadcaster spawned");
        handle
    }

    /// Drop exited broadcasters from the table.
    pub async fn reap(&self) {
        let mut slots = self.slots.write().await;
        slots.retain(|_, handle| !handle.is_closed());
    }
}
