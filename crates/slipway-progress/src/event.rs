//! Wire-level event types for the live progress protocol.
//!
//! Messages serialize as `{"type": ..., "data": ...}` and are consumed
//! verbatim by dashboard push channels.

use serde::{Deserialize, Serialize};

/// Live status of a deployment operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl DeploymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Completed | DeploymentStatus::Failed)
    }
}

/// Severity of a forwarded log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One log line forwarded to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Unix-epoch seconds when the line was recorded.
    pub at: u64,
}

/// One progress step notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    pub step: String,
    /// 0–100.
    pub percent: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub at: u64,
}

/// A status transition, with the captured error on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: DeploymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full state of a deployment's progress channel. Sent to every new
/// subscriber before any live event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSnapshot {
    pub deployment_id: String,
    pub status: DeploymentStatus,
    pub logs: Vec<LogLine>,
    pub progress: Vec<ProgressPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
}

impl DeploymentSnapshot {
    pub fn new(deployment_id: &str, started_at: u64) -> Self {
        Self {
            deployment_id: deployment_id.to_string(),
            status: DeploymentStatus::Pending,
            logs: Vec::new(),
            progress: Vec::new(),
            error: None,
            started_at,
            completed_at: None,
        }
    }
}

/// One frame on a subscriber channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChannelMessage {
    State(DeploymentSnapshot),
    Log(LogLine),
    Progress(ProgressPoint),
    Status(StatusChange),
    /// Keepalive frame. Transports may translate this into a comment.
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_serialize_with_type_and_data() {
        let msg = ChannelMessage::Progress(ProgressPoint {
            step: "deploying".to_string(),
            percent: 70,
            message: "pushing worker".to_string(),
            data: None,
            at: 1000,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["data"]["percent"], 70);
    }

    #[test]
    fn ping_is_type_only() {
        let json = serde_json::to_value(&ChannelMessage::Ping).unwrap();
        assert_eq!(json, serde_json::json!({"type": "ping"}));
    }

    #[test]
    fn state_frame_carries_the_full_snapshot() {
        let mut snapshot = DeploymentSnapshot::new("dep-1", 1000);
        snapshot.logs.push(LogLine {
            level: LogLevel::Info,
            message: "starting".to_string(),
            data: None,
            at: 1000,
        });
        let json = serde_json::to_value(&ChannelMessage::State(snapshot)).unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["data"]["deployment_id"], "dep-1");
        assert_eq!(json["data"]["logs"][0]["message"], "starting");
    }
}
