//! Broadcaster — the per-deployment task owning live progress state.

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

use slipway_core::now_epoch;

use crate::event::*;
use crate::hub::ProgressSettings;

/// Control messages accepted by a broadcaster task.
pub(crate) enum Command {
    Log(LogLine),
    Progress(ProgressPoint),
    Status(StatusChange),
    Subscribe {
        reply: oneshot::Sender<mpsc::UnboundedReceiver<ChannelMessage>>,
    },
}

/// Cheap handle to one deployment's broadcaster. Events sent through a
/// handle are serialized by the task's single control channel, so arrival
/// order is delivery order for every subscriber.
#[derive(Clone)]
pub struct BroadcasterHandle {
    deployment_id: String,
    tx: mpsc::UnboundedSender<Command>,
}

impl BroadcasterHandle {
    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    /// Forward a log line to subscribers.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.log_with(level, message, None);
    }

    /// Forward a log line with a structured payload.
    pub fn log_with(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        let _ = self.tx.send(Command::Log(LogLine {
            level,
            message: message.into(),
            data,
            at: now_epoch(),
        }));
    }

    /// Forward a progress step notification.
    pub fn progress(&self, step: &str, percent: u8, message: impl Into<String>) {
        let _ = self.tx.send(Command::Progress(ProgressPoint {
            step: step.to_string(),
            percent,
            message: message.into(),
            data: None,
            at: now_epoch(),
        }));
    }

    /// Forward a status transition.
    pub fn status(&self, status: DeploymentStatus, error: Option<String>) {
        let _ = self.tx.send(Command::Status(StatusChange { status, error }));
    }

    /// Subscribe to this deployment's channel. The first frame is always a
    /// `state` replay of everything emitted so far.
    pub async fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<ChannelMessage>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Subscribe { reply }).ok()?;
        rx.await.ok()
    }

    /// Whether the broadcaster task has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct Subscriber {
    tx: mpsc::UnboundedSender<ChannelMessage>,
    since: Instant,
}

pub(crate) fn spawn(deployment_id: &str, settings: ProgressSettings) -> BroadcasterHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = deployment_id.to_string();
    tokio::spawn(run(id.clone(), rx, settings));
    BroadcasterHandle {
        deployment_id: id,
        tx,
    }
}

async fn run(
    deployment_id: String,
    mut rx: mpsc::UnboundedReceiver<Command>,
    settings: ProgressSettings,
) {
    let mut snapshot = DeploymentSnapshot::new(&deployment_id, now_epoch());
    let mut subscribers: Vec<Subscriber> = Vec::new();
    let mut keepalive = tokio::time::interval(settings.keepalive);
    keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut terminal_since: Option<Instant> = None;

    debug!(%deployment_id, "broadcaster started");
    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Log(line)) => {
                    snapshot.logs.push(line.clone());
                    fanout(&mut subscribers, ChannelMessage::Log(line));
                }
                Some(Command::Progress(point)) => {
                    snapshot.progress.push(point.clone());
                    fanout(&mut subscribers, ChannelMessage::Progress(point));
                }
                Some(Command::Status(change)) => {
                    // The snapshot freezes at the first terminal status;
                    // later transitions cannot happen upstream, but a
                    // frozen snapshot must stay frozen regardless.
                    if terminal_since.is_none() {
                        snapshot.status = change.status;
                        snapshot.error = change.error.clone();
                        if change.status.is_terminal() {
                            snapshot.completed_at = Some(now_epoch());
                            terminal_since = Some(Instant::now());
                        }
                        fanout(&mut subscribers, ChannelMessage::Status(change));
                    }
                }
                Some(Command::Subscribe { reply }) => {
                    let (tx, sub_rx) = mpsc::unbounded_channel();
                    // Replay first: the full snapshot precedes any live event.
                    let _ = tx.send(ChannelMessage::State(snapshot.clone()));
                    subscribers.push(Subscriber { tx, since: Instant::now() });
                    let _ = reply.send(sub_rx);
                }
                None => break,
            },
            _ = keepalive.tick() => {
                subscribers.retain(|sub| {
                    sub.since.elapsed() < settings.max_session
                        && sub.tx.send(ChannelMessage::Ping).is_ok()
                });
                if let Some(since) = terminal_since
                    && since.elapsed() >= settings.linger
                {
                    break;
                }
            }
        }
    }
    debug!(%deployment_id, "broadcaster stopped");
}

fn fanout(subscribers: &mut Vec<Subscriber>, message: ChannelMessage) {
    subscribers.retain(|sub| sub.tx.send(message.clone()).is_ok());
}
