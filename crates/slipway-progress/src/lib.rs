//! slipway-progress — live progress for publish and rollback operations.
//!
//! One broadcaster task per deployment id owns the operation's live state:
//!
//! ```text
//! ProgressHub
//!   ├── Per-deployment broadcaster task (spawned lazily)
//!   │   ├── DeploymentSnapshot (sole authoritative copy)
//!   │   ├── Subscribers: state replay first, then live events in order
//!   │   └── Keepalive tick: ping frames + max-session eviction
//!   └── BroadcasterHandle: log / progress / status / subscribe
//! ```
//!
//! Subscribers always receive one `state` frame first (the full snapshot so
//! far), then every later event in arrival order. Sessions older than the
//! configured maximum are force-closed on the keepalive tick; reconnecting
//! replays the snapshot again. Once the status is terminal the snapshot is
//! frozen and the task lingers briefly for late subscribers before exiting.

mod broadcaster;
mod event;
mod hub;

pub use broadcaster::BroadcasterHandle;
pub use event::{
    ChannelMessage, DeploymentSnapshot, DeploymentStatus, LogLevel, LogLine, ProgressPoint,
    StatusChange,
};
pub use hub::{ProgressHub, ProgressSettings};
