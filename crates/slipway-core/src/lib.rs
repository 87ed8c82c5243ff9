pub mod config;
pub mod types;

pub use config::SlipwayConfig;
pub use types::*;

/// Current time as unix-epoch seconds.
pub fn now_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
