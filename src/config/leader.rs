use serde::Deserialize;
use serde::Serialize;

/// Leader election settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderConfig {
    /// Delay before an acquisition attempt triggered by a lock-key change, in
    /// seconds. Should cover the session lock delay so the agent's own
    /// enforcement window has lapsed before we race for the lock.
    #[serde(default = "default_lock_delay_seconds")]
    pub lock_delay_seconds: u64,

    /// Interval of the unconditional "lock rescue" acquisition attempts, in
    /// seconds. A safety net against missed watch events.
    #[serde(default = "default_lock_rescue_interval_seconds")]
    pub lock_rescue_interval_seconds: u64,

    /// Stable node identity written into the lock key. Generated when absent.
    #[serde(default)]
    pub node_id: Option<String>,
}

impl Default for LeaderConfig {
    fn default() -> Self {
        Self {
            lock_delay_seconds: default_lock_delay_seconds(),
            lock_rescue_interval_seconds: default_lock_rescue_interval_seconds(),
            node_id: None,
        }
    }
}

fn default_lock_delay_seconds() -> u64 {
    16
}
fn default_lock_rescue_interval_seconds() -> u64 {
    5 * 60
}
