use serde::Deserialize;
use serde::Serialize;

/// Long-poll watch engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Blocking-query `wait` parameter, in Consul duration syntax
    #[serde(default = "default_wait")]
    pub wait: String,

    /// When true, blocking queries carry `stale=` so any agent replica may
    /// answer. Trades strict consistency for availability and lower load on
    /// the Consul leader.
    #[serde(default = "default_allow_stale")]
    pub allow_stale: bool,

    /// First reconnect delay after a failed poll (milliseconds)
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Reconnect delay ceiling (milliseconds)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Window of the rolling failure counter (milliseconds, minimum 1s)
    #[serde(default = "default_recent_stats_window_ms")]
    pub recent_stats_window_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            wait: default_wait(),
            allow_stale: default_allow_stale(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            recent_stats_window_ms: default_recent_stats_window_ms(),
        }
    }
}

fn default_wait() -> String {
    "5m".to_string()
}
fn default_allow_stale() -> bool {
    true
}
fn default_initial_backoff_ms() -> u64 {
    100
}
fn default_max_backoff_ms() -> u64 {
    60 * 1000
}
fn default_recent_stats_window_ms() -> u64 {
    60 * 1000
}
