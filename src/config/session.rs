use serde::Deserialize;
use serde::Serialize;

/// TTL session settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session TTL in seconds. The session is renewed every `ttl - 2` seconds
    /// (clamped to at least 1s) to leave margin for network latency.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Lock delay the agent enforces before a released lock can be
    /// re-acquired, in seconds
    #[serde(default = "default_lock_delay_seconds")]
    pub lock_delay_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            lock_delay_seconds: default_lock_delay_seconds(),
        }
    }
}

fn default_ttl_seconds() -> u64 {
    60
}
fn default_lock_delay_seconds() -> u64 {
    15
}
