use serde::Deserialize;
use serde::Serialize;

/// Consul agent address and the limits for the two HTTP clients built from it:
/// the "watch" client carrying long-lived blocking queries and the "simple"
/// client carrying short request/response calls (session, lock acquisition).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base address of the local Consul agent
    #[serde(default = "default_address")]
    pub address: String,

    /// Read timeout for simple request/response calls (milliseconds)
    #[serde(default = "default_simple_timeout_ms")]
    pub simple_read_timeout_ms: u64,

    /// Connect timeout for simple request/response calls (milliseconds)
    #[serde(default = "default_simple_timeout_ms")]
    pub simple_connect_timeout_ms: u64,

    /// Read timeout for blocking queries (milliseconds). Must exceed the
    /// blocking-query `wait` duration or every poll times out client-side.
    #[serde(default = "default_watch_read_timeout_ms")]
    pub watch_read_timeout_ms: u64,

    /// Connect timeout for blocking queries (milliseconds)
    #[serde(default = "default_watch_connect_timeout_ms")]
    pub watch_connect_timeout_ms: u64,

    /// Upper bound on concurrently watched endpoints. Sizes the watch client's
    /// connection pool: one long-lived connection per watched endpoint.
    #[serde(default = "default_max_watched_endpoints")]
    pub max_watched_endpoints: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            simple_read_timeout_ms: default_simple_timeout_ms(),
            simple_connect_timeout_ms: default_simple_timeout_ms(),
            watch_read_timeout_ms: default_watch_read_timeout_ms(),
            watch_connect_timeout_ms: default_watch_connect_timeout_ms(),
            max_watched_endpoints: default_max_watched_endpoints(),
        }
    }
}

fn default_address() -> String {
    "http://localhost:8500".to_string()
}
fn default_simple_timeout_ms() -> u64 {
    2000
}
fn default_watch_read_timeout_ms() -> u64 {
    // 6 minutes: one minute of slack over the 5m blocking-query wait
    6 * 60 * 1000
}
fn default_watch_connect_timeout_ms() -> u64 {
    2000
}
fn default_max_watched_endpoints() -> usize {
    1000
}
