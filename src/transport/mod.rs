//! HTTP transport abstraction over the Consul agent API.
//!
//! The watch engine and recipes talk to Consul exclusively through
//! [`ConsulTransport`], which keeps the protocol state machines independent of
//! the HTTP client and lets tests script agent behavior with a mock.

mod http;
pub use http::*;

#[cfg(test)]
mod http_test;

// Trait definition of the current module
// -----------------------------------------------------------------------------

#[cfg(test)]
use mockall::automock;

use async_trait::async_trait;

use crate::Result;

/// Consistency-index header echoed on blocking-query responses
pub const CONSUL_INDEX_HEADER: &str = "X-Consul-Index";

/// Parameters of a single blocking query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingQuery {
    /// Last observed consistency index; 0 means "no preference, get latest"
    pub index: u64,
    /// Maximum time the agent holds the request open (Consul duration syntax)
    pub wait: String,
    /// Adds `stale=` so a non-leader replica may answer
    pub allow_stale: bool,
}

/// Raw agent response: status line, parsed consistency index and body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    pub status: u16,
    /// `X-Consul-Index` header when present and parseable
    pub index: Option<u64>,
    pub body: Vec<u8>,
}

impl QueryResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConsulTransport: Send + Sync + 'static {
    /// Issues a blocking GET against `endpoint`, held open by the agent until
    /// the watched resource changes past `query.index` or `query.wait`
    /// elapses.
    ///
    /// # Errors
    /// - Returns [`TransportError::Request`](crate::TransportError::Request)
    ///   for network-level failures
    /// - Returns [`TransportError::InvalidUri`](crate::TransportError::InvalidUri)
    ///   if `endpoint` cannot be joined onto the agent base address
    ///
    /// Non-2xx statuses are not errors at this layer; callers decide.
    async fn blocking_get(
        &self,
        endpoint: &str,
        query: BlockingQuery,
    ) -> Result<QueryResponse>;

    /// Issues a PUT with a JSON content type against `path`, with optional
    /// query parameters. Used by the session and leader-election recipes.
    async fn put(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Result<QueryResponse>;
}
