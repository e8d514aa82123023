use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use reqwest::Response;
use reqwest::Url;
use tracing::trace;

use super::BlockingQuery;
use super::ConsulTransport;
use super::QueryResponse;
use super::CONSUL_INDEX_HEADER;
use crate::AgentConfig;
use crate::Result;
use crate::TransportError;

/// reqwest-backed [`ConsulTransport`].
///
/// Carries two clients: a watch client whose read timeout exceeds the
/// blocking-query wait and whose pool is sized for one long-lived connection
/// per watched endpoint, and a simple client with short timeouts for
/// request/response calls.
pub struct HttpTransport {
    base: Url,
    watch_client: Client,
    simple_client: Client,
}

impl HttpTransport {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let base = Url::parse(&config.address)
            .map_err(|e| TransportError::InvalidUri(format!("{}: {e}", config.address)))?;

        let watch_client = Client::builder()
            .connect_timeout(Duration::from_millis(config.watch_connect_timeout_ms))
            .timeout(Duration::from_millis(config.watch_read_timeout_ms))
            .pool_max_idle_per_host(config.max_watched_endpoints)
            .build()
            .map_err(TransportError::from)?;

        let simple_client = Client::builder()
            .connect_timeout(Duration::from_millis(config.simple_connect_timeout_ms))
            .timeout(Duration::from_millis(config.simple_read_timeout_ms))
            .build()
            .map_err(TransportError::from)?;

        Ok(Self {
            base,
            watch_client,
            simple_client,
        })
    }

    /// Joins `endpoint` onto the agent base address, keeping any query string
    /// the endpoint already carries, and appends the blocking-query
    /// parameters.
    pub(crate) fn blocking_url(
        &self,
        endpoint: &str,
        query: &BlockingQuery,
    ) -> Result<Url> {
        let mut url = self.join(endpoint)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("wait", &query.wait);
            if query.allow_stale {
                pairs.append_pair("stale", "");
            }
            pairs.append_pair("index", &query.index.to_string());
        }
        Ok(url)
    }

    fn join(
        &self,
        path: &str,
    ) -> Result<Url> {
        Ok(self
            .base
            .join(path)
            .map_err(|e| TransportError::InvalidUri(format!("{path}: {e}")))?)
    }

    async fn read_response(response: Response) -> Result<QueryResponse> {
        let status = response.status().as_u16();
        let index = response
            .headers()
            .get(CONSUL_INDEX_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let body = response.bytes().await.map_err(TransportError::from)?.to_vec();
        Ok(QueryResponse { status, index, body })
    }
}

#[async_trait]
impl ConsulTransport for HttpTransport {
    async fn blocking_get(
        &self,
        endpoint: &str,
        query: BlockingQuery,
    ) -> Result<QueryResponse> {
        let url = self.blocking_url(endpoint, &query)?;
        trace!(%url, "issuing blocking query");
        let response = self
            .watch_client
            .get(url)
            .send()
            .await
            .map_err(TransportError::from)?;
        Self::read_response(response).await
    }

    async fn put(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Result<QueryResponse> {
        let mut url = self.join(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &query {
                pairs.append_pair(key, value);
            }
        }
        let response = self
            .simple_client
            .put(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(TransportError::from)?;
        Self::read_response(response).await
    }
}

