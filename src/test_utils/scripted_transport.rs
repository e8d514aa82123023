use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::BlockingQuery;
use crate::ConsulTransport;
use crate::QueryResponse;
use crate::Result;
use crate::TransportError;

/// Transport that replays a scripted blocking-query sequence and parks
/// forever once the script is exhausted, so a watch loop under test stays
/// alive but quiet. `put` calls are recorded and answered from a separate
/// script.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<QueryResponse>>>,
    put_responses: Mutex<VecDeque<Result<QueryResponse>>>,
    pub seen_indices: Mutex<Vec<u64>>,
    pub seen_at: Mutex<Vec<Instant>>,
    pub seen_puts: Mutex<Vec<(String, Vec<(String, String)>)>>,
    exhausted: Notify,
}

impl ScriptedTransport {
    pub fn with_responses(responses: Vec<Result<QueryResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            put_responses: Mutex::new(VecDeque::new()),
            seen_indices: Mutex::new(Vec::new()),
            seen_at: Mutex::new(Vec::new()),
            seen_puts: Mutex::new(Vec::new()),
            exhausted: Notify::new(),
        })
    }

    pub fn script_put(
        &self,
        response: Result<QueryResponse>,
    ) {
        self.put_responses.lock().push_back(response);
    }

    pub fn ok(
        index: u64,
        body: &str,
    ) -> Result<QueryResponse> {
        Ok(QueryResponse {
            status: 200,
            index: Some(index),
            body: body.as_bytes().to_vec(),
        })
    }

    pub fn without_index(body: &str) -> Result<QueryResponse> {
        Ok(QueryResponse {
            status: 200,
            index: None,
            body: body.as_bytes().to_vec(),
        })
    }

    pub fn status(status: u16) -> Result<QueryResponse> {
        Ok(QueryResponse {
            status,
            index: None,
            body: Vec::new(),
        })
    }

    pub fn transport_error() -> Result<QueryResponse> {
        Err(TransportError::InvalidUri("scripted transport failure".to_string()).into())
    }

    /// Resolves once every scripted blocking-query response has been consumed
    pub async fn exhausted(&self) {
        self.exhausted.notified().await;
    }
}

#[async_trait]
impl ConsulTransport for ScriptedTransport {
    async fn blocking_get(
        &self,
        _endpoint: &str,
        query: BlockingQuery,
    ) -> Result<QueryResponse> {
        self.seen_indices.lock().push(query.index);
        self.seen_at.lock().push(Instant::now());
        let next = self.responses.lock().pop_front();
        match next {
            Some(response) => response,
            None => {
                self.exhausted.notify_one();
                std::future::pending().await
            }
        }
    }

    async fn put(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        _body: Vec<u8>,
    ) -> Result<QueryResponse> {
        self.seen_puts.lock().push((path.to_string(), query));
        match self.put_responses.lock().pop_front() {
            Some(response) => response,
            None => Err(TransportError::InvalidUri("put is not scripted".to_string()).into()),
        }
    }
}
