use std::sync::Arc;

use super::WatchHandle;
use super::WatchResult;
use super::WatcherStats;
use crate::ConsulWatcher;
use crate::Error;
use crate::Result;

/// Decoding strategy turning a raw watch body into a typed value
pub type JsonDecoder<T> = Arc<dyn Fn(&str) -> Result<T> + Send + Sync>;

/// Typed watch over one endpoint: every raw result is passed through a decoder
/// before reaching the consumer.
///
/// Decode failures go to the failure consumer and do not stop the watch; the
/// loop keeps polling with the index it had.
pub struct EndpointWatcher<T> {
    endpoint: String,
    watcher: Arc<ConsulWatcher>,
    decoder: JsonDecoder<T>,
}

impl<T: Send + 'static> EndpointWatcher<T> {
    pub fn new(
        endpoint: impl Into<String>,
        watcher: Arc<ConsulWatcher>,
        decoder: impl Fn(&str) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            watcher,
            decoder: Arc::new(decoder),
        }
    }

    pub fn watch(
        &self,
        consumer: impl Fn(WatchResult<T>) + Send + Sync + 'static,
        on_failure: impl Fn(Error) + Send + Sync + 'static,
    ) -> WatchHandle {
        let decoder = self.decoder.clone();
        let on_failure = Arc::new(on_failure);
        let decode_failure = on_failure.clone();
        self.watcher.watch_endpoint(
            &self.endpoint,
            move |raw: WatchResult<String>| {
                let index = raw.index();
                match (*decoder)(raw.body()) {
                    Ok(decoded) => consumer(WatchResult::new(index, decoded)),
                    Err(error) => (*decode_failure)(error),
                }
            },
            move |error| (*on_failure)(error),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn stats(&self) -> Arc<WatcherStats> {
        self.watcher.stats()
    }
}
