//! Long-poll watch engine.
//!
//! [`ConsulWatcher`] owns one blocking-query loop per watched endpoint:
//! it issues the request, reconciles the response index and content against
//! remembered state, dispatches changes to the runtime's worker pool and
//! reconnects - immediately after a successful poll, after an exponential
//! backoff on any failure - until the watch handle is cancelled.

mod backoff;
mod catalog;
mod endpoint;
mod poll;
mod recent_counter;
mod stats;
mod watcher;
pub use backoff::*;
pub use catalog::*;
pub use endpoint::*;
pub(crate) use poll::*;
pub use recent_counter::*;
pub use stats::*;
pub use watcher::*;

#[cfg(test)]
mod catalog_test;
#[cfg(test)]
mod poll_test;
#[cfg(test)]
mod recent_counter_test;

use tokio_util::sync::CancellationToken;

/// Consistency index and decoded payload of one observed change.
///
/// The index is Consul's opacity token for "what version of the watched
/// resource was observed"; it is preserved across [`map`](WatchResult::map).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchResult<T> {
    index: u64,
    body: T,
}

impl<T> WatchResult<T> {
    pub fn new(
        index: u64,
        body: T,
    ) -> Self {
        Self { index, body }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn body(&self) -> &T {
        &self.body
    }

    pub fn into_body(self) -> T {
        self.body
    }

    pub fn map<R>(
        self,
        mapper: impl FnOnce(T) -> R,
    ) -> WatchResult<R> {
        WatchResult {
            index: self.index,
            body: mapper(self.body),
        }
    }
}

/// Cooperative stop signal for one watch, shared by clone between the engine
/// loop and the caller.
///
/// Cancellation is non-preemptive: a request already on the wire may still
/// complete, but its result is discarded without dispatch. `cancel` is
/// idempotent.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    token: CancellationToken,
}

impl WatchHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
