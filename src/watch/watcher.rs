use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::Backoff;
use super::PollState;
use super::Reconciled;
use super::SystemClock;
use super::WatchHandle;
use super::WatchResult;
use super::WatcherStats;
use crate::BlockingQuery;
use crate::Clock;
use crate::ConsulTransport;
use crate::Error;
use crate::ProtocolError;
use crate::Result;
use crate::WatchConfig;

/// Bounded wait for watch loops to drain on close before shutdown is treated
/// as forced
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub(crate) type ChangeConsumer = Arc<dyn Fn(WatchResult<String>) + Send + Sync>;
pub(crate) type FailureConsumer = Arc<dyn Fn(Error) + Send + Sync>;

/// Long-poll watch engine.
///
/// One spawned task per watched endpoint runs the blocking-query loop;
/// consumers run on the runtime's worker pool, decoupled from the loop, so a
/// slow consumer never stalls polling. All watches share one transport, one
/// backoff policy and one [`WatcherStats`].
pub struct ConsulWatcher {
    transport: Arc<dyn ConsulTransport>,
    stats: Arc<WatcherStats>,
    backoff: Backoff,
    wait: String,
    allow_stale: bool,
    shutdown: CancellationToken,
    watch_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ConsulWatcher {
    pub fn builder(transport: Arc<dyn ConsulTransport>) -> ConsulWatcherBuilder {
        ConsulWatcherBuilder::new(transport)
    }

    /// Starts a long-poll loop on `endpoint`.
    ///
    /// `on_change` receives `(index, body)` for every observed content change;
    /// `on_failure` receives every transport/protocol error the loop recovers
    /// from. Both run on the worker pool. The returned handle cancels just
    /// this watch; [`close`](Self::close) cancels them all.
    pub fn watch_endpoint(
        &self,
        endpoint: &str,
        on_change: impl Fn(WatchResult<String>) + Send + Sync + 'static,
        on_failure: impl Fn(Error) + Send + Sync + 'static,
    ) -> WatchHandle {
        info!(endpoint, "Starting HTTP long poll");
        let handle = WatchHandle::new(self.shutdown.child_token());
        let ctx = WatchContext {
            endpoint: endpoint.to_string(),
            transport: self.transport.clone(),
            stats: self.stats.clone(),
            backoff: self.backoff,
            wait: self.wait.clone(),
            allow_stale: self.allow_stale,
        };
        let task = tokio::spawn(run_watch(
            ctx,
            handle.clone(),
            Arc::new(on_change),
            Arc::new(on_failure),
        ));
        self.watch_tasks.lock().push(task);
        handle
    }

    pub fn stats(&self) -> Arc<WatcherStats> {
        self.stats.clone()
    }

    /// Cancels every watch and waits up to 10s for the loops to drain.
    /// In-flight requests may still complete on the wire; their results are
    /// discarded.
    pub async fn close(&self) {
        self.shutdown.cancel();
        let mut tasks = {
            let mut guard = self.watch_tasks.lock();
            std::mem::take(&mut *guard)
        };
        if timeout(SHUTDOWN_GRACE, join_all(tasks.iter_mut())).await.is_err() {
            warn!("watch loops did not drain within grace period, aborting");
            for task in &tasks {
                task.abort();
            }
        }
    }
}

pub struct ConsulWatcherBuilder {
    transport: Arc<dyn ConsulTransport>,
    clock: Arc<dyn Clock>,
    wait: String,
    allow_stale: bool,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    recent_stats_ms: u64,
}

impl ConsulWatcherBuilder {
    pub fn new(transport: Arc<dyn ConsulTransport>) -> Self {
        let defaults = WatchConfig::default();
        Self {
            transport,
            clock: Arc::new(SystemClock),
            wait: defaults.wait,
            allow_stale: defaults.allow_stale,
            initial_backoff_ms: defaults.initial_backoff_ms,
            max_backoff_ms: defaults.max_backoff_ms,
            recent_stats_ms: defaults.recent_stats_window_ms,
        }
    }

    pub fn with_config(
        mut self,
        config: &WatchConfig,
    ) -> Self {
        self.wait = config.wait.clone();
        self.allow_stale = config.allow_stale;
        self.initial_backoff_ms = config.initial_backoff_ms;
        self.max_backoff_ms = config.max_backoff_ms;
        self.recent_stats_ms = config.recent_stats_window_ms;
        self
    }

    pub fn with_backoff(
        mut self,
        initial_ms: u64,
        max_ms: u64,
    ) -> Self {
        self.initial_backoff_ms = initial_ms;
        self.max_backoff_ms = max_ms;
        self
    }

    /// Drops the `stale=` query parameter, forcing every blocking query
    /// through the Consul leader
    pub fn require_default_consistency(mut self) -> Self {
        self.allow_stale = false;
        self
    }

    pub fn with_recent_stats_millis(
        mut self,
        recent_stats_ms: u64,
    ) -> Self {
        self.recent_stats_ms = recent_stats_ms;
        self
    }

    pub fn with_clock(
        mut self,
        clock: Arc<dyn Clock>,
    ) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<ConsulWatcher> {
        Ok(ConsulWatcher {
            transport: self.transport,
            stats: Arc::new(WatcherStats::new(self.clock, self.recent_stats_ms)?),
            backoff: Backoff::from_millis(self.initial_backoff_ms, self.max_backoff_ms),
            wait: self.wait,
            allow_stale: self.allow_stale,
            shutdown: CancellationToken::new(),
            watch_tasks: Mutex::new(Vec::new()),
        })
    }
}

struct WatchContext {
    endpoint: String,
    transport: Arc<dyn ConsulTransport>,
    stats: Arc<WatcherStats>,
    backoff: Backoff,
    wait: String,
    allow_stale: bool,
}

async fn run_watch(
    ctx: WatchContext,
    handle: WatchHandle,
    on_change: ChangeConsumer,
    on_failure: FailureConsumer,
) {
    let mut state = PollState::new();
    loop {
        if handle.is_cancelled() {
            break;
        }

        let query = BlockingQuery {
            index: state.current_index(),
            wait: ctx.wait.clone(),
            allow_stale: ctx.allow_stale,
        };
        trace!(endpoint = %ctx.endpoint, index = query.index, "starting long poll");

        let outcome = tokio::select! {
            _ = handle.cancelled() => break,
            outcome = ctx.transport.blocking_get(&ctx.endpoint, query) => outcome,
        };
        if handle.is_cancelled() {
            // release the in-flight response without dispatch
            break;
        }

        match outcome {
            Ok(response) if response.is_success() => {
                ctx.stats.event_received();
                match state.reconcile(response.index, response.body) {
                    Reconciled::Dispatch { index, body } => {
                        ctx.stats.callback_called();
                        let text = String::from_utf8_lossy(&body).into_owned();
                        trace!(endpoint = %ctx.endpoint, index, "dispatching change to worker");
                        let consumer = on_change.clone();
                        tokio::spawn(async move {
                            (*consumer)(WatchResult::new(index, text));
                        });
                    }
                    Reconciled::ContentUnchanged => {
                        ctx.stats.content_not_changed();
                        trace!(
                            endpoint = %ctx.endpoint,
                            index = state.current_index(),
                            "discarding event as content did not change"
                        );
                    }
                    Reconciled::IndexUnchanged => {
                        ctx.stats.index_not_changed();
                        trace!(
                            endpoint = %ctx.endpoint,
                            index = state.current_index(),
                            "long poll wait elapsed without change"
                        );
                    }
                    Reconciled::IndexReset { previous, received } => {
                        ctx.stats.index_reset();
                        warn!(
                            endpoint = %ctx.endpoint,
                            previous,
                            received,
                            "discarding event as new index is lower than previous - resetting index"
                        );
                    }
                    Reconciled::MissingIndex => {
                        let error = ProtocolError::MissingIndexHeader {
                            endpoint: ctx.endpoint.clone(),
                        };
                        if !fail_and_backoff(&ctx, &mut state, &handle, &on_failure, error.into())
                            .await
                        {
                            break;
                        }
                        continue;
                    }
                }
                state.poll_succeeded();
            }
            Ok(response) => {
                let error = ProtocolError::UnexpectedStatus {
                    status: response.status,
                    body: response.body_text(),
                };
                if !fail_and_backoff(&ctx, &mut state, &handle, &on_failure, error.into()).await {
                    break;
                }
            }
            Err(error) => {
                if !fail_and_backoff(&ctx, &mut state, &handle, &on_failure, error).await {
                    break;
                }
            }
        }
    }
    debug!(endpoint = %ctx.endpoint, "watch loop stopped");
}

/// Records the failure, reports it once to the failure consumer and sleeps out
/// the backoff. Returns false when the watch was cancelled while waiting.
async fn fail_and_backoff(
    ctx: &WatchContext,
    state: &mut PollState,
    handle: &WatchHandle,
    on_failure: &FailureConsumer,
    error: Error,
) -> bool {
    ctx.stats.failed();
    let retry = state.poll_failed();
    let delay = ctx.backoff.delay_for(retry);
    error!(
        endpoint = %ctx.endpoint,
        backoff_ms = delay.as_millis() as u64,
        %error,
        "long poll failed, retrying with backoff"
    );

    let reporter = on_failure.clone();
    tokio::spawn(async move {
        (*reporter)(error);
    });

    tokio::select! {
        _ = handle.cancelled() => false,
        _ = sleep(delay) => true,
    }
}
