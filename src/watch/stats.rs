use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::Clock;
use super::RecentCounter;
use crate::Result;

/// Aggregate watch counters shared by every watch on one [`ConsulWatcher`].
///
/// Totals grow monotonically; `recent_failures` is a rolling window suitable
/// for alerting on a watcher that keeps reconnecting.
///
/// [`ConsulWatcher`]: crate::ConsulWatcher
pub struct WatcherStats {
    events_total: AtomicU64,
    actionable_events: AtomicU64,
    content_not_changed_events: AtomicU64,
    index_not_changed_events: AtomicU64,
    index_reset_events: AtomicU64,
    failures: AtomicU64,
    recent_failures: RecentCounter,
}

impl WatcherStats {
    pub fn new(
        clock: Arc<dyn Clock>,
        recent_stats_millis: u64,
    ) -> Result<Self> {
        Ok(Self {
            events_total: AtomicU64::new(0),
            actionable_events: AtomicU64::new(0),
            content_not_changed_events: AtomicU64::new(0),
            index_not_changed_events: AtomicU64::new(0),
            index_reset_events: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            recent_failures: RecentCounter::new(clock, recent_stats_millis)?,
        })
    }

    pub(crate) fn event_received(&self) {
        self.events_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn callback_called(&self) {
        self.actionable_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn content_not_changed(&self) {
        self.content_not_changed_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn index_not_changed(&self) {
        self.index_not_changed_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn index_reset(&self) {
        self.index_reset_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.recent_failures.increment();
    }

    /// Successful long-poll responses received, whether or not they carried a
    /// change
    pub fn events_total(&self) -> u64 {
        self.events_total.load(Ordering::Relaxed)
    }

    /// Responses that carried new content and were dispatched to a consumer
    pub fn actionable_events(&self) -> u64 {
        self.actionable_events.load(Ordering::Relaxed)
    }

    pub fn content_not_changed_events(&self) -> u64 {
        self.content_not_changed_events.load(Ordering::Relaxed)
    }

    pub fn index_not_changed_events(&self) -> u64 {
        self.index_not_changed_events.load(Ordering::Relaxed)
    }

    /// Responses discarded because the agent reported an index lower than the
    /// last observed one (agent restore/rollback)
    pub fn index_reset_events(&self) -> u64 {
        self.index_reset_events.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Failures counted in the just-completed stats window
    pub fn recent_failures(&self) -> u64 {
        self.recent_failures.last_completed_count()
    }
}
