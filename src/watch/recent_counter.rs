use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use config::ConfigError;

use crate::Result;

/// Wall-clock source, injectable so windowing logic can be tested with a
/// manual clock.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }
}

/// Rolling fixed-window counter over a three-slot ring keyed by wall-clock
/// interval.
///
/// A slot is reset lazily the first time an increment lands in it after the
/// ring rolled over, so reads of the just-completed interval need no locking.
/// When no increment happened within the last two intervals, all counts read
/// as zero.
pub struct RecentCounter {
    clock: Arc<dyn Clock>,
    interval_millis: u64,
    last_update: AtomicU64,
    last_index: AtomicUsize,
    counts: [AtomicU64; 3],
}

impl RecentCounter {
    /// Rejects intervals below one second: shorter windows make the
    /// just-completed reading meaningless against wall-clock jitter.
    pub fn new(
        clock: Arc<dyn Clock>,
        interval_millis: u64,
    ) -> Result<Self> {
        if interval_millis < 1000 {
            return Err(ConfigError::Message(format!(
                "Interval needs to be at least 1 second. {interval_millis}ms provided."
            ))
            .into());
        }

        let now = clock.now_millis();
        let last_index = Self::offset_index(now, interval_millis, 0);
        Ok(Self {
            clock,
            interval_millis,
            last_update: AtomicU64::new(now),
            last_index: AtomicUsize::new(last_index),
            counts: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
        })
    }

    pub fn increment(&self) {
        let now = self.clock.now_millis();
        let index = self.index_at(now, 0);
        let next_index = self.index_at(now, 1);
        let previous_index = self.index_at(now, 2);

        if self.last_update.load(Ordering::Acquire) <= now.saturating_sub(2 * self.interval_millis)
        {
            // the whole ring is stale
            self.counts[index].store(0, Ordering::Release);
            self.counts[next_index].store(0, Ordering::Release);
            self.counts[previous_index].store(0, Ordering::Release);
        } else if self.last_index.load(Ordering::Acquire) != index {
            self.counts[index].store(0, Ordering::Release);
        }
        self.counts[index].fetch_add(1, Ordering::AcqRel);

        self.last_update.store(now, Ordering::Release);
        self.last_index.store(index, Ordering::Release);
    }

    /// Count accumulated in the interval immediately preceding the current
    /// one, or zero when nothing was counted within the last two intervals.
    pub fn last_completed_count(&self) -> u64 {
        let now = self.clock.now_millis();
        if self.last_update.load(Ordering::Acquire) <= now.saturating_sub(2 * self.interval_millis)
        {
            return 0;
        }
        self.counts[self.index_at(now, 2)].load(Ordering::Acquire)
    }

    /// Count accumulated so far in the current interval
    pub fn current_count(&self) -> u64 {
        let now = self.clock.now_millis();
        if self.last_update.load(Ordering::Acquire) <= now.saturating_sub(self.interval_millis) {
            return 0;
        }
        self.counts[self.index_at(now, 0)].load(Ordering::Acquire)
    }

    fn index_at(
        &self,
        millis: u64,
        offset: u64,
    ) -> usize {
        Self::offset_index(millis, self.interval_millis, offset)
    }

    fn offset_index(
        millis: u64,
        interval_millis: u64,
        offset: u64,
    ) -> usize {
        ((millis / interval_millis + offset) % 3) as usize
    }
}
