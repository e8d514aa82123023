use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::Clock;
use super::RecentCounter;

struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    fn starting_at(millis: u64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(millis),
        })
    }

    fn advance(
        &self,
        millis: u64,
    ) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

const INTERVAL: u64 = 1000;

#[test]
fn should_reject_sub_second_interval() {
    let clock = ManualClock::starting_at(0);
    assert!(RecentCounter::new(clock, 999).is_err());
}

#[test]
fn last_completed_count_should_read_previous_interval() {
    let clock = ManualClock::starting_at(10_000);
    let counter = RecentCounter::new(clock.clone(), INTERVAL).unwrap();

    counter.increment();
    counter.increment();
    counter.increment();
    assert_eq!(counter.current_count(), 3);
    assert_eq!(counter.last_completed_count(), 0);

    clock.advance(INTERVAL);
    assert_eq!(counter.last_completed_count(), 3);
    assert_eq!(counter.current_count(), 0);
}

#[test]
fn counts_should_read_zero_after_two_idle_intervals() {
    let clock = ManualClock::starting_at(10_000);
    let counter = RecentCounter::new(clock.clone(), INTERVAL).unwrap();

    counter.increment();
    clock.advance(2 * INTERVAL);

    assert_eq!(counter.last_completed_count(), 0);
    assert_eq!(counter.current_count(), 0);
}

#[test]
fn increment_should_reset_recycled_slot() {
    let clock = ManualClock::starting_at(10_000);
    let counter = RecentCounter::new(clock.clone(), INTERVAL).unwrap();

    counter.increment();
    counter.increment();

    // same ring slot comes around three intervals later, with activity in
    // between keeping the ring warm
    clock.advance(INTERVAL);
    counter.increment();
    clock.advance(INTERVAL);
    counter.increment();
    clock.advance(INTERVAL);
    counter.increment();

    assert_eq!(counter.current_count(), 1);
}

#[test]
fn increment_should_clear_whole_ring_after_long_idle() {
    let clock = ManualClock::starting_at(10_000);
    let counter = RecentCounter::new(clock.clone(), INTERVAL).unwrap();

    counter.increment();
    counter.increment();
    clock.advance(5 * INTERVAL);
    counter.increment();

    assert_eq!(counter.current_count(), 1);
    assert_eq!(counter.last_completed_count(), 0);
}
