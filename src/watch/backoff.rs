use std::time::Duration;

/// Exponential reconnect backoff: `min(initial << retry, max)`.
///
/// The shift is clamped explicitly so large retry counters saturate at `max`
/// instead of wrapping.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(
        initial: Duration,
        max: Duration,
    ) -> Self {
        Self { initial, max }
    }

    pub fn from_millis(
        initial_ms: u64,
        max_ms: u64,
    ) -> Self {
        Self::new(
            Duration::from_millis(initial_ms),
            Duration::from_millis(max_ms),
        )
    }

    pub fn delay_for(
        &self,
        retry: u32,
    ) -> Duration {
        let initial = self.initial.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        let delay = if initial == 0 {
            0
        } else if retry >= initial.leading_zeros() {
            // the shift would push bits past u64; the result exceeds any sane max
            max
        } else {
            (initial << retry).min(max)
        };
        Duration::from_millis(delay)
    }
}
