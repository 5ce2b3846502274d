//! Time-gated diagnostic throttle.
//!
//! Registration failures can arrive in bursts (input method switches re-run
//! registration several times a second). Every failure is still returned to
//! the caller; only the `warn!` line is rate limited.
use std::time::{Duration, Instant};

/// Minimum spacing between registry failure warnings.
pub const REGISTRY_WARN_INTERVAL: Duration = Duration::from_secs(10);

/// Admits at most one event per interval.
#[derive(Debug)]
pub struct Throttle {
    /// Minimum spacing between admitted events.
    interval: Duration,
    /// When the last event was admitted.
    last: Option<Instant>,
    /// Events dropped since the last admitted one.
    suppressed: u64,
}

impl Throttle {
    /// Create a throttle with the given spacing.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            suppressed: 0,
        }
    }

    /// Record an event at `now`.
    ///
    /// Returns `Some(n)` when the event should be reported, where `n` is the
    /// number of events suppressed since the previous report; `None` otherwise.
    pub fn admit(&mut self, now: Instant) -> Option<u64> {
        let open = match self.last {
            None => true,
            Some(t) => now.saturating_duration_since(t) >= self.interval,
        };
        if open {
            self.last = Some(now);
            let n = self.suppressed;
            self.suppressed = 0;
            Some(n)
        } else {
            self.suppressed += 1;
            None
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(REGISTRY_WARN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_event_is_admitted() {
        let mut t = Throttle::default();
        assert_eq!(t.admit(Instant::now()), Some(0));
    }

    #[test]
    fn burst_is_collapsed_until_interval_passes() {
        let mut t = Throttle::default();
        let t0 = Instant::now();
        assert_eq!(t.admit(t0), Some(0));
        assert_eq!(t.admit(t0 + Duration::from_secs(1)), None);
        assert_eq!(t.admit(t0 + Duration::from_secs(9)), None);
        assert_eq!(t.admit(t0 + Duration::from_secs(10)), Some(2));
        assert_eq!(t.admit(t0 + Duration::from_secs(11)), None);
    }
}
