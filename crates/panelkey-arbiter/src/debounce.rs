//! Per-action debounce gate for shortcut fires.
use std::time::{Duration, Instant};

/// Minimum spacing between two accepted fires of one action.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(250);

/// Time gate that drops fires closer than its window to the last accepted one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// Gate width.
    window: Duration,
    /// When the last accepted fire happened.
    last: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW)
    }
}

impl Debouncer {
    /// A gate with the given window.
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Record a fire at `now`; true if it is accepted.
    pub fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last
            && now.saturating_duration_since(last) < self.window
        {
            return false;
        }
        self.last = Some(now);
        true
    }

    /// Run `action` if a fire at `now` is accepted. Returns whether it ran.
    pub fn fire_at(&mut self, now: Instant, action: impl FnOnce()) -> bool {
        let ok = self.admit(now);
        if ok {
            action();
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn fifty_ms_apart_fires_once() {
        let n = Cell::new(0);
        let mut d = Debouncer::default();
        let t0 = Instant::now();
        d.fire_at(t0, || n.set(n.get() + 1));
        d.fire_at(t0 + Duration::from_millis(50), || n.set(n.get() + 1));
        assert_eq!(n.get(), 1);
    }

    #[test]
    fn three_hundred_ms_apart_fires_twice() {
        let n = Cell::new(0);
        let mut d = Debouncer::default();
        let t0 = Instant::now();
        d.fire_at(t0, || n.set(n.get() + 1));
        d.fire_at(t0 + Duration::from_millis(300), || n.set(n.get() + 1));
        assert_eq!(n.get(), 2);
    }

    #[test]
    fn dropped_fires_do_not_extend_the_window() {
        let mut d = Debouncer::default();
        let t0 = Instant::now();
        assert!(d.admit(t0));
        assert!(!d.admit(t0 + Duration::from_millis(200)));
        assert!(d.admit(t0 + Duration::from_millis(260)));
        assert!(!d.admit(t0 + Duration::from_millis(261)));
    }
}
