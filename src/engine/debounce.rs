use std::time::{Duration, Instant};

/// A cancellable one-shot quiet-period timer.
///
/// Each `trigger` pushes the deadline out to `now + window`; `fire`
/// consumes the deadline once the window has elapsed. Time is injected so
/// callers (and tests) control the clock.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            deadline: None,
        }
    }

    /// Start or reset the quiet window
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the deadline if the window has elapsed
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending deadline; returns whether one was pending
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(800);

    #[test]
    fn fires_only_after_quiet_window() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        d.trigger(t0);
        assert!(!d.fire(t0 + Duration::from_millis(799)));
        assert!(d.fire(t0 + Duration::from_millis(800)));
        // Consumed: does not fire twice
        assert!(!d.fire(t0 + Duration::from_millis(900)));
    }

    #[test]
    fn retrigger_pushes_deadline_out() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        d.trigger(t0);
        d.trigger(t0 + Duration::from_millis(500));
        assert!(!d.fire(t0 + Duration::from_millis(1000)));
        assert!(d.fire(t0 + Duration::from_millis(1300)));
    }

    #[test]
    fn cancel_reports_pending() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        assert!(!d.cancel());
        d.trigger(t0);
        assert!(d.cancel());
        assert!(!d.fire(t0 + WINDOW));
    }
}
