//! Coalescing of rapid edits into a single delayed commit.

use std::time::{Duration, Instant};

/// Holds the latest value of an editing session until it has been quiet for `delay`.
///
/// The caller drives time: `push` on every edit, `take_due` on each tick,
/// and `flush` when the user navigates away so the last edit is never lost.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Debouncer committing after `delay` of inactivity.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Quiet period before a value becomes due.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a new value, restarting the quiet period.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Take the pending value if its quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        let due = matches!(&self.pending, Some((_, deadline)) if now >= *deadline);
        if due {
            self.flush()
        } else {
            None
        }
    }

    /// Take the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Drop the pending value without committing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Whether a value is waiting.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The waiting value, if any.
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commits_last_value_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(200));
        debouncer.push("p", start);
        debouncer.push("pa", start + Duration::from_millis(100));
        assert_eq!(debouncer.take_due(start + Duration::from_millis(250)), None);
        assert_eq!(
            debouncer.take_due(start + Duration::from_millis(300)),
            Some("pa")
        );
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.take_due(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn flush_commits_immediately() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(800));
        debouncer.push(String::from("notes"), start);
        assert_eq!(debouncer.pending().map(String::as_str), Some("notes"));
        assert_eq!(debouncer.flush().as_deref(), Some("notes"));
        assert_eq!(debouncer.flush(), None);
    }

    #[test]
    fn cancel_drops_pending_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::ZERO);
        debouncer.push(1, start);
        debouncer.cancel();
        assert_eq!(debouncer.take_due(start), None);
    }
}
