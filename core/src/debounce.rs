//! Debouncing for the search box.
//!
//! Time is passed in by the caller rather than read from a clock, so the
//! behaviour is deterministic under test.

use std::time::{Duration, Instant};

pub const DEFAULT_SEARCH_DELAY: Duration = Duration::from_millis(300);

/// Holds the most recent search input until it has been quiet for `delay`.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DELAY)
    }
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Records a keystroke. Replaces any pending value and restarts the wait.
    pub fn input(&mut self, value: impl Into<String>, now: Instant) {
        self.pending = Some((value.into(), now));
    }

    /// Releases the pending value once `delay` has passed since the last input.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, at)) if now.saturating_duration_since(*at) >= self.delay => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    /// When the pending value becomes ready, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.delay)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
