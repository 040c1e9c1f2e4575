use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Gates request submission after repeated timeouts.
///
/// Closed while the timeout counter stays under the threshold. Once the
/// counter reaches it, the breaker opens and rejects traffic for a fixed
/// cooldown period, then closes again on the first gate check after expiry.
/// That same check admits its request, so no extra probe call is needed.
///
/// State transitions happen inside [`BackoffTracker::should_submit`]; there
/// is no background timer. The tracker is not synchronized; callers that
/// share one across threads wrap it in a mutex.
#[derive(Debug)]
pub struct BackoffTracker {
    max_timeouts: u32,
    backoff_period: Duration,
    timeout_count: u32,
    backoff_started: Option<Instant>,
}

impl BackoffTracker {
    /// Creates a closed tracker with a zeroed timeout counter.
    pub fn new(max_timeouts: u32, backoff_period: Duration) -> Self {
        Self {
            max_timeouts,
            backoff_period,
            timeout_count: 0,
            backoff_started: None,
        }
    }

    /// Records one request timeout.
    pub fn report_timeout(&mut self) {
        self.timeout_count += 1;
    }

    /// Whether the caller should submit a request right now.
    ///
    /// Evaluates breaker transitions fresh on every call: opens when the
    /// counter has reached the threshold, rejects while the cooldown runs,
    /// and closes (clearing the timestamp, zeroing the counter) as soon as
    /// the cooldown has elapsed.
    pub fn should_submit(&mut self) -> bool {
        self.should_submit_at(Instant::now())
    }

    /// Backoff progress as `(elapsed_secs, remaining_secs)`, rounded to two
    /// decimals. `(0.0, 0.0)` while the breaker is closed.
    pub fn status(&self) -> (f64, f64) {
        self.status_at(Instant::now())
    }

    fn should_submit_at(&mut self, now: Instant) -> bool {
        match self.backoff_started {
            None if self.timeout_count >= self.max_timeouts => {
                info!(
                    backoff_secs = self.backoff_period.as_secs(),
                    timeouts = self.timeout_count,
                    "max number of timeouts exceeded, backing off"
                );
                self.backoff_started = Some(now);
                false
            }
            None => true,
            Some(started) => {
                let elapsed = now.saturating_duration_since(started).as_secs_f64();
                let remaining = self.backoff_period.as_secs_f64() - elapsed;
                if remaining < 0.0 {
                    info!(
                        elapsed_secs = round2(elapsed),
                        "exiting backoff state, submitting again"
                    );
                    self.backoff_started = None;
                    self.timeout_count = 0;
                    true
                } else {
                    debug!(
                        remaining_secs = round2(remaining),
                        "in backoff state, not submitting"
                    );
                    false
                }
            }
        }
    }

    fn status_at(&self, now: Instant) -> (f64, f64) {
        let Some(started) = self.backoff_started else {
            return (0.0, 0.0);
        };
        let elapsed = now.saturating_duration_since(started).as_secs_f64();
        let remaining = self.backoff_period.as_secs_f64() - elapsed;
        (round2(elapsed), round2(remaining))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::BackoffTracker;

    const PERIOD: Duration = Duration::from_secs(300);

    fn tripped_tracker(now: Instant) -> BackoffTracker {
        let mut tracker = BackoffTracker::new(3, PERIOD);
        for _ in 0..3 {
            tracker.report_timeout();
        }
        assert!(!tracker.should_submit_at(now));
        tracker
    }

    #[test]
    fn submits_while_under_threshold() {
        let now = Instant::now();
        let mut tracker = BackoffTracker::new(3, PERIOD);
        assert!(tracker.should_submit_at(now));

        tracker.report_timeout();
        tracker.report_timeout();
        assert!(tracker.should_submit_at(now));
    }

    #[test]
    fn opens_at_threshold_and_rejects_during_cooldown() {
        let now = Instant::now();
        let mut tracker = tripped_tracker(now);

        assert!(!tracker.should_submit_at(now + Duration::from_secs(1)));
        assert!(!tracker.should_submit_at(now + Duration::from_secs(299)));
    }

    #[test]
    fn still_rejects_when_exactly_at_period_end() {
        let now = Instant::now();
        let mut tracker = tripped_tracker(now);

        // remaining == 0 is not yet expired; only remaining < 0 closes it.
        assert!(!tracker.should_submit_at(now + PERIOD));
    }

    #[test]
    fn first_check_after_expiry_submits_and_resets() {
        let now = Instant::now();
        let mut tracker = tripped_tracker(now);

        let after = now + PERIOD + Duration::from_secs(1);
        assert!(tracker.should_submit_at(after));
        // Fresh closed state: immediate re-check submits too, counter is gone.
        assert!(tracker.should_submit_at(after));
        assert_eq!(tracker.timeout_count, 0);
        assert!(tracker.backoff_started.is_none());
    }

    #[test]
    fn reopens_on_new_timeout_run_after_reset() {
        let now = Instant::now();
        let mut tracker = tripped_tracker(now);
        assert!(tracker.should_submit_at(now + PERIOD + Duration::from_secs(1)));

        for _ in 0..3 {
            tracker.report_timeout();
        }
        assert!(!tracker.should_submit_at(now + PERIOD + Duration::from_secs(2)));
    }

    #[test]
    fn status_splits_period_into_elapsed_and_remaining() {
        let now = Instant::now();
        let tracker = tripped_tracker(now);

        let (elapsed, remaining) = tracker.status_at(now + Duration::from_secs(120));
        assert!((elapsed - 120.0).abs() < 0.01);
        assert!((remaining - 180.0).abs() < 0.01);
        assert!((elapsed + remaining - PERIOD.as_secs_f64()).abs() < 0.02);
    }

    #[test]
    fn status_rounds_to_two_decimals() {
        let now = Instant::now();
        let tracker = tripped_tracker(now);

        let (elapsed, _) = tracker.status_at(now + Duration::from_millis(1234));
        assert_eq!(elapsed, 1.23);
    }

    #[test]
    fn status_is_zeroed_while_closed() {
        let tracker = BackoffTracker::new(3, PERIOD);
        assert_eq!(tracker.status_at(Instant::now()), (0.0, 0.0));
    }
}
