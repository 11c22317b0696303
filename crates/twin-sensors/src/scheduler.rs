//! [`PublishScheduler`]: per-sensor rate limiter.
//!
//! The render loop runs at whatever rate the host manages; each sensor wants
//! its own fixed publish rate.  A scheduler answers, once per render tick,
//! "should this sensor sample now?".
//!
//! The rule: publish when `now` has reached the stored
//! threshold, then move the threshold to `now + 1/rate`.  Missed periods are
//! never backfilled, so a slow render loop yields at most one publish per
//! tick and the effective rate degrades gracefully instead of bursting.
//!
//! # Example
//!
//! ```rust
//! use twin_sensors::scheduler::PublishScheduler;
//!
//! let mut sched = PublishScheduler::new(10.0, PublishScheduler::DEFAULT_MIN_RATE_HZ, 0.0);
//! assert!(sched.should_publish(0.0));   // first tick fires immediately
//! assert!(!sched.should_publish(0.05)); // too early
//! assert!(sched.should_publish(0.1));
//! ```

/// Lowest floor any scheduler accepts, so a zero floor cannot reintroduce a
/// division by zero.
const ABSOLUTE_MIN_RATE_HZ: f64 = 1e-3;

/// Decides, per render tick, whether its sensor should publish.
///
/// The only mutable state is the next publish time, which never moves
/// backwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishScheduler {
    period: f64,
    next_publish: f64,
}

impl PublishScheduler {
    /// Floor used by the lidar and camera.
    pub const DEFAULT_MIN_RATE_HZ: f64 = 0.1;

    /// Create a scheduler for `rate_hz`, clamped to at least `min_rate_hz`.
    ///
    /// The first call to [`should_publish`](Self::should_publish) at or after
    /// `start_time` returns `true`.
    pub fn new(rate_hz: f64, min_rate_hz: f64, start_time: f64) -> Self {
        let floor = if min_rate_hz.is_finite() {
            min_rate_hz.max(ABSOLUTE_MIN_RATE_HZ)
        } else {
            ABSOLUTE_MIN_RATE_HZ
        };
        // NaN compares false and therefore falls through to the floor.
        let rate = if rate_hz > floor { rate_hz } else { floor };
        let rate = if rate.is_finite() { rate } else { floor };
        Self {
            period: 1.0 / rate,
            next_publish: if start_time.is_finite() { start_time } else { 0.0 },
        }
    }

    /// Returns `true` at most once per period.  On `true` the threshold
    /// advances to `now + period`; the caller must publish.
    ///
    /// Non-finite `now` never publishes and leaves the state untouched.
    pub fn should_publish(&mut self, now: f64) -> bool {
        if !now.is_finite() || now < self.next_publish {
            return false;
        }
        self.next_publish = now + self.period;
        true
    }

    /// Seconds between publishes after clamping.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Publish rate after clamping (Hz).
    pub fn effective_rate(&self) -> f64 {
        1.0 / self.period
    }

    /// Earliest simulation time at which the next publish may happen.
    pub fn next_publish(&self) -> f64 {
        self.next_publish
    }
}
