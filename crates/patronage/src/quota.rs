//! Windowed API request quotas.
//!
//! The remote API budget is enforced locally with two independent counters,
//! one per clock-hour-sized window and one per day-sized window. Both must
//! have headroom before a request is issued, and both are charged once per
//! completed request.
//!
//! The two-step `can_perform` / `performed` protocol mirrors how the fetcher
//! uses these counters: a non-consuming predicate first, then a consuming
//! call that rejects when the window is already full. This keeps the net
//! increment at exactly one per call while still surfacing quota exhaustion
//! as its own failure before any network I/O happens.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Which quota window rejected the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaWindowKind {
    Hourly,
    Daily,
}

impl QuotaWindowKind {
    /// Length of the rolling window.
    #[must_use]
    pub fn period(self) -> Duration {
        match self {
            QuotaWindowKind::Hourly => Duration::from_secs(60 * 60),
            QuotaWindowKind::Daily => Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl fmt::Display for QuotaWindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaWindowKind::Hourly => write!(f, "hourly"),
            QuotaWindowKind::Daily => write!(f, "daily"),
        }
    }
}

/// A quota window was already exhausted when a call tried to consume it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("API request quota exhausted for the {kind} window")]
pub struct QuotaExceeded {
    pub kind: QuotaWindowKind,
}

/// A single rolling quota window.
///
/// Time is tracked with [`tokio::time::Instant`] so tests can drive the
/// window with a paused clock.
#[derive(Debug)]
pub struct QuotaWindow {
    kind: QuotaWindowKind,
    max: u32,
    used: u32,
    started: Instant,
}

impl QuotaWindow {
    #[must_use]
    pub fn new(kind: QuotaWindowKind, max: u32) -> Self {
        Self {
            kind,
            max,
            used: 0,
            started: Instant::now(),
        }
    }

    /// Reset the counter once the window has elapsed.
    fn roll(&mut self) {
        if self.started.elapsed() >= self.kind.period() {
            self.used = 0;
            self.started = Instant::now();
        }
    }

    /// Would one more call fit in this window?
    ///
    /// Non-consuming; callers that get `false` are expected to follow up
    /// with [`performed`](Self::performed) to obtain the rejection.
    pub fn can_perform(&mut self) -> bool {
        self.roll();
        self.used < self.max
    }

    /// Register one call against this window.
    ///
    /// Rejects without incrementing when the window is already full.
    pub fn performed(&mut self) -> Result<(), QuotaExceeded> {
        self.roll();
        if self.used >= self.max {
            return Err(QuotaExceeded { kind: self.kind });
        }
        self.used += 1;
        Ok(())
    }

    /// Calls left in the current window.
    pub fn remaining(&mut self) -> u32 {
        self.roll();
        self.max.saturating_sub(self.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn consumes_until_exhausted() {
        let mut window = QuotaWindow::new(QuotaWindowKind::Hourly, 2);

        assert!(window.can_perform());
        window.performed().expect("first call fits");
        assert!(window.can_perform());
        window.performed().expect("second call fits");

        assert!(!window.can_perform());
        let err = window.performed().expect_err("third call must reject");
        assert_eq!(err.kind, QuotaWindowKind::Hourly);
        assert_eq!(window.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_does_not_increment() {
        let mut window = QuotaWindow::new(QuotaWindowKind::Daily, 1);
        window.performed().expect("first call fits");

        // Repeated rejections leave the counter untouched.
        for _ in 0..3 {
            assert!(window.performed().is_err());
        }
        assert_eq!(window.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn window_rolls_over_after_period() {
        let mut window = QuotaWindow::new(QuotaWindowKind::Hourly, 1);
        window.performed().expect("first call fits");
        assert!(!window.can_perform());

        tokio::time::advance(Duration::from_secs(60 * 60)).await;

        assert!(window.can_perform());
        window.performed().expect("fresh window accepts again");
        assert_eq!(window.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn daily_window_outlives_hourly_rollover() {
        let mut window = QuotaWindow::new(QuotaWindowKind::Daily, 1);
        window.performed().expect("first call fits");

        tokio::time::advance(Duration::from_secs(2 * 60 * 60)).await;
        assert!(!window.can_perform());

        tokio::time::advance(Duration::from_secs(23 * 60 * 60)).await;
        assert!(window.can_perform());
    }

    #[test]
    fn kind_display_and_period() {
        assert_eq!(QuotaWindowKind::Hourly.to_string(), "hourly");
        assert_eq!(QuotaWindowKind::Daily.to_string(), "daily");
        assert_eq!(
            QuotaWindowKind::Daily.period(),
            Duration::from_secs(86_400)
        );
    }
}
