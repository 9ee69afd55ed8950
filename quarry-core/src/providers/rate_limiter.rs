//! Client-side request limiter for search backends.
//!
//! Keeps the timestamps of recent calls in a sliding 60-second window and
//! reports how long a caller must wait before the next call fits.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A sliding-window limiter counting requests per window.
#[derive(Debug)]
pub struct RequestWindowLimiter {
    max_requests: usize,
    requests_window: VecDeque<Instant>,
    window: Duration,
}

impl RequestWindowLimiter {
    /// Allow `max_requests` calls per rolling minute. Zero means unlimited.
    pub fn per_minute(max_requests: usize) -> Self {
        Self::with_window(max_requests, Duration::from_secs(60))
    }

    pub fn with_window(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            requests_window: VecDeque::new(),
            window,
        }
    }

    /// Check whether a call can proceed now.
    ///
    /// Returns `None` if it can, or `Some(delay)` until the oldest recorded
    /// call leaves the window.
    pub fn check(&mut self) -> Option<Duration> {
        let now = Instant::now();
        self.prune(now);

        if self.max_requests == 0 || self.requests_window.len() < self.max_requests {
            return None;
        }
        let oldest = *self.requests_window.front()?;
        let wait = self.window.saturating_sub(now.duration_since(oldest));
        if wait.is_zero() { None } else { Some(wait) }
    }

    /// Record a call made now.
    pub fn record(&mut self) {
        self.requests_window.push_back(Instant::now());
    }

    /// Calls currently counted inside the window.
    pub fn in_window(&mut self) -> usize {
        self.prune(Instant::now());
        self.requests_window.len()
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.requests_window.front() {
            if now.duration_since(oldest) >= self.window {
                self.requests_window.pop_front();
            } else {
                break;
            }
        }
    }
}
