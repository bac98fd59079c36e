//! Sliding-window message-rate limiter, one instance per connected user.
//!
//! Same shape as the session layer's connection-level limiter — a bounded
//! deque of recent timestamps — applied here to chat specifically so the
//! two limits can be tuned independently even though they currently share
//! the same 50-per-60s threshold.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub struct ChatRateLimiter {
    max_messages: u32,
    window: Duration,
    timestamps: VecDeque<Instant>,
}

impl ChatRateLimiter {
    pub fn new(max_messages: u32, window: Duration) -> Self {
        assert!(max_messages > 0, "max_messages must be positive");
        Self {
            max_messages,
            window,
            timestamps: VecDeque::new(),
        }
    }

    /// Records a message attempt at `now` and returns whether it is within
    /// the allowed rate.
    pub fn record(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.timestamps.front() {
            if now.duration_since(oldest) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        self.timestamps.push_back(now);
        self.timestamps.len() as u32 <= self.max_messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_under_limit_allows_message() {
        let mut limiter = ChatRateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.record(now));
        assert!(limiter.record(now));
    }

    #[test]
    fn test_record_over_limit_rejects_message() {
        let mut limiter = ChatRateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.record(now));
        assert!(limiter.record(now));
        assert!(!limiter.record(now));
    }

    #[test]
    fn test_record_outside_window_resets() {
        let mut limiter = ChatRateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.record(now));
        let later = now + Duration::from_secs(61);
        assert!(limiter.record(later));
    }
}
