//! Session types: the per-connection bookkeeping the manager tracks.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chess_protocol::UserId;

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often the client is expected to send a heartbeat. A session
    /// that misses two consecutive intervals is considered dead by the
    /// connection layer.
    pub heartbeat_interval: Duration,
    /// Inbound message budget per rolling window, enforced by
    /// [`RateLimiter`]. The canonical value is 50 messages per 60 seconds;
    /// it is fixed at construction so a misconfigured `0` can never reach
    /// the limiter.
    pub rate_limit_max_messages: u32,
    pub rate_limit_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            rate_limit_max_messages: 50,
            rate_limit_window: Duration::from_secs(60),
        }
    }
}

/// Rolling-window inbound message rate limiter.
///
/// The limit is validated once, here, at construction — every `Session`
/// shares the same rule, so there is exactly one place a bad threshold
/// could be introduced.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_messages: u32,
    window: Duration,
    timestamps: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_messages: u32, window: Duration) -> Self {
        assert!(max_messages > 0, "rate limit must allow at least one message");
        Self {
            max_messages,
            window,
            timestamps: VecDeque::new(),
        }
    }

    /// Records a message at `now`, evicting timestamps outside the window.
    /// Returns `false` once the window already holds `max_messages`
    /// entries (the new message is still recorded so a persistently noisy
    /// client keeps tripping the limit rather than sliding back under it).
    pub fn record(&mut self, now: Instant) -> bool {
        while let Some(&front) = self.timestamps.front() {
            if now.duration_since(front) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        self.timestamps.push_back(now);
        self.timestamps.len() as u32 <= self.max_messages
    }
}

/// The server's live record of a connected player.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub provider: String,
    pub connected_at: Instant,
    pub last_heartbeat_at: Instant,
    pub(crate) limiter: RateLimiter,
}

impl Session {
    pub fn new(user_id: UserId, provider: String, config: &SessionConfig) -> Self {
        let now = Instant::now();
        Self {
            user_id,
            provider,
            connected_at: now,
            last_heartbeat_at: now,
            limiter: RateLimiter::new(config.rate_limit_max_messages, config.rate_limit_window),
        }
    }

    /// True once the session has missed two consecutive heartbeat
    /// intervals and should be treated as dead.
    pub fn is_heartbeat_stale(&self, interval: Duration, now: Instant) -> bool {
        now.duration_since(self.last_heartbeat_at) > interval * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_up_to_max_within_window() {
        let mut limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.record(now));
        assert!(limiter.record(now));
        assert!(limiter.record(now));
        assert!(!limiter.record(now), "fourth message within window should trip the limit");
    }

    #[test]
    fn test_rate_limiter_evicts_timestamps_outside_window() {
        let mut limiter = RateLimiter::new(1, Duration::from_millis(10));
        let t0 = Instant::now();
        assert!(limiter.record(t0));
        let t1 = t0 + Duration::from_millis(20);
        assert!(limiter.record(t1), "old timestamp should have rolled out of the window");
    }

    #[test]
    #[should_panic]
    fn test_rate_limiter_rejects_zero_max_messages() {
        RateLimiter::new(0, Duration::from_secs(60));
    }
}
