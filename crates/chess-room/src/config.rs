//! Timing constants for room/queue/disconnect lifecycles.

use std::time::Duration;

/// Fixed timing knobs for the room service. Unlike the session and chat
/// rate limits, these durations are not configurable per deployment — they
/// are part of the protocol the client expects.
#[derive(Debug, Clone, Copy)]
pub struct RoomConfig {
    /// How long a queued player waits before `QUEUE_TIMEOUT`.
    pub queue_timeout: Duration,
    /// Grace period after a disconnect before a game is marked abandoned.
    pub disconnect_grace: Duration,
    /// Maximum ELO difference for a rated match.
    pub rated_elo_window: i32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            queue_timeout: Duration::from_secs(60),
            disconnect_grace: Duration::from_secs(30),
            rated_elo_window: 100,
        }
    }
}
