//! Timing and threshold constants for the game service.

use std::time::Duration;

/// Fixed knobs for move validation and the draw protocol. Like
/// [`chess_room::RoomConfig`], these are protocol constants rather than
/// per-deployment tuning.
#[derive(Debug, Clone, Copy)]
pub struct GameConfig {
    /// Illegal move attempts allowed within `invalid_move_window` before
    /// the offending player is disconnected.
    pub invalid_move_limit: u32,
    /// Sliding window the illegal-move counter is tracked over.
    pub invalid_move_window: Duration,
    /// How long an outstanding draw offer remains valid.
    pub draw_offer_ttl: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            invalid_move_limit: 3,
            invalid_move_window: Duration::from_secs(60),
            draw_offer_ttl: Duration::from_secs(300),
        }
    }
}
