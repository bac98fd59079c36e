//! Callback surface the room service uses to reach back into the
//! coordinator for the handful of things it cannot do itself: notifying a
//! disconnected socket's eventual owner, and asking the Game Service to
//! make the abandonment call once a disconnect grace period lapses.
//!
//! Room Service never holds a reference to the Game Service or the
//! Connection Registry directly — only to this sink, which the coordinator
//! implements. This is the same cyclic-reference fix the top-level crate
//! uses everywhere else.

use chess_protocol::{GameId, RoomId, UserId};

#[allow(async_fn_in_trait)]
pub trait RoomEvents: Send + Sync + 'static {
    /// A queued player's 60-second wait expired with no match.
    async fn on_queue_timeout(&self, user_id: UserId);

    /// A disconnected player's 30-second grace period expired. The sink
    /// re-checks whether the player is still disconnected and, if so,
    /// performs the abandonment transition.
    async fn on_grace_expired(&self, game_id: GameId, room_id: RoomId, user_id: UserId);
}
