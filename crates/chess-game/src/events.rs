//! Callback surface the game actor uses to reach the coordinator: pushing
//! state to connected clients and reporting terminal outcomes back to the
//! room service. A game actor never holds a reference to the Connection
//! Registry or the Room Service directly — only to this sink.

use chess_protocol::{ChatEntry, Game, GameId, RoomId, UserId};

#[allow(async_fn_in_trait)]
pub trait GameEvents: Send + Sync + 'static {
    /// The game's state changed (a move was played, a draw was offered,
    /// the clocks ticked). The sink broadcasts the relevant wire message to
    /// both players.
    async fn on_state_changed(&self, game: Game);

    /// A move attempt was rejected by the rules oracle. The sink relays
    /// `INVALID_MOVE` to the offending player alone, along with how many
    /// consecutive invalid attempts it has made in the tracking window.
    async fn on_invalid_move(&self, game_id: GameId, user_id: UserId, reason: String, attempt_count: u32);

    /// The other player offered a draw.
    async fn on_draw_offered(&self, game_id: GameId, from_user_id: UserId);

    /// A draw offer was declined (or expired without a response).
    async fn on_draw_declined(&self, game_id: GameId, by_user_id: UserId);

    /// A chat message was appended to the game's history.
    async fn on_chat_message(&self, game_id: GameId, entry: ChatEntry);

    /// The game reached a terminal status (checkmate, resignation, draw,
    /// timeout, or abandonment). The sink unregisters the game from the
    /// clock coordinator and notifies the room service.
    async fn on_game_over(&self, game: Game, room_id: RoomId);
}
