//! Callback surface for the one piece of chat state that isn't persisted:
//! typing notifications. Persisted messages are relayed through
//! `chess_game::GameEvents::on_chat_message`, which the game actor already
//! calls once an entry is durably appended.

use chess_protocol::{GameId, UserId};

#[allow(async_fn_in_trait)]
pub trait ChatEvents: Send + Sync + 'static {
    /// A player started or stopped typing. The sink relays this to the
    /// opponent only; it is never stored.
    async fn on_typing(&self, game_id: GameId, user_id: UserId, is_typing: bool);
}
