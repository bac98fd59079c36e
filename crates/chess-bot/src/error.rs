//! Error types for the bot layer.

use chess_protocol::GameId;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// The controller is already running its maximum number of concurrent
    /// bot games.
    #[error("bot controller is already running the maximum number of games")]
    TooManyActiveGames,

    /// `game_id` is not registered with this controller.
    #[error("game {0} is not a registered bot game")]
    NotRegistered(GameId),

    /// Propagated from the game actor while making the bot's move.
    #[error(transparent)]
    Game(#[from] chess_game::GameError),
}
