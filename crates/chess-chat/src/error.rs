//! Error types for the chat layer.

use chess_protocol::UserId;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// A message exceeded the 500-character limit.
    #[error("chat message exceeds {max} characters")]
    TooLong { max: usize },

    /// The message was empty, or only whitespace, after trimming.
    #[error("chat message is empty")]
    Empty,

    /// The user sent more than 50 messages within the tracking window.
    #[error("user {0} is sending chat messages too quickly")]
    RateLimited(UserId),

    /// Propagated from the game actor: the game doesn't exist or the user
    /// isn't one of its two players.
    #[error(transparent)]
    Game(#[from] chess_game::GameError),
}
