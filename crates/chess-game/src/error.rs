//! Error types for the game layer.

use chess_protocol::{GameId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The game does not exist, or its actor has already shut down.
    #[error("game {0} not found")]
    NotFound(GameId),

    /// The supplied game id isn't even well-formed enough to look up.
    #[error("invalid game id: {0}")]
    InvalidId(String),

    /// The acting user is not a participant in this game.
    #[error("user {0} is not a participant in game {1}")]
    NotParticipant(UserId, GameId),

    /// A move, resignation, or draw response arrived out of turn or after
    /// the game already reached a terminal status.
    #[error("game {0} is not active")]
    NotActive(GameId),

    /// It is the other player's turn to move.
    #[error("it is not {0}'s turn")]
    NotYourTurn(UserId),

    /// The move was rejected by the rules oracle.
    #[error(transparent)]
    IllegalMove(#[from] chess_rules::RuleError),

    /// The user has submitted three illegal moves within the tracking
    /// window and should be disconnected.
    #[error("user {0} exceeded the illegal move limit")]
    TooManyInvalidMoves(UserId),

    /// A draw response arrived with no outstanding offer from the other
    /// player.
    #[error("no draw offer outstanding for game {0}")]
    NoDrawOffer(GameId),

    /// Underlying hot/durable store failure.
    #[error(transparent)]
    Store(#[from] chess_store::StoreError),

    /// The game actor's mailbox is gone (task panicked or was dropped).
    #[error("game {0} actor is unavailable")]
    Unavailable(GameId),
}
