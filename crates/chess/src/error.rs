//! Unified error type for the chess server.

use chess_bot::BotError;
use chess_chat::ChatError;
use chess_game::GameError;
use chess_protocol::ProtocolError;
use chess_room::RoomError;
use chess_session::SessionError;
use chess_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps every sub-crate's error type.
///
/// When using the `chess` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates a `From` impl, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ChessCoreError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, reconnect, expired).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, invalid state).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A game-level error (illegal move, wrong turn, no draw offer).
    #[error(transparent)]
    Game(#[from] GameError),

    /// A chat-level error (too long, rate limited).
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// A bot-controller error (too many active games, unregistered).
    #[error(transparent)]
    Bot(#[from] BotError),

    /// Configuration was missing, malformed, or unsafe for the requested
    /// environment (e.g. `DevAuthenticator` selected in production).
    #[error(transparent)]
    Config(#[from] ConfigError),
}
