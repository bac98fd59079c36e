//! Error types for the session layer.

use chess_protocol::UserId;

/// Errors that can occur while tracking a connected player's session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Authentication failed — the token was invalid, expired, or rejected
    /// by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No live session exists for the given player.
    #[error("session not found for user {0}")]
    NotFound(UserId),

    /// The user already has a live socket tracked by this manager. A user
    /// gets at most one active session at a time; a second IDENTIFY from
    /// the same user must close the earlier socket first.
    #[error("user {0} already has an active session")]
    AlreadyConnected(UserId),

    /// The player exceeded the inbound message rate limit (50 messages per
    /// rolling 60-second window). The connection should be closed with
    /// `RATE_LIMIT_EXCEEDED`.
    #[error("user {0} exceeded the inbound message rate limit")]
    RateLimited(UserId),
}
