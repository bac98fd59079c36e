//! Error types for the room layer.

use chess_protocol::{RoomId, UserId};

/// Errors that can occur during room and matchmaking operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The acting user is banned and may not create or join rooms.
    #[error("user {0} is banned")]
    Banned(UserId),

    /// The room is full — no more player slots available.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The room is not open for joining (already active or closed).
    #[error("room {0} is not open")]
    NotOpen(RoomId),

    /// A private room's invite code didn't match.
    #[error("invite code did not match room {0}")]
    InviteCodeMismatch(RoomId),

    /// The user is already a player in this room.
    #[error("user {0} already in room {1}")]
    AlreadyInRoom(UserId, RoomId),

    /// The user is not a player in this room.
    #[error("user {0} not in room {1}")]
    NotInRoom(UserId, RoomId),

    /// The game tied to this room has already reached a terminal status;
    /// there is nothing left to rejoin.
    #[error("game for room {0} is no longer active")]
    GameNotActive(RoomId),

    /// The user is already queued (guest or rated).
    #[error("user {0} is already queued")]
    AlreadyQueued(UserId),

    /// Underlying hot/durable store failure.
    #[error(transparent)]
    Store(#[from] chess_store::StoreError),
}
