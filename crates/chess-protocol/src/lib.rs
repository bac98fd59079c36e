//! Domain types and wire protocol for the chess server.
//!
//! This crate defines the "language" every other layer speaks:
//!
//! - **Types** ([`Game`], [`Room`], [`ClientMessage`], [`ServerMessage`], etc.) —
//!   the domain model and the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the game/room
//! services (domain logic). It doesn't know about sockets or actors — it
//! only knows the shape of the data.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room/Game/Chat services
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ChatEntry, ClientMessage, Clocks, CloseCode, Color, Game, GameId, GamePlayer, GameStatus,
    MovePayload, MoveRecord, Room, RoomId, RoomPlayer, RoomStatus, RoomType, ServerMessage,
    TimeControl, User, UserId, UserStatus, BOT_USER_ID,
};
