//! External state-store contracts for the chess server: a fast, TTL'd
//! key/value + list cache (hot store) and a record-level persistence layer
//! (durable store). Both ship an in-memory reference implementation so the
//! rest of the workspace runs standalone; a production deployment swaps
//! these for clients to a shared cache and a relational database without
//! touching any calling service.

#![allow(async_fn_in_trait)]

mod durable;
mod error;
mod hot;

pub use durable::{DurableOp, DurableStore, InMemoryDurableStore, Transaction};
pub use error::StoreError;
pub use hot::{HotOp, HotStore, HotStoreExt, InMemoryHotStore};

/// Hot-store key for a game's cached state.
pub fn game_key(id: &chess_protocol::GameId) -> String {
    format!("game:{id}")
}

/// Hot-store key for a room's cached state.
pub fn room_key(id: &chess_protocol::RoomId) -> String {
    format!("room:{id}")
}

pub const GUEST_QUEUE_KEY: &str = "guestQueue";
pub const RATED_QUEUE_KEY: &str = "ratedQueue";

pub fn player_status_key(id: &chess_protocol::UserId) -> String {
    format!("player:{id}:status")
}

pub fn player_queue_key(id: &chess_protocol::UserId) -> String {
    format!("player:{id}:queue")
}

pub fn player_queue_timeout_key(id: &chess_protocol::UserId) -> String {
    format!("player:{id}:queueTimeoutId")
}

pub fn player_last_game_key(id: &chess_protocol::UserId) -> String {
    format!("player:{id}:lastGame")
}

pub fn invalid_moves_key(id: &chess_protocol::UserId) -> String {
    format!("invalidMoves:{id}")
}

pub fn draw_offer_key(game_id: &chess_protocol::GameId, user_id: &chess_protocol::UserId) -> String {
    format!("drawOffer:{game_id}:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_protocol::{GameId, RoomId, UserId};

    #[test]
    fn test_key_helpers_match_hot_store_layout() {
        assert_eq!(game_key(&GameId::from("g1")), "game:g1");
        assert_eq!(room_key(&RoomId::from("r1")), "room:r1");
        assert_eq!(player_status_key(&UserId::from("u1")), "player:u1:status");
        assert_eq!(
            invalid_moves_key(&UserId::from("u1")),
            "invalidMoves:u1"
        );
        assert_eq!(
            draw_offer_key(&GameId::from("g1"), &UserId::from("u1")),
            "drawOffer:g1:u1"
        );
    }
}
