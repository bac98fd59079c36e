//! Room lifecycle management: room creation and joining, guest/rated
//! matchmaking queues, and disconnect/rejoin handling.

mod config;
mod error;
mod events;
mod manager;

pub use config::RoomConfig;
pub use error::RoomError;
pub use events::RoomEvents;
pub use manager::{DisconnectOutcome, QueueOutcome, RoomJoinOutcome, RoomManager};
