//! # Chess
//!
//! The server-side core of a real-time two-player chess service: matchmaking,
//! move validation, clocks, reconnection, chat, and an optional bot
//! opponent, wired together behind a single WebSocket endpoint.
//!
//! Each concern lives in its own crate (`chess-room`, `chess-game`,
//! `chess-session`, ...); this crate is the coordinator that wires them to a
//! concrete store, a concrete rules oracle, and a concrete transport, and
//! exposes the one thing a binary needs: [`Server`](server::Server).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chess::prelude::*;
//!
//! # async fn run() -> Result<(), ChessCoreError> {
//! let config = Config::from_env().expect("invalid configuration");
//! let server = Server::build(config).await?;
//! server.run().await
//! # }
//! ```

mod broadcaster;
mod config;
mod coordinator;
mod error;
mod handler;
mod registry;
mod server;
mod tick_loop;

pub use config::{Config, ConfigError, Environment};
pub use error::ChessCoreError;
pub use server::Server;

/// The hot store every manager in this crate is instantiated against.
pub(crate) type Hot = chess_store::InMemoryHotStore;
/// The durable store every manager in this crate is instantiated against.
pub(crate) type Durable = chess_store::InMemoryDurableStore;
/// The rules oracle every manager in this crate is instantiated against.
pub(crate) type Oracle = chess_rules::ShakmatyOracle;

pub mod prelude {
    pub use crate::{ChessCoreError, Config, ConfigError, Environment, Server};
}
