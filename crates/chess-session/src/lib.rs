//! Player session tracking for the chess server.
//!
//! This crate handles the lifecycle of a connected socket:
//!
//! 1. **Authentication** — verifying who a player is ([`Authenticator`])
//! 2. **Live-session tracking** — knowing who's connected right now and
//!    enforcing the inbound heartbeat/rate-limit budget ([`SessionManager`])
//!
//! Reconnection grace periods are deliberately not handled here — they
//! depend on which room/game a player was in, so that logic lives one
//! layer up, in the room service.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room/Game layer (above)  ← decides what a disconnect/rejoin means for play
//!     ↕
//! Session layer (this crate)  ← tracks live sockets, heartbeats, rate limits
//!     ↕
//! Protocol layer (below)  ← provides UserId and wire types
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod manager;
mod session;

pub use auth::{Authenticator, DevAuthenticator, Identity};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{RateLimiter, Session, SessionConfig};
