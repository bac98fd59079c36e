//! In-game chat: length and rate limiting, persisted history, and
//! ephemeral typing notifications.

mod config;
mod error;
mod events;
mod limiter;
mod service;

pub use config::ChatConfig;
pub use error::ChatError;
pub use events::ChatEvents;
pub use limiter::ChatRateLimiter;
pub use service::ChatService;
