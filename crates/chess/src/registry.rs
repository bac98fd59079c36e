//! Connection Registry: the one place that knows which live socket belongs
//! to which player and can push a [`ServerMessage`] to it.
//!
//! Unlike the room/game/session managers, which stay generic over their
//! store and event-sink types, this registry is concretely typed over
//! [`WebSocketConnection`] — concrete over the one transport this
//! deployment actually runs.

use std::collections::HashMap;
use std::sync::Arc;

use chess_protocol::{Codec, JsonCodec, ServerMessage, UserId};
use chess_transport::{Connection, WebSocketConnection};
use tokio::sync::Mutex;

/// Tracks every connected player's live socket and encodes outbound
/// messages through a fixed [`JsonCodec`].
pub struct ConnectionRegistry {
    sockets: Mutex<HashMap<UserId, Arc<WebSocketConnection>>>,
    codec: JsonCodec,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sockets: Mutex::new(HashMap::new()),
            codec: JsonCodec,
        }
    }

    /// Registers a newly identified connection. If the user already has a
    /// socket tracked, it is closed with `1000 "superseded"` first — the
    /// session layer refuses to silently replace a live session, so the
    /// caller must tear down the old connection before creating a new one.
    pub async fn register(&self, user_id: UserId, conn: Arc<WebSocketConnection>) {
        let previous = self.sockets.lock().await.insert(user_id, conn);
        if let Some(previous) = previous {
            let _ = previous.close_with_code(1000, "superseded").await;
        }
    }

    pub async fn unregister(&self, user_id: &UserId) {
        self.sockets.lock().await.remove(user_id);
    }

    /// Sends a message to a single player. No-op if they aren't connected
    /// (they may have disconnected between the event firing and delivery).
    pub async fn send(&self, user_id: &UserId, message: &ServerMessage) {
        let conn = self.sockets.lock().await.get(user_id).cloned();
        let Some(conn) = conn else {
            return;
        };
        match self.codec.encode(message) {
            Ok(bytes) => {
                if let Err(err) = conn.send(&bytes).await {
                    tracing::debug!(%user_id, %err, "failed to deliver message, dropping");
                }
            }
            Err(err) => tracing::error!(%err, "failed to encode outbound message"),
        }
    }

    pub async fn send_to_many(&self, user_ids: impl IntoIterator<Item = &UserId>, message: &ServerMessage) {
        for user_id in user_ids {
            self.send(user_id, message).await;
        }
    }

    pub async fn close(&self, user_id: &UserId, code: u16, reason: &str) {
        let conn = self.sockets.lock().await.remove(user_id);
        if let Some(conn) = conn {
            let _ = conn.close_with_code(code, reason).await;
        }
    }

    pub async fn is_connected(&self, user_id: &UserId) -> bool {
        self.sockets.lock().await.contains_key(user_id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
