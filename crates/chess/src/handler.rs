//! Per-connection handler: the `IDENTIFY` handshake, then a message loop
//! that decodes [`ClientMessage`]s and dispatches them through the
//! [`Coordinator`].
//!
//! Uses a `SessionGuard` drop-spawns-a-cleanup-task idiom, a
//! timeout-wrapped handshake receive, and routes every post-handshake
//! frame through `Coordinator::dispatch`.

use std::sync::Arc;
use std::time::Duration;

use chess_protocol::{ClientMessage, Codec, CloseCode, JsonCodec};
use chess_session::{Authenticator, SessionError};
use chess_transport::{Connection, WebSocketConnection};
use serde::Deserialize;

use crate::coordinator::Coordinator;
use crate::ChessCoreError;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// The wire shape of the one frame that isn't a [`ClientMessage`] variant —
/// the first frame every connection must send, before any session exists
/// for it to be tagged against.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "payload")]
enum HandshakeFrame {
    #[serde(rename = "IDENTIFY")]
    Identify { token: String },
}

/// Disconnects a player's session when the handler exits, however it
/// exits. Since `Drop` is synchronous, it spawns a fire-and-forget task
/// for the async cleanup.
struct SessionGuard<A: Authenticator> {
    user_id: chess_protocol::UserId,
    coordinator: Arc<Coordinator<A>>,
}

impl<A: Authenticator> Drop for SessionGuard<A> {
    fn drop(&mut self) {
        let user_id = self.user_id.clone();
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            coordinator.handle_disconnect(&user_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A: Authenticator>(
    conn: Arc<WebSocketConnection>,
    coordinator: Arc<Coordinator<A>>,
) {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let codec = JsonCodec;

    let user_id = match perform_handshake(&conn, &codec, &coordinator).await {
        Ok(user_id) => user_id,
        Err(err) => {
            tracing::debug!(%conn_id, %err, "handshake failed");
            return;
        }
    };

    tracing::info!(%conn_id, %user_id, "player identified");

    // _guard drops once this function returns, whatever the reason, and
    // tears the session down from there.
    let _guard = SessionGuard {
        user_id: user_id.clone(),
        coordinator: Arc::clone(&coordinator),
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%user_id, "connection closed cleanly");
                break;
            }
            Err(err) => {
                tracing::debug!(%user_id, %err, "recv error");
                break;
            }
        };

        // Any frame that reaches us at all is proof of life — the
        // transport layer doesn't surface WebSocket ping/pong frames, so
        // ordinary traffic stands in for the heartbeat the registry's
        // periodic sweep is watching for.
        if coordinator.record_heartbeat(&user_id).await.is_err() {
            break;
        }

        match coordinator.record_message(&user_id).await {
            Ok(()) => {}
            Err(SessionError::RateLimited(_)) => {
                coordinator
                    .registry()
                    .close(&user_id, CloseCode::RateLimitExceeded as u16, "rate limit exceeded")
                    .await;
                break;
            }
            Err(_) => break,
        }

        let msg: ClientMessage = match codec.decode(&data) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::debug!(%user_id, %err, "malformed client message");
                coordinator
                    .registry()
                    .send(&user_id, &chess_protocol::ServerMessage::Error { message: "malformed message".into() })
                    .await;
                continue;
            }
        };

        coordinator.dispatch(&user_id, msg).await;
    }
}

/// Reads the first frame, which must be `IDENTIFY`, authenticates its
/// token, and registers the resulting session and socket.
async fn perform_handshake<A: Authenticator>(
    conn: &Arc<WebSocketConnection>,
    codec: &JsonCodec,
    coordinator: &Arc<Coordinator<A>>,
) -> Result<chess_protocol::UserId, ChessCoreError> {
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(chess_protocol::ProtocolError::InvalidMessage("connection closed before IDENTIFY".into()).into());
        }
        Ok(Err(err)) => return Err(err.into()),
        Err(_) => {
            return Err(chess_protocol::ProtocolError::InvalidMessage("IDENTIFY timed out".into()).into());
        }
    };

    let HandshakeFrame::Identify { token } = match codec.decode(&data) {
        Ok(frame) => frame,
        Err(err) => {
            let _ = conn.close_with_code(CloseCode::InvalidMessage as u16, "expected IDENTIFY").await;
            return Err(err.into());
        }
    };

    let identity = match coordinator.authenticate(&token).await {
        Ok(identity) => identity,
        Err(err) => {
            let _ = conn.close_with_code(CloseCode::AuthFailed as u16, "authentication failed").await;
            return Err(err.into());
        }
    };

    // The session manager is the source of truth for one-live-socket-per-user;
    // a second IDENTIFY from an already-connected user is rejected rather
    // than silently superseding the first.
    if let Err(err) = coordinator
        .create_session(identity.user_id.clone(), identity.provider.clone())
        .await
    {
        let _ = conn.close_with_code(CloseCode::Unauthorized as u16, "already connected").await;
        return Err(err.into());
    }

    coordinator.registry().register(identity.user_id.clone(), Arc::clone(conn)).await;

    Ok(identity.user_id)
}
