//! `Server` builder and accept loop.
//!
//! This is the entry point for running a chess server: it ties together
//! transport → protocol → session → room/game/chat → bot layers behind
//! one listening socket, the same builder-then-accept-loop shape used
//! to stand up a generic room/game server, generalized to route every
//! connection through the [`Coordinator`].

use std::sync::Arc;
use std::time::Duration;

use chess_protocol::CloseCode;
use chess_session::{Authenticator, DevAuthenticator, SessionConfig};
use chess_transport::{Transport, WebSocketTransport};

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::ChessCoreError;
use crate::handler::handle_connection;

/// How often the background sweep looks for sessions that missed their
/// heartbeat window and closes them.
const STALE_SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Builder for configuring and starting a chess server.
pub struct ServerBuilder {
    config: Config,
    session_config: SessionConfig,
}

impl ServerBuilder {
    fn new(config: Config) -> Self {
        Self {
            config,
            session_config: SessionConfig::default(),
        }
    }

    /// Overrides the default heartbeat/rate-limit configuration.
    pub fn session_config(mut self, session_config: SessionConfig) -> Self {
        self.session_config = session_config;
        self
    }

    /// Builds the server with a caller-supplied authenticator. Use this
    /// for any real deployment — `build_dev` is for local runs only.
    pub async fn build<A: Authenticator>(self, auth: A) -> Result<Server<A>, ChessCoreError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr().to_string()).await?;
        let coordinator = Coordinator::new(auth, self.session_config);
        Ok(Server { transport, coordinator })
    }

    /// Builds the server with [`DevAuthenticator`]. Refuses to start when
    /// `environment=production` — a deployment must call [`build`](Self::build)
    /// with its own authenticator instead.
    pub async fn build_dev(self) -> Result<Server<DevAuthenticator>, ChessCoreError> {
        if self.config.environment.is_production() {
            return Err(crate::config::ConfigError::MissingInProduction("a real Authenticator (DevAuthenticator is disallowed)").into());
        }
        self.build(DevAuthenticator).await
    }
}

/// A running chess server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct Server<A: Authenticator> {
    transport: WebSocketTransport,
    coordinator: Arc<Coordinator<A>>,
}

impl Server<DevAuthenticator> {
    /// Builds a server using [`DevAuthenticator`] — the one-line path for
    /// local runs and examples. Equivalent to
    /// `Server::builder(config).build_dev()`.
    pub async fn build(config: Config) -> Result<Self, ChessCoreError> {
        ServerBuilder::new(config).build_dev().await
    }
}

impl<A: Authenticator> Server<A> {
    /// Starts a [`ServerBuilder`] for deployments that need their own
    /// authenticator or a non-default [`SessionConfig`].
    pub fn builder(config: Config) -> ServerBuilder {
        ServerBuilder::new(config)
    }

    /// Returns the address this server is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop: spawns a handler task per accepted
    /// connection, plus a background sweep that closes sockets whose
    /// session missed its heartbeat window. Runs until the process is
    /// terminated.
    pub async fn run(mut self) -> Result<(), ChessCoreError> {
        tracing::info!("chess server running");

        spawn_stale_session_sweep(Arc::clone(&self.coordinator));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let conn = Arc::new(conn);
                    let coordinator = Arc::clone(&self.coordinator);
                    tokio::spawn(async move {
                        handle_connection(conn, coordinator).await;
                    });
                }
                Err(err) => {
                    tracing::error!(%err, "accept failed");
                }
            }
        }
    }
}

/// Periodically closes any socket whose session has gone heartbeat-stale.
/// A player who simply isn't making moves is never affected — liveness is
/// judged purely by whether any frame has arrived recently, not by game
/// activity.
fn spawn_stale_session_sweep<A: Authenticator>(coordinator: Arc<Coordinator<A>>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STALE_SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            for user_id in coordinator.stale_user_ids().await {
                tracing::debug!(%user_id, "closing heartbeat-stale session");
                coordinator
                    .registry()
                    .close(&user_id, CloseCode::Normal as u16, "heartbeat timed out")
                    .await;
                coordinator.handle_disconnect(&user_id).await;
            }
        }
    });
}
