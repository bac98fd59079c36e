//! The `Coordinator`: owns every service, wires the event-sink cycle
//! through [`Broadcaster`], and turns a decoded [`ClientMessage`] into
//! calls against the Room/Game/Chat services plus the wire replies they
//! produce.
//!
//! One struct the connection handler holds an `Arc` of, generalized from
//! a single room manager to this system's five services plus the tick
//! loop and connection registry.

use std::sync::{Arc, Weak};

use chess_bot::{BotController, BotDifficulty, BotEngine, HeuristicEngine};
use chess_chat::{ChatConfig, ChatService};
use chess_game::{GameConfig, GameManager, TickOutcome};
use chess_protocol::{
    ClientMessage, GameId, RoomId, RoomType, ServerMessage, User, UserId, BOT_USER_ID,
};
use chess_room::{DisconnectOutcome, QueueOutcome, RoomConfig, RoomManager};
use chess_session::{Authenticator, Identity, SessionConfig, SessionError, SessionManager};
use chess_store::DurableStore;
use tokio::sync::Mutex;

use crate::broadcaster::Broadcaster;
use crate::error::ChessCoreError;
use crate::registry::ConnectionRegistry;
use crate::tick_loop::{spawn_tick_loop, TickHandle};
use crate::{Durable, Hot, Oracle};

/// Bot Controller's own concurrency cap, mirroring the matchmaker's fixed
/// protocol constants rather than a per-deployment tuning knob.
const MAX_ACTIVE_BOT_GAMES: usize = 5;

type Rooms = RoomManager<Hot, Durable, Broadcaster>;
type Games = GameManager<Oracle, Hot, Durable, Broadcaster>;
type Chat = ChatService<Oracle, Hot, Durable, Broadcaster, Broadcaster>;
type Bots = BotController<Oracle, Hot, Durable, Broadcaster>;

pub struct Coordinator<A: Authenticator> {
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) auth: A,
    durable: Arc<Durable>,
    rooms: Arc<Rooms>,
    games: Arc<Games>,
    chat: Arc<Chat>,
    bots: Arc<Bots>,
    broadcaster: Arc<Broadcaster>,
    tick: TickHandle,
}

impl<A: Authenticator> Coordinator<A> {
    pub fn new(auth: A, session_config: SessionConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Coordinator<A>>| {
            let hot = Arc::new(Hot::new());
            let durable = Arc::new(Durable::new());
            let oracle = Arc::new(Oracle::new());
            let registry = Arc::new(ConnectionRegistry::new());

            let due_target = weak.clone();
            let tick = spawn_tick_loop(move |game_id| {
                let due_target = due_target.clone();
                tokio::spawn(async move {
                    if let Some(coordinator) = due_target.upgrade() {
                        coordinator.handle_tick_due(game_id).await;
                    }
                });
            });

            let broadcaster = Broadcaster::new(Arc::clone(&registry), tick.clone());

            let rooms = Arc::new(RoomManager::new(
                Arc::clone(&hot),
                Arc::clone(&durable),
                Arc::clone(&broadcaster),
                RoomConfig::default(),
            ));
            let games = Arc::new(GameManager::new(
                Arc::clone(&oracle),
                Arc::clone(&hot),
                Arc::clone(&durable),
                Arc::clone(&broadcaster),
                GameConfig::default(),
            ));
            let chat = Arc::new(ChatService::new(
                Arc::clone(&games),
                Arc::clone(&broadcaster),
                ChatConfig::default(),
            ));
            let engine: Arc<dyn BotEngine> = Arc::new(HeuristicEngine::new(Arc::clone(&oracle)));
            let bots = Arc::new(BotController::new(Arc::clone(&games), engine, MAX_ACTIVE_BOT_GAMES));

            broadcaster.wire(Arc::downgrade(&rooms), Arc::downgrade(&games), Arc::clone(&bots));

            Self {
                registry,
                sessions: Mutex::new(SessionManager::new(session_config)),
                auth,
                durable,
                rooms,
                games,
                chat,
                bots,
                broadcaster,
                tick,
            }
        })
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Validates `token` against the configured authenticator. Called once,
    /// by the connection handler, for the `IDENTIFY` handshake frame.
    pub async fn authenticate(&self, token: &str) -> Result<Identity, SessionError> {
        self.auth.authenticate(token).await
    }

    /// Registers a session for a just-identified connection.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the user already has a live
    /// session — the handler must close the new socket rather than call
    /// this again.
    pub async fn create_session(&self, user_id: UserId, provider: String) -> Result<(), SessionError> {
        self.sessions.lock().await.create(user_id, provider)?;
        Ok(())
    }

    pub async fn record_heartbeat(&self, user_id: &UserId) -> Result<(), SessionError> {
        self.sessions.lock().await.record_heartbeat(user_id)
    }

    pub async fn record_message(&self, user_id: &UserId) -> Result<(), SessionError> {
        self.sessions.lock().await.record_message(user_id)
    }

    /// Returns every user whose session has missed its heartbeat window,
    /// for the periodic sweep to close.
    pub async fn stale_user_ids(&self) -> Vec<UserId> {
        self.sessions.lock().await.stale_sessions()
    }

    /// Called once a socket closes, whatever the reason. Tears down the
    /// session and lets the Room Service start the disconnect-grace clock.
    pub async fn handle_disconnect(self: &Arc<Self>, user_id: &UserId) {
        self.sessions.lock().await.remove(user_id);
        self.registry.unregister(user_id).await;
        self.chat.forget_limiter(user_id).await;
        match self.rooms.handle_disconnect(user_id).await {
            Ok(DisconnectOutcome::WasIdle) => {}
            Ok(DisconnectOutcome::GraceStarted { room_id, .. }) => {
                tracing::info!(%user_id, %room_id, "disconnect grace period started");
            }
            Err(err) => tracing::warn!(%user_id, %err, "handle_disconnect failed"),
        }
    }

    async fn handle_tick_due(&self, game_id: GameId) {
        match self.games.tick(&game_id).await {
            Ok(TickOutcome::Continued) => {
                if let Ok(game) = self.games.snapshot(&game_id).await {
                    let user_ids: Vec<UserId> = game.players.iter().map(|p| p.user_id.clone()).collect();
                    self.registry
                        .send_to_many(
                            user_ids.iter(),
                            &ServerMessage::TimerUpdate {
                                game_id: game_id.clone(),
                                white_secs: game.clocks.white_secs,
                                black_secs: game.clocks.black_secs,
                            },
                        )
                        .await;
                }
            }
            Ok(TickOutcome::TimedOut(game)) => {
                if let Some(winner) = &game.winner_user_id {
                    if let Some(loser_color) = game.opponent_of(winner).and_then(|loser| game.color_of(loser)) {
                        let user_ids: Vec<UserId> = game.players.iter().map(|p| p.user_id.clone()).collect();
                        self.registry
                            .send_to_many(user_ids.iter(), &ServerMessage::TimeOut { color: loser_color })
                            .await;
                    }
                }
                self.games.retire(&game_id).await;
            }
            Err(err) => tracing::debug!(%game_id, %err, "tick against a game that is already gone"),
        }
    }

    /// Fetches the durable user record for `user_id`, creating a fresh
    /// one (default ELO, not banned) the first time this user is seen.
    async fn load_or_create_user(&self, user_id: &UserId) -> Result<User, ChessCoreError> {
        if let Some(user) = self.durable.get_user(user_id).await.map_err(chess_room::RoomError::from)? {
            return Ok(user);
        }
        let user = User::new(user_id.clone(), user_id.as_str());
        self.durable.upsert_user(user.clone()).await.map_err(chess_room::RoomError::from)?;
        Ok(user)
    }

    /// Seeds a room and game pitting `user_id` against the reserved bot
    /// identity, through the same `create_room`/`join_room` path two
    /// humans take. Not reachable from the wire protocol — `ClientMessage`
    /// has no bot-opponent variant — exposed as a library entry point for
    /// a deployment's own out-of-band surface (e.g. a "practice" button
    /// wired outside this crate's dispatcher).
    pub async fn start_bot_game(self: &Arc<Self>, user_id: UserId, difficulty: BotDifficulty) -> Result<(), ChessCoreError> {
        let user = self.load_or_create_user(&user_id).await?;
        let room = self.rooms.create_room(&user, RoomType::Public, None).await?;
        let bot_user = self.load_or_create_user(&UserId::from(BOT_USER_ID)).await?;
        let outcome = self.rooms.join_room(&bot_user, &room.id, None).await?;

        let game = self.games.start(&outcome.room, chess_protocol::TimeControl::default()).await?;
        self.tick.register(game.id.clone());
        self.broadcaster.register_bot_game(game.id.clone(), difficulty).await;
        self.bots.register(game.id.clone()).await?;

        self.registry
            .send(&user_id, &ServerMessage::RoomUpdated { room: outcome.room, game: Some(game) })
            .await;
        Ok(())
    }

    /// Routes one decoded client message. Domain errors are translated to
    /// the matching wire error message and sent back to `user_id` rather
    /// than propagated — only session-layer misuse (caught upstream, in
    /// the connection handler) closes the socket.
    pub async fn dispatch(self: &Arc<Self>, user_id: &UserId, msg: ClientMessage) {
        match msg {
            ClientMessage::CreateRoom { room_type, invite_code } => self.on_create_room(user_id, room_type, invite_code).await,
            ClientMessage::JoinRoom { room_id, invite_code } => {
                self.on_join_room(user_id, room_id, invite_code.as_deref()).await
            }
            ClientMessage::LeaveRoom { room_id } => self.on_leave_room(user_id, room_id).await,
            ClientMessage::JoinQueue { is_guest } => self.on_join_queue(user_id, is_guest).await,
            ClientMessage::LeaveQueue => self.on_leave_queue(user_id).await,
            ClientMessage::RequestRejoin { game_id } => self.on_request_rejoin(user_id, game_id).await,
            ClientMessage::MakeMove { game_id, mv } => {
                self.on_make_move(user_id, game_id, mv.from, mv.to, mv.promotion).await
            }
            ClientMessage::GetLegalMoves { game_id, square } => self.on_get_legal_moves(user_id, game_id, square).await,
            ClientMessage::Resign { game_id } => self.on_resign(user_id, game_id).await,
            ClientMessage::OfferDraw { game_id } => self.on_offer_draw(user_id, game_id).await,
            ClientMessage::AcceptDraw { game_id } => self.on_respond_draw(user_id, game_id, true).await,
            ClientMessage::DeclineDraw { game_id } => self.on_respond_draw(user_id, game_id, false).await,
            ClientMessage::ChatMessage { game_id, text } => self.on_chat_message(user_id, game_id, text).await,
            ClientMessage::Typing { game_id } => self.chat.typing(game_id, user_id.clone(), true).await,
            ClientMessage::LoadGame { game_id } => self.on_load_game(user_id, game_id).await,
        }
    }

    async fn on_create_room(&self, user_id: &UserId, room_type: RoomType, invite_code: Option<String>) {
        let user = match self.load_or_create_user(user_id).await {
            Ok(user) => user,
            Err(err) => return self.send_error(user_id, err).await,
        };
        match self.rooms.create_room(&user, room_type, invite_code).await {
            Ok(room) => {
                self.registry.send(user_id, &ServerMessage::RoomCreated { room }).await;
            }
            Err(err) => self.send_room_error(user_id, err).await,
        }
    }

    async fn on_join_room(&self, user_id: &UserId, room_id: RoomId, invite_code: Option<&str>) {
        let user = match self.load_or_create_user(user_id).await {
            Ok(user) => user,
            Err(err) => return self.send_error(user_id, err).await,
        };
        let outcome = match self.rooms.join_room(&user, &room_id, invite_code).await {
            Ok(outcome) => outcome,
            Err(err) => return self.send_room_error(user_id, err).await,
        };

        let game = match self.games.start(&outcome.room, chess_protocol::TimeControl::default()).await {
            Ok(game) => game,
            Err(err) => return self.send_error(user_id, err).await,
        };
        self.tick.register(game.id.clone());

        let user_ids: Vec<UserId> = outcome.room.players.iter().map(|p| p.user_id.clone()).collect();
        self.registry
            .send_to_many(user_ids.iter(), &ServerMessage::RoomUpdated { room: outcome.room, game: Some(game) })
            .await;
    }

    async fn on_leave_room(&self, user_id: &UserId, room_id: RoomId) {
        match self.rooms.leave_room(user_id, &room_id).await {
            Ok(()) => self.registry.send(user_id, &ServerMessage::LeaveRoom { room_id }).await,
            Err(err) => self.send_room_error(user_id, err).await,
        }
    }

    async fn on_join_queue(self: &Arc<Self>, user_id: &UserId, is_guest: bool) {
        let user = match self.load_or_create_user(user_id).await {
            Ok(user) => user,
            Err(err) => return self.send_error(user_id, err).await,
        };
        let outcome = match self.rooms.join_queue(&user, is_guest).await {
            Ok(outcome) => outcome,
            Err(err) => return self.send_room_error(user_id, err).await,
        };

        let QueueOutcome::Matched(join) = outcome else {
            return;
        };
        let game = match self.games.start(&join.room, chess_protocol::TimeControl::default()).await {
            Ok(game) => game,
            Err(err) => return self.send_error(user_id, err).await,
        };
        self.tick.register(game.id.clone());

        let user_ids: Vec<UserId> = join.room.players.iter().map(|p| p.user_id.clone()).collect();
        self.registry
            .send_to_many(user_ids.iter(), &ServerMessage::RoomUpdated { room: join.room, game: Some(game) })
            .await;
    }

    async fn on_leave_queue(self: &Arc<Self>, user_id: &UserId) {
        match self.rooms.leave_queue(user_id).await {
            Ok(()) => self.registry.send(user_id, &ServerMessage::QueueLeft).await,
            Err(err) => self.send_room_error(user_id, err).await,
        }
    }

    async fn on_request_rejoin(&self, user_id: &UserId, game_id: GameId) {
        match self.rooms.handle_rejoin(user_id, &game_id).await {
            Ok(game) => {
                self.tick.register(game.id.clone());
                self.registry.send(user_id, &ServerMessage::RejoinGame { game }).await;
            }
            Err(err) => self.send_room_error(user_id, err).await,
        }
    }

    async fn on_make_move(self: &Arc<Self>, user_id: &UserId, game_id: GameId, from: String, to: String, promotion: Option<String>) {
        match self.games.make_move(&game_id, user_id.clone(), from, to, promotion).await {
            Ok(game) => self.maybe_retire(&game).await,
            Err(chess_game::GameError::TooManyInvalidMoves(offender)) => {
                self.ban_user(&offender).await;
            }
            Err(chess_game::GameError::NotFound(game_id)) => {
                self.registry.send(user_id, &ServerMessage::GameNotFound { game_id }).await;
            }
            Err(err) => self.send_error(user_id, err).await,
        }
    }

    async fn on_get_legal_moves(&self, user_id: &UserId, game_id: GameId, square: String) {
        match self.games.legal_destinations(&game_id, square.clone()).await {
            Ok(destinations) => {
                self.registry
                    .send(user_id, &ServerMessage::LegalMovesUpdate { square, destinations })
                    .await;
            }
            Err(err) => self.send_error(user_id, err).await,
        }
    }

    async fn on_resign(self: &Arc<Self>, user_id: &UserId, game_id: GameId) {
        match self.games.resign(&game_id, user_id.clone()).await {
            Ok(game) => {
                let display_name = game
                    .color_of(user_id)
                    .map(|color| game.player(color).display_name.clone())
                    .unwrap_or_else(|| user_id.to_string());
                let user_ids: Vec<UserId> = game.players.iter().map(|p| p.user_id.clone()).collect();
                self.registry
                    .send_to_many(user_ids.iter(), &ServerMessage::PlayerResigned { display_name })
                    .await;
                self.maybe_retire(&game).await;
            }
            Err(err) => self.send_error(user_id, err).await,
        }
    }

    async fn on_offer_draw(&self, user_id: &UserId, game_id: GameId) {
        if let Err(err) = self.games.offer_draw(&game_id, user_id.clone()).await {
            self.send_error(user_id, err).await;
        }
    }

    async fn on_respond_draw(self: &Arc<Self>, user_id: &UserId, game_id: GameId, accept: bool) {
        match self.games.respond_draw(&game_id, user_id.clone(), accept).await {
            Ok(game) => {
                if accept {
                    let user_ids: Vec<UserId> = game.players.iter().map(|p| p.user_id.clone()).collect();
                    self.registry.send_to_many(user_ids.iter(), &ServerMessage::DrawAccepted).await;
                }
                self.maybe_retire(&game).await;
            }
            Err(err) => self.send_error(user_id, err).await,
        }
    }

    async fn on_chat_message(&self, user_id: &UserId, game_id: GameId, text: String) {
        if let Err(err) = self.chat.send(&game_id, user_id.clone(), text).await {
            self.send_error(user_id, err).await;
        }
    }

    async fn on_load_game(&self, user_id: &UserId, game_id: GameId) {
        match self.games.load(&game_id, user_id).await {
            Ok(game) => self.registry.send(user_id, &ServerMessage::GameLoaded { game }).await,
            Err(chess_game::GameError::InvalidId(game_id)) => {
                self.registry
                    .send(user_id, &ServerMessage::InvalidGameId { game_id })
                    .await
            }
            Err(chess_game::GameError::NotFound(game_id)) => {
                self.registry.send(user_id, &ServerMessage::GameNotFound { game_id }).await
            }
            Err(chess_game::GameError::NotParticipant(_, _)) => {
                self.registry
                    .send(user_id, &ServerMessage::Unauthorized { reason: "not a participant in this game".into() })
                    .await
            }
            Err(err) => {
                self.registry
                    .send(user_id, &ServerMessage::LoadGameError { reason: err.to_string() })
                    .await
            }
        }
    }

    /// Per the Game Service's own contract, the caller of any operation
    /// that may end a game is responsible for retiring its actor handle
    /// once it is done reacting to the terminal state.
    async fn maybe_retire(&self, game: &chess_protocol::Game) {
        if game.status.is_terminal() {
            self.games.retire(&game.id).await;
        }
    }

    async fn ban_user(&self, user_id: &UserId) {
        if let Ok(Some(mut user)) = self.durable.get_user(user_id).await {
            user.banned = true;
            let _ = self.durable.upsert_user(user).await;
        }
        self.registry
            .send(user_id, &ServerMessage::Error { message: "Banned for Illegal moves.".into() })
            .await;
    }

    async fn send_error(&self, user_id: &UserId, err: impl std::fmt::Display) {
        self.registry.send(user_id, &ServerMessage::Error { message: err.to_string() }).await;
    }

    async fn send_room_error(&self, user_id: &UserId, err: chess_room::RoomError) {
        self.send_error(user_id, err).await;
    }
}
