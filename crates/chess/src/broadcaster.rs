//! The `Broadcaster`: the single type that implements every sub-crate's
//! event sink trait and turns their callbacks into wire messages pushed
//! through the [`ConnectionRegistry`].
//!
//! Room Service and Game Service each hold an `Arc<Broadcaster>` as their
//! event sink, and the `Broadcaster` needs to call back into both of them
//! (to force-close a room, to load a game snapshot, to retire a finished
//! game) — a reference cycle. It is broken the usual way: the cyclic
//! side holds a `Weak` behind a `OnceLock`, filled in once after both
//! sides exist.
//!
//! Bot Controller is not part of the cycle — it only holds a strong
//! `Arc<GameManager<...>>` and never calls back into the `Broadcaster` —
//! so it is stored as a plain `Arc` once wiring completes.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use chess_bot::{BotController, BotDifficulty};
use chess_chat::ChatEvents;
use chess_game::{GameEvents, GameManager};
use chess_protocol::{ChatEntry, Color, Game, GameId, RoomId, ServerMessage, UserId, BOT_USER_ID};
use chess_room::{RoomEvents, RoomManager};
use tokio::sync::Mutex;

use crate::registry::ConnectionRegistry;
use crate::tick_loop::TickHandle;
use crate::{Durable, Hot, Oracle};

type Rooms = RoomManager<Hot, Durable, Broadcaster>;
type Games = GameManager<Oracle, Hot, Durable, Broadcaster>;
type Bots = BotController<Oracle, Hot, Durable, Broadcaster>;

pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    tick: TickHandle,
    rooms: OnceLock<Weak<Rooms>>,
    games: OnceLock<Weak<Games>>,
    bots: OnceLock<Arc<Bots>>,
    bot_difficulty: Mutex<HashMap<GameId, BotDifficulty>>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>, tick: TickHandle) -> Arc<Self> {
        Arc::new(Self {
            registry,
            tick,
            rooms: OnceLock::new(),
            games: OnceLock::new(),
            bots: OnceLock::new(),
            bot_difficulty: Mutex::new(HashMap::new()),
        })
    }

    /// Completes the two-phase wiring once the Room Service, Game Service,
    /// and Bot Controller that hold this broadcaster as their event sink
    /// all exist. Must be called exactly once.
    pub fn wire(&self, rooms: Weak<Rooms>, games: Weak<Games>, bots: Arc<Bots>) {
        self.rooms.set(rooms).ok().expect("wire called twice");
        self.games.set(games).ok().expect("wire called twice");
        self.bots.set(bots).ok().expect("wire called twice");
    }

    /// Tracks which difficulty a bot-opponent game was started at, so
    /// `on_state_changed` can hand it to the bot controller without the
    /// game actor needing to know bots exist.
    pub async fn register_bot_game(&self, game_id: GameId, difficulty: BotDifficulty) {
        self.bot_difficulty.lock().await.insert(game_id, difficulty);
    }

    fn rooms(&self) -> Arc<Rooms> {
        self.rooms
            .get()
            .expect("broadcaster used before wire()")
            .upgrade()
            .expect("room service outlives the broadcaster")
    }

    fn games(&self) -> Arc<Games> {
        self.games
            .get()
            .expect("broadcaster used before wire()")
            .upgrade()
            .expect("game service outlives the broadcaster")
    }

    fn bots(&self) -> Arc<Bots> {
        Arc::clone(self.bots.get().expect("broadcaster used before wire()"))
    }

    async fn is_bot_game(&self, game_id: &GameId) -> bool {
        self.bot_difficulty.lock().await.contains_key(game_id)
    }
}

/// Mirrors the game actor's own reading of whose turn it is from the FEN
/// `position` field, so the bot controller is only woken when it is
/// actually the bot's move.
fn side_to_move(fen: &str) -> Color {
    match fen.split_whitespace().nth(1) {
        Some("b") => Color::Black,
        _ => Color::White,
    }
}

impl RoomEvents for Broadcaster {
    async fn on_queue_timeout(&self, user_id: UserId) {
        self.registry.send(&user_id, &ServerMessage::QueueTimeout).await;
    }

    async fn on_grace_expired(&self, game_id: GameId, _room_id: RoomId, user_id: UserId) {
        match self.games().abandon(&game_id, user_id).await {
            Ok(_game) => self.games().retire(&game_id).await,
            Err(err) => tracing::debug!(%game_id, %err, "grace expiry raced a different game end"),
        }
    }
}

impl GameEvents for Broadcaster {
    async fn on_state_changed(&self, game: Game) {
        let user_ids: Vec<UserId> = game.players.iter().map(|p| p.user_id.clone()).collect();
        self.registry
            .send_to_many(user_ids.iter(), &ServerMessage::GameUpdated { game: game.clone() })
            .await;

        if !self.is_bot_game(&game.id).await {
            return;
        }
        let to_move = side_to_move(&game.position);
        if game.player(to_move).user_id.as_str() != BOT_USER_ID {
            return;
        }
        let difficulty = self
            .bot_difficulty
            .lock()
            .await
            .get(&game.id)
            .copied()
            .unwrap_or_default();
        self.bots().on_state_changed(game.id, difficulty);
    }

    async fn on_invalid_move(&self, _game_id: GameId, user_id: UserId, reason: String, attempt_count: u32) {
        self.registry
            .send(&user_id, &ServerMessage::IllegalMove { reason, attempt_count })
            .await;
    }

    async fn on_draw_offered(&self, game_id: GameId, from_user_id: UserId) {
        let Ok(game) = self.games().snapshot(&game_id).await else {
            return;
        };
        if let Some(opponent) = game.opponent_of(&from_user_id) {
            self.registry
                .send(opponent, &ServerMessage::DrawOffered { from_user_id: from_user_id.clone() })
                .await;
        }
        self.registry.send(&from_user_id, &ServerMessage::DrawOfferSent).await;
    }

    async fn on_draw_declined(&self, game_id: GameId, by_user_id: UserId) {
        let Ok(game) = self.games().snapshot(&game_id).await else {
            return;
        };
        if let Some(offeror) = game.opponent_of(&by_user_id) {
            self.registry.send(offeror, &ServerMessage::DrawDeclined).await;
        }
    }

    async fn on_chat_message(&self, game_id: GameId, _entry: ChatEntry) {
        let Ok(game) = self.games().snapshot(&game_id).await else {
            return;
        };
        let user_ids: Vec<UserId> = game.players.iter().map(|p| p.user_id.clone()).collect();
        self.registry
            .send_to_many(user_ids.iter(), &ServerMessage::GameUpdated { game })
            .await;
    }

    async fn on_game_over(&self, game: Game, room_id: RoomId) {
        self.tick.unregister(game.id.clone());

        // The room's `Closed` status already landed durably as part of the
        // same transaction that finalized `game` — this only clears the
        // room's in-memory and hot-store bookkeeping.
        self.rooms().evict_closed_room(&room_id).await;

        let user_ids: Vec<UserId> = game.players.iter().map(|p| p.user_id.clone()).collect();
        self.registry
            .send_to_many(user_ids.iter(), &ServerMessage::GameUpdated { game: game.clone() })
            .await;

        if self.bot_difficulty.lock().await.remove(&game.id).is_some() {
            self.bots().unregister(&game.id).await;
        }
    }
}

impl ChatEvents for Broadcaster {
    async fn on_typing(&self, game_id: GameId, user_id: UserId, _is_typing: bool) {
        let Ok(game) = self.games().snapshot(&game_id).await else {
            return;
        };
        if let Some(opponent) = game.opponent_of(&user_id) {
            self.registry
                .send(opponent, &ServerMessage::Typing { from_user_id: user_id.clone() })
                .await;
        }
    }
}
