//! Game service: starts games from matched rooms and routes per-game
//! operations to the right actor.

use std::collections::HashMap;
use std::sync::Arc;

use chess_protocol::{Color, Game, GameId, GamePlayer, GameStatus, Room, TimeControl, UserId};
use chess_rules::RulesOracle;
use chess_store::{game_key, player_last_game_key, DurableStore, HotStore, HotStoreExt};
use std::time::Duration;

const LAST_GAME_TTL: Duration = Duration::from_secs(3600);
use tokio::sync::Mutex;

use crate::actor::{spawn_game, GameHandle, TickOutcome};
use crate::{GameConfig, GameError, GameEvents};

const CHANNEL_SIZE: usize = 64;

pub struct GameManager<R: RulesOracle, H: HotStore, D: DurableStore, E: GameEvents> {
    oracle: Arc<R>,
    hot: Arc<H>,
    durable: Arc<D>,
    events: Arc<E>,
    config: GameConfig,
    handles: Mutex<HashMap<GameId, GameHandle>>,
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl<R: RulesOracle, H: HotStore, D: DurableStore, E: GameEvents> GameManager<R, H, D, E> {
    pub fn new(oracle: Arc<R>, hot: Arc<H>, durable: Arc<D>, events: Arc<E>, config: GameConfig) -> Self {
        Self {
            oracle,
            hot,
            durable,
            events,
            config,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// `start`: builds the initial `Game` record from a just-activated room
    /// and spawns its actor. The game id is minted from the room id, since a
    /// room has at most one active game at a time.
    pub async fn start(&self, room: &Room, time_control: TimeControl) -> Result<Game, GameError> {
        let game_id = GameId::from(room.id.to_string());
        let mut players = Vec::with_capacity(2);
        for p in &room.players {
            let display_name = self
                .durable
                .get_user(&p.user_id)
                .await?
                .map(|u| u.display_name)
                .unwrap_or_else(|| p.user_id.to_string());
            players.push(GamePlayer {
                user_id: p.user_id.clone(),
                color: p.color,
                display_name,
            });
        }
        let [a, b]: [GamePlayer; 2] =
            players.try_into().map_err(|_| GameError::NotActive(game_id.clone()))?;
        let (white, black) = if a.color == Color::White { (a, b) } else { (b, a) };

        let game = Game {
            id: game_id.clone(),
            room_id: room.id.clone(),
            position: self.oracle.initial_position(),
            move_history: Vec::new(),
            clocks: chess_protocol::Clocks {
                white_secs: time_control.initial_secs,
                black_secs: time_control.initial_secs,
            },
            time_control,
            status: GameStatus::Active,
            players: [white, black],
            chat: Vec::new(),
            winner_user_id: None,
            created_at_ms: now_ms(),
        };

        self.durable.upsert_game(game.clone()).await?;
        self.hot.set_json(&game_key(&game_id), &game, None).await?;
        for player in &game.players {
            self.hot
                .set(
                    &player_last_game_key(&player.user_id),
                    game_id.to_string(),
                    Some(LAST_GAME_TTL),
                )
                .await?;
        }

        let handle = spawn_game(
            game.clone(),
            Arc::clone(&self.oracle),
            Arc::clone(&self.hot),
            Arc::clone(&self.durable),
            Arc::clone(&self.events),
            self.config,
            CHANNEL_SIZE,
        );
        self.handles.lock().await.insert(game_id.clone(), handle);

        tracing::info!(game_id = %game_id, "game started");
        Ok(game)
    }

    async fn handle(&self, game_id: &GameId) -> Result<GameHandle, GameError> {
        self.handles
            .lock()
            .await
            .get(game_id)
            .cloned()
            .ok_or_else(|| GameError::NotFound(game_id.clone()))
    }

    pub async fn make_move(
        &self,
        game_id: &GameId,
        user_id: UserId,
        from: String,
        to: String,
        promotion: Option<String>,
    ) -> Result<Game, GameError> {
        self.handle(game_id)
            .await?
            .make_move(game_id, user_id, from, to, promotion)
            .await
    }

    pub async fn legal_destinations(
        &self,
        game_id: &GameId,
        square: String,
    ) -> Result<Vec<String>, GameError> {
        self.handle(game_id).await?.legal_destinations(game_id, square).await
    }

    pub async fn resign(&self, game_id: &GameId, user_id: UserId) -> Result<Game, GameError> {
        self.handle(game_id).await?.resign(game_id, user_id).await
    }

    /// Called by the coordinator once a disconnected player's grace period
    /// expires with no reconnection. The opponent is declared the winner;
    /// the game's hot-store entries are purged rather than mirrored.
    pub async fn abandon(
        &self,
        game_id: &GameId,
        disconnected_user_id: UserId,
    ) -> Result<Game, GameError> {
        self.handle(game_id).await?.abandon(game_id, disconnected_user_id).await
    }

    pub async fn offer_draw(&self, game_id: &GameId, user_id: UserId) -> Result<(), GameError> {
        self.handle(game_id).await?.offer_draw(game_id, user_id).await
    }

    pub async fn respond_draw(
        &self,
        game_id: &GameId,
        user_id: UserId,
        accept: bool,
    ) -> Result<Game, GameError> {
        self.handle(game_id).await?.respond_draw(game_id, user_id, accept).await
    }

    pub async fn append_chat(
        &self,
        game_id: &GameId,
        entry: chess_protocol::ChatEntry,
    ) -> Result<(), GameError> {
        self.handle(game_id).await?.append_chat(game_id, entry).await
    }

    /// Called once per second, per active game, by the clock coordinator.
    /// A `TimedOut` result has already been persisted and reported through
    /// [`GameEvents::on_game_over`]; as with every other termination path,
    /// the caller is responsible for calling [`Self::retire`] once it has
    /// finished handling that notification.
    pub async fn tick(&self, game_id: &GameId) -> Result<TickOutcome, GameError> {
        self.handle(game_id).await?.tick(game_id).await
    }

    /// Returns the current snapshot with no participant check, asking the
    /// live actor if one is running, otherwise falling back to the hot and
    /// then durable store. For internal callers acting on a game rather
    /// than a specific player's behalf (the broadcaster, the bot
    /// controller, chat history) — client-facing reads go through
    /// [`Self::load`] instead.
    pub async fn snapshot(&self, game_id: &GameId) -> Result<Game, GameError> {
        if let Some(handle) = self.handles.lock().await.get(game_id).cloned() {
            return handle.snapshot(game_id).await;
        }
        if let Some(game) = self.hot.get_json::<Game>(&game_key(game_id)).await? {
            return Ok(game);
        }
        self.durable
            .get_game(game_id)
            .await?
            .ok_or_else(|| GameError::NotFound(game_id.clone()))
    }

    /// `load(gameId, playerId)`: the client-facing read behind `LOAD_GAME`.
    /// Rejects a blank game id as [`GameError::InvalidId`] before any
    /// lookup; a well-formed id with no matching record is
    /// [`GameError::NotFound`]; a record that exists but doesn't include
    /// `player_id` is [`GameError::NotParticipant`].
    pub async fn load(&self, game_id: &GameId, player_id: &UserId) -> Result<Game, GameError> {
        if game_id.as_str().trim().is_empty() {
            return Err(GameError::InvalidId(game_id.to_string()));
        }
        let game = self.snapshot(game_id).await?;
        if !game.is_participant(player_id) {
            return Err(GameError::NotParticipant(player_id.clone(), game_id.clone()));
        }
        Ok(game)
    }

    /// Drops the actor handle for a game that has reached a terminal
    /// status. The actor's mailbox closes once the last handle is dropped.
    pub async fn retire(&self, game_id: &GameId) {
        if let Some(handle) = self.handles.lock().await.remove(game_id) {
            handle.shutdown().await;
        }
    }

    pub async fn active_game_count(&self) -> usize {
        self.handles.lock().await.len()
    }
}
