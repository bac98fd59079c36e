//! The room manager: room creation, matchmaking queues, rejoin, and
//! disconnect handling.
//!
//! Rooms and the player→room index are owned in-memory by this manager,
//! behind a map of handles; the hot and durable stores are the
//! cross-component replica, not the synchronization primitive.
//! Matchmaking queues live in the hot store
//! directly (its list operations are the linearizable primitive this needs),
//! so two racing `joinQueue` calls can't both observe an empty slot.
//!
//! A room and its eventual game share one id: the Game Service mints a
//! game's id from its room's id (`GameId::from(room_id.as_str())`), since
//! at most one active game exists per room at a time. This manager relies
//! on that convention to recover a game id from a room it owns.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use chess_protocol::{
    Color, Game, GameId, GameStatus, Room, RoomId, RoomPlayer, RoomStatus, RoomType, User, UserId,
    UserStatus,
};
use chess_store::{
    player_queue_key, player_status_key, room_key, DurableOp, DurableStore, HotStore,
    HotStoreExt, Transaction, GUEST_QUEUE_KEY, RATED_QUEUE_KEY,
};

use crate::{RoomConfig, RoomError, RoomEvents};

/// Result of a successful room join (direct `JOIN_ROOM` or matchmaker
/// pairing). The caller broadcasts `ROOM_UPDATED` and starts the game.
#[derive(Debug, Clone)]
pub struct RoomJoinOutcome {
    pub room: Room,
}

#[derive(Debug, Clone)]
pub enum QueueOutcome {
    Queued,
    Matched(RoomJoinOutcome),
}

#[derive(Debug, Clone)]
pub enum DisconnectOutcome {
    /// The user was idle (not in a room); queues were cleared.
    WasIdle,
    /// The user was seated in a room; the grace period has started.
    GraceStarted {
        room_id: RoomId,
        game_id: Option<GameId>,
    },
}

struct Inner {
    rooms: HashMap<RoomId, Room>,
    player_rooms: HashMap<UserId, RoomId>,
    queue_tasks: HashMap<UserId, JoinHandle<()>>,
    grace_tasks: HashMap<UserId, JoinHandle<()>>,
}

pub struct RoomManager<H: HotStore, D: DurableStore, E: RoomEvents> {
    hot: Arc<H>,
    durable: Arc<D>,
    events: Arc<E>,
    config: RoomConfig,
    inner: Mutex<Inner>,
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn generate_invite_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();
    (0..6)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

fn generate_room_id() -> RoomId {
    let mut rng = rand::rng();
    let bytes: [u8; 8] = rng.random();
    RoomId::from(format!(
        "room_{}",
        bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
    ))
}

fn game_id_for_room(room_id: &RoomId) -> GameId {
    GameId::from(room_id.to_string())
}

impl<H: HotStore, D: DurableStore, E: RoomEvents> RoomManager<H, D, E> {
    pub fn new(hot: Arc<H>, durable: Arc<D>, events: Arc<E>, config: RoomConfig) -> Self {
        Self {
            hot,
            durable,
            events,
            config,
            inner: Mutex::new(Inner {
                rooms: HashMap::new(),
                player_rooms: HashMap::new(),
                queue_tasks: HashMap::new(),
                grace_tasks: HashMap::new(),
            }),
        }
    }

    async fn mirror_room_to_hot(&self, room: &Room) -> Result<(), RoomError> {
        self.hot.set_json(&room_key(&room.id), room, None).await?;
        Ok(())
    }

    async fn set_status_hot(&self, user_id: &UserId, status: &str, ttl: Option<std::time::Duration>) -> Result<(), RoomError> {
        self.hot.set(&player_status_key(user_id), status.to_string(), ttl).await?;
        Ok(())
    }

    /// `createRoom`.
    pub async fn create_room(
        &self,
        user: &User,
        room_type: RoomType,
        invite_code: Option<String>,
    ) -> Result<Room, RoomError> {
        if user.banned {
            return Err(RoomError::Banned(user.id.clone()));
        }

        let invite_code = match room_type {
            RoomType::Private => Some(invite_code.unwrap_or_else(generate_invite_code)),
            RoomType::Public => None,
        };

        let room = Room {
            id: generate_room_id(),
            room_type,
            status: RoomStatus::Open,
            players: vec![RoomPlayer {
                user_id: user.id.clone(),
                color: Color::Unset,
            }],
            invite_code,
            created_at_ms: now_ms(),
        };

        let mut waiting_user = user.clone();
        waiting_user.status = UserStatus::Waiting;
        self.set_status_hot(&user.id, "WAITING", None).await?;
        self.durable.upsert_user(waiting_user).await?;
        self.mirror_room_to_hot(&room).await?;
        self.durable.upsert_room(room.clone()).await?;

        let mut inner = self.inner.lock().await;
        inner.player_rooms.insert(user.id.clone(), room.id.clone());
        inner.rooms.insert(room.id.clone(), room.clone());

        tracing::info!(room_id = %room.id, user_id = %user.id, "room created");
        Ok(room)
    }

    /// `joinRoom`.
    pub async fn join_room(
        &self,
        user: &User,
        room_id: &RoomId,
        invite_code: Option<&str>,
    ) -> Result<RoomJoinOutcome, RoomError> {
        if user.banned {
            return Err(RoomError::Banned(user.id.clone()));
        }

        let mut room = {
            let inner = self.inner.lock().await;
            inner
                .rooms
                .get(room_id)
                .cloned()
                .ok_or_else(|| RoomError::NotFound(room_id.clone()))?
        };

        if room.status != RoomStatus::Open {
            return Err(RoomError::NotOpen(room_id.clone()));
        }
        if room.room_type == RoomType::Private && room.invite_code.as_deref() != invite_code {
            return Err(RoomError::InviteCodeMismatch(room_id.clone()));
        }
        if room.has_player(&user.id) {
            return Err(RoomError::AlreadyInRoom(user.id.clone(), room_id.clone()));
        }
        if room.is_full() {
            return Err(RoomError::RoomFull(room_id.clone()));
        }

        let joiner_is_white = rand::rng().random_bool(0.5);
        for player in room.players.iter_mut() {
            player.color = if joiner_is_white { Color::Black } else { Color::White };
        }
        let first_user_id = room.players[0].user_id.clone();
        room.players.push(RoomPlayer {
            user_id: user.id.clone(),
            color: if joiner_is_white { Color::White } else { Color::Black },
        });
        room.status = RoomStatus::Active;

        let mut ops = vec![DurableOp::UpsertRoom(room.clone())];
        let mut joiner = user.clone();
        joiner.status = UserStatus::InGame;
        ops.push(DurableOp::UpsertUser(joiner));
        if let Some(mut first_user) = self.durable.get_user(&first_user_id).await? {
            first_user.status = UserStatus::InGame;
            ops.push(DurableOp::UpsertUser(first_user));
        }
        self.durable.transact(Transaction::new(ops)).await?;

        self.set_status_hot(&user.id, "IN_GAME", None).await?;
        self.set_status_hot(&first_user_id, "IN_GAME", None).await?;
        self.mirror_room_to_hot(&room).await?;

        let mut inner = self.inner.lock().await;
        inner.player_rooms.insert(user.id.clone(), room.id.clone());
        inner.rooms.insert(room.id.clone(), room.clone());
        drop(inner);

        tracing::info!(room_id = %room.id, user_id = %user.id, "room joined, now active");
        Ok(RoomJoinOutcome { room })
    }

    /// `leaveRoom`.
    pub async fn leave_room(&self, user_id: &UserId, room_id: &RoomId) -> Result<(), RoomError> {
        let mut inner = self.inner.lock().await;
        let room = inner
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        if !room.has_player(user_id) {
            return Err(RoomError::NotInRoom(user_id.clone(), room_id.clone()));
        }
        room.players.retain(|p| &p.user_id != user_id);
        inner.player_rooms.remove(user_id);

        if room.players.is_empty() {
            room.status = RoomStatus::Closed;
            let closed = room.clone();
            inner.rooms.remove(room_id);
            drop(inner);
            self.hot.delete(&room_key(room_id)).await?;
            self.durable.upsert_room(closed).await?;
        } else {
            let updated = room.clone();
            drop(inner);
            self.mirror_room_to_hot(&updated).await?;
            self.durable.upsert_room(updated).await?;
        }
        Ok(())
    }

    /// Closes a room once its game has reached a terminal status, without
    /// a specific departing user to key off of (unlike [`Self::leave_room`],
    /// called by a player's own `LEAVE_ROOM`).
    pub async fn force_close(&self, room_id: &RoomId) -> Result<(), RoomError> {
        let mut inner = self.inner.lock().await;
        let Some(mut room) = inner.rooms.remove(room_id) else {
            return Ok(());
        };
        room.status = RoomStatus::Closed;
        for player in &room.players {
            inner.player_rooms.remove(&player.user_id);
        }
        drop(inner);

        self.hot.delete(&room_key(room_id)).await?;
        self.durable.upsert_room(room).await?;
        tracing::info!(room_id = %room_id, "room force-closed");
        Ok(())
    }

    /// Drops a room's in-memory and hot-store bookkeeping once its Closed
    /// status has already landed durably as part of the same transaction
    /// that finalized its game — unlike [`Self::force_close`], this never
    /// touches the durable store, so it can't race or double-write that
    /// commit. Called by the coordinator's `on_game_over` handler.
    pub async fn evict_closed_room(&self, room_id: &RoomId) {
        let mut inner = self.inner.lock().await;
        if let Some(room) = inner.rooms.remove(room_id) {
            for player in &room.players {
                inner.player_rooms.remove(&player.user_id);
            }
        }
        drop(inner);

        if let Err(err) = self.hot.delete(&room_key(room_id)).await {
            tracing::warn!(room_id = %room_id, %err, "failed to evict closed room from hot store");
        }
    }

    /// `joinQueue`. Takes `self: &Arc<Self>` because the 60-second timeout
    /// is a task that calls back into this manager.
    pub async fn join_queue(
        self: &Arc<Self>,
        user: &User,
        is_guest: bool,
    ) -> Result<QueueOutcome, RoomError> {
        let queue_key = if is_guest { GUEST_QUEUE_KEY } else { RATED_QUEUE_KEY };
        if self.hot.get(&player_queue_key(&user.id)).await?.is_some() {
            return Err(RoomError::AlreadyQueued(user.id.clone()));
        }

        self.hot.push_head(queue_key, user.id.to_string()).await?;
        self.hot.set(&player_queue_key(&user.id), queue_key.to_string(), None).await?;
        let mut waiting_user = user.clone();
        waiting_user.status = UserStatus::Waiting;
        self.set_status_hot(&user.id, "WAITING", None).await?;
        self.durable.upsert_user(waiting_user).await?;

        self.spawn_queue_timeout(user.id.clone()).await;

        let matched = if is_guest {
            self.try_match_guest().await?
        } else {
            self.try_match_rated(&user.id, user.elo).await?
        };

        Ok(match matched {
            Some(outcome) => QueueOutcome::Matched(outcome),
            None => QueueOutcome::Queued,
        })
    }

    /// `leaveQueue`.
    pub async fn leave_queue(self: &Arc<Self>, user_id: &UserId) -> Result<(), RoomError> {
        self.hot.remove_value(GUEST_QUEUE_KEY, user_id.as_str()).await?;
        self.hot.remove_value(RATED_QUEUE_KEY, user_id.as_str()).await?;
        self.hot.delete(&player_queue_key(user_id)).await?;
        if let Some(mut user) = self.durable.get_user(user_id).await? {
            user.status = UserStatus::Online;
            self.set_status_hot(user_id, "ONLINE", None).await?;
            self.durable.upsert_user(user).await?;
        }
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.queue_tasks.remove(user_id) {
            handle.abort();
        }
        Ok(())
    }

    async fn try_match_guest(&self) -> Result<Option<RoomJoinOutcome>, RoomError> {
        let Some((a, b)) = self.hot.pop_two_heads(GUEST_QUEUE_KEY).await? else {
            return Ok(None);
        };
        let a = UserId::from(a);
        let b = UserId::from(b);
        match self.pair_users(&a, &b).await {
            Ok(outcome) => Ok(Some(outcome)),
            Err(err) => {
                tracing::warn!(%err, "guest match failed, returning both players to the queue");
                self.hot.push_head(GUEST_QUEUE_KEY, a.to_string()).await.ok();
                self.hot.push_head(GUEST_QUEUE_KEY, b.to_string()).await.ok();
                Err(err)
            }
        }
    }

    async fn try_match_rated(
        &self,
        requester: &UserId,
        requester_elo: i32,
    ) -> Result<Option<RoomJoinOutcome>, RoomError> {
        let queued = self.hot.snapshot(RATED_QUEUE_KEY).await?;
        for candidate in queued.iter() {
            if candidate == requester.as_str() {
                continue;
            }
            let candidate_id = UserId::from(candidate.clone());
            let Some(candidate_user) = self.durable.get_user(&candidate_id).await? else {
                continue;
            };
            if (candidate_user.elo - requester_elo).abs() <= self.config.rated_elo_window {
                self.hot.remove_value(RATED_QUEUE_KEY, requester.as_str()).await?;
                self.hot.remove_value(RATED_QUEUE_KEY, candidate).await?;
                return Ok(Some(self.pair_users(requester, &candidate_id).await?));
            }
        }
        Ok(None)
    }

    async fn pair_users(&self, a: &UserId, b: &UserId) -> Result<RoomJoinOutcome, RoomError> {
        let user_a = self
            .durable
            .get_user(a)
            .await?
            .unwrap_or_else(|| User::new(a.clone(), a.as_str()));
        let user_b = self
            .durable
            .get_user(b)
            .await?
            .unwrap_or_else(|| User::new(b.clone(), b.as_str()));

        let a_is_white = rand::rng().random_bool(0.5);
        let room = Room {
            id: generate_room_id(),
            room_type: RoomType::Public,
            status: RoomStatus::Active,
            players: vec![
                RoomPlayer {
                    user_id: a.clone(),
                    color: if a_is_white { Color::White } else { Color::Black },
                },
                RoomPlayer {
                    user_id: b.clone(),
                    color: if a_is_white { Color::Black } else { Color::White },
                },
            ],
            invite_code: None,
            created_at_ms: now_ms(),
        };

        let mut ops = vec![DurableOp::UpsertRoom(room.clone())];
        for mut user in [user_a, user_b] {
            user.status = UserStatus::InGame;
            self.hot.delete(&player_queue_key(&user.id)).await?;
            self.set_status_hot(&user.id, "IN_GAME", None).await?;
            ops.push(DurableOp::UpsertUser(user));
        }
        self.durable.transact(Transaction::new(ops)).await?;
        self.mirror_room_to_hot(&room).await?;

        let mut inner = self.inner.lock().await;
        for id in [a, b] {
            inner.player_rooms.insert(id.clone(), room.id.clone());
            if let Some(handle) = inner.queue_tasks.remove(id) {
                handle.abort();
            }
        }
        inner.rooms.insert(room.id.clone(), room.clone());
        drop(inner);

        tracing::info!(room_id = %room.id, a = %a, b = %b, "matchmaker paired players");
        Ok(RoomJoinOutcome { room })
    }

    async fn spawn_queue_timeout(self: &Arc<Self>, user_id: UserId) {
        let this = Arc::clone(self);
        let timeout = self.config.queue_timeout;
        let uid = user_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if this.hot.get(&player_queue_key(&uid)).await.ok().flatten().is_some() {
                let _ = this.leave_queue(&uid).await;
                this.events.on_queue_timeout(uid).await;
            }
        });
        self.inner.lock().await.queue_tasks.insert(user_id, handle);
    }

    /// `handleRejoin`. Reads the game record (hot store first, durable on
    /// miss) and re-admits the user without touching game state directly —
    /// the coordinator binds the socket and re-registers with the tick
    /// scheduler.
    pub async fn handle_rejoin(&self, user_id: &UserId, game_id: &GameId) -> Result<Game, RoomError> {
        let game = match self.hot.get_json::<Game>(&chess_store::game_key(game_id)).await? {
            Some(g) => g,
            None => self
                .durable
                .get_game(game_id)
                .await?
                .ok_or_else(|| RoomError::NotFound(RoomId::from(game_id.to_string())))?,
        };
        if !game.is_participant(user_id) {
            return Err(RoomError::NotInRoom(user_id.clone(), game.room_id.clone()));
        }
        if game.status != GameStatus::Active {
            return Err(RoomError::GameNotActive(game.room_id.clone()));
        }

        {
            let mut inner = self.inner.lock().await;
            if let Some(handle) = inner.grace_tasks.remove(user_id) {
                handle.abort();
            }
            inner.player_rooms.insert(user_id.clone(), game.room_id.clone());
        }

        if let Some(mut user) = self.durable.get_user(user_id).await? {
            user.status = UserStatus::InGame;
            self.set_status_hot(user_id, "IN_GAME", None).await?;
            self.durable.upsert_user(user).await?;
        }

        tracing::info!(%user_id, game_id = %game_id, "player rejoined");
        Ok(game)
    }

    /// `handleDisconnect`.
    pub async fn handle_disconnect(
        self: &Arc<Self>,
        user_id: &UserId,
    ) -> Result<DisconnectOutcome, RoomError> {
        self.hot.remove_value(GUEST_QUEUE_KEY, user_id.as_str()).await?;
        self.hot.remove_value(RATED_QUEUE_KEY, user_id.as_str()).await?;
        self.hot.delete(&player_queue_key(user_id)).await?;
        {
            let mut inner = self.inner.lock().await;
            if let Some(handle) = inner.queue_tasks.remove(user_id) {
                handle.abort();
            }
        }

        let room_id = {
            let inner = self.inner.lock().await;
            inner.player_rooms.get(user_id).cloned()
        };

        let Some(room_id) = room_id else {
            if let Some(mut user) = self.durable.get_user(user_id).await? {
                user.status = UserStatus::Offline;
                self.set_status_hot(user_id, "OFFLINE", None).await?;
                self.durable.upsert_user(user).await?;
            }
            return Ok(DisconnectOutcome::WasIdle);
        };

        if let Some(mut user) = self.durable.get_user(user_id).await? {
            user.status = UserStatus::Disconnected;
            self.set_status_hot(user_id, "DISCONNECTED", Some(self.config.disconnect_grace)).await?;
            self.durable.upsert_user(user).await?;
        }

        let game_id = {
            let inner = self.inner.lock().await;
            inner
                .rooms
                .get(&room_id)
                .filter(|r| r.status == RoomStatus::Active)
                .map(|_| game_id_for_room(&room_id))
        };

        self.spawn_grace_task(user_id.clone(), room_id.clone(), game_id.clone()).await;

        Ok(DisconnectOutcome::GraceStarted { room_id, game_id })
    }

    async fn spawn_grace_task(
        self: &Arc<Self>,
        user_id: UserId,
        room_id: RoomId,
        game_id: Option<GameId>,
    ) {
        let this = Arc::clone(self);
        let grace = self.config.disconnect_grace;
        let uid = user_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let still_disconnected = matches!(
                this.hot.get(&player_status_key(&uid)).await,
                Ok(Some(status)) if status == "DISCONNECTED"
            );
            if still_disconnected {
                if let Some(game_id) = game_id {
                    this.events.on_grace_expired(game_id, room_id, uid).await;
                }
            }
        });
        self.inner.lock().await.grace_tasks.insert(user_id, handle);
    }

    pub async fn player_room(&self, user_id: &UserId) -> Option<RoomId> {
        self.inner.lock().await.player_rooms.get(user_id).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.inner.lock().await.rooms.len()
    }

    pub async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        self.inner.lock().await.rooms.get(room_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_store::{InMemoryDurableStore, InMemoryHotStore};

    struct NoopEvents;
    impl RoomEvents for NoopEvents {
        async fn on_queue_timeout(&self, _user_id: UserId) {}
        async fn on_grace_expired(&self, _game_id: GameId, _room_id: RoomId, _user_id: UserId) {}
    }

    fn manager() -> Arc<RoomManager<InMemoryHotStore, InMemoryDurableStore, NoopEvents>> {
        Arc::new(RoomManager::new(
            Arc::new(InMemoryHotStore::new()),
            Arc::new(InMemoryDurableStore::new()),
            Arc::new(NoopEvents),
            RoomConfig {
                queue_timeout: std::time::Duration::from_secs(3600),
                disconnect_grace: std::time::Duration::from_secs(3600),
                ..RoomConfig::default()
            },
        ))
    }

    fn user(id: &str) -> User {
        User::new(UserId::from(id), id)
    }

    #[tokio::test]
    async fn test_create_room_returns_open_room_with_one_player() {
        let mgr = manager();
        let room = mgr.create_room(&user("alice"), RoomType::Public, None).await.unwrap();
        assert_eq!(room.status, RoomStatus::Open);
        assert_eq!(room.players.len(), 1);
    }

    #[tokio::test]
    async fn test_create_room_rejects_banned_user() {
        let mgr = manager();
        let mut banned = user("alice");
        banned.banned = true;
        let result = mgr.create_room(&banned, RoomType::Public, None).await;
        assert!(matches!(result, Err(RoomError::Banned(_))));
    }

    #[tokio::test]
    async fn test_join_room_activates_room_with_two_colored_players() {
        let mgr = manager();
        let room = mgr.create_room(&user("alice"), RoomType::Public, None).await.unwrap();
        let outcome = mgr.join_room(&user("bob"), &room.id, None).await.unwrap();
        assert_eq!(outcome.room.status, RoomStatus::Active);
        assert_eq!(outcome.room.players.len(), 2);
        assert_ne!(outcome.room.players[0].color, outcome.room.players[1].color);
    }

    #[tokio::test]
    async fn test_join_room_rejects_full_room() {
        let mgr = manager();
        let room = mgr.create_room(&user("alice"), RoomType::Public, None).await.unwrap();
        mgr.join_room(&user("bob"), &room.id, None).await.unwrap();
        let result = mgr.join_room(&user("carol"), &room.id, None).await;
        assert!(matches!(result, Err(RoomError::NotOpen(_))));
    }

    #[tokio::test]
    async fn test_join_room_private_wrong_code_rejected() {
        let mgr = manager();
        let room = mgr
            .create_room(&user("alice"), RoomType::Private, Some("AAAAAA".into()))
            .await
            .unwrap();
        let result = mgr.join_room(&user("bob"), &room.id, Some("WRONG1")).await;
        assert!(matches!(result, Err(RoomError::InviteCodeMismatch(_))));
    }

    #[tokio::test]
    async fn test_join_queue_guest_pair_matches_two_waiting_players() {
        let mgr = manager();
        let first = mgr.join_queue(&user("alice"), true).await.unwrap();
        assert!(matches!(first, QueueOutcome::Queued));
        let second = mgr.join_queue(&user("bob"), true).await.unwrap();
        assert!(matches!(second, QueueOutcome::Matched(_)));
    }

    #[tokio::test]
    async fn test_leave_queue_removes_user_from_both_queues() {
        let mgr = manager();
        mgr.join_queue(&user("alice"), true).await.unwrap();
        mgr.leave_queue(&UserId::from("alice")).await.unwrap();
        let second = mgr.join_queue(&user("bob"), true).await.unwrap();
        assert!(matches!(second, QueueOutcome::Queued));
    }

    #[tokio::test]
    async fn test_leave_room_empties_and_closes_room() {
        let mgr = manager();
        let room = mgr.create_room(&user("alice"), RoomType::Public, None).await.unwrap();
        mgr.leave_room(&UserId::from("alice"), &room.id).await.unwrap();
        assert!(mgr.get_room(&room.id).await.is_none());
    }

    #[tokio::test]
    async fn test_force_close_removes_room_and_its_players_index() {
        let mgr = manager();
        let room = mgr.create_room(&user("alice"), RoomType::Public, None).await.unwrap();
        mgr.join_room(&user("bob"), &room.id, None).await.unwrap();
        mgr.force_close(&room.id).await.unwrap();
        assert!(mgr.get_room(&room.id).await.is_none());
        assert!(mgr.player_room(&UserId::from("alice")).await.is_none());
    }

    fn test_game(room_id: &RoomId, status: GameStatus) -> Game {
        Game {
            id: GameId::from(room_id.to_string()),
            room_id: room_id.clone(),
            position: "startpos".into(),
            move_history: Vec::new(),
            clocks: chess_protocol::Clocks { white_secs: 600, black_secs: 600 },
            time_control: chess_protocol::TimeControl { initial_secs: 600, increment_secs: 0 },
            status,
            players: [
                chess_protocol::GamePlayer {
                    user_id: UserId::from("alice"),
                    color: Color::White,
                    display_name: "alice".into(),
                },
                chess_protocol::GamePlayer {
                    user_id: UserId::from("bob"),
                    color: Color::Black,
                    display_name: "bob".into(),
                },
            ],
            chat: Vec::new(),
            winner_user_id: None,
            created_at_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_handle_rejoin_returns_game_for_active_participant() {
        let mgr = manager();
        let room = mgr.create_room(&user("alice"), RoomType::Public, None).await.unwrap();
        mgr.join_room(&user("bob"), &room.id, None).await.unwrap();
        let game = test_game(&room.id, GameStatus::Active);
        mgr.durable.upsert_game(game.clone()).await.unwrap();

        let rejoined = mgr.handle_rejoin(&UserId::from("alice"), &game.id).await.unwrap();
        assert_eq!(rejoined.id, game.id);
    }

    #[tokio::test]
    async fn test_handle_rejoin_rejects_non_participant() {
        let mgr = manager();
        let room = mgr.create_room(&user("alice"), RoomType::Public, None).await.unwrap();
        mgr.join_room(&user("bob"), &room.id, None).await.unwrap();
        let game = test_game(&room.id, GameStatus::Active);
        mgr.durable.upsert_game(game.clone()).await.unwrap();

        let result = mgr.handle_rejoin(&UserId::from("mallory"), &game.id).await;
        assert!(matches!(result, Err(RoomError::NotInRoom(_, _))));
    }

    #[tokio::test]
    async fn test_handle_rejoin_rejects_completed_game() {
        let mgr = manager();
        let room = mgr.create_room(&user("alice"), RoomType::Public, None).await.unwrap();
        mgr.join_room(&user("bob"), &room.id, None).await.unwrap();
        let game = test_game(&room.id, GameStatus::Completed);
        mgr.durable.upsert_game(game.clone()).await.unwrap();

        let result = mgr.handle_rejoin(&UserId::from("alice"), &game.id).await;
        assert!(matches!(result, Err(RoomError::GameNotActive(_))));
    }

    #[tokio::test]
    async fn test_rated_queue_matches_within_elo_window() {
        let mgr = manager();
        let mut low = user("a");
        low.elo = 1500;
        let mut high = user("b");
        high.elo = 1700;
        let mut mid = user("c");
        mid.elo = 1580;

        assert!(matches!(mgr.join_queue(&low, false).await.unwrap(), QueueOutcome::Queued));
        assert!(matches!(mgr.join_queue(&high, false).await.unwrap(), QueueOutcome::Queued));
        assert!(matches!(mgr.join_queue(&mid, false).await.unwrap(), QueueOutcome::Matched(_)));
    }
}
