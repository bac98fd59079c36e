//! The game actor: a single-writer mailbox that serializes every mutation
//! to one game — moves, resignations, draw responses, and clock ticks —
//! the same way the room actor serializes joins and leaves onto one room.

use std::sync::Arc;

use chess_protocol::{ChatEntry, Color, Game, GamePlayer, GameStatus, MoveRecord, RoomStatus, UserId};
use chess_rules::{position_signature, RulesOracle};
use chess_store::{
    draw_offer_key, game_key, invalid_moves_key, player_last_game_key, DurableOp, DurableStore,
    HotStore, HotStoreExt, Transaction,
};
use tokio::sync::{mpsc, oneshot};

use crate::{GameConfig, GameError, GameEvents};

/// Outcome of ticking one second off the side-to-move's clock.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// The game is still active.
    Continued,
    /// The side to move ran out of time; the game has already been
    /// finalized and persisted.
    TimedOut(Game),
}

enum GameCommand {
    MakeMove {
        user_id: UserId,
        from: String,
        to: String,
        promotion: Option<String>,
        reply: oneshot::Sender<Result<Game, GameError>>,
    },
    LegalDestinations {
        square: String,
        reply: oneshot::Sender<Result<Vec<String>, GameError>>,
    },
    Resign {
        user_id: UserId,
        reply: oneshot::Sender<Result<Game, GameError>>,
    },
    Abandon {
        disconnected_user_id: UserId,
        reply: oneshot::Sender<Result<Game, GameError>>,
    },
    OfferDraw {
        user_id: UserId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    RespondDraw {
        user_id: UserId,
        accept: bool,
        reply: oneshot::Sender<Result<Game, GameError>>,
    },
    Tick {
        reply: oneshot::Sender<TickOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<Game>,
    },
    AppendChat {
        entry: ChatEntry,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Shutdown,
}

/// Cheap-to-clone handle to a running game actor.
#[derive(Clone)]
pub struct GameHandle {
    sender: mpsc::Sender<GameCommand>,
}

impl GameHandle {
    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> GameCommand,
        game_id_for_error: impl FnOnce() -> chess_protocol::GameId,
    ) -> Result<T, GameError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| GameError::Unavailable(game_id_for_error()))?;
        rx.await.map_err(|_| GameError::Unavailable(game_id_for_error()))
    }

    pub async fn make_move(
        &self,
        game_id: &chess_protocol::GameId,
        user_id: UserId,
        from: String,
        to: String,
        promotion: Option<String>,
    ) -> Result<Game, GameError> {
        self.call(
            |reply| GameCommand::MakeMove { user_id, from, to, promotion, reply },
            || game_id.clone(),
        )
        .await?
    }

    pub async fn legal_destinations(
        &self,
        game_id: &chess_protocol::GameId,
        square: String,
    ) -> Result<Vec<String>, GameError> {
        self.call(
            |reply| GameCommand::LegalDestinations { square, reply },
            || game_id.clone(),
        )
        .await?
    }

    pub async fn resign(
        &self,
        game_id: &chess_protocol::GameId,
        user_id: UserId,
    ) -> Result<Game, GameError> {
        self.call(
            |reply| GameCommand::Resign { user_id, reply },
            || game_id.clone(),
        )
        .await?
    }

    pub async fn abandon(
        &self,
        game_id: &chess_protocol::GameId,
        disconnected_user_id: UserId,
    ) -> Result<Game, GameError> {
        self.call(
            |reply| GameCommand::Abandon { disconnected_user_id, reply },
            || game_id.clone(),
        )
        .await?
    }

    pub async fn offer_draw(
        &self,
        game_id: &chess_protocol::GameId,
        user_id: UserId,
    ) -> Result<(), GameError> {
        self.call(
            |reply| GameCommand::OfferDraw { user_id, reply },
            || game_id.clone(),
        )
        .await?
    }

    pub async fn respond_draw(
        &self,
        game_id: &chess_protocol::GameId,
        user_id: UserId,
        accept: bool,
    ) -> Result<Game, GameError> {
        self.call(
            |reply| GameCommand::RespondDraw { user_id, accept, reply },
            || game_id.clone(),
        )
        .await?
    }

    pub async fn tick(&self, game_id: &chess_protocol::GameId) -> Result<TickOutcome, GameError> {
        self.call(|reply| GameCommand::Tick { reply }, || game_id.clone())
            .await
    }

    pub async fn snapshot(&self, game_id: &chess_protocol::GameId) -> Result<Game, GameError> {
        self.call(|reply| GameCommand::Snapshot { reply }, || game_id.clone())
            .await
    }

    pub async fn append_chat(
        &self,
        game_id: &chess_protocol::GameId,
        entry: ChatEntry,
    ) -> Result<(), GameError> {
        self.call(
            |reply| GameCommand::AppendChat { entry, reply },
            || game_id.clone(),
        )
        .await?
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(GameCommand::Shutdown).await;
    }
}

fn side_to_move(fen: &str) -> Color {
    match fen.split_whitespace().nth(1) {
        Some("b") => Color::Black,
        _ => Color::White,
    }
}

struct GameActor<R: RulesOracle, H: HotStore, D: DurableStore, E: GameEvents> {
    oracle: Arc<R>,
    hot: Arc<H>,
    durable: Arc<D>,
    events: Arc<E>,
    config: GameConfig,
    game: Game,
    /// Signatures of every position reached, for threefold repetition.
    position_history: Vec<String>,
    receiver: mpsc::Receiver<GameCommand>,
}

impl<R: RulesOracle, H: HotStore, D: DurableStore, E: GameEvents> GameActor<R, H, D, E> {
    async fn run(mut self) {
        let game_id = self.game.id.clone();
        tracing::info!(game_id = %game_id, "game actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                GameCommand::MakeMove { user_id, from, to, promotion, reply } => {
                    let result = self.handle_make_move(user_id, from, to, promotion).await;
                    let _ = reply.send(result);
                }
                GameCommand::LegalDestinations { square, reply } => {
                    let result = self
                        .oracle
                        .legal_destinations(&self.game.position, &square)
                        .map_err(GameError::from);
                    let _ = reply.send(result);
                }
                GameCommand::Resign { user_id, reply } => {
                    let result = self.handle_resign(user_id).await;
                    let _ = reply.send(result);
                }
                GameCommand::Abandon { disconnected_user_id, reply } => {
                    let result = self.handle_abandon(disconnected_user_id).await;
                    let _ = reply.send(result);
                }
                GameCommand::OfferDraw { user_id, reply } => {
                    let result = self.handle_offer_draw(user_id).await;
                    let _ = reply.send(result);
                }
                GameCommand::RespondDraw { user_id, accept, reply } => {
                    let result = self.handle_respond_draw(user_id, accept).await;
                    let _ = reply.send(result);
                }
                GameCommand::Tick { reply } => {
                    let result = self.handle_tick().await;
                    let _ = reply.send(result);
                }
                GameCommand::Snapshot { reply } => {
                    let _ = reply.send(self.game.clone());
                }
                GameCommand::AppendChat { entry, reply } => {
                    let result = self.handle_append_chat(entry).await;
                    let _ = reply.send(result);
                }
                GameCommand::Shutdown => {
                    tracing::info!(game_id = %game_id, "game actor shutting down");
                    break;
                }
            }
        }

        tracing::info!(game_id = %game_id, "game actor stopped");
    }

    fn require_active(&self) -> Result<(), GameError> {
        if self.game.status != GameStatus::Active {
            return Err(GameError::NotActive(self.game.id.clone()));
        }
        Ok(())
    }

    fn require_participant(&self, user_id: &UserId) -> Result<Color, GameError> {
        self.game
            .color_of(user_id)
            .ok_or_else(|| GameError::NotParticipant(user_id.clone(), self.game.id.clone()))
    }

    async fn mirror_hot(&self) -> Result<(), GameError> {
        self.hot.set_json(&game_key(&self.game.id), &self.game, None).await?;
        Ok(())
    }

    async fn handle_make_move(
        &mut self,
        user_id: UserId,
        from: String,
        to: String,
        promotion: Option<String>,
    ) -> Result<Game, GameError> {
        self.require_active()?;
        let color = self.require_participant(&user_id)?;
        if side_to_move(&self.game.position) != color {
            return Err(GameError::NotYourTurn(user_id));
        }

        let outcome = match self.oracle.apply_move(&self.game.position, &from, &to, promotion.as_deref()) {
            Ok(outcome) => outcome,
            Err(rule_err) => {
                let key = invalid_moves_key(&user_id);
                let count = self.hot.incr(&key, Some(self.config.invalid_move_window)).await?;
                self.events
                    .on_invalid_move(self.game.id.clone(), user_id.clone(), rule_err.to_string(), count as u32)
                    .await;
                if count as u32 >= self.config.invalid_move_limit {
                    return Err(GameError::TooManyInvalidMoves(user_id));
                }
                return Err(GameError::IllegalMove(rule_err));
            }
        };

        self.hot.delete(&invalid_moves_key(&user_id)).await.ok();

        self.game.move_history.push(MoveRecord {
            from,
            to,
            promotion,
            san: outcome.san,
        });
        self.game.position = outcome.new_position.clone();
        self.position_history.push(position_signature(&outcome.new_position));

        let increment = self.game.time_control.increment_secs;
        match color {
            Color::White => self.game.clocks.white_secs += increment,
            Color::Black => self.game.clocks.black_secs += increment,
            Color::Unset => {}
        }

        let repeated_thrice = self
            .position_history
            .iter()
            .filter(|sig| *sig == self.position_history.last().unwrap())
            .count()
            >= 3;

        if outcome.is_checkmate {
            self.finalize(GameStatus::Completed, Some(user_id)).await?;
        } else if outcome.is_stalemate
            || outcome.is_insufficient_material
            || outcome.is_fifty_move
            || repeated_thrice
        {
            self.finalize(GameStatus::Draw, None).await?;
        } else {
            self.durable.upsert_game(self.game.clone()).await?;
            self.mirror_hot().await?;
            self.events.on_state_changed(self.game.clone()).await;
        }

        Ok(self.game.clone())
    }

    async fn handle_resign(&mut self, user_id: UserId) -> Result<Game, GameError> {
        self.require_active()?;
        self.require_participant(&user_id)?;
        let winner = self.game.opponent_of(&user_id).cloned();
        self.finalize(GameStatus::Resigned, winner).await?;
        Ok(self.game.clone())
    }

    /// Unlike every other terminal path, abandonment purges the game's hot
    /// store entries instead of mirroring the final state into them: a
    /// disconnected player's client is gone and nothing will ever read
    /// `lastGame` for a game that ended this way.
    async fn handle_abandon(&mut self, disconnected_user_id: UserId) -> Result<Game, GameError> {
        self.require_active()?;
        self.require_participant(&disconnected_user_id)?;
        let winner = self.game.opponent_of(&disconnected_user_id).cloned();
        self.finalize(GameStatus::Abandoned, winner).await?;

        self.hot.delete(&game_key(&self.game.id)).await.ok();
        for GamePlayer { user_id, .. } in self.game.players.clone() {
            self.hot.delete(&player_last_game_key(&user_id)).await.ok();
        }
        Ok(self.game.clone())
    }

    async fn handle_offer_draw(&mut self, user_id: UserId) -> Result<(), GameError> {
        self.require_active()?;
        self.require_participant(&user_id)?;
        self.hot
            .set(
                &draw_offer_key(&self.game.id, &user_id),
                "1".to_string(),
                Some(self.config.draw_offer_ttl),
            )
            .await?;
        self.events.on_draw_offered(self.game.id.clone(), user_id).await;
        Ok(())
    }

    async fn handle_respond_draw(&mut self, user_id: UserId, accept: bool) -> Result<Game, GameError> {
        self.require_active()?;
        self.require_participant(&user_id)?;
        let Some(opponent) = self.game.opponent_of(&user_id).cloned() else {
            return Err(GameError::NoDrawOffer(self.game.id.clone()));
        };
        let offer_key = draw_offer_key(&self.game.id, &opponent);
        if self.hot.get(&offer_key).await?.is_none() {
            return Err(GameError::NoDrawOffer(self.game.id.clone()));
        }
        self.hot.delete(&offer_key).await?;

        if accept {
            self.finalize(GameStatus::Draw, None).await?;
        } else {
            self.events.on_draw_declined(self.game.id.clone(), user_id).await;
        }
        Ok(self.game.clone())
    }

    async fn handle_append_chat(&mut self, entry: ChatEntry) -> Result<(), GameError> {
        self.require_participant(&entry.author_user_id)?;
        self.game.chat.push(entry.clone());
        self.durable.upsert_game(self.game.clone()).await?;
        self.mirror_hot().await?;
        self.events.on_chat_message(self.game.id.clone(), entry).await;
        Ok(())
    }

    async fn handle_tick(&mut self) -> TickOutcome {
        if self.game.status != GameStatus::Active {
            return TickOutcome::Continued;
        }
        let mover = side_to_move(&self.game.position);
        let remaining = self.game.clocks.for_color(mover);
        if remaining <= 1 {
            match mover {
                Color::White => self.game.clocks.white_secs = 0,
                Color::Black => self.game.clocks.black_secs = 0,
                Color::Unset => {}
            }
            let winner = self
                .game
                .players
                .iter()
                .find(|p| p.color != mover)
                .map(|p| p.user_id.clone());
            if self.finalize(GameStatus::Completed, winner).await.is_ok() {
                return TickOutcome::TimedOut(self.game.clone());
            }
            return TickOutcome::Continued;
        }

        match mover {
            Color::White => self.game.clocks.white_secs -= 1,
            Color::Black => self.game.clocks.black_secs -= 1,
            Color::Unset => {}
        }
        if self.mirror_hot().await.is_err() {
            tracing::warn!(game_id = %self.game.id, "failed to mirror clock tick to hot store");
        }
        TickOutcome::Continued
    }

    /// Commits the game's terminal status, both players' return to
    /// `Online`, and the owning room's `Closed` status in a single durable
    /// transaction, so a crash mid-write can never leave the game marked
    /// finished while its room still looks open (or vice versa).
    async fn finalize(&mut self, status: GameStatus, winner: Option<UserId>) -> Result<(), GameError> {
        self.game.status = status;
        self.game.winner_user_id = winner;

        let mut ops = vec![DurableOp::UpsertGame(self.game.clone())];
        for GamePlayer { user_id, .. } in self.game.players.clone() {
            if let Some(mut user) = self.durable.get_user(&user_id).await? {
                user.status = chess_protocol::UserStatus::Online;
                ops.push(DurableOp::UpsertUser(user));
            }
        }
        if let Some(mut room) = self.durable.get_room(&self.game.room_id).await? {
            room.status = RoomStatus::Closed;
            ops.push(DurableOp::UpsertRoom(room));
        }
        self.durable.transact(Transaction::new(ops)).await?;
        self.mirror_hot().await?;

        tracing::info!(game_id = %self.game.id, status = ?self.game.status, "game finalized");
        self.events
            .on_game_over(self.game.clone(), self.game.room_id.clone())
            .await;
        Ok(())
    }
}

pub(crate) fn spawn_game<R: RulesOracle, H: HotStore, D: DurableStore, E: GameEvents>(
    game: Game,
    oracle: Arc<R>,
    hot: Arc<H>,
    durable: Arc<D>,
    events: Arc<E>,
    config: GameConfig,
    channel_size: usize,
) -> GameHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let position_history = vec![position_signature(&game.position)];

    let actor = GameActor {
        oracle,
        hot,
        durable,
        events,
        config,
        game,
        position_history,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    GameHandle { sender: tx }
}
