//! Bot controller: paces the heuristic engine's moves and caps how many
//! bot games run concurrently.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chess_game::{GameEvents, GameManager};
use chess_protocol::{Color, GameId, GameStatus, UserId, BOT_USER_ID};
use chess_rules::RulesOracle;
use chess_store::{DurableStore, HotStore};
use rand::Rng;
use tokio::sync::Mutex;

use crate::{BotDifficulty, BotEngine, BotError};

const MIN_THINK_MS: u64 = 1000;
const MAX_THINK_MS: u64 = 3000;

fn side_to_move(fen: &str) -> Color {
    match fen.split_whitespace().nth(1) {
        Some("b") => Color::Black,
        _ => Color::White,
    }
}

/// Caps the number of games the bot plays at once and, once it is the
/// bot's turn in a registered game, schedules a move after a randomized
/// 1-3 second "thinking" delay.
pub struct BotController<R: RulesOracle, H: HotStore, D: DurableStore, GE: GameEvents> {
    games: Arc<GameManager<R, H, D, GE>>,
    engine: Arc<dyn BotEngine>,
    active: Mutex<HashSet<GameId>>,
    max_active_games: usize,
}

impl<R: RulesOracle, H: HotStore, D: DurableStore, GE: GameEvents> BotController<R, H, D, GE> {
    pub fn new(games: Arc<GameManager<R, H, D, GE>>, engine: Arc<dyn BotEngine>, max_active_games: usize) -> Self {
        Self {
            games,
            engine,
            active: Mutex::new(HashSet::new()),
            max_active_games,
        }
    }

    pub async fn register(&self, game_id: GameId) -> Result<(), BotError> {
        let mut active = self.active.lock().await;
        if active.len() >= self.max_active_games {
            return Err(BotError::TooManyActiveGames);
        }
        active.insert(game_id);
        Ok(())
    }

    pub async fn unregister(&self, game_id: &GameId) {
        self.active.lock().await.remove(game_id);
    }

    pub async fn active_game_count(&self) -> usize {
        self.active.lock().await.len()
    }

    /// Called by the coordinator whenever a registered bot game's state
    /// changes. If it is now the bot's turn, spawns a task that "thinks"
    /// for 1-3 seconds and then plays a move.
    pub fn on_state_changed(self: &Arc<Self>, game_id: GameId, difficulty: BotDifficulty) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = this.maybe_move(&game_id, difficulty).await {
                tracing::debug!(game_id = %game_id, %err, "bot did not move");
            }
        });
    }

    async fn maybe_move(&self, game_id: &GameId, difficulty: BotDifficulty) -> Result<(), BotError> {
        if !self.active.lock().await.contains(game_id) {
            return Err(BotError::NotRegistered(game_id.clone()));
        }

        let game = self.games.snapshot(game_id).await?;
        if game.status != GameStatus::Active {
            return Ok(());
        }
        let mover_color = side_to_move(&game.position);
        let mover = game.player(mover_color);
        if mover.user_id.as_str() != BOT_USER_ID {
            return Ok(());
        }

        let think_ms = rand::rng().random_range(MIN_THINK_MS..=MAX_THINK_MS);
        tokio::time::sleep(Duration::from_millis(think_ms)).await;

        // Re-check after sleeping: the game may have ended (resignation,
        // timeout) while the bot was "thinking".
        let game = self.games.snapshot(game_id).await?;
        if game.status != GameStatus::Active || side_to_move(&game.position) != mover_color {
            return Ok(());
        }

        let Some(mv) = self.engine.find_best_move(&game.position, mover_color, difficulty) else {
            tracing::warn!(game_id = %game_id, "bot engine found no legal move in an active game");
            return Ok(());
        };

        self.games
            .make_move(game_id, UserId::from(BOT_USER_ID), mv.from, mv.to, mv.promotion)
            .await?;
        Ok(())
    }
}
