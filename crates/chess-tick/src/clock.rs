//! Drives the 1 Hz clock tick for every in-progress game from a single
//! scheduler, instead of spinning up one [`TickScheduler`] per game.
//!
//! A chess clock only needs a coarse, shared heartbeat — there's no
//! per-game budget to protect the way a real-time simulation has one. A
//! single scheduler polled by the coordinator and a dynamic registry of
//! which games are currently ticking gets the same 1 Hz cadence at a
//! fraction of the task/timer overhead of one scheduler per game.

use std::collections::HashSet;

use chess_protocol::GameId;

use crate::{TickConfig, TickInfo, TickScheduler};

/// Coordinates the 1 Hz clock tick across every active game.
pub struct GameClockCoordinator {
    scheduler: TickScheduler,
    active: HashSet<GameId>,
}

impl GameClockCoordinator {
    /// Creates a coordinator ticking at 1 Hz with no games registered.
    pub fn new() -> Self {
        Self {
            scheduler: TickScheduler::new(TickConfig::with_rate(1)),
            active: HashSet::new(),
        }
    }

    /// Starts counting down `game_id`'s clock on the next tick.
    pub fn register(&mut self, game_id: GameId) {
        self.active.insert(game_id);
    }

    /// Stops counting down `game_id`'s clock (it finished, or is paused
    /// because a player is in their reconnect grace period).
    pub fn unregister(&mut self, game_id: &GameId) {
        self.active.remove(game_id);
    }

    /// Waits for the next 1 Hz tick, then returns the set of game ids the
    /// caller should deduct one second of clock time from.
    ///
    /// Pends forever if no games are registered, so an idle coordinator
    /// doesn't spin a `tokio::select!` loop for nothing.
    pub async fn wait_for_tick(&mut self) -> (TickInfo, Vec<GameId>) {
        if self.active.is_empty() {
            std::future::pending::<()>().await;
            unreachable!()
        }
        let info = self.scheduler.wait_for_tick().await;
        (info, self.active.iter().cloned().collect())
    }

    pub fn active_game_count(&self) -> usize {
        self.active.len()
    }
}

impl Default for GameClockCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
