//! Drives per-second clock ticks for every active game through a dedicated
//! background task, rather than sharing a [`GameClockCoordinator`] behind a
//! `Mutex`.
//!
//! [`GameClockCoordinator::wait_for_tick`] pends forever while no game is
//! registered, so a shared mutex guard held across that await would starve
//! every `register`/`unregister` call made while the coordinator is
//! otherwise idle. Instead one task owns the coordinator exclusively and
//! reacts to `tokio::select!` between incoming commands and the next tick —
//! the same shape chess-tick's own module docs show for a room actor.

use tokio::sync::mpsc;

use chess_protocol::GameId;
use chess_tick::GameClockCoordinator;

enum TickCommand {
    Register(GameId),
    Unregister(GameId),
}

/// Cheap-to-clone handle used to register and unregister games with the
/// tick loop without contending on the coordinator itself.
#[derive(Clone)]
pub struct TickHandle {
    sender: mpsc::UnboundedSender<TickCommand>,
}

impl TickHandle {
    pub fn register(&self, game_id: GameId) {
        let _ = self.sender.send(TickCommand::Register(game_id));
    }

    pub fn unregister(&self, game_id: GameId) {
        let _ = self.sender.send(TickCommand::Unregister(game_id));
    }
}

/// Spawns the tick loop task and returns a handle to it. `on_due` is called
/// with every game id that came due on a given tick; the caller advances
/// each game's clock and handles the resulting [`chess_game::TickOutcome`].
pub fn spawn_tick_loop<F>(mut on_due: F) -> TickHandle
where
    F: FnMut(GameId) + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<TickCommand>();

    tokio::spawn(async move {
        let mut coordinator = GameClockCoordinator::new();
        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    match cmd {
                        Some(TickCommand::Register(game_id)) => coordinator.register(game_id),
                        Some(TickCommand::Unregister(game_id)) => coordinator.unregister(&game_id),
                        None => return,
                    }
                }
                (_, due) = coordinator.wait_for_tick() => {
                    for game_id in due {
                        on_due(game_id);
                    }
                }
            }
        }
    });

    TickHandle { sender: tx }
}
