//! Heuristic bot opponent: a material-greedy move engine and a controller
//! that paces its moves and caps how many games it plays at once.

mod controller;
mod engine;
mod error;

pub use controller::BotController;
pub use engine::{BotDifficulty, BotEngine, BotMove, HeuristicEngine};
pub use error::BotError;
