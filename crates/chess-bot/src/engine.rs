//! The bot's move-selection engine. [`HeuristicEngine`] is the one
//! concrete implementation shipped: it enumerates legal moves through the
//! same rules oracle the Game Service validates against, scores each by
//! resulting material balance, and picks randomly among the top-scoring
//! candidates — no search tree, no opening book.

use std::sync::Arc;

use chess_protocol::Color;
use chess_rules::RulesOracle;
use rand::seq::IndexedRandom;

/// A candidate move, in the same (from, to, promotion) shape the Game
/// Service's `makeMove` operation accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotMove {
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
}

/// Difficulty knob: a smaller value widens the pool of candidate moves the
/// engine picks randomly among, so lower difficulty plays weaker. Clamped
/// to the 2-4 range the matchmaker offers players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotDifficulty(u8);

impl BotDifficulty {
    pub fn new(level: u8) -> Self {
        Self(level.clamp(2, 4))
    }

    fn candidate_pool_size(self) -> usize {
        (6 - self.0 as usize).max(1)
    }
}

impl Default for BotDifficulty {
    fn default() -> Self {
        Self::new(3)
    }
}

/// The fixed contract the Bot Controller asks for a move through.
pub trait BotEngine: Send + Sync + 'static {
    /// Picks a move for `color` to play in `position`, or `None` if there
    /// are no legal moves (the controller treats that as a bug — a
    /// stalemate/checkmate should already have ended the game).
    fn find_best_move(
        &self,
        position: &str,
        color: Color,
        difficulty: BotDifficulty,
    ) -> Option<BotMove>;

    /// Releases any engine-held resources (tablebases, transposition
    /// tables). The heuristic engine holds none.
    fn dispose(&self);
}

fn squares_with_color(position: &str, color: Color) -> Vec<String> {
    let Some(board_field) = position.split_whitespace().next() else {
        return Vec::new();
    };
    let mut squares = Vec::new();
    for (rank_from_top, rank_str) in board_field.split('/').enumerate() {
        let rank = 8 - rank_from_top;
        let mut file = 0u8;
        for ch in rank_str.chars() {
            if let Some(skip) = ch.to_digit(10) {
                file += skip as u8;
                continue;
            }
            let is_white_piece = ch.is_ascii_uppercase();
            let matches = match color {
                Color::White => is_white_piece,
                Color::Black => !is_white_piece,
                Color::Unset => false,
            };
            if matches {
                let file_char = (b'a' + file) as char;
                squares.push(format!("{file_char}{rank}"));
            }
            file += 1;
        }
    }
    squares
}

fn material_balance(fen: &str) -> i32 {
    let Some(board_field) = fen.split_whitespace().next() else {
        return 0;
    };
    board_field
        .chars()
        .map(|ch| {
            let value = match ch.to_ascii_lowercase() {
                'p' => 1,
                'n' | 'b' => 3,
                'r' => 5,
                'q' => 9,
                _ => 0,
            };
            if ch.is_ascii_uppercase() { value } else { -value }
        })
        .sum()
}

/// Material-greedy engine backed by a [`RulesOracle`] for legality.
pub struct HeuristicEngine<R: RulesOracle> {
    oracle: Arc<R>,
}

impl<R: RulesOracle> HeuristicEngine<R> {
    pub fn new(oracle: Arc<R>) -> Self {
        Self { oracle }
    }

    fn candidate_moves(&self, position: &str, color: Color) -> Vec<(BotMove, i32)> {
        let mut candidates = Vec::new();
        for from in squares_with_color(position, color) {
            let Ok(destinations) = self.oracle.legal_destinations(position, &from) else {
                continue;
            };
            for to in destinations {
                let promotes = is_promotion(&from, &to, color);
                let promotion = if promotes { Some("q".to_string()) } else { None };
                let Ok(outcome) = self
                    .oracle
                    .apply_move(position, &from, &to, promotion.as_deref())
                else {
                    continue;
                };
                let balance = material_balance(&outcome.new_position);
                let score = match color {
                    Color::White => balance,
                    Color::Black => -balance,
                    Color::Unset => 0,
                };
                let score = if outcome.is_checkmate { i32::MAX } else { score };
                candidates.push((BotMove { from: from.clone(), to, promotion }, score));
            }
        }
        candidates
    }
}

fn is_promotion(from: &str, to: &str, color: Color) -> bool {
    let from_rank = from.chars().nth(1);
    let to_rank = to.chars().nth(1);
    match color {
        Color::White => from_rank == Some('7') && to_rank == Some('8'),
        Color::Black => from_rank == Some('2') && to_rank == Some('1'),
        Color::Unset => false,
    }
}

impl<R: RulesOracle> BotEngine for HeuristicEngine<R> {
    fn find_best_move(
        &self,
        position: &str,
        color: Color,
        difficulty: BotDifficulty,
    ) -> Option<BotMove> {
        let mut candidates = self.candidate_moves(position, color);
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        let pool_size = difficulty.candidate_pool_size().min(candidates.len());
        let mut rng = rand::rng();
        candidates[..pool_size]
            .choose(&mut rng)
            .map(|(mv, _)| mv.clone())
    }

    fn dispose(&self) {}
}
