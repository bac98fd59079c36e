//! Rules oracle: the fixed contract every Game Service call-site uses to
//! validate and apply moves, without the caller knowing anything about the
//! chess engine backing it. [`ShakmatyOracle`] is the one concrete
//! implementation shipped so the workspace runs standalone; it is built on
//! the `shakmaty` move generator rather than a hand-rolled rules engine.
//!
//! Positions are passed around as plain FEN strings so callers (and the hot
//! store, which caches them verbatim) never need to depend on this crate's
//! internal representation.

mod error;

pub use error::RuleError;

use shakmaty::{
    fen::Fen, CastlingMode, Chess, Color as ShakmatyColor, EnPassantMode, Position, Role, Square,
};

use chess_protocol::Color;

/// Result of successfully applying a move to a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// FEN of the position after the move.
    pub new_position: String,
    /// Standard Algebraic Notation for the move just played, including
    /// check/mate suffix.
    pub san: String,
    /// Color to move in the resulting position.
    pub side_to_move: Color,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_insufficient_material: bool,
    /// True once the halfmove clock has reached the 50-move-rule threshold.
    pub is_fifty_move: bool,
}

/// The fixed contract the Game Service validates and applies moves through.
pub trait RulesOracle: Send + Sync + 'static {
    /// FEN for a fresh game's starting position.
    fn initial_position(&self) -> String;

    /// Applies a move to `position`, returning the resulting position and
    /// terminal-state flags, or [`RuleError::IllegalMove`] if the move is
    /// not legal.
    fn apply_move(
        &self,
        position: &str,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<MoveOutcome, RuleError>;

    /// Squares a piece on `square` may legally move to in `position`.
    fn legal_destinations(&self, position: &str, square: &str) -> Result<Vec<String>, RuleError>;
}

/// Opaque key used to detect repeated positions across a game's move
/// history. Two FENs with the same signature are the same position for
/// threefold-repetition purposes even if their halfmove/fullmove counters
/// differ.
pub fn position_signature(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Rules oracle backed by the `shakmaty` move generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShakmatyOracle;

impl ShakmatyOracle {
    pub fn new() -> Self {
        Self
    }

    fn parse_position(&self, position: &str) -> Result<Chess, RuleError> {
        let fen: Fen = position
            .parse()
            .map_err(|_| RuleError::InvalidPosition(position.to_string()))?;
        fen.into_position(CastlingMode::Standard)
            .map_err(|_| RuleError::InvalidPosition(position.to_string()))
    }

    fn parse_square(&self, square: &str) -> Result<Square, RuleError> {
        square
            .parse()
            .map_err(|_| RuleError::InvalidSquare(square.to_string()))
    }

    fn parse_promotion(&self, promotion: Option<&str>) -> Result<Option<Role>, RuleError> {
        match promotion {
            None => Ok(None),
            Some(p) => {
                let ch = p
                    .chars()
                    .next()
                    .ok_or_else(|| RuleError::InvalidPromotion(p.to_string()))?;
                Role::from_char(ch.to_ascii_lowercase())
                    .map(Some)
                    .ok_or_else(|| RuleError::InvalidPromotion(p.to_string()))
            }
        }
    }

    fn fen_of(&self, pos: &Chess) -> String {
        Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string()
    }
}

impl RulesOracle for ShakmatyOracle {
    fn initial_position(&self) -> String {
        self.fen_of(&Chess::default())
    }

    fn apply_move(
        &self,
        position: &str,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<MoveOutcome, RuleError> {
        let pos = self.parse_position(position)?;
        let from_sq = self.parse_square(from)?;
        let to_sq = self.parse_square(to)?;
        let promotion_role = self.parse_promotion(promotion)?;

        let candidate = pos
            .legal_moves()
            .into_iter()
            .find(|m| m.from() == Some(from_sq) && m.to() == to_sq && m.promotion() == promotion_role)
            .ok_or_else(|| RuleError::IllegalMove {
                from: from.to_string(),
                to: to.to_string(),
            })?;

        let san = shakmaty::san::SanPlus::from_move(pos.clone(), &candidate).to_string();
        let new_pos = pos.play(&candidate).map_err(|_| RuleError::IllegalMove {
            from: from.to_string(),
            to: to.to_string(),
        })?;

        let side_to_move = match new_pos.turn() {
            ShakmatyColor::White => Color::White,
            ShakmatyColor::Black => Color::Black,
        };

        Ok(MoveOutcome {
            new_position: self.fen_of(&new_pos),
            san,
            side_to_move,
            is_check: new_pos.is_check(),
            is_checkmate: new_pos.is_checkmate(),
            is_stalemate: new_pos.is_stalemate(),
            is_insufficient_material: new_pos.is_insufficient_material(),
            is_fifty_move: new_pos.halfmoves() >= 100,
        })
    }

    fn legal_destinations(&self, position: &str, square: &str) -> Result<Vec<String>, RuleError> {
        let pos = self.parse_position(position)?;
        let from_sq = self.parse_square(square)?;
        Ok(pos
            .legal_moves()
            .into_iter()
            .filter(|m| m.from() == Some(from_sq))
            .map(|m| m.to().to_string())
            .collect())
    }
}
