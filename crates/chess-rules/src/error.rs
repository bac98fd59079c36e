//! Error types for the rules oracle.

/// Errors surfaced while validating or applying a move.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The position string could not be parsed into a legal chess position.
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// A `from`/`to` square string was not a valid board square.
    #[error("invalid square: {0}")]
    InvalidSquare(String),

    /// A promotion piece letter was not one of n/b/r/q.
    #[error("invalid promotion piece: {0}")]
    InvalidPromotion(String),

    /// The requested move is not legal in the given position.
    #[error("illegal move from {from} to {to}")]
    IllegalMove { from: String, to: String },
}
