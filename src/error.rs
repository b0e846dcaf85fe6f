use thiserror::Error;

/// Errors returned by the game core.
///
/// Every variant is recoverable: the operation that produced it left the
/// session, clock and position exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("invalid square: {0:?}")]
    InvalidSquare(String),

    #[error("invalid position encoding: {0}")]
    InvalidPositionEncoding(String),

    #[error("cannot {action} while the game is {state}")]
    InvalidStateTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("a promotion choice is pending on {0}")]
    PendingPromotion(String),

    #[error("a computer search is in flight")]
    SearchInFlight,

    #[error("search was cancelled")]
    SearchCancelled,

    #[error("no legal moves in this position")]
    NoLegalMoves,

    #[error("it is not the computer's turn")]
    NotComputerTurn,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("search worker unavailable: {0}")]
    SearchUnavailable(String),

    #[error("room service unavailable: {0}")]
    RoomUnavailable(String),
}

pub type Result<T> = std::result::Result<T, GameError>;
