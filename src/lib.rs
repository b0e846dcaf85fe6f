pub mod actors;
pub mod error;
pub mod game;
pub mod models;
pub mod multiplayer;
pub mod rules;
pub mod search;

pub use error::{GameError, Result};
pub use game::{GameResult, GameSession, SessionEvent, SessionState, SubmitOutcome};
pub use models::{GameMode, Settings, TimeControl};
pub use rules::{Color, CoordinateMove, Move, PieceType, Position, Square};
pub use search::{Difficulty, SearchEngine};
