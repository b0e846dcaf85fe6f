//! Board representation and the rules of chess.

pub mod movegen;
pub mod moves;
pub mod notation;
pub mod position;
pub mod types;

pub use moves::{Move, MoveFlags};
pub use notation::CoordinateMove;
pub use position::{CastlingRights, Position, Undo, START_FEN};
pub use types::{Color, Piece, PieceType, Square};
