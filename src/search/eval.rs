//! Static evaluation, in centipawns from white's point of view.
//!
//! Combines material, piece-square tables, mobility and a small bonus for
//! occupying the four centre squares.

use crate::rules::{movegen, Color, PieceType, Position, Square};

pub const MATE_SCORE: i32 = 10_000;
pub const MOBILITY_WEIGHT: i32 = 10;
pub const CENTER_BONUS: i32 = 20;

// Row 0 is rank 8, as seen from white's side of the board.
#[rustfmt::skip]
const PAWN_TABLE: [[i32; 8]; 8] = [
    [ 0,  0,   0,   0,   0,   0,  0,  0],
    [50, 50,  50,  50,  50,  50, 50, 50],
    [10, 10,  20,  30,  30,  20, 10, 10],
    [ 5,  5,  10,  25,  25,  10,  5,  5],
    [ 0,  0,   0,  20,  20,   0,  0,  0],
    [ 5, -5, -10,   0,   0, -10, -5,  5],
    [ 5, 10,  10, -20, -20,  10, 10,  5],
    [ 0,  0,   0,   0,   0,   0,  0,  0],
];

#[rustfmt::skip]
const KNIGHT_TABLE: [[i32; 8]; 8] = [
    [-50, -40, -30, -30, -30, -30, -40, -50],
    [-40, -20,   0,   0,   0,   0, -20, -40],
    [-30,   0,  10,  15,  15,  10,   0, -30],
    [-30,   5,  15,  20,  20,  15,   5, -30],
    [-30,   0,  15,  20,  20,  15,   0, -30],
    [-30,   5,  10,  15,  15,  10,   5, -30],
    [-40, -20,   0,   5,   5,   0, -20, -40],
    [-50, -40, -30, -30, -30, -30, -40, -50],
];

#[rustfmt::skip]
const BISHOP_TABLE: [[i32; 8]; 8] = [
    [-20, -10, -10, -10, -10, -10, -10, -20],
    [-10,   0,   0,   0,   0,   0,   0, -10],
    [-10,   0,   5,  10,  10,   5,   0, -10],
    [-10,   5,   5,  10,  10,   5,   5, -10],
    [-10,   0,  10,  10,  10,  10,   0, -10],
    [-10,  10,  10,  10,  10,  10,  10, -10],
    [-10,   5,   0,   0,   0,   0,   5, -10],
    [-20, -10, -10, -10, -10, -10, -10, -20],
];

#[rustfmt::skip]
const ROOK_TABLE: [[i32; 8]; 8] = [
    [ 0,  0,  0,  0,  0,  0,  0,  0],
    [ 5, 10, 10, 10, 10, 10, 10,  5],
    [-5,  0,  0,  0,  0,  0,  0, -5],
    [-5,  0,  0,  0,  0,  0,  0, -5],
    [-5,  0,  0,  0,  0,  0,  0, -5],
    [-5,  0,  0,  0,  0,  0,  0, -5],
    [-5,  0,  0,  0,  0,  0,  0, -5],
    [ 0,  0,  0,  5,  5,  0,  0,  0],
];

#[rustfmt::skip]
const QUEEN_TABLE: [[i32; 8]; 8] = [
    [-20, -10, -10, -5, -5, -10, -10, -20],
    [-10,   0,   0,  0,  0,   0,   0, -10],
    [-10,   0,   5,  5,  5,   5,   0, -10],
    [ -5,   0,   5,  5,  5,   5,   0,  -5],
    [  0,   0,   5,  5,  5,   5,   0,  -5],
    [-10,   5,   5,  5,  5,   5,   0, -10],
    [-10,   0,   5,  0,  0,   0,   0, -10],
    [-20, -10, -10, -5, -5, -10, -10, -20],
];

#[rustfmt::skip]
const KING_TABLE: [[i32; 8]; 8] = [
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-20, -30, -30, -40, -40, -30, -30, -20],
    [-10, -20, -20, -20, -20, -20, -20, -10],
    [ 20,  20,   0,   0,   0,   0,  20,  20],
    [ 20,  30,  10,   0,   0,  10,  30,  20],
];

fn table(kind: PieceType) -> &'static [[i32; 8]; 8] {
    match kind {
        PieceType::Pawn => &PAWN_TABLE,
        PieceType::Knight => &KNIGHT_TABLE,
        PieceType::Bishop => &BISHOP_TABLE,
        PieceType::Rook => &ROOK_TABLE,
        PieceType::Queen => &QUEEN_TABLE,
        PieceType::King => &KING_TABLE,
    }
}

/// Positional bonus for a piece of `color` standing on `sq`.
///
/// Black reads the table rotated by 180 degrees.
pub fn square_bonus(kind: PieceType, color: Color, sq: Square) -> i32 {
    let (file, rank) = (sq.file() as usize, sq.rank() as usize);
    let (row, col) = match color {
        Color::White => (7 - rank, file),
        Color::Black => (rank, 7 - file),
    };
    table(kind)[row][col]
}

fn is_center(sq: Square) -> bool {
    (3..=4).contains(&sq.file()) && (3..=4).contains(&sq.rank())
}

/// Legal moves white would have minus those black would have, each as if on move.
pub fn mobility(pos: &Position) -> i32 {
    let white = movegen::legal_moves(&pos.with_turn(Color::White)).len() as i32;
    let black = movegen::legal_moves(&pos.with_turn(Color::Black)).len() as i32;
    white - black
}

/// Material, tables and centre occupation, without mobility or terminal checks.
pub fn material_and_placement(pos: &Position) -> i32 {
    pos.pieces()
        .map(|(sq, piece)| {
            let mut value = piece.kind.value() + square_bonus(piece.kind, piece.color, sq);
            if is_center(sq) {
                value += CENTER_BONUS;
            }
            match piece.color {
                Color::White => value,
                Color::Black => -value,
            }
        })
        .sum()
}

/// Full evaluation, including mate and draw detection for the side to move.
pub fn evaluate(pos: &Position) -> i32 {
    let mover = pos.side_to_move();
    if !movegen::has_legal_move(pos) {
        if movegen::is_in_check(pos, mover) {
            return match mover {
                Color::White => -MATE_SCORE,
                Color::Black => MATE_SCORE,
            };
        }
        return 0;
    }
    if movegen::is_fifty_move_draw(pos) || movegen::is_insufficient_material(pos) {
        return 0;
    }
    material_and_placement(pos) + mobility(pos) * MOBILITY_WEIGHT
}
