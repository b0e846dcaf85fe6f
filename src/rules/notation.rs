use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::movegen;
use super::moves::{Move, MoveFlags};
use super::position::Position;
use super::types::{PieceType, Square};
use crate::error::{GameError, Result};

/// Returns `mv` with its check and checkmate flags filled in.
pub fn annotate(pos: &Position, mv: &Move) -> Move {
    let mut annotated = *mv;
    let mut after = pos.clone();
    after.make_move(mv);
    let defender = after.side_to_move();
    if movegen::is_in_check(&after, defender) {
        annotated.flags.insert(MoveFlags::CHECK);
        if !movegen::has_legal_move(&after) {
            annotated.flags.insert(MoveFlags::CHECKMATE);
        }
    }
    annotated
}

fn piece_letter(kind: PieceType) -> char {
    kind.to_char().to_ascii_uppercase()
}

fn san_body(pos: &Position, mv: &Move) -> String {
    if mv.is_castle() {
        return if mv.to.file() == 6 { "O-O" } else { "O-O-O" }.to_string();
    }

    let mut text = String::with_capacity(8);
    if mv.piece == PieceType::Pawn {
        if mv.is_capture() {
            text.push(mv.from.file_char());
        }
    } else {
        text.push(piece_letter(mv.piece));
        let rivals: Vec<Square> = movegen::legal_moves(pos)
            .into_iter()
            .filter(|other| other.piece == mv.piece && other.to == mv.to && other.from != mv.from)
            .map(|other| other.from)
            .collect();
        if !rivals.is_empty() {
            let file_unique = rivals.iter().all(|sq| sq.file() != mv.from.file());
            let rank_unique = rivals.iter().all(|sq| sq.rank() != mv.from.rank());
            if file_unique {
                text.push(mv.from.file_char());
            } else if rank_unique {
                text.push(mv.from.rank_char());
            } else {
                text.push(mv.from.file_char());
                text.push(mv.from.rank_char());
            }
        }
    }

    if mv.is_capture() {
        text.push('x');
    }
    text.push_str(&mv.to.to_string());
    if let Some(promotion) = mv.promotion {
        text.push('=');
        text.push(piece_letter(promotion));
    }
    text
}

/// Standard algebraic notation for a legal move of `pos`.
pub fn to_san(pos: &Position, mv: &Move) -> String {
    let annotated = annotate(pos, mv);
    let mut text = san_body(pos, &annotated);
    if annotated.is_checkmate() {
        text.push('#');
    } else if annotated.is_check() {
        text.push('+');
    }
    text
}

/// Finds the legal move whose algebraic rendering matches `san`.
///
/// Check and mate suffixes are optional; `0-0` is accepted for castling.
pub fn parse_san(pos: &Position, san: &str) -> Result<Move> {
    let wanted = san
        .trim()
        .trim_end_matches(['+', '#', '!', '?'])
        .replace('0', "O");
    movegen::legal_moves(pos)
        .into_iter()
        .find(|mv| san_body(pos, mv) == wanted)
        .ok_or_else(|| GameError::IllegalMove(san.to_string()))
}

/// Move text used on the wire: origin, destination and an optional
/// lowercase promotion letter, e.g. `e7e8q`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoordinateMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceType>,
}

impl CoordinateMove {
    pub fn new(from: Square, to: Square, promotion: Option<PieceType>) -> CoordinateMove {
        CoordinateMove {
            from,
            to,
            promotion,
        }
    }
}

impl From<&Move> for CoordinateMove {
    fn from(mv: &Move) -> CoordinateMove {
        CoordinateMove::new(mv.from, mv.to, mv.promotion)
    }
}

impl fmt::Display for CoordinateMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.promotion {
            write!(f, "{}", p.to_char())?;
        }
        Ok(())
    }
}

impl FromStr for CoordinateMove {
    type Err = GameError;

    fn from_str(s: &str) -> Result<CoordinateMove> {
        let bad = || GameError::IllegalMove(format!("malformed move text {s:?}"));
        if !s.is_ascii() || !(s.len() == 4 || s.len() == 5) {
            return Err(bad());
        }
        let from: Square = s[0..2].parse()?;
        let to: Square = s[2..4].parse()?;
        let promotion = match s[4..].chars().next() {
            None => None,
            Some(c) => match PieceType::from_char(c) {
                Some(p) if p.is_promotion_target() => Some(p),
                _ => return Err(bad()),
            },
        };
        Ok(CoordinateMove::new(from, to, promotion))
    }
}

impl Serialize for CoordinateMove {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CoordinateMove {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<CoordinateMove, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
