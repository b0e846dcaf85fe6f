use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{PieceType, Square};

/// Bit set describing what a move does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveFlags(u8);

impl MoveFlags {
    pub const NONE: MoveFlags = MoveFlags(0);
    pub const CAPTURE: MoveFlags = MoveFlags(1 << 0);
    pub const EN_PASSANT: MoveFlags = MoveFlags(1 << 1);
    pub const CASTLE: MoveFlags = MoveFlags(1 << 2);
    pub const DOUBLE_PUSH: MoveFlags = MoveFlags(1 << 3);
    pub const CHECK: MoveFlags = MoveFlags(1 << 4);
    pub const CHECKMATE: MoveFlags = MoveFlags(1 << 5);

    #[inline]
    pub fn contains(self, other: MoveFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: MoveFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for MoveFlags {
    type Output = MoveFlags;

    fn bitor(self, rhs: MoveFlags) -> MoveFlags {
        MoveFlags(self.0 | rhs.0)
    }
}

/// A move produced by the move generator for one specific position.
///
/// `piece` and `captured` describe the position the move was generated in;
/// a `Move` carried over to another position is meaningless.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub piece: PieceType,
    pub promotion: Option<PieceType>,
    pub captured: Option<PieceType>,
    pub flags: MoveFlags,
}

impl Move {
    pub fn is_capture(&self) -> bool {
        self.flags.contains(MoveFlags::CAPTURE)
    }

    pub fn is_en_passant(&self) -> bool {
        self.flags.contains(MoveFlags::EN_PASSANT)
    }

    pub fn is_castle(&self) -> bool {
        self.flags.contains(MoveFlags::CASTLE)
    }

    pub fn is_double_push(&self) -> bool {
        self.flags.contains(MoveFlags::DOUBLE_PUSH)
    }

    pub fn is_check(&self) -> bool {
        self.flags.contains(MoveFlags::CHECK)
    }

    pub fn is_checkmate(&self) -> bool {
        self.flags.contains(MoveFlags::CHECKMATE)
    }

    /// True when this move goes from `from` to `to` with the given promotion.
    pub fn matches(&self, from: Square, to: Square, promotion: Option<PieceType>) -> bool {
        self.from == from && self.to == to && self.promotion == promotion
    }

    /// Coordinate notation such as `e2e4` or `e7e8q`.
    pub fn to_coordinate(&self) -> String {
        match self.promotion {
            Some(p) => format!("{}{}{}", self.from, self.to, p.to_char()),
            None => format!("{}{}", self.from, self.to),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_coordinate())
    }
}
