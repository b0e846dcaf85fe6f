use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::movegen;
use super::moves::Move;
use super::types::{Color, Piece, PieceType, Square};
use crate::error::{GameError, Result};

/// Encoding of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// The four castling permissions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const WHITE_KINGSIDE: u8 = 1 << 0;
    pub const WHITE_QUEENSIDE: u8 = 1 << 1;
    pub const BLACK_KINGSIDE: u8 = 1 << 2;
    pub const BLACK_QUEENSIDE: u8 = 1 << 3;

    pub const NONE: CastlingRights = CastlingRights(0);
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    #[inline]
    pub fn kingside(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_KINGSIDE,
            Color::Black => Self::BLACK_KINGSIDE,
        }
    }

    #[inline]
    pub fn queenside(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_QUEENSIDE,
            Color::Black => Self::BLACK_QUEENSIDE,
        }
    }

    #[inline]
    pub fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    #[inline]
    fn clear(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    #[inline]
    fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Drops the rights tied to a corner square once anything moves from or to it.
    fn clear_for_square(&mut self, sq: Square) {
        match sq.index() {
            0 => self.clear(Self::WHITE_QUEENSIDE),
            7 => self.clear(Self::WHITE_KINGSIDE),
            56 => self.clear(Self::BLACK_QUEENSIDE),
            63 => self.clear(Self::BLACK_KINGSIDE),
            _ => {}
        }
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        for (flag, c) in [
            (Self::WHITE_KINGSIDE, 'K'),
            (Self::WHITE_QUEENSIDE, 'Q'),
            (Self::BLACK_KINGSIDE, 'k'),
            (Self::BLACK_QUEENSIDE, 'q'),
        ] {
            if self.has(flag) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

/// State needed to take a move back.
#[derive(Clone, Copy, Debug)]
pub struct Undo {
    captured: Option<Piece>,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

/// A complete board snapshot.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Position {
    board: [Option<Piece>; 64],
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Default for Position {
    fn default() -> Self {
        Position::startpos()
    }
}

impl Position {
    /// The standard initial array.
    pub fn startpos() -> Position {
        let mut board = [None; 64];
        let back = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];
        for (file, kind) in back.iter().enumerate() {
            let file = file as u8;
            board[Square::from_coords(file, 0).index()] = Some(Piece::new(*kind, Color::White));
            board[Square::from_coords(file, 1).index()] =
                Some(Piece::new(PieceType::Pawn, Color::White));
            board[Square::from_coords(file, 6).index()] =
                Some(Piece::new(PieceType::Pawn, Color::Black));
            board[Square::from_coords(file, 7).index()] = Some(Piece::new(*kind, Color::Black));
        }
        Position {
            board,
            side_to_move: Color::White,
            castling: CastlingRights::ALL,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Parses the six-field text encoding.
    pub fn from_fen(fen: &str) -> Result<Position> {
        let invalid = |msg: &str| GameError::InvalidPositionEncoding(format!("{msg}: {fen:?}"));

        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(invalid("expected six fields"));
        }

        let mut board = [None; 64];
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(invalid("expected eight ranks"));
        }
        for (i, rank_text) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file: u8 = 0;
            for c in rank_text.chars() {
                if let Some(run) = c.to_digit(10) {
                    if !(1..=8).contains(&run) {
                        return Err(invalid("bad empty-square count"));
                    }
                    file += run as u8;
                } else {
                    let piece = Piece::from_char(c).ok_or_else(|| invalid("unknown piece letter"))?;
                    if file >= 8 {
                        return Err(invalid("rank overflows eight files"));
                    }
                    board[Square::from_coords(file, rank).index()] = Some(piece);
                    file += 1;
                }
                if file > 8 {
                    return Err(invalid("rank overflows eight files"));
                }
            }
            if file != 8 {
                return Err(invalid("rank does not cover eight files"));
            }
        }

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(invalid("side to move must be 'w' or 'b'")),
        };

        let mut castling = CastlingRights::NONE;
        if fields[2] != "-" {
            for c in fields[2].chars() {
                let flag = match c {
                    'K' => CastlingRights::WHITE_KINGSIDE,
                    'Q' => CastlingRights::WHITE_QUEENSIDE,
                    'k' => CastlingRights::BLACK_KINGSIDE,
                    'q' => CastlingRights::BLACK_QUEENSIDE,
                    _ => return Err(invalid("bad castling rights")),
                };
                if castling.has(flag) {
                    return Err(invalid("repeated castling right"));
                }
                castling.set(flag);
            }
        }

        let en_passant = match fields[3] {
            "-" => None,
            text => {
                let sq: Square = text.parse().map_err(|_| invalid("bad en-passant square"))?;
                let expected_rank = match side_to_move {
                    Color::White => 5,
                    Color::Black => 2,
                };
                if sq.rank() != expected_rank {
                    return Err(invalid("en-passant square on the wrong rank"));
                }
                Some(sq)
            }
        };

        let halfmove_clock: u32 = fields[4]
            .parse()
            .map_err(|_| invalid("bad halfmove clock"))?;
        let fullmove_number: u32 = fields[5]
            .parse()
            .map_err(|_| invalid("bad fullmove number"))?;
        if fullmove_number == 0 {
            return Err(invalid("fullmove number must be at least 1"));
        }

        let position = Position {
            board,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        };
        position.validate().map_err(invalid)?;
        Ok(position)
    }

    fn validate(&self) -> std::result::Result<(), &'static str> {
        for color in Color::ALL {
            let kings = self
                .pieces()
                .filter(|(_, p)| *p == Piece::new(PieceType::King, color))
                .count();
            if kings != 1 {
                return Err("each side needs exactly one king");
            }
        }
        if self.pieces().any(|(sq, p)| {
            p.kind == PieceType::Pawn && (sq.rank() == 0 || sq.rank() == 7)
        }) {
            return Err("pawn on a back rank");
        }
        for color in Color::ALL {
            let home_rank = if color == Color::White { 0 } else { 7 };
            let king = Piece::new(PieceType::King, color);
            let rook = Piece::new(PieceType::Rook, color);
            let king_home = self.piece_at(Square::from_coords(4, home_rank)) == Some(king);
            if self.castling.has(CastlingRights::kingside(color))
                && (!king_home || self.piece_at(Square::from_coords(7, home_rank)) != Some(rook))
            {
                return Err("castling right without king and rook on their home squares");
            }
            if self.castling.has(CastlingRights::queenside(color))
                && (!king_home || self.piece_at(Square::from_coords(0, home_rank)) != Some(rook))
            {
                return Err("castling right without king and rook on their home squares");
            }
        }
        if let Some(target) = self.en_passant {
            let pusher = self.side_to_move.flip();
            let (pawn_rank, origin_rank) = match pusher {
                Color::White => (3, 1),
                Color::Black => (4, 6),
            };
            let pawn = Square::from_coords(target.file(), pawn_rank);
            let origin = Square::from_coords(target.file(), origin_rank);
            if self.piece_at(target).is_some()
                || self.piece_at(origin).is_some()
                || self.piece_at(pawn) != Some(Piece::new(PieceType::Pawn, pusher))
            {
                return Err("en-passant square without a double-pushed pawn behind it");
            }
        }
        let waiting = self.side_to_move.flip();
        if movegen::is_square_attacked(self, self.king_square(waiting), self.side_to_move) {
            return Err("side not to move is in check");
        }
        Ok(())
    }

    /// Produces the six-field text encoding.
    pub fn to_fen(&self) -> String {
        format!(
            "{} {} {}",
            self.repetition_key(),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    /// The first four encoding fields; equal keys mean a repeated position.
    pub fn repetition_key(&self) -> String {
        let mut out = String::with_capacity(64);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match self.piece_at(Square::from_coords(file, rank)) {
                    Some(piece) => {
                        if empty > 0 {
                            out.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        out.push(piece.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                out.push('/');
            }
        }
        let ep = self
            .en_passant
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!("{} {} {} {}", out, self.side_to_move.to_char(), self.castling, ep)
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board[sq.index()]
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Occupied squares in a1..h8 order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    pub fn find_king(&self, color: Color) -> Option<Square> {
        let king = Piece::new(PieceType::King, color);
        self.pieces().find(|(_, p)| *p == king).map(|(sq, _)| sq)
    }

    /// Square of `color`'s king. A missing king means the position is corrupt.
    pub fn king_square(&self, color: Color) -> Square {
        match self.find_king(color) {
            Some(sq) => sq,
            None => panic!("position invariant violated: no {color} king on the board"),
        }
    }

    /// Same placement with the other side to move and no en-passant target.
    /// Used to count the waiting side's mobility.
    pub(crate) fn with_turn(&self, color: Color) -> Position {
        let mut copy = self.clone();
        copy.side_to_move = color;
        copy.en_passant = None;
        copy
    }

    /// Plays `mv` in place and returns what is needed to take it back.
    ///
    /// `mv` must have been generated for this exact position.
    pub fn make_move(&mut self, mv: &Move) -> Undo {
        let undo = Undo {
            captured: None,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        };
        let Some(piece) = self.board[mv.from.index()].take() else {
            panic!("make_move from empty square {}", mv.from);
        };
        let color = piece.color;

        let captured = if mv.is_en_passant() {
            let victim = Square::from_coords(mv.to.file(), mv.from.rank());
            self.board[victim.index()].take()
        } else {
            self.board[mv.to.index()]
        };

        let placed = match mv.promotion {
            Some(kind) => Piece::new(kind, color),
            None => piece,
        };
        self.board[mv.to.index()] = Some(placed);

        if mv.is_castle() {
            let rank = mv.from.rank();
            let (rook_from, rook_to) = if mv.to.file() == 6 {
                (Square::from_coords(7, rank), Square::from_coords(5, rank))
            } else {
                (Square::from_coords(0, rank), Square::from_coords(3, rank))
            };
            let rook = self.board[rook_from.index()].take();
            self.board[rook_to.index()] = rook;
        }

        if piece.kind == PieceType::King {
            self.castling.clear(CastlingRights::kingside(color));
            self.castling.clear(CastlingRights::queenside(color));
        }
        self.castling.clear_for_square(mv.from);
        self.castling.clear_for_square(mv.to);

        self.en_passant = if mv.is_double_push() {
            Square::new((mv.from.index() as u8 + mv.to.index() as u8) / 2)
        } else {
            None
        };

        if piece.kind == PieceType::Pawn || captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if color == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = color.flip();

        Undo { captured, ..undo }
    }

    /// Reverts a move played by [`Position::make_move`].
    pub fn unmake_move(&mut self, mv: &Move, undo: Undo) {
        let Some(moved) = self.board[mv.to.index()].take() else {
            panic!("unmake_move with empty destination {}", mv.to);
        };
        let color = moved.color;
        let original = if mv.promotion.is_some() {
            Piece::new(PieceType::Pawn, color)
        } else {
            moved
        };
        self.board[mv.from.index()] = Some(original);

        if mv.is_en_passant() {
            let victim = Square::from_coords(mv.to.file(), mv.from.rank());
            self.board[victim.index()] = undo.captured;
        } else {
            self.board[mv.to.index()] = undo.captured;
        }

        if mv.is_castle() {
            let rank = mv.from.rank();
            let (rook_from, rook_to) = if mv.to.file() == 6 {
                (Square::from_coords(7, rank), Square::from_coords(5, rank))
            } else {
                (Square::from_coords(0, rank), Square::from_coords(3, rank))
            };
            let rook = self.board[rook_to.index()].take();
            self.board[rook_from.index()] = rook;
        }

        self.castling = undo.castling;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove_number = undo.fullmove_number;
        self.side_to_move = color;
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({})", self.to_fen())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}

impl FromStr for Position {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Position> {
        Position::from_fen(s)
    }
}

impl Serialize for Position {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_fen())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Position, D::Error> {
        let text = String::deserialize(deserializer)?;
        Position::from_fen(&text).map_err(serde::de::Error::custom)
    }
}
