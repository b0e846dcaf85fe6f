//! Pseudo-legal and legal move generation, attack detection and the
//! terminal predicates built on them.

use super::moves::{Move, MoveFlags};
use super::position::{CastlingRights, Position};
use super::types::{Color, Piece, PieceType, Square};
use crate::error::{GameError, Result};

const KNIGHT_STEPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_STEPS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

const ROOK_DIRS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

#[inline]
fn pawn_direction(color: Color) -> i8 {
    match color {
        Color::White => 1,
        Color::Black => -1,
    }
}

/// Whether any piece of color `by` attacks `sq`.
pub fn is_square_attacked(pos: &Position, sq: Square, by: Color) -> bool {
    // A pawn of `by` attacks sq from one rank behind it, relative to its direction.
    let back = -pawn_direction(by);
    for df in [-1, 1] {
        if let Some(from) = sq.offset(df, back) {
            if pos.piece_at(from) == Some(Piece::new(PieceType::Pawn, by)) {
                return true;
            }
        }
    }

    for (df, dr) in KNIGHT_STEPS {
        if let Some(from) = sq.offset(df, dr) {
            if pos.piece_at(from) == Some(Piece::new(PieceType::Knight, by)) {
                return true;
            }
        }
    }

    for (df, dr) in KING_STEPS {
        if let Some(from) = sq.offset(df, dr) {
            if pos.piece_at(from) == Some(Piece::new(PieceType::King, by)) {
                return true;
            }
        }
    }

    let slides = |dirs: &[(i8, i8)], kind: PieceType| {
        dirs.iter().any(|&(df, dr)| {
            let mut cur = sq;
            while let Some(next) = cur.offset(df, dr) {
                if let Some(piece) = pos.piece_at(next) {
                    return piece.color == by
                        && (piece.kind == kind || piece.kind == PieceType::Queen);
                }
                cur = next;
            }
            false
        })
    };
    slides(&ROOK_DIRS, PieceType::Rook) || slides(&BISHOP_DIRS, PieceType::Bishop)
}

pub fn is_in_check(pos: &Position, color: Color) -> bool {
    is_square_attacked(pos, pos.king_square(color), color.flip())
}

fn push_move(
    moves: &mut Vec<Move>,
    from: Square,
    to: Square,
    piece: PieceType,
    captured: Option<PieceType>,
    flags: MoveFlags,
) {
    let flags = if captured.is_some() {
        flags | MoveFlags::CAPTURE
    } else {
        flags
    };
    moves.push(Move {
        from,
        to,
        piece,
        promotion: None,
        captured,
        flags,
    });
}

fn push_pawn_move(
    moves: &mut Vec<Move>,
    color: Color,
    from: Square,
    to: Square,
    captured: Option<PieceType>,
) {
    if to.rank() == color.promotion_rank() {
        for promotion in PieceType::PROMOTIONS {
            let flags = if captured.is_some() {
                MoveFlags::CAPTURE
            } else {
                MoveFlags::NONE
            };
            moves.push(Move {
                from,
                to,
                piece: PieceType::Pawn,
                promotion: Some(promotion),
                captured,
                flags,
            });
        }
    } else {
        push_move(moves, from, to, PieceType::Pawn, captured, MoveFlags::NONE);
    }
}

fn pawn_moves(pos: &Position, from: Square, color: Color, moves: &mut Vec<Move>) {
    let dir = pawn_direction(color);
    let start_rank = match color {
        Color::White => 1,
        Color::Black => 6,
    };

    if let Some(one) = from.offset(0, dir) {
        if pos.piece_at(one).is_none() {
            push_pawn_move(moves, color, from, one, None);
            if from.rank() == start_rank {
                if let Some(two) = from.offset(0, 2 * dir) {
                    if pos.piece_at(two).is_none() {
                        push_move(
                            moves,
                            from,
                            two,
                            PieceType::Pawn,
                            None,
                            MoveFlags::DOUBLE_PUSH,
                        );
                    }
                }
            }
        }
    }

    for df in [-1, 1] {
        let Some(to) = from.offset(df, dir) else {
            continue;
        };
        match pos.piece_at(to) {
            Some(target) if target.color != color => {
                push_pawn_move(moves, color, from, to, Some(target.kind));
            }
            None if pos.en_passant() == Some(to) => {
                push_move(
                    moves,
                    from,
                    to,
                    PieceType::Pawn,
                    Some(PieceType::Pawn),
                    MoveFlags::EN_PASSANT,
                );
            }
            _ => {}
        }
    }
}

fn step_moves(
    pos: &Position,
    from: Square,
    piece: Piece,
    steps: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in steps {
        let Some(to) = from.offset(df, dr) else {
            continue;
        };
        match pos.piece_at(to) {
            None => push_move(moves, from, to, piece.kind, None, MoveFlags::NONE),
            Some(target) if target.color != piece.color => {
                push_move(moves, from, to, piece.kind, Some(target.kind), MoveFlags::NONE)
            }
            Some(_) => {}
        }
    }
}

fn slide_moves(
    pos: &Position,
    from: Square,
    piece: Piece,
    dirs: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in dirs {
        let mut cur = from;
        while let Some(to) = cur.offset(df, dr) {
            match pos.piece_at(to) {
                None => push_move(moves, from, to, piece.kind, None, MoveFlags::NONE),
                Some(target) => {
                    if target.color != piece.color {
                        push_move(moves, from, to, piece.kind, Some(target.kind), MoveFlags::NONE);
                    }
                    break;
                }
            }
            cur = to;
        }
    }
}

fn castle_moves(pos: &Position, from: Square, color: Color, moves: &mut Vec<Move>) {
    let rank = if color == Color::White { 0 } else { 7 };
    if from != Square::from_coords(4, rank) {
        return;
    }
    let rights = pos.castling();
    let enemy = color.flip();
    let empty = |file: u8| pos.piece_at(Square::from_coords(file, rank)).is_none();
    let safe = |file: u8| !is_square_attacked(pos, Square::from_coords(file, rank), enemy);

    let wants_kingside = rights.has(CastlingRights::kingside(color));
    let wants_queenside = rights.has(CastlingRights::queenside(color));
    if !(wants_kingside || wants_queenside) || !safe(4) {
        return;
    }
    if wants_kingside && empty(5) && empty(6) && safe(5) && safe(6) {
        push_move(
            moves,
            from,
            Square::from_coords(6, rank),
            PieceType::King,
            None,
            MoveFlags::CASTLE,
        );
    }
    if wants_queenside && empty(1) && empty(2) && empty(3) && safe(3) && safe(2) {
        push_move(
            moves,
            from,
            Square::from_coords(2, rank),
            PieceType::King,
            None,
            MoveFlags::CASTLE,
        );
    }
}

fn piece_moves(pos: &Position, from: Square, piece: Piece, moves: &mut Vec<Move>) {
    match piece.kind {
        PieceType::Pawn => pawn_moves(pos, from, piece.color, moves),
        PieceType::Knight => step_moves(pos, from, piece, &KNIGHT_STEPS, moves),
        PieceType::Bishop => slide_moves(pos, from, piece, &BISHOP_DIRS, moves),
        PieceType::Rook => slide_moves(pos, from, piece, &ROOK_DIRS, moves),
        PieceType::Queen => {
            slide_moves(pos, from, piece, &ROOK_DIRS, moves);
            slide_moves(pos, from, piece, &BISHOP_DIRS, moves);
        }
        PieceType::King => {
            step_moves(pos, from, piece, &KING_STEPS, moves);
            castle_moves(pos, from, piece.color, moves);
        }
    }
}

/// Moves obeying piece geometry for the side to move, ignoring self-check.
pub fn pseudo_legal_moves(pos: &Position) -> Vec<Move> {
    let mut moves = Vec::with_capacity(48);
    let color = pos.side_to_move();
    for (sq, piece) in pos.pieces() {
        if piece.color == color {
            piece_moves(pos, sq, piece, &mut moves);
        }
    }
    moves
}

fn retain_legal(pos: &Position, moves: &mut Vec<Move>) {
    let mover = pos.side_to_move();
    let mut scratch = pos.clone();
    moves.retain(|mv| {
        let undo = scratch.make_move(mv);
        let legal = !is_in_check(&scratch, mover);
        scratch.unmake_move(mv, undo);
        legal
    });
}

/// Every legal move for the side to move, a1..h8 by origin square.
pub fn legal_moves(pos: &Position) -> Vec<Move> {
    let mut moves = pseudo_legal_moves(pos);
    retain_legal(pos, &mut moves);
    moves
}

/// Legal moves of the piece standing on `from`.
///
/// Fails with `IllegalMove` when the square is empty. A piece of the side not
/// to move simply has no legal moves.
pub fn legal_moves_from(pos: &Position, from: Square) -> Result<Vec<Move>> {
    let piece = pos
        .piece_at(from)
        .ok_or_else(|| GameError::IllegalMove(format!("no piece on {from}")))?;
    let mut moves = Vec::new();
    if piece.color == pos.side_to_move() {
        piece_moves(pos, from, piece, &mut moves);
        retain_legal(pos, &mut moves);
    }
    Ok(moves)
}

/// Looks up the legal move matching the given squares and promotion.
pub fn find_move(
    pos: &Position,
    from: Square,
    to: Square,
    promotion: Option<PieceType>,
) -> Option<Move> {
    legal_moves_from(pos, from)
        .ok()?
        .into_iter()
        .find(|mv| mv.matches(from, to, promotion))
}

/// Returns the position after `mv`, leaving `pos` untouched.
pub fn apply_move(pos: &Position, mv: &Move) -> Result<Position> {
    let legal = find_move(pos, mv.from, mv.to, mv.promotion)
        .ok_or_else(|| GameError::IllegalMove(format!("{mv} in {pos}")))?;
    let mut next = pos.clone();
    next.make_move(&legal);
    Ok(next)
}

pub fn has_legal_move(pos: &Position) -> bool {
    let mover = pos.side_to_move();
    let mut scratch = pos.clone();
    pseudo_legal_moves(pos).iter().any(|mv| {
        let undo = scratch.make_move(mv);
        let legal = !is_in_check(&scratch, mover);
        scratch.unmake_move(mv, undo);
        legal
    })
}

pub fn is_checkmate(pos: &Position) -> bool {
    is_in_check(pos, pos.side_to_move()) && !has_legal_move(pos)
}

pub fn is_stalemate(pos: &Position) -> bool {
    !is_in_check(pos, pos.side_to_move()) && !has_legal_move(pos)
}

/// King against king, king and knight, or king and bishop.
pub fn is_insufficient_material(pos: &Position) -> bool {
    let mut minors = 0;
    for (_, piece) in pos.pieces() {
        match piece.kind {
            PieceType::King => {}
            PieceType::Knight | PieceType::Bishop => minors += 1,
            _ => return false,
        }
    }
    minors <= 1
}

pub fn is_fifty_move_draw(pos: &Position) -> bool {
    pos.halfmove_clock() >= 100
}

/// Draw decidable from the position alone (repetition needs game history).
pub fn is_draw(pos: &Position) -> bool {
    is_stalemate(pos) || is_fifty_move_draw(pos) || is_insufficient_material(pos)
}

/// Counts leaf nodes of the legal move tree to `depth`.
pub fn perft(pos: &Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = legal_moves(pos);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut scratch = pos.clone();
    let mut nodes = 0;
    for mv in &moves {
        let undo = scratch.make_move(mv);
        nodes += perft(&scratch, depth - 1);
        scratch.unmake_move(mv, undo);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    fn sq(text: &str) -> Square {
        text.parse().unwrap()
    }

    #[test]
    fn twenty_moves_from_start() {
        assert_eq!(20, legal_moves(&Position::startpos()).len());
    }

    #[test]
    fn perft_reference_counts() {
        let cases: &[(&str, &[u64])] = &[
            (
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
                &[20, 400, 8902],
            ),
            (
                "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
                &[48, 2039],
            ),
            ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", &[14, 191, 2812]),
            (
                "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
                &[6, 264],
            ),
        ];
        for (fen, counts) in cases {
            let p = pos(fen);
            for (depth, expected) in counts.iter().enumerate() {
                assert_eq!(*expected, perft(&p, depth as u32 + 1), "{fen} depth {}", depth + 1);
            }
        }
    }

    #[test]
    fn castling_through_attack_is_refused() {
        // The black rook on f8 covers f1.
        let p = pos("4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        let moves = legal_moves(&p);
        assert!(!moves.iter().any(|m| m.is_castle() && m.to == sq("g1")));
        assert!(moves.iter().any(|m| m.is_castle() && m.to == sq("c1")));
    }

    #[test]
    fn en_passant_is_generated_and_removes_the_pawn() {
        let p = pos("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3");
        let ep = find_move(&p, sq("e5"), sq("d6"), None).unwrap();
        assert!(ep.is_en_passant());
        assert_eq!(Some(PieceType::Pawn), ep.captured);
        let next = apply_move(&p, &ep).unwrap();
        assert_eq!(None, next.piece_at(sq("d5")));
        assert_eq!(0, next.halfmove_clock());
    }

    #[test]
    fn pinned_piece_cannot_move() {
        let p = pos("4k3/4r3/8/8/8/8/4B3/4K3 w - - 0 1");
        assert!(legal_moves_from(&p, sq("e2")).unwrap().is_empty());
    }

    #[test]
    fn empty_square_is_an_illegal_request() {
        let p = Position::startpos();
        assert!(matches!(
            legal_moves_from(&p, sq("e4")),
            Err(GameError::IllegalMove(_))
        ));
    }

    #[test]
    fn apply_illegal_move_leaves_position_alone() {
        let p = Position::startpos();
        let bogus = Move {
            from: sq("e2"),
            to: sq("e5"),
            piece: PieceType::Pawn,
            promotion: None,
            captured: None,
            flags: MoveFlags::NONE,
        };
        assert!(matches!(apply_move(&p, &bogus), Err(GameError::IllegalMove(_))));
        assert_eq!(Position::startpos(), p);
    }

    #[test]
    fn promotions_expand_to_four_pieces() {
        let p = pos("8/4P3/8/8/8/8/k7/4K3 w - - 0 1");
        let promos: Vec<_> = legal_moves_from(&p, sq("e7"))
            .unwrap()
            .into_iter()
            .map(|m| m.promotion)
            .collect();
        assert_eq!(
            vec![
                Some(PieceType::Queen),
                Some(PieceType::Rook),
                Some(PieceType::Bishop),
                Some(PieceType::Knight)
            ],
            promos
        );
    }

    #[test]
    fn rook_capture_drops_castling_right() {
        let p = pos("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let mv = find_move(&p, sq("a1"), sq("a8"), None).unwrap();
        let next = apply_move(&p, &mv).unwrap();
        assert_eq!("Kk", next.castling().to_string());
    }

    #[test]
    fn terminal_predicates() {
        let mate = pos("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
        assert!(is_checkmate(&mate));
        assert!(!is_stalemate(&mate));

        let stalemate = pos("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert!(is_stalemate(&stalemate));
        assert!(!is_checkmate(&stalemate));
        assert!(is_draw(&stalemate));

        assert!(is_fifty_move_draw(&pos("4k3/8/8/8/8/8/8/R3K3 w - - 100 80")));
        assert!(!is_fifty_move_draw(&pos("4k3/8/8/8/8/8/8/R3K3 w - - 99 80")));
    }

    #[test]
    fn insufficient_material_cases() {
        assert!(is_insufficient_material(&pos("4k3/8/8/8/8/8/8/4K3 w - - 0 1")));
        assert!(is_insufficient_material(&pos("4k3/8/8/8/8/8/8/4KN2 w - - 0 1")));
        assert!(is_insufficient_material(&pos("4kb2/8/8/8/8/8/8/4K3 w - - 0 1")));
        assert!(!is_insufficient_material(&pos("4kb2/8/8/8/8/8/8/4KB2 w - - 0 1")));
        assert!(!is_insufficient_material(&pos("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1")));
        assert!(!is_insufficient_material(&pos("4k3/8/8/8/8/8/8/4KR2 w - - 0 1")));
    }
}
