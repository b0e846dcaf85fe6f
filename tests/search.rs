use chess_session::rules::{movegen, Position};
use chess_session::search::{eval, Difficulty, SearchEngine};

#[test]
fn minimax_ignores_the_seed() {
    let pos = Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3")
        .unwrap();
    for difficulty in [Difficulty::Medium, Difficulty::Hard] {
        let a = SearchEngine::with_seed(1).select_move(&pos, difficulty).unwrap();
        let b = SearchEngine::with_seed(99).select_move(&pos, difficulty).unwrap();
        assert_eq!(a, b, "{difficulty}");
    }
}

#[test]
fn every_level_returns_a_legal_move() {
    let pos = Position::startpos();
    let legal = movegen::legal_moves(&pos);
    let mut engine = SearchEngine::with_seed(5);
    for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
        let mv = engine.select_move(&pos, difficulty).unwrap();
        assert!(legal.contains(&mv), "{difficulty} picked {mv}");
    }
}

#[test]
fn hard_takes_a_hanging_queen() {
    // White queen on d5 can be taken by the e6 pawn
    let pos = Position::from_fen("4k3/8/4p3/3Q4/8/8/8/4K3 b - - 0 1").unwrap();
    let mv = SearchEngine::with_seed(3)
        .select_move(&pos, Difficulty::Hard)
        .unwrap();
    assert_eq!("e6d5", mv.to_coordinate());
    assert!(eval::evaluate(&pos) > 0);
}
