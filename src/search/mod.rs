//! Computer move selection.
//!
//! `Easy` picks a uniformly random legal move. `Medium` and `Hard` run a plain
//! fixed-depth minimax over make/unmake. White maximizes the evaluation and
//! black minimizes it. Among equally scored moves the first one in generation
//! order wins, so the result for a given position never varies.

pub mod eval;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::rules::{movegen, Color, Move, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Minimax depth in plies; `None` for random play.
    pub fn depth(self) -> Option<u32> {
        match self {
            Difficulty::Easy => None,
            Difficulty::Medium => Some(2),
            Difficulty::Hard => Some(3),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        })
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Difficulty> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(GameError::InvalidSettings(format!(
                "unknown difficulty {other:?}"
            ))),
        }
    }
}

/// Shared flag used to interrupt a running search from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Bounds on a single search. A search that hits either bound fails with
/// `SearchCancelled` and returns nothing partial.
#[derive(Clone, Debug, Default)]
pub struct SearchLimits {
    pub cancel: Option<CancelToken>,
    pub max_nodes: Option<u64>,
}

impl SearchLimits {
    pub fn unbounded() -> SearchLimits {
        SearchLimits::default()
    }

    pub fn with_cancel(mut self, token: CancelToken) -> SearchLimits {
        self.cancel = Some(token);
        self
    }

    pub fn with_max_nodes(mut self, nodes: u64) -> SearchLimits {
        self.max_nodes = Some(nodes);
        self
    }
}

/// What a finished search produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchResult {
    pub best: Move,
    /// White-perspective score; zero for random play.
    pub score: i32,
    pub nodes: u64,
}

struct Minimax<'a> {
    limits: &'a SearchLimits,
    nodes: u64,
}

impl Minimax<'_> {
    fn visit(&mut self) -> Result<()> {
        self.nodes += 1;
        if let Some(max) = self.limits.max_nodes {
            if self.nodes > max {
                return Err(GameError::SearchCancelled);
            }
        }
        if let Some(token) = &self.limits.cancel {
            if token.is_cancelled() {
                return Err(GameError::SearchCancelled);
            }
        }
        Ok(())
    }

    fn value(&mut self, pos: &mut Position, depth: u32) -> Result<i32> {
        self.visit()?;
        let moves = movegen::legal_moves(pos);
        if depth == 0 || moves.is_empty() || Self::is_settled(pos) {
            return Ok(eval::evaluate(pos));
        }
        let maximizing = pos.side_to_move() == Color::White;
        let mut best = if maximizing { i32::MIN } else { i32::MAX };
        for mv in &moves {
            let undo = pos.make_move(mv);
            let score = self.value(pos, depth - 1);
            pos.unmake_move(mv, undo);
            let score = score?;
            best = if maximizing {
                best.max(score)
            } else {
                best.min(score)
            };
        }
        Ok(best)
    }

    fn is_settled(pos: &Position) -> bool {
        movegen::is_fifty_move_draw(pos) || movegen::is_insufficient_material(pos)
    }

    fn root(&mut self, pos: &Position, depth: u32) -> Result<SearchResult> {
        let moves = movegen::legal_moves(pos);
        let first = *moves.first().ok_or(GameError::NoLegalMoves)?;
        let maximizing = pos.side_to_move() == Color::White;
        let mut scratch = pos.clone();
        let mut best = first;
        let mut best_score = if maximizing { i32::MIN } else { i32::MAX };
        for mv in &moves {
            let undo = scratch.make_move(mv);
            let score = self.value(&mut scratch, depth - 1);
            scratch.unmake_move(mv, undo);
            let score = score?;
            let improves = if maximizing {
                score > best_score
            } else {
                score < best_score
            };
            if improves {
                best = *mv;
                best_score = score;
            }
        }
        Ok(SearchResult {
            best,
            score: best_score,
            nodes: self.nodes,
        })
    }
}

/// Picks moves for the computer side.
///
/// Holds the random generator used by `Easy`; seed it for reproducible games.
pub struct SearchEngine {
    rng: StdRng,
}

impl Default for SearchEngine {
    fn default() -> Self {
        SearchEngine::new()
    }
}

impl SearchEngine {
    pub fn new() -> SearchEngine {
        SearchEngine {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> SearchEngine {
        SearchEngine {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Selects a move without bounds.
    pub fn select_move(&mut self, pos: &Position, difficulty: Difficulty) -> Result<Move> {
        self.search(pos, difficulty, &SearchLimits::unbounded())
            .map(|result| result.best)
    }

    pub fn search(
        &mut self,
        pos: &Position,
        difficulty: Difficulty,
        limits: &SearchLimits,
    ) -> Result<SearchResult> {
        let result = match difficulty.depth() {
            None => {
                let moves = movegen::legal_moves(pos);
                if moves.is_empty() {
                    return Err(GameError::NoLegalMoves);
                }
                let best = moves[self.rng.random_range(0..moves.len())];
                SearchResult {
                    best,
                    score: 0,
                    nodes: 1,
                }
            }
            Some(depth) => {
                let mut minimax = Minimax { limits, nodes: 0 };
                minimax.root(pos, depth)?
            }
        };
        debug!(
            "{} search picked {} (score {}, {} nodes)",
            difficulty, result.best, result.score, result.nodes
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    #[test]
    fn difficulty_depths() {
        assert_eq!(None, Difficulty::Easy.depth());
        assert_eq!(Some(2), Difficulty::Medium.depth());
        assert_eq!(Some(3), Difficulty::Hard.depth());
        assert_eq!(Difficulty::Hard, "hard".parse().unwrap());
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn finds_mate_in_one_for_white() {
        let p = pos("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
        let mv = SearchEngine::with_seed(1)
            .select_move(&p, Difficulty::Medium)
            .unwrap();
        assert_eq!("a1a8", mv.to_coordinate());
    }

    #[test]
    fn finds_mate_in_one_for_black() {
        let p = pos("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2");
        let result = SearchEngine::with_seed(1)
            .search(&p, Difficulty::Medium, &SearchLimits::unbounded())
            .unwrap();
        assert_eq!("d8h4", result.best.to_coordinate());
        assert_eq!(-eval::MATE_SCORE, result.score);
    }

    #[test]
    fn easy_is_reproducible_with_a_seed() {
        let p = Position::startpos();
        let a = SearchEngine::with_seed(7).select_move(&p, Difficulty::Easy).unwrap();
        let b = SearchEngine::with_seed(7).select_move(&p, Difficulty::Easy).unwrap();
        assert_eq!(a, b);
        assert!(movegen::legal_moves(&p).contains(&a));
    }

    #[test]
    fn no_moves_is_an_error() {
        let mated = pos("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
        for difficulty in [Difficulty::Easy, Difficulty::Medium] {
            assert_eq!(
                Err(GameError::NoLegalMoves),
                SearchEngine::with_seed(0).select_move(&mated, difficulty)
            );
        }
    }

    #[test]
    fn cancelled_search_returns_nothing() {
        let token = CancelToken::new();
        token.cancel();
        let limits = SearchLimits::unbounded().with_cancel(token);
        let result = SearchEngine::with_seed(0).search(&Position::startpos(), Difficulty::Hard, &limits);
        assert_eq!(Err(GameError::SearchCancelled), result);
    }

    #[test]
    fn node_budget_interrupts() {
        let limits = SearchLimits::unbounded().with_max_nodes(50);
        let result = SearchEngine::with_seed(0).search(&Position::startpos(), Difficulty::Medium, &limits);
        assert_eq!(Err(GameError::SearchCancelled), result);
    }
}
