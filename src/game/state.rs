use serde::{Deserialize, Serialize};

use crate::rules::{Color, Move, PieceType, Position, Square};

/// Result from white's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Checkmate,
    Resignation,
    Timeout,
    Stalemate,
    Draw,
    Abandonment,
}

/// How a game finished. Created once per game and never changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameResult {
    pub outcome: Outcome,
    pub reason: EndReason,
    pub winner: Option<Color>,
}

impl GameResult {
    pub fn decisive(winner: Color, reason: EndReason) -> GameResult {
        let outcome = match winner {
            Color::White => Outcome::Win,
            Color::Black => Outcome::Loss,
        };
        GameResult {
            outcome,
            reason,
            winner: Some(winner),
        }
    }

    pub fn draw(reason: EndReason) -> GameResult {
        GameResult {
            outcome: Outcome::Draw,
            reason,
            winner: None,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.outcome == Outcome::Draw
    }
}

/// Pieces taken so far, listed under the side that took them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPieces {
    pub white: Vec<PieceType>,
    pub black: Vec<PieceType>,
}

impl CapturedPieces {
    pub fn record(&mut self, capturer: Color, kind: PieceType) {
        match capturer {
            Color::White => self.white.push(kind),
            Color::Black => self.black.push(kind),
        }
    }

    pub fn by(&self, capturer: Color) -> &[PieceType] {
        match capturer {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// Centipawn value of everything `capturer` has taken.
    pub fn material(&self, capturer: Color) -> i32 {
        self.by(capturer).iter().map(|kind| kind.value()).sum()
    }

    /// Positive when white has taken more material than black.
    pub fn material_balance(&self) -> i32 {
        self.material(Color::White) - self.material(Color::Black)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub moves_played: u32,
    pub checks: u32,
    pub captures: u32,
    pub time_elapsed: u32,
}

impl GameStats {
    /// Mean seconds per move, zero before the first move.
    pub fn average_move_time(&self) -> f64 {
        if self.moves_played == 0 {
            0.0
        } else {
            f64::from(self.time_elapsed) / f64::from(self.moves_played)
        }
    }
}

/// An applied move with its notations and surrounding encodings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    #[serde(rename = "move")]
    pub mv: Move,
    pub color: Color,
    pub san: String,
    pub coordinate: String,
    pub fen_before: String,
    pub fen_after: String,
}

/// Presentation flags for an accepted move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    pub record: MoveRecord,
    pub is_capture: bool,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_draw: bool,
    pub is_game_over: bool,
    pub result: Option<GameResult>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Played(MoveReport),
    PromotionPending { square: Square },
}

impl SubmitOutcome {
    pub fn report(&self) -> Option<&MoveReport> {
        match self {
            SubmitOutcome::Played(report) => Some(report),
            SubmitOutcome::PromotionPending { .. } => None,
        }
    }
}

/// Derived snapshot of the game, rebuilt on request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub position: Position,
    pub history: Vec<MoveRecord>,
    pub turn: Color,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_draw: bool,
    pub is_game_over: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "result", rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Active,
    Paused,
    Ended(GameResult),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
            SessionState::Ended(_) => "ended",
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, SessionState::Ended(_))
    }
}

/// Outbound notifications for whoever relays the game elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    MoveMade { record: MoveRecord },
    Resigned { color: Color },
    DrawOffered { color: Color },
    DrawAccepted { color: Color },
    DrawDeclined { color: Color },
    GameEnded { result: GameResult },
}
