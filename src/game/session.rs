use std::collections::{HashMap, VecDeque};

use log::{info, warn};

use crate::error::{GameError, Result};
use crate::game::clock::{Clock, TimerState};
use crate::game::state::{
    CapturedPieces, EndReason, GameResult, GameState, GameStats, MoveRecord, MoveReport,
    SessionEvent, SessionState, SubmitOutcome,
};
use crate::models::{GameMode, Player, Settings};
use crate::rules::{movegen, notation, Color, CoordinateMove, Move, PieceType, Position, Square};
use crate::search::{Difficulty, SearchEngine};

/// Number of occurrences of a position that ends the game in a draw.
const REPETITION_LIMIT: u32 = 3;

/// A pawn move to the last rank waiting for the piece choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingPromotion {
    from: Square,
    to: Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DrawOffer {
    color: Color,
    remote: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Local,
    Remote,
}

/// Work handed to a search engine when the computer is on move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRequest {
    pub position: Position,
    pub difficulty: Difficulty,
}

/// One game from initialization to result, owned by a single caller.
///
/// Every failing operation returns an error and leaves the session exactly
/// as it was.
#[derive(Clone, Debug)]
pub struct GameSession {
    state: SessionState,
    settings: Settings,
    position: Position,
    history: Vec<MoveRecord>,
    captured: CapturedPieces,
    stats: GameStats,
    clock: Clock,
    players: Vec<Player>,
    repetitions: HashMap<String, u32>,
    pending_promotion: Option<PendingPromotion>,
    search_in_flight: bool,
    draw_offer: Option<DrawOffer>,
    events: VecDeque<SessionEvent>,
}

impl Default for GameSession {
    fn default() -> Self {
        GameSession::new()
    }
}

impl GameSession {
    pub fn new() -> GameSession {
        let settings = Settings::default();
        let clock = Clock::new(settings.time_per_player, settings.increment);
        GameSession {
            state: SessionState::Idle,
            settings,
            position: Position::startpos(),
            history: Vec::new(),
            captured: CapturedPieces::default(),
            stats: GameStats::default(),
            clock,
            players: Vec::new(),
            repetitions: HashMap::new(),
            pending_promotion: None,
            search_in_flight: false,
            draw_offer: None,
            events: VecDeque::new(),
        }
    }

    fn reject(&self, action: &'static str) -> GameError {
        GameError::InvalidStateTransition {
            action,
            state: self.state.name(),
        }
    }

    fn ensure_active(&self, action: &'static str) -> Result<()> {
        match self.state {
            SessionState::Active => Ok(()),
            _ => Err(self.reject(action)),
        }
    }

    fn ensure_in_progress(&self, action: &'static str) -> Result<()> {
        match self.state {
            SessionState::Active | SessionState::Paused => Ok(()),
            _ => Err(self.reject(action)),
        }
    }

    // ---- lifecycle ----

    /// Starts a new game from the standard position. Only from Idle or Ended.
    pub fn initialize_game(&mut self, settings: Settings) -> Result<()> {
        match self.state {
            SessionState::Idle | SessionState::Ended(_) => {}
            _ => return Err(self.reject("initialize a game")),
        }
        let settings = settings.sanitized()?;
        self.start(settings);
        Ok(())
    }

    /// Starts over with the settings of the current game.
    pub fn reset_game(&mut self) -> Result<()> {
        if self.state == SessionState::Idle {
            return Err(self.reject("reset the game"));
        }
        info!("Resetting game");
        self.start(self.settings.clone());
        Ok(())
    }

    fn start(&mut self, settings: Settings) {
        // Position
        self.position = Position::startpos();
        self.history.clear();
        self.captured = CapturedPieces::default();
        self.stats = GameStats::default();
        self.repetitions.clear();
        self.repetitions.insert(self.position.repetition_key(), 1);

        // Pending interactions
        self.pending_promotion = None;
        self.search_in_flight = false;
        self.draw_offer = None;
        self.events.clear();

        // Clock and players
        self.clock = Clock::new(settings.time_per_player, settings.increment);
        self.clock.start();
        self.players = Color::ALL
            .iter()
            .map(|&color| Player::new(settings.player_name(color), color, settings.time_per_player))
            .collect();

        info!(
            "Starting {} game, {}+{}s per player",
            settings.game_mode, settings.time_per_player, settings.increment
        );
        self.settings = settings;
        self.state = SessionState::Active;
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_active("pause")?;
        self.clock.stop();
        self.state = SessionState::Paused;
        info!("Game paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.state != SessionState::Paused {
            return Err(self.reject("resume"));
        }
        self.clock.start();
        self.state = SessionState::Active;
        info!("Game resumed");
        Ok(())
    }

    pub fn resign(&mut self, color: Color) -> Result<GameResult> {
        self.ensure_in_progress("resign")?;
        info!("{} resigns", color);
        self.events.push_back(SessionEvent::Resigned { color });
        Ok(self.finish(GameResult::decisive(!color, EndReason::Resignation), true))
    }

    /// A player leaves an unfinished game; the other side wins.
    pub fn abandon(&mut self, color: Color) -> Result<GameResult> {
        self.ensure_in_progress("abandon")?;
        info!("{} abandoned the game", color);
        Ok(self.finish(GameResult::decisive(!color, EndReason::Abandonment), true))
    }

    /// Offers a draw on behalf of `color`.
    ///
    /// Local and computer games end at once. Online games record the offer
    /// and wait for the room service to report the answer.
    pub fn offer_draw(&mut self, color: Color) -> Result<Option<GameResult>> {
        self.ensure_active("offer a draw")?;
        if self.settings.game_mode != GameMode::Online {
            info!("{} offers a draw, accepted", color);
            return Ok(Some(self.finish(GameResult::draw(EndReason::Draw), true)));
        }
        info!("{} offers a draw", color);
        self.draw_offer = Some(DrawOffer {
            color,
            remote: false,
        });
        self.events.push_back(SessionEvent::DrawOffered { color });
        Ok(None)
    }

    /// Records a draw offer made by the remote opponent.
    pub fn receive_draw_offer(&mut self, color: Color) -> Result<()> {
        self.ensure_active("receive a draw offer")?;
        info!("Remote {} offers a draw", color);
        self.draw_offer = Some(DrawOffer {
            color,
            remote: true,
        });
        Ok(())
    }

    fn take_remote_offer(&self) -> Result<DrawOffer> {
        match self.draw_offer {
            Some(offer) if offer.remote => Ok(offer),
            _ => Err(GameError::InvalidStateTransition {
                action: "answer a draw offer",
                state: "without a pending offer",
            }),
        }
    }

    pub fn accept_draw(&mut self) -> Result<GameResult> {
        self.ensure_active("accept a draw")?;
        let offer = self.take_remote_offer()?;
        info!("{} accepts the draw", !offer.color);
        self.events
            .push_back(SessionEvent::DrawAccepted { color: !offer.color });
        Ok(self.finish(GameResult::draw(EndReason::Draw), true))
    }

    pub fn decline_draw(&mut self) -> Result<()> {
        self.ensure_active("decline a draw")?;
        let offer = self.take_remote_offer()?;
        self.draw_offer = None;
        info!("{} declines the draw", !offer.color);
        self.events
            .push_back(SessionEvent::DrawDeclined { color: !offer.color });
        Ok(())
    }

    /// The remote opponent turned down our offer.
    pub fn receive_draw_decline(&mut self) -> Result<()> {
        self.ensure_active("receive a draw decline")?;
        match self.draw_offer {
            Some(offer) if !offer.remote => {
                info!("Draw offer by {} was declined", offer.color);
                self.draw_offer = None;
                Ok(())
            }
            _ => Err(GameError::InvalidStateTransition {
                action: "receive a draw decline",
                state: "without a pending offer",
            }),
        }
    }

    /// Advances the clock by `elapsed` seconds while the game is Active.
    ///
    /// Returns the result when the tick made a flag fall.
    pub fn tick(&mut self, elapsed: u32) -> Result<Option<GameResult>> {
        self.ensure_active("tick the clock")?;
        self.stats.time_elapsed = self.stats.time_elapsed.saturating_add(elapsed);
        let expired = self.clock.tick(elapsed);
        self.sync_players();
        match expired {
            Some(color) => self.on_clock_expired(color).map(Some),
            None => Ok(None),
        }
    }

    pub fn on_clock_expired(&mut self, color: Color) -> Result<GameResult> {
        self.ensure_active("time out")?;
        info!("{} ran out of time", color);
        Ok(self.finish(GameResult::decisive(!color, EndReason::Timeout), true))
    }

    fn finish(&mut self, result: GameResult, announce: bool) -> GameResult {
        self.clock.stop();
        self.pending_promotion = None;
        self.search_in_flight = false;
        self.draw_offer = None;
        self.state = SessionState::Ended(result);
        self.sync_players();
        if announce {
            self.events.push_back(SessionEvent::GameEnded { result });
        }
        info!(
            "Game over: {:?} by {:?}, winner {}",
            result.outcome,
            result.reason,
            result.winner.map_or("none".to_string(), |c| c.to_string())
        );
        result
    }

    // ---- moves ----

    /// Plays a move for the side to move.
    ///
    /// A pawn reaching the last rank without `promotion` leaves the move
    /// pending until `resolve_promotion`. A promotion piece given for any
    /// other move is ignored.
    pub fn submit_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> Result<SubmitOutcome> {
        self.check_can_move("move")?;
        self.play(from, to, promotion, Origin::Local)
    }

    fn check_can_move(&self, action: &'static str) -> Result<()> {
        self.ensure_active(action)?;
        if let Some(pending) = self.pending_promotion {
            return Err(GameError::PendingPromotion(pending.to.to_string()));
        }
        if self.search_in_flight {
            return Err(GameError::SearchInFlight);
        }
        Ok(())
    }

    pub fn resolve_promotion(&mut self, piece: PieceType) -> Result<SubmitOutcome> {
        self.ensure_active("resolve a promotion")?;
        let pending = self.pending_promotion.ok_or_else(|| {
            GameError::IllegalMove("no promotion is pending".to_string())
        })?;
        if !piece.is_promotion_target() {
            return Err(GameError::IllegalMove(format!("cannot promote to a {piece}")));
        }
        self.pending_promotion = None;
        let outcome = self.play(pending.from, pending.to, Some(piece), Origin::Local);
        if outcome.is_err() {
            self.pending_promotion = Some(pending);
        }
        outcome
    }

    /// Dismisses a pending promotion without moving. Returns whether one was pending.
    pub fn cancel_promotion(&mut self) -> bool {
        self.pending_promotion.take().is_some()
    }

    fn play(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
        origin: Origin,
    ) -> Result<SubmitOutcome> {
        let candidates: Vec<Move> = movegen::legal_moves_from(&self.position, from)?
            .into_iter()
            .filter(|mv| mv.to == to)
            .collect();
        let Some(first) = candidates.first().copied() else {
            return Err(GameError::IllegalMove(format!("{from}{to}")));
        };

        let mv = if first.promotion.is_some() {
            match promotion {
                None if origin == Origin::Local => {
                    info!("Promotion pending on {}", to);
                    self.pending_promotion = Some(PendingPromotion { from, to });
                    return Ok(SubmitOutcome::PromotionPending { square: to });
                }
                None => {
                    return Err(GameError::IllegalMove(format!(
                        "{from}{to} needs a promotion piece"
                    )))
                }
                Some(piece) => candidates
                    .into_iter()
                    .find(|mv| mv.promotion == Some(piece))
                    .ok_or_else(|| GameError::IllegalMove(format!("cannot promote to a {piece}")))?,
            }
        } else {
            first
        };

        let report = self.commit(mv, origin);
        Ok(SubmitOutcome::Played(report))
    }

    fn commit(&mut self, mv: Move, origin: Origin) -> MoveReport {
        let mover = self.position.side_to_move();
        let fen_before = self.position.to_fen();
        let annotated = notation::annotate(&self.position, &mv);
        let san = notation::to_san(&self.position, &mv);

        self.position.make_move(&annotated);

        let record = MoveRecord {
            mv: annotated,
            color: mover,
            san,
            coordinate: annotated.to_coordinate(),
            fen_before,
            fen_after: self.position.to_fen(),
        };
        self.history.push(record.clone());

        // Captures and stats
        if let Some(kind) = annotated.captured {
            self.captured.record(mover, kind);
            self.stats.captures += 1;
        }
        self.stats.moves_played += 1;
        if annotated.is_check() {
            self.stats.checks += 1;
        }

        // Clock
        self.clock.add_increment(mover);
        self.clock.switch_active(!mover);
        self.sync_players();

        // Repetition table
        let seen = self
            .repetitions
            .entry(self.position.repetition_key())
            .or_insert(0);
        *seen += 1;
        let repeated = *seen >= REPETITION_LIMIT;

        self.draw_offer = None;
        info!("{} plays {} ({})", mover, record.san, record.coordinate);
        if origin == Origin::Local {
            self.events.push_back(SessionEvent::MoveMade {
                record: record.clone(),
            });
        }

        // Terminal conditions
        let is_checkmate = annotated.is_checkmate();
        let is_stalemate = !annotated.is_check() && !movegen::has_legal_move(&self.position);
        let is_draw = is_stalemate
            || repeated
            || movegen::is_fifty_move_draw(&self.position)
            || movegen::is_insufficient_material(&self.position);

        let result = if is_checkmate {
            Some(GameResult::decisive(mover, EndReason::Checkmate))
        } else if is_stalemate {
            Some(GameResult::draw(EndReason::Stalemate))
        } else if is_draw {
            Some(GameResult::draw(EndReason::Draw))
        } else {
            None
        };
        // The side that made the move reports the result
        let result = result.map(|r| self.finish(r, origin == Origin::Local));

        MoveReport {
            record,
            is_capture: annotated.is_capture(),
            is_check: annotated.is_check(),
            is_checkmate,
            is_stalemate,
            is_draw,
            is_game_over: result.is_some(),
            result,
        }
    }

    // ---- computer play ----

    pub fn is_computer_turn(&self) -> bool {
        self.settings.game_mode == GameMode::Computer
            && self.position.side_to_move() == self.settings.computer_color
    }

    /// Marks a search in flight and returns what to search.
    ///
    /// Moves are rejected until the search is completed or aborted.
    pub fn begin_computer_search(&mut self) -> Result<SearchRequest> {
        self.check_can_move("start a computer search")?;
        if !self.is_computer_turn() {
            return Err(GameError::NotComputerTurn);
        }
        let difficulty = self
            .settings
            .difficulty
            .ok_or_else(|| GameError::InvalidSettings("computer games need a difficulty".to_string()))?;
        self.search_in_flight = true;
        Ok(SearchRequest {
            position: self.position.clone(),
            difficulty,
        })
    }

    /// Plays the move a finished search selected.
    pub fn complete_computer_search(&mut self, mv: Move) -> Result<SubmitOutcome> {
        if !self.search_in_flight {
            return Err(self.reject("complete a computer search"));
        }
        // Paused while the engine was thinking; the search stays in flight
        self.ensure_active("complete a computer search")?;
        self.search_in_flight = false;
        let outcome = self.play(mv.from, mv.to, mv.promotion, Origin::Local);
        if outcome.is_err() {
            self.search_in_flight = true;
        }
        outcome
    }

    /// Clears the in-flight marker after a failed or cancelled search.
    pub fn abort_computer_search(&mut self) {
        self.search_in_flight = false;
    }

    /// Runs a whole computer turn on the calling thread.
    pub fn request_computer_move(&mut self, engine: &mut SearchEngine) -> Result<SubmitOutcome> {
        let request = self.begin_computer_search()?;
        match engine.select_move(&request.position, request.difficulty) {
            Ok(mv) => self.complete_computer_search(mv),
            Err(e) => {
                self.abort_computer_search();
                Err(e)
            }
        }
    }

    // ---- remote play ----

    /// Applies the opponent's move received from the room service.
    ///
    /// Goes through the same checks as a local move but is not queued as an
    /// outbound event.
    pub fn apply_remote_move(&mut self, mv: CoordinateMove) -> Result<SubmitOutcome> {
        let outcome = self
            .check_can_move("apply a remote move")
            .and_then(|_| self.play(mv.from, mv.to, mv.promotion, Origin::Remote));
        if let Err(e) = &outcome {
            warn!("Rejected remote move {}: {}", mv, e);
        }
        outcome
    }

    /// Ends the game with a result decided remotely.
    pub fn apply_remote_result(&mut self, result: GameResult) -> Result<GameResult> {
        self.ensure_in_progress("apply a remote result")?;
        Ok(self.finish(result, false))
    }

    /// Drains the outbound notifications queued since the last call.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    /// Puts undelivered events back in front of the queue, keeping their order.
    pub fn restore_events(&mut self, events: Vec<SessionEvent>) {
        for event in events.into_iter().rev() {
            self.events.push_front(event);
        }
    }

    // ---- accessors ----

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn captured(&self) -> &CapturedPieces {
        &self.captured
    }

    pub fn stats(&self) -> GameStats {
        self.stats
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn timer(&self) -> TimerState {
        self.clock.state()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, color: Color) -> Option<&Player> {
        self.players.iter().find(|p| p.color == color)
    }

    pub fn result(&self) -> Option<GameResult> {
        match self.state {
            SessionState::Ended(result) => Some(result),
            _ => None,
        }
    }

    pub fn pending_promotion(&self) -> Option<Square> {
        self.pending_promotion.map(|p| p.to)
    }

    pub fn is_search_in_flight(&self) -> bool {
        self.search_in_flight
    }

    /// Color of the side whose draw offer is outstanding.
    pub fn draw_offer(&self) -> Option<Color> {
        self.draw_offer.map(|offer| offer.color)
    }

    pub fn repetition_count(&self) -> u32 {
        self.repetitions
            .get(&self.position.repetition_key())
            .copied()
            .unwrap_or(0)
    }

    /// Destination squares for the piece on `from`.
    pub fn legal_targets(&self, from: Square) -> Result<Vec<Square>> {
        let moves = movegen::legal_moves_from(&self.position, from)?;
        let mut targets: Vec<Square> = moves.into_iter().map(|mv| mv.to).collect();
        targets.sort();
        targets.dedup();
        Ok(targets)
    }

    /// Snapshot derived from the position and history.
    pub fn game_state(&self) -> GameState {
        let turn = self.position.side_to_move();
        let is_check = movegen::is_in_check(&self.position, turn);
        let is_checkmate = movegen::is_checkmate(&self.position);
        let is_stalemate = movegen::is_stalemate(&self.position);
        let is_draw = movegen::is_draw(&self.position) || self.repetition_count() >= REPETITION_LIMIT;
        GameState {
            position: self.position.clone(),
            history: self.history.clone(),
            turn,
            is_check,
            is_checkmate,
            is_stalemate,
            is_draw,
            is_game_over: self.state.is_ended() || is_checkmate || is_draw,
        }
    }

    fn sync_players(&mut self) {
        let active = if self.state.is_ended() {
            None
        } else {
            self.clock.active()
        };
        for player in &mut self.players {
            player.time_remaining = self.clock.remaining(player.color);
            player.is_active = active == Some(player.color);
        }
    }
}
