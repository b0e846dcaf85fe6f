use std::time::Duration;

use actix::prelude::*;
use log::{info, warn};
use serde::Serialize;

use crate::actors::search_worker::{SearchWorker, SelectMove};
use crate::error::{GameError, Result};
use crate::game::{
    GameResult, GameSession, GameState, GameStats, SessionEvent, SessionState, SubmitOutcome,
    TimerState,
};
use crate::models::Settings;
use crate::rules::{Color, PieceType, Square};
use crate::search::{CancelToken, SearchLimits};

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Owns one game session and drives its clock in real time.
///
/// Computer moves are searched on a `SearchWorker` so the clock keeps
/// running while the engine thinks.
pub struct GameActor {
    session: GameSession,
    worker: Addr<SearchWorker>,
    tick_interval: Duration,
    ticker: Option<SpawnHandle>,
    // Time observed since the last whole second was charged
    carry: Duration,
    search_cancel: Option<CancelToken>,
}

impl GameActor {
    pub fn new(session: GameSession, worker: Addr<SearchWorker>) -> GameActor {
        GameActor {
            session,
            worker,
            tick_interval: DEFAULT_TICK_INTERVAL,
            ticker: None,
            carry: Duration::ZERO,
            search_cancel: None,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> GameActor {
        self.tick_interval = interval;
        self
    }

    fn start_ticker(&mut self, ctx: &mut Context<Self>) {
        if self.ticker.is_some() {
            return;
        }
        self.carry = Duration::ZERO;
        let handle = ctx.run_interval(self.tick_interval, |act, ctx| act.on_tick(ctx));
        self.ticker = Some(handle);
    }

    fn on_tick(&mut self, ctx: &mut Context<Self>) {
        if self.session.state() != SessionState::Active {
            return;
        }
        self.carry += self.tick_interval;
        let seconds = self.carry.as_secs();
        if seconds == 0 {
            return;
        }
        self.carry -= Duration::from_secs(seconds);

        let elapsed = u32::try_from(seconds).unwrap_or(u32::MAX);
        match self.session.tick(elapsed) {
            Ok(Some(result)) => info!("Clock flagged, winner {:?}", result.winner),
            Ok(None) => {}
            Err(e) => warn!("Clock tick rejected: {}", e),
        }
        self.after_update(ctx);
    }

    /// Stops the ticker and any running search once the game is over.
    fn after_update(&mut self, ctx: &mut Context<Self>) {
        if !self.session.state().is_ended() {
            return;
        }
        if let Some(handle) = self.ticker.take() {
            ctx.cancel_future(handle);
        }
        if let Some(token) = self.search_cancel.take() {
            token.cancel();
        }
    }
}

impl Actor for GameActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("Game actor started in state {}", self.session.state().name());
        self.start_ticker(ctx);
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        if let Some(token) = self.search_cancel.take() {
            token.cancel();
        }
        info!("Game actor stopped");
    }
}

/// Starts a fresh game with new settings
#[derive(Message)]
#[rtype(result = "Result<()>")]
pub struct NewGame(pub Settings);

#[derive(Message)]
#[rtype(result = "Result<SubmitOutcome>")]
pub struct SubmitMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceType>,
}

#[derive(Message)]
#[rtype(result = "Result<SubmitOutcome>")]
pub struct ResolvePromotion(pub PieceType);

#[derive(Message)]
#[rtype(result = "Result<()>")]
pub struct Pause;

#[derive(Message)]
#[rtype(result = "Result<()>")]
pub struct Resume;

#[derive(Message)]
#[rtype(result = "Result<GameResult>")]
pub struct Resign(pub Color);

#[derive(Message)]
#[rtype(result = "Result<Option<GameResult>>")]
pub struct OfferDraw(pub Color);

/// Plays the computer's move once the worker has found it
#[derive(Message)]
#[rtype(result = "Result<SubmitOutcome>")]
pub struct RequestComputerMove;

/// Drains the session's outbound events
#[derive(Message)]
#[rtype(result = "Vec<SessionEvent>")]
pub struct TakeEvents;

#[derive(Message)]
#[rtype(result = "Snapshot")]
pub struct GetSnapshot;

/// Everything a view needs to draw the game
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub state: SessionState,
    pub game: GameState,
    pub timer: TimerState,
    pub stats: GameStats,
    pub pending_promotion: Option<Square>,
    pub thinking: bool,
}

impl Handler<NewGame> for GameActor {
    type Result = Result<()>;

    fn handle(&mut self, msg: NewGame, ctx: &mut Self::Context) -> Self::Result {
        self.session.initialize_game(msg.0)?;
        self.start_ticker(ctx);
        Ok(())
    }
}

impl Handler<SubmitMove> for GameActor {
    type Result = Result<SubmitOutcome>;

    fn handle(&mut self, msg: SubmitMove, ctx: &mut Self::Context) -> Self::Result {
        let outcome = self.session.submit_move(msg.from, msg.to, msg.promotion);
        self.after_update(ctx);
        outcome
    }
}

impl Handler<ResolvePromotion> for GameActor {
    type Result = Result<SubmitOutcome>;

    fn handle(&mut self, msg: ResolvePromotion, ctx: &mut Self::Context) -> Self::Result {
        let outcome = self.session.resolve_promotion(msg.0);
        self.after_update(ctx);
        outcome
    }
}

impl Handler<Pause> for GameActor {
    type Result = Result<()>;

    fn handle(&mut self, _: Pause, _: &mut Self::Context) -> Self::Result {
        self.session.pause()
    }
}

impl Handler<Resume> for GameActor {
    type Result = Result<()>;

    fn handle(&mut self, _: Resume, _: &mut Self::Context) -> Self::Result {
        self.session.resume()
    }
}

impl Handler<Resign> for GameActor {
    type Result = Result<GameResult>;

    fn handle(&mut self, msg: Resign, ctx: &mut Self::Context) -> Self::Result {
        let result = self.session.resign(msg.0);
        self.after_update(ctx);
        result
    }
}

impl Handler<OfferDraw> for GameActor {
    type Result = Result<Option<GameResult>>;

    fn handle(&mut self, msg: OfferDraw, ctx: &mut Self::Context) -> Self::Result {
        let result = self.session.offer_draw(msg.0);
        self.after_update(ctx);
        result
    }
}

impl Handler<RequestComputerMove> for GameActor {
    type Result = ResponseActFuture<Self, Result<SubmitOutcome>>;

    fn handle(&mut self, _: RequestComputerMove, _: &mut Self::Context) -> Self::Result {
        let request = match self.session.begin_computer_search() {
            Ok(request) => request,
            Err(e) => return Box::pin(fut::ready(Err(e))),
        };

        let token = CancelToken::new();
        self.search_cancel = Some(token.clone());
        let search = self.worker.send(SelectMove {
            position: request.position,
            difficulty: request.difficulty,
            limits: SearchLimits::unbounded().with_cancel(token),
        });

        Box::pin(search.into_actor(self).map(|response, act, ctx| {
            act.search_cancel = None;
            let found = match response {
                Ok(found) => found,
                Err(e) => Err(GameError::SearchUnavailable(e.to_string())),
            };
            let outcome = found.and_then(|result| act.session.complete_computer_search(result.best));
            if let Err(e) = &outcome {
                // The move is dropped; the caller may ask again once the game is active
                warn!("Computer move not played: {}", e);
                act.session.abort_computer_search();
            }
            act.after_update(ctx);
            outcome
        }))
    }
}

impl Handler<TakeEvents> for GameActor {
    type Result = MessageResult<TakeEvents>;

    fn handle(&mut self, _: TakeEvents, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.session.take_events())
    }
}

impl Handler<GetSnapshot> for GameActor {
    type Result = MessageResult<GetSnapshot>;

    fn handle(&mut self, _: GetSnapshot, _: &mut Self::Context) -> Self::Result {
        MessageResult(Snapshot {
            state: self.session.state(),
            game: self.session.game_state(),
            timer: self.session.timer(),
            stats: self.session.stats(),
            pending_promotion: self.session.pending_promotion(),
            thinking: self.session.is_search_in_flight(),
        })
    }
}
