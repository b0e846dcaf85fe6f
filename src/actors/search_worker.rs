use actix::prelude::*;
use log::debug;

use crate::error::Result;
use crate::rules::Position;
use crate::search::{Difficulty, SearchEngine, SearchLimits, SearchResult};

/// Runs move searches on a dedicated thread pool
pub struct SearchWorker {
    engine: SearchEngine,
}

impl SearchWorker {
    pub fn new(engine: SearchEngine) -> SearchWorker {
        SearchWorker { engine }
    }

    /// Starts `threads` workers with randomly seeded engines
    pub fn start_pool(threads: usize) -> Addr<SearchWorker> {
        SyncArbiter::start(threads, || SearchWorker::new(SearchEngine::new()))
    }

    /// Starts one worker whose random play is reproducible
    pub fn start_seeded(seed: u64) -> Addr<SearchWorker> {
        SyncArbiter::start(1, move || SearchWorker::new(SearchEngine::with_seed(seed)))
    }
}

impl Actor for SearchWorker {
    type Context = SyncContext<Self>;
}

/// Asks a worker for the best move in `position`
#[derive(Message)]
#[rtype(result = "Result<SearchResult>")]
pub struct SelectMove {
    pub position: Position,
    pub difficulty: Difficulty,
    pub limits: SearchLimits,
}

impl Handler<SelectMove> for SearchWorker {
    type Result = Result<SearchResult>;

    fn handle(&mut self, msg: SelectMove, _: &mut Self::Context) -> Self::Result {
        debug!("Searching {} at {}", msg.position.to_fen(), msg.difficulty);
        self.engine.search(&msg.position, msg.difficulty, &msg.limits)
    }
}
