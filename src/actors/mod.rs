//! Actor front end: a game actor with a real-time clock and a pool of search workers.

pub mod game_actor;
pub mod search_worker;

pub use game_actor::*;
pub use search_worker::{SearchWorker, SelectMove};
