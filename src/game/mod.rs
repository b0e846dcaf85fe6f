pub mod clock;
pub mod session;
pub mod state;
pub mod utils;

pub use clock::{Clock, TimerState};
pub use session::{GameSession, SearchRequest};
pub use state::*;
