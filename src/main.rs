use std::env;
use std::error::Error;

use actix::Actor;
use log::info;

use chess_session::actors::{
    GameActor, GetSnapshot, NewGame, RequestComputerMove, SearchWorker, SubmitMove, TakeEvents,
};
use chess_session::game::utils::{format_time, game_phase, game_status};
use chess_session::{
    Difficulty, GameMode, GameSession, SearchEngine, SessionEvent, SessionState, Settings,
    TimeControl,
};

/// Longest game the demo plays before giving up
const MAX_PLIES: usize = 300;

#[actix_rt::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Settings come from an optional JSON file, otherwise a rapid game against the computer
    let settings = match env::args().nth(1) {
        Some(path) => {
            info!("Loading settings from {}", path);
            Settings::load(path)?
        }
        None => Settings::computer(TimeControl::rapid(), Difficulty::Medium),
    };

    let worker = SearchWorker::start_pool(2);
    let game = GameActor::new(GameSession::new(), worker).start();
    game.send(NewGame(settings.clone())).await??;

    // The side the session does not play itself is moved by a random engine
    let mut opponent = SearchEngine::new();
    for _ in 0..MAX_PLIES {
        let snapshot = game.send(GetSnapshot).await?;
        if snapshot.state != SessionState::Active {
            break;
        }

        let turn = snapshot.game.turn;
        let computer_turn =
            settings.game_mode == GameMode::Computer && turn == settings.computer_color;
        if computer_turn {
            game.send(RequestComputerMove).await??;
        } else {
            let mv = opponent.select_move(&snapshot.game.position, Difficulty::Easy)?;
            game.send(SubmitMove {
                from: mv.from,
                to: mv.to,
                promotion: mv.promotion,
            })
            .await??;
        }

        for event in game.send(TakeEvents).await? {
            if let SessionEvent::MoveMade { record } = event {
                info!("{} plays {}", record.color, record.san);
            }
        }
    }

    let snapshot = game.send(GetSnapshot).await?;
    let result = match snapshot.state {
        SessionState::Ended(result) => Some(result),
        _ => None,
    };
    info!(
        "Finished after {} moves in the {:?}: {} (white {}, black {})",
        snapshot.stats.moves_played,
        game_phase(snapshot.game.history.len()),
        game_status(&snapshot.game.position, result.as_ref()),
        format_time(snapshot.timer.white_time),
        format_time(snapshot.timer.black_time)
    );

    Ok(())
}
