use std::time::Duration;

use actix::Actor;
use chess_session::actors::{
    GameActor, GetSnapshot, NewGame, OfferDraw, Pause, RequestComputerMove, Resume,
    SearchWorker, SubmitMove,
};
use chess_session::game::{EndReason, GameSession, SessionState};
use chess_session::models::{Settings, TimeControl, TimeControlKind};
use chess_session::rules::Color;
use chess_session::{Difficulty, GameError};

fn computer_settings() -> Settings {
    Settings::computer(TimeControl::rapid(), Difficulty::Medium)
}

#[actix_rt::test]
async fn computer_answers_a_move() {
    let game = GameActor::new(GameSession::new(), SearchWorker::start_seeded(11)).start();
    game.send(NewGame(computer_settings())).await.unwrap().unwrap();

    game.send(SubmitMove {
        from: "e2".parse().unwrap(),
        to: "e4".parse().unwrap(),
        promotion: None,
    })
    .await
    .unwrap()
    .unwrap();
    let outcome = game.send(RequestComputerMove).await.unwrap().unwrap();
    assert_eq!(Color::Black, outcome.report().unwrap().record.color);

    let snapshot = game.send(GetSnapshot).await.unwrap();
    assert_eq!(2, snapshot.game.history.len());
    assert_eq!(Color::White, snapshot.game.turn);
    assert!(!snapshot.thinking);

    // White to move again, so the computer must wait
    let err = game.send(RequestComputerMove).await.unwrap().unwrap_err();
    assert_eq!(GameError::NotComputerTurn, err);
}

#[actix_rt::test]
async fn clock_runs_out_in_real_time() {
    let session = GameSession::new();
    let game = GameActor::new(session, SearchWorker::start_seeded(1))
        .with_tick_interval(Duration::from_millis(50))
        .start();
    let settings = Settings::local(TimeControl::new(TimeControlKind::Custom, 1, 0));
    game.send(NewGame(settings)).await.unwrap().unwrap();

    actix_rt::time::sleep(Duration::from_millis(1500)).await;

    let snapshot = game.send(GetSnapshot).await.unwrap();
    match snapshot.state {
        SessionState::Ended(result) => {
            assert_eq!(EndReason::Timeout, result.reason);
            assert_eq!(Some(Color::Black), result.winner);
        }
        other => panic!("game still {other:?}"),
    }
    assert_eq!(0, snapshot.timer.white_time);
}

#[actix_rt::test]
async fn paused_game_keeps_its_time() {
    let game = GameActor::new(GameSession::new(), SearchWorker::start_seeded(1))
        .with_tick_interval(Duration::from_millis(50))
        .start();
    game.send(NewGame(Settings::local(TimeControl::blitz())))
        .await
        .unwrap()
        .unwrap();
    game.send(Pause).await.unwrap().unwrap();

    actix_rt::time::sleep(Duration::from_millis(1200)).await;
    let snapshot = game.send(GetSnapshot).await.unwrap();
    assert_eq!(SessionState::Paused, snapshot.state);
    assert_eq!(300, snapshot.timer.white_time);

    game.send(Resume).await.unwrap().unwrap();
    let result = game.send(OfferDraw(Color::White)).await.unwrap().unwrap();
    assert!(result.unwrap().is_draw());
}
