use chess_session::game::{GameSession, SessionState};
use chess_session::models::{Player, RoomCommand, RoomInfo, RoomMessage, Settings, TimeControl};
use chess_session::multiplayer::{channel, RemoteLink, RoomEndpoint};
use chess_session::rules::{Color, Square};

struct Seat {
    session: GameSession,
    link: RemoteLink,
    endpoint: RoomEndpoint,
    player: Player,
}

fn seat(color: Color, name: &str) -> Seat {
    let mut session = GameSession::new();
    session
        .initialize_game(Settings::online(TimeControl::blitz()))
        .unwrap();
    let player = Player::new(name, color, 300);
    let (link, endpoint) = channel(player.id, color);
    Seat {
        session,
        link,
        endpoint,
        player,
    }
}

fn enter_room(seat: &mut Seat, players: Vec<Player>) {
    let room = RoomInfo {
        id: "lobby".to_string(),
        code: "Q7Z2K9".parse().unwrap(),
        players,
        settings: Settings::online(TimeControl::blitz()),
        is_active: true,
    };
    seat.endpoint
        .messages
        .unbounded_send(RoomMessage::RoomJoined { room })
        .unwrap();
    seat.link.pump(&mut seat.session).unwrap();
}

/// Forwards everything `from` sent to the room into `to`, the way a relay server would.
fn relay(from: &mut Seat, to: &mut Seat) {
    from.link.flush(&mut from.session).unwrap();
    while let Ok(Some(command)) = from.endpoint.commands.try_next() {
        let message = match command {
            RoomCommand::MakeMove { player_id, mv, .. } => RoomMessage::MoveMade { player_id, mv },
            RoomCommand::OfferDraw { .. } => RoomMessage::DrawOffered {
                player_id: from.player.id,
            },
            RoomCommand::RespondDraw { accept: false, .. } => RoomMessage::DrawDeclined {
                player_id: from.player.id,
            },
            RoomCommand::ReportResult { result, .. } => RoomMessage::GameEnded { result },
            _ => continue,
        };
        to.endpoint.messages.unbounded_send(message).unwrap();
    }
    to.link.pump(&mut to.session).unwrap();
}

fn sq(text: &str) -> Square {
    text.parse().unwrap()
}

#[test]
fn two_sessions_stay_in_step() {
    let mut white = seat(Color::White, "Alice");
    let mut black = seat(Color::Black, "Bruno");
    let players = vec![white.player.clone(), black.player.clone()];
    enter_room(&mut white, players.clone());
    enter_room(&mut black, players);

    white.session.submit_move(sq("e2"), sq("e4"), None).unwrap();
    relay(&mut white, &mut black);
    black.session.submit_move(sq("e7"), sq("e5"), None).unwrap();
    relay(&mut black, &mut white);

    assert_eq!(white.session.position(), black.session.position());
    assert_eq!(2, white.session.history().len());
    assert!(white.link.last_error().is_none());
    assert!(black.link.last_error().is_none());
}

#[test]
fn declined_draw_offer_reaches_the_offerer() {
    let mut white = seat(Color::White, "Alice");
    let mut black = seat(Color::Black, "Bruno");
    let players = vec![white.player.clone(), black.player.clone()];
    enter_room(&mut white, players.clone());
    enter_room(&mut black, players);

    assert_eq!(None, white.session.offer_draw(Color::White).unwrap());
    relay(&mut white, &mut black);
    assert_eq!(Some(Color::White), black.session.draw_offer());

    black.session.decline_draw().unwrap();
    relay(&mut black, &mut white);
    assert_eq!(None, white.session.draw_offer());
    assert_eq!(SessionState::Active, white.session.state());
}

#[test]
fn checkmate_is_reported_once() {
    let mut white = seat(Color::White, "Alice");
    let mut black = seat(Color::Black, "Bruno");
    let players = vec![white.player.clone(), black.player.clone()];
    enter_room(&mut white, players.clone());
    enter_room(&mut black, players);

    for (mover_is_white, from, to) in [
        (true, "f2", "f3"),
        (false, "e7", "e5"),
        (true, "g2", "g4"),
        (false, "d8", "h4"),
    ] {
        if mover_is_white {
            white.session.submit_move(sq(from), sq(to), None).unwrap();
            relay(&mut white, &mut black);
        } else {
            black.session.submit_move(sq(from), sq(to), None).unwrap();
            relay(&mut black, &mut white);
        }
    }

    assert!(white.session.state().is_ended());
    assert_eq!(white.session.result(), black.session.result());
    assert!(white.link.last_error().is_none());
}
