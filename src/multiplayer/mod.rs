//! Typed link between a session and an external room service.
//!
//! The link turns session events into `RoomCommand`s and applies inbound
//! `RoomMessage`s to the session. Room lifecycle messages only update the
//! roster, except that an opponent leaving an unfinished game is recorded as
//! an abandonment.

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use log::{info, warn};
use uuid::Uuid;

use crate::error::{GameError, Result};
use crate::game::{GameSession, SessionEvent, SessionState};
use crate::models::{Player, RoomCode, RoomCommand, RoomMessage};
use crate::rules::{Color, CoordinateMove};

/// The room service's end of the channel pair.
pub struct RoomEndpoint {
    pub commands: UnboundedReceiver<RoomCommand>,
    pub messages: UnboundedSender<RoomMessage>,
}

/// The session's end of the channel pair.
pub struct RemoteLink {
    local_id: Uuid,
    local_color: Color,
    room_id: Option<String>,
    roster: Vec<Player>,
    last_error: Option<String>,
    commands: UnboundedSender<RoomCommand>,
    messages: UnboundedReceiver<RoomMessage>,
}

/// Creates a connected link/endpoint pair for the local player.
pub fn channel(local_id: Uuid, local_color: Color) -> (RemoteLink, RoomEndpoint) {
    let (command_tx, command_rx) = mpsc::unbounded();
    let (message_tx, message_rx) = mpsc::unbounded();
    let link = RemoteLink {
        local_id,
        local_color,
        room_id: None,
        roster: Vec::new(),
        last_error: None,
        commands: command_tx,
        messages: message_rx,
    };
    let endpoint = RoomEndpoint {
        commands: command_rx,
        messages: message_tx,
    };
    (link, endpoint)
}

impl RemoteLink {
    pub fn local_id(&self) -> Uuid {
        self.local_id
    }

    pub fn local_color(&self) -> Color {
        self.local_color
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    /// Last error reported by the room service or raised applying its input.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn send(&self, command: RoomCommand) -> Result<()> {
        self.commands
            .unbounded_send(command)
            .map_err(|e| GameError::RoomUnavailable(e.to_string()))
    }

    fn require_room(&self) -> Result<String> {
        self.room_id
            .clone()
            .ok_or_else(|| GameError::RoomUnavailable("not in a room".to_string()))
    }

    pub fn create_room(&self, code: RoomCode) -> Result<()> {
        info!("Creating room {}", code);
        self.send(RoomCommand::CreateRoom { code })
    }

    pub fn join_room(&self, code: RoomCode) -> Result<()> {
        info!("Joining room {}", code);
        self.send(RoomCommand::JoinRoom { code })
    }

    pub fn leave_room(&mut self) -> Result<()> {
        let room_id = self.require_room()?;
        self.send(RoomCommand::LeaveRoom { room_id })?;
        self.room_id = None;
        self.roster.clear();
        Ok(())
    }

    pub fn rematch(&self) -> Result<()> {
        let room_id = self.require_room()?;
        self.send(RoomCommand::Rematch { room_id })
    }

    /// Sends every queued session event to the room. Returns how many were sent.
    ///
    /// Events that could not be delivered stay queued on the session.
    pub fn flush(&mut self, session: &mut GameSession) -> Result<usize> {
        let room_id = self.require_room()?;
        let mut events = session.take_events().into_iter();
        let mut sent = 0;
        while let Some(event) = events.next() {
            let command = self.command_for(&room_id, event.clone());
            if let Err(e) = self.send(command) {
                let mut unsent = vec![event];
                unsent.extend(events);
                warn!("{} events left undelivered: {}", unsent.len(), e);
                session.restore_events(unsent);
                return Err(e);
            }
            sent += 1;
        }
        Ok(sent)
    }

    fn command_for(&self, room_id: &str, event: SessionEvent) -> RoomCommand {
        let room_id = room_id.to_string();
        match event {
            SessionEvent::MoveMade { record } => RoomCommand::MakeMove {
                room_id,
                player_id: self.local_id,
                mv: CoordinateMove::from(&record.mv),
                san: record.san,
            },
            SessionEvent::Resigned { .. } => RoomCommand::Resign { room_id },
            SessionEvent::DrawOffered { .. } => RoomCommand::OfferDraw { room_id },
            SessionEvent::DrawAccepted { .. } => RoomCommand::RespondDraw {
                room_id,
                accept: true,
            },
            SessionEvent::DrawDeclined { .. } => RoomCommand::RespondDraw {
                room_id,
                accept: false,
            },
            SessionEvent::GameEnded { result } => RoomCommand::ReportResult { room_id, result },
        }
    }

    /// Applies every message already waiting, without blocking.
    ///
    /// Returns how many messages were handled. Input the session rejects is
    /// logged and kept in `last_error`; it does not stop the pump.
    pub fn pump(&mut self, session: &mut GameSession) -> Result<usize> {
        let mut handled = 0;
        loop {
            match self.messages.try_next() {
                Ok(Some(message)) => {
                    self.handle(message, session);
                    handled += 1;
                }
                Ok(None) => {
                    if handled == 0 {
                        return Err(GameError::RoomUnavailable(
                            "room service closed the channel".to_string(),
                        ));
                    }
                    break;
                }
                Err(_) => break,
            }
        }
        Ok(handled)
    }

    /// Waits for the next message and applies it. `None` once the room
    /// service has gone away.
    pub async fn next(&mut self, session: &mut GameSession) -> Option<RoomMessage> {
        let message = self.messages.next().await?;
        self.handle(message.clone(), session);
        Some(message)
    }

    fn opponent_color(&self) -> Color {
        !self.local_color
    }

    fn is_local(&self, player_id: Uuid) -> bool {
        player_id == self.local_id
    }

    fn record_error(&mut self, context: &str, error: GameError) {
        warn!("{}: {}", context, error);
        self.last_error = Some(format!("{context}: {error}"));
    }

    fn handle(&mut self, message: RoomMessage, session: &mut GameSession) {
        match message {
            RoomMessage::RoomCreated { room } | RoomMessage::RoomJoined { room } => {
                info!("In room {} ({})", room.id, room.code);
                self.room_id = Some(room.id);
                self.roster = room.players;
            }
            RoomMessage::PlayerJoined { player } => {
                info!("{} joined as {}", player.name, player.color);
                self.roster.retain(|p| p.id != player.id);
                self.roster.push(player);
            }
            RoomMessage::PlayerLeft { player_id } => {
                let left = self.roster.iter().position(|p| p.id == player_id);
                let Some(index) = left else {
                    return;
                };
                let player = self.roster.remove(index);
                info!("{} left the room", player.name);
                let in_progress = matches!(
                    session.state(),
                    SessionState::Active | SessionState::Paused
                );
                if !self.is_local(player_id) && in_progress {
                    if let Err(e) = session.abandon(player.color) {
                        self.record_error("abandonment", e);
                    }
                }
            }
            RoomMessage::MoveMade { player_id, mv } => {
                if self.is_local(player_id) {
                    return;
                }
                let turn = session.position().side_to_move();
                if turn != self.opponent_color() {
                    let e = GameError::IllegalMove(format!("{mv} played on {turn}'s turn"));
                    self.record_error("remote move", e);
                    return;
                }
                if let Err(e) = session.apply_remote_move(mv) {
                    self.record_error("remote move", e);
                }
            }
            RoomMessage::GameEnded { result } => {
                if session.state().is_ended() {
                    return;
                }
                if let Err(e) = session.apply_remote_result(result) {
                    self.record_error("remote result", e);
                }
            }
            RoomMessage::DrawOffered { player_id } => {
                if self.is_local(player_id) {
                    return;
                }
                if let Err(e) = session.receive_draw_offer(self.opponent_color()) {
                    self.record_error("draw offer", e);
                }
            }
            RoomMessage::DrawDeclined { player_id } => {
                if self.is_local(player_id) {
                    return;
                }
                if let Err(e) = session.receive_draw_decline() {
                    self.record_error("draw decline", e);
                }
            }
            RoomMessage::Error { message } => {
                warn!("Room service error: {}", message);
                self.last_error = Some(message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::EndReason;
    use crate::models::{RoomInfo, Settings, TimeControl};

    fn online_session() -> GameSession {
        let mut session = GameSession::new();
        session
            .initialize_game(Settings::online(TimeControl::rapid()))
            .unwrap();
        session
    }

    fn room(players: Vec<Player>) -> RoomInfo {
        RoomInfo {
            id: "room-1".to_string(),
            code: "ABC123".parse().unwrap(),
            players,
            settings: Settings::online(TimeControl::rapid()),
            is_active: true,
        }
    }

    #[test]
    fn flush_needs_a_room() {
        let mut session = online_session();
        let (mut link, _endpoint) = channel(Uuid::new_v4(), Color::White);
        assert!(link.flush(&mut session).is_err());
    }

    #[test]
    fn room_join_sets_roster() {
        let mut session = online_session();
        let (mut link, endpoint) = channel(Uuid::new_v4(), Color::White);
        let opponent = Player::new("Rival", Color::Black, 600);
        endpoint
            .messages
            .unbounded_send(RoomMessage::RoomJoined {
                room: room(vec![opponent.clone()]),
            })
            .unwrap();
        assert_eq!(1, link.pump(&mut session).unwrap());
        assert_eq!(Some("room-1"), link.room_id());
        assert_eq!(vec![opponent], link.roster());
    }

    #[test]
    fn service_errors_are_kept() {
        let mut session = online_session();
        let (mut link, endpoint) = channel(Uuid::new_v4(), Color::White);
        endpoint
            .messages
            .unbounded_send(RoomMessage::Error {
                message: "room full".to_string(),
            })
            .unwrap();
        link.pump(&mut session).unwrap();
        assert_eq!(Some("room full"), link.last_error());
    }

    fn joined(local: Uuid) -> (GameSession, RemoteLink, RoomEndpoint, Player) {
        let mut session = online_session();
        let (mut link, endpoint) = channel(local, Color::White);
        let opponent = Player::new("Rival", Color::Black, 600);
        endpoint
            .messages
            .unbounded_send(RoomMessage::RoomCreated {
                room: room(vec![opponent.clone()]),
            })
            .unwrap();
        link.pump(&mut session).unwrap();
        (session, link, endpoint, opponent)
    }

    #[test]
    fn local_moves_are_relayed_and_remote_moves_applied() {
        let local = Uuid::new_v4();
        let (mut session, mut link, mut endpoint, opponent) = joined(local);

        session
            .submit_move("e2".parse().unwrap(), "e4".parse().unwrap(), None)
            .unwrap();
        assert_eq!(1, link.flush(&mut session).unwrap());
        match endpoint.commands.try_next().unwrap().unwrap() {
            RoomCommand::MakeMove {
                room_id,
                player_id,
                mv,
                san,
            } => {
                assert_eq!("room-1", room_id);
                assert_eq!(local, player_id);
                assert_eq!("e2e4", mv.to_string());
                assert_eq!("e4", san);
            }
            other => panic!("unexpected command {other:?}"),
        }

        endpoint
            .messages
            .unbounded_send(RoomMessage::MoveMade {
                player_id: opponent.id,
                mv: "e7e5".parse().unwrap(),
            })
            .unwrap();
        link.pump(&mut session).unwrap();
        assert_eq!(2, session.history().len());
        assert!(session.take_events().is_empty());
    }

    #[test]
    fn rejected_remote_move_is_recorded() {
        let (mut session, mut link, endpoint, opponent) = joined(Uuid::new_v4());
        endpoint
            .messages
            .unbounded_send(RoomMessage::MoveMade {
                player_id: opponent.id,
                mv: "e7e5".parse().unwrap(),
            })
            .unwrap();
        link.pump(&mut session).unwrap();
        assert!(session.history().is_empty());
        assert!(link.last_error().unwrap().starts_with("remote move"));
    }

    #[test]
    fn opponent_cannot_move_local_pieces() {
        let (mut session, mut link, endpoint, opponent) = joined(Uuid::new_v4());
        endpoint
            .messages
            .unbounded_send(RoomMessage::MoveMade {
                player_id: opponent.id,
                mv: "e2e4".parse().unwrap(),
            })
            .unwrap();
        link.pump(&mut session).unwrap();
        assert!(session.history().is_empty());
        assert_eq!(Color::White, session.position().side_to_move());
        assert!(link.last_error().unwrap().starts_with("remote move"));
    }

    #[test]
    fn undelivered_events_stay_queued() {
        let (mut session, mut link, endpoint, _) = joined(Uuid::new_v4());
        session
            .submit_move("e2".parse().unwrap(), "e4".parse().unwrap(), None)
            .unwrap();
        session.resign(Color::White).unwrap();
        drop(endpoint);

        assert!(matches!(
            link.flush(&mut session),
            Err(GameError::RoomUnavailable(_))
        ));
        let events = session.take_events();
        assert_eq!(3, events.len());
        assert!(matches!(events[0], SessionEvent::MoveMade { .. }));
        assert!(matches!(events[2], SessionEvent::GameEnded { .. }));
    }

    #[test]
    fn opponent_leaving_is_abandonment() {
        let (mut session, mut link, endpoint, opponent) = joined(Uuid::new_v4());
        endpoint
            .messages
            .unbounded_send(RoomMessage::PlayerLeft {
                player_id: opponent.id,
            })
            .unwrap();
        link.pump(&mut session).unwrap();
        assert!(link.roster().is_empty());
        let result = session.result().unwrap();
        assert_eq!(EndReason::Abandonment, result.reason);
        assert_eq!(Some(Color::White), result.winner);
    }

    #[test]
    fn remote_draw_offer_can_be_accepted() {
        let (mut session, mut link, mut endpoint, opponent) = joined(Uuid::new_v4());
        endpoint
            .messages
            .unbounded_send(RoomMessage::DrawOffered {
                player_id: opponent.id,
            })
            .unwrap();
        link.pump(&mut session).unwrap();
        assert_eq!(Some(Color::Black), session.draw_offer());

        session.accept_draw().unwrap();
        assert_eq!(2, link.flush(&mut session).unwrap());
        assert!(matches!(
            endpoint.commands.try_next().unwrap(),
            Some(RoomCommand::RespondDraw { accept: true, .. })
        ));
        assert!(matches!(
            endpoint.commands.try_next().unwrap(),
            Some(RoomCommand::ReportResult { .. })
        ));
    }

    #[test]
    fn closed_channel_is_reported() {
        let mut session = online_session();
        let (mut link, endpoint) = channel(Uuid::new_v4(), Color::White);
        drop(endpoint);
        assert!(matches!(
            link.pump(&mut session),
            Err(GameError::RoomUnavailable(_))
        ));
    }
}
