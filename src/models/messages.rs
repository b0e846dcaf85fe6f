use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GameError, Result};
use crate::game::state::GameResult;
use crate::models::player::Player;
use crate::models::settings::Settings;
use crate::rules::CoordinateMove;

const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Six characters from `A-Z0-9`, shared out of band to join a room.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn generate<R: Rng>(rng: &mut R) -> RoomCode {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        RoomCode(code)
    }

    pub fn is_valid(code: &str) -> bool {
        code.len() == ROOM_CODE_LEN
            && code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = GameError;

    fn from_str(s: &str) -> Result<RoomCode> {
        if RoomCode::is_valid(s) {
            Ok(RoomCode(s.to_string()))
        } else {
            Err(GameError::InvalidSettings(format!("invalid room code {s:?}")))
        }
    }
}

impl Serialize for RoomCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RoomCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<RoomCode, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Room description sent by the room service
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub id: String,
    pub code: RoomCode,
    pub players: Vec<Player>,
    pub settings: Settings,
    pub is_active: bool,
}

/// Message sent from the session to the room service
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomCommand {
    CreateRoom {
        code: RoomCode,
    },
    JoinRoom {
        code: RoomCode,
    },
    LeaveRoom {
        room_id: String,
    },
    MakeMove {
        room_id: String,
        player_id: Uuid,
        #[serde(rename = "move")]
        mv: CoordinateMove,
        san: String,
    },
    OfferDraw {
        room_id: String,
    },
    RespondDraw {
        room_id: String,
        accept: bool,
    },
    Resign {
        room_id: String,
    },
    ReportResult {
        room_id: String,
        result: GameResult,
    },
    Rematch {
        room_id: String,
    },
}

/// Message sent from the room service to the session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomMessage {
    RoomCreated {
        room: RoomInfo,
    },
    RoomJoined {
        room: RoomInfo,
    },
    PlayerJoined {
        player: Player,
    },
    PlayerLeft {
        player_id: Uuid,
    },
    MoveMade {
        player_id: Uuid,
        #[serde(rename = "move")]
        mv: CoordinateMove,
    },
    GameEnded {
        result: GameResult,
    },
    DrawOffered {
        player_id: Uuid,
    },
    DrawDeclined {
        player_id: Uuid,
    },
    Error {
        message: String,
    },
}
