use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GameError, Result};
use crate::rules::Color;

/// One side of a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub color: Color,
    /// Whole seconds left on this player's clock.
    pub time_remaining: u32,
    pub is_active: bool,
}

impl Player {
    pub fn new(name: impl Into<String>, color: Color, time_remaining: u32) -> Player {
        Player {
            id: Uuid::new_v4(),
            name: name.into(),
            color,
            time_remaining,
            is_active: color == Color::White,
        }
    }
}

/// Trims the name and strips angle brackets, then checks length and characters.
pub fn validate_player_name(name: &str) -> Result<String> {
    let sanitized: String = name.trim().chars().filter(|c| !matches!(c, '<' | '>')).collect();
    let len = sanitized.chars().count();
    if len == 0 {
        return Err(GameError::InvalidSettings("player name cannot be empty".to_string()));
    }
    if len < 2 {
        return Err(GameError::InvalidSettings(
            "player name must be at least 2 characters".to_string(),
        ));
    }
    if len > 20 {
        return Err(GameError::InvalidSettings(
            "player name must be at most 20 characters".to_string(),
        ));
    }
    if !sanitized
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || c == '_' || c == '-')
    {
        return Err(GameError::InvalidSettings(format!(
            "player name {sanitized:?} contains invalid characters"
        )));
    }
    Ok(sanitized)
}
