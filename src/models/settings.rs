use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::models::player::validate_player_name;
use crate::rules::Color;
use crate::search::Difficulty;

/// Longest allowed base time, one day.
pub const MAX_TIME_PER_PLAYER: u32 = 24 * 60 * 60;
pub const MAX_INCREMENT: u32 = 60;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Local,
    Computer,
    Online,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameMode::Local => "local",
            GameMode::Computer => "computer",
            GameMode::Online => "online",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeControlKind {
    Blitz,
    Rapid,
    Classical,
    Custom,
}

/// Base time and increment, both in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeControl {
    pub kind: TimeControlKind,
    pub time_per_player: u32,
    pub increment: u32,
}

impl TimeControl {
    pub const fn new(kind: TimeControlKind, time_per_player: u32, increment: u32) -> TimeControl {
        TimeControl {
            kind,
            time_per_player,
            increment,
        }
    }

    pub const fn blitz() -> TimeControl {
        TimeControl::new(TimeControlKind::Blitz, 300, 0)
    }

    pub const fn rapid() -> TimeControl {
        TimeControl::new(TimeControlKind::Rapid, 600, 0)
    }

    pub const fn classical() -> TimeControl {
        TimeControl::new(TimeControlKind::Classical, 1800, 0)
    }

    /// The menu of standard controls, with and without increment.
    pub fn presets() -> [TimeControl; 6] {
        [
            TimeControl::blitz(),
            TimeControl::new(TimeControlKind::Blitz, 300, 3),
            TimeControl::rapid(),
            TimeControl::new(TimeControlKind::Rapid, 600, 5),
            TimeControl::classical(),
            TimeControl::new(TimeControlKind::Classical, 1800, 10),
        ]
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.time_per_player / 60, self.increment)
    }
}

/// Parses `minutes+increment`, e.g. `5+3`. The increment part is optional.
impl FromStr for TimeControl {
    type Err = GameError;

    fn from_str(s: &str) -> Result<TimeControl> {
        let bad = || GameError::InvalidSettings(format!("malformed time control {s:?}"));
        let (minutes, increment) = match s.trim().split_once('+') {
            Some((m, i)) => (m, Some(i)),
            None => (s.trim(), None),
        };
        let minutes: u32 = minutes.trim().parse().map_err(|_| bad())?;
        let increment: u32 = match increment {
            Some(i) => i.trim().parse().map_err(|_| bad())?,
            None => 0,
        };
        let time_per_player = minutes.checked_mul(60).ok_or_else(bad)?;
        Ok(TimeControl::new(TimeControlKind::Custom, time_per_player, increment))
    }
}

/// Game configuration supplied at initialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub time_per_player: u32,
    pub increment: u32,
    pub game_mode: GameMode,
    pub difficulty: Option<Difficulty>,
    pub computer_color: Color,
    /// Presentation only.
    pub board_orientation: Color,
    pub white_name: String,
    pub black_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        let rapid = TimeControl::rapid();
        Settings {
            time_per_player: rapid.time_per_player,
            increment: rapid.increment,
            game_mode: GameMode::Local,
            difficulty: None,
            computer_color: Color::Black,
            board_orientation: Color::White,
            white_name: "White".to_string(),
            black_name: "Black".to_string(),
        }
    }
}

impl Settings {
    pub fn local(time_control: TimeControl) -> Settings {
        Settings::default().with_time_control(time_control)
    }

    pub fn computer(time_control: TimeControl, difficulty: Difficulty) -> Settings {
        Settings {
            game_mode: GameMode::Computer,
            difficulty: Some(difficulty),
            ..Settings::local(time_control)
        }
    }

    pub fn online(time_control: TimeControl) -> Settings {
        Settings {
            game_mode: GameMode::Online,
            ..Settings::local(time_control)
        }
    }

    pub fn with_time_control(mut self, time_control: TimeControl) -> Settings {
        self.time_per_player = time_control.time_per_player;
        self.increment = time_control.increment;
        self
    }

    pub fn time_control(&self) -> TimeControl {
        TimeControl::new(TimeControlKind::Custom, self.time_per_player, self.increment)
    }

    pub fn player_name(&self, color: Color) -> &str {
        match color {
            Color::White => &self.white_name,
            Color::Black => &self.black_name,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_per_player == 0 {
            return Err(GameError::InvalidSettings(
                "time per player must be positive".to_string(),
            ));
        }
        if self.time_per_player > MAX_TIME_PER_PLAYER {
            return Err(GameError::InvalidSettings(
                "time per player cannot exceed 24 hours".to_string(),
            ));
        }
        if self.increment > MAX_INCREMENT {
            return Err(GameError::InvalidSettings(format!(
                "increment cannot exceed {MAX_INCREMENT} seconds"
            )));
        }
        if self.game_mode == GameMode::Computer && self.difficulty.is_none() {
            return Err(GameError::InvalidSettings(
                "computer games need a difficulty".to_string(),
            ));
        }
        validate_player_name(&self.white_name)?;
        validate_player_name(&self.black_name)?;
        Ok(())
    }

    /// Validates and returns the settings with player names cleaned up.
    pub fn sanitized(mut self) -> Result<Settings> {
        self.validate()?;
        self.white_name = validate_player_name(&self.white_name)?;
        self.black_name = validate_player_name(&self.black_name)?;
        Ok(self)
    }

    /// Parses and validates settings from JSON; missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Settings> {
        let settings: Settings =
            serde_json::from_str(text).map_err(|e| GameError::InvalidSettings(e.to_string()))?;
        settings.sanitized()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GameError::InvalidSettings(format!("{}: {e}", path.display())))?;
        Settings::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_names_lose_brackets() {
        let settings = Settings {
            black_name: "<Judit_P>".to_string(),
            ..Settings::default()
        }
        .sanitized()
        .unwrap();
        assert_eq!("Judit_P", settings.black_name);
        assert_eq!("White", settings.white_name);
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(600, settings.time_per_player);
        assert_eq!(Color::Black, settings.computer_color);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut settings = Settings::default();
        settings.time_per_player = 0;
        assert!(matches!(settings.validate(), Err(GameError::InvalidSettings(_))));
        settings.time_per_player = MAX_TIME_PER_PLAYER + 1;
        assert!(settings.validate().is_err());
        settings.time_per_player = 60;
        settings.increment = 61;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn computer_mode_needs_difficulty() {
        let mut settings = Settings::computer(TimeControl::blitz(), Difficulty::Easy);
        assert!(settings.validate().is_ok());
        settings.difficulty = None;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn json_with_partial_fields() {
        let settings =
            Settings::from_json(r#"{"game_mode": "computer", "difficulty": "hard", "increment": 2}"#)
                .unwrap();
        assert_eq!(GameMode::Computer, settings.game_mode);
        assert_eq!(Some(Difficulty::Hard), settings.difficulty);
        assert_eq!(2, settings.increment);
        assert_eq!(600, settings.time_per_player);

        assert!(Settings::from_json(r#"{"game_mode": "computer"}"#).is_err());
        assert!(Settings::from_json(r#"{"game_mode": "chess960"}"#).is_err());
    }

    #[test]
    fn time_control_text() {
        let tc: TimeControl = "5+3".parse().unwrap();
        assert_eq!(300, tc.time_per_player);
        assert_eq!(3, tc.increment);
        assert_eq!("5+3", tc.to_string());
        let plain: TimeControl = "10".parse().unwrap();
        assert_eq!(0, plain.increment);
        assert!("x+1".parse::<TimeControl>().is_err());
        assert!("5+".parse::<TimeControl>().is_err());
    }

    #[test]
    fn presets_cover_three_families() {
        let presets = TimeControl::presets();
        assert_eq!(6, presets.len());
        assert_eq!(TimeControl::classical(), presets[4]);
    }
}
