use crate::game::state::{EndReason, GameResult};
use crate::rules::{movegen, Color, Position};

/// Format seconds as `m:ss`, or `h:mm:ss` from one hour up
pub fn format_time(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Get the game status as a string
pub fn game_status(position: &Position, result: Option<&GameResult>) -> String {
    match result {
        Some(result) => match (result.winner, result.reason) {
            (Some(Color::White), _) => "white_wins".to_string(),
            (Some(Color::Black), _) => "black_wins".to_string(),
            (None, EndReason::Stalemate) => "stalemate".to_string(),
            (None, _) => "draw".to_string(),
        },
        None => {
            let turn = position.side_to_move();
            if movegen::is_in_check(position, turn) {
                "check".to_string()
            } else {
                format!("{turn}_turn")
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

/// Rough phase from the number of half-moves played
pub fn game_phase(moves_played: usize) -> GamePhase {
    match moves_played {
        0..=19 => GamePhase::Opening,
        20..=39 => GamePhase::Middlegame,
        _ => GamePhase::Endgame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_formatting() {
        assert_eq!("0:00", format_time(0));
        assert_eq!("5:07", format_time(307));
        assert_eq!("1:00:05", format_time(3605));
    }

    #[test]
    fn status_strings() {
        let start = Position::startpos();
        assert_eq!("white_turn", game_status(&start, None));
        let mated = GameResult::decisive(Color::Black, EndReason::Checkmate);
        assert_eq!("black_wins", game_status(&start, Some(&mated)));
        let stalemate = GameResult::draw(EndReason::Stalemate);
        assert_eq!("stalemate", game_status(&start, Some(&stalemate)));

        let check = Position::from_fen("4k3/8/8/8/8/8/8/4K2r w - - 0 1").unwrap();
        assert_eq!("check", game_status(&check, None));
    }

    #[test]
    fn phases() {
        assert_eq!(GamePhase::Opening, game_phase(0));
        assert_eq!(GamePhase::Middlegame, game_phase(20));
        assert_eq!(GamePhase::Endgame, game_phase(40));
    }
}
