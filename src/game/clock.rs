use serde::{Deserialize, Serialize};

use crate::rules::Color;

/// Snapshot of both countdowns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub white_time: u32,
    pub black_time: u32,
    pub is_running: bool,
    pub active_player: Option<Color>,
}

/// Per-color countdown in whole seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clock {
    remaining: [u32; 2],
    increment: u32,
    running: bool,
    active: Option<Color>,
    expired: bool,
}

impl Clock {
    /// Both sides get `time_per_player` seconds; white is active but stopped.
    pub fn new(time_per_player: u32, increment: u32) -> Clock {
        Clock {
            remaining: [time_per_player; 2],
            increment,
            running: false,
            active: Some(Color::White),
            expired: false,
        }
    }

    pub fn start(&mut self) {
        if !self.expired {
            self.running = true;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn active(&self) -> Option<Color> {
        self.active
    }

    pub fn increment(&self) -> u32 {
        self.increment
    }

    /// Deducts `elapsed` seconds from the active side.
    ///
    /// Returns the color whose time ran out, at most once per clock.
    pub fn tick(&mut self, elapsed: u32) -> Option<Color> {
        if !self.running || self.expired {
            return None;
        }
        let color = self.active?;
        let left = &mut self.remaining[color.index()];
        *left = left.saturating_sub(elapsed);
        if *left == 0 {
            self.expired = true;
            self.running = false;
            return Some(color);
        }
        None
    }

    pub fn switch_active(&mut self, color: Color) {
        self.active = Some(color);
    }

    pub fn add_increment(&mut self, color: Color) {
        self.remaining[color.index()] = self.remaining[color.index()].saturating_add(self.increment);
    }

    pub fn remaining(&self, color: Color) -> u32 {
        self.remaining[color.index()]
    }

    pub fn has_expired(&self) -> bool {
        self.expired
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            white_time: self.remaining(Color::White),
            black_time: self.remaining(Color::Black),
            is_running: self.running,
            active_player: self.active,
        }
    }

    /// True while `color` has some time left but no more than `threshold`.
    pub fn is_low_time(&self, color: Color, threshold: u32) -> bool {
        let left = self.remaining(color);
        left > 0 && left <= threshold
    }

    /// The side ahead on the clock and by how many seconds.
    pub fn time_advantage(&self) -> Option<(Color, u32)> {
        let white = self.remaining(Color::White);
        let black = self.remaining(Color::Black);
        match white.cmp(&black) {
            std::cmp::Ordering::Greater => Some((Color::White, white - black)),
            std::cmp::Ordering::Less => Some((Color::Black, black - white)),
            std::cmp::Ordering::Equal => None,
        }
    }
}
