//! Game-mode policy: one rule table per mode. The engine itself is shared;
//! modes differ in field dimensions, starting fill, interaction semantics and
//! whether the field rises.

use crate::grid::Easing;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GameMode {
    /// Rising field, swap the cursor pair.
    #[default]
    Classic,
    /// Self-contained 8x8 board, speculative swaps, refilled from the top.
    Jewels,
    /// Pick up same-colour runs and drop them elsewhere.
    Drop,
}

impl GameMode {
    pub const ALL: [Self; 3] = [Self::Classic, Self::Jewels, Self::Drop];

    pub fn label(self) -> &'static str {
        match self {
            Self::Classic => "Classic",
            Self::Jewels => "Jewels",
            Self::Drop => "Drop",
        }
    }

    /// High score file name per mode, under the config directory.
    pub fn highscore_file(self) -> &'static str {
        match self {
            Self::Classic => "highscores",
            Self::Jewels => "highscores_jewels",
            Self::Drop => "highscores_drop",
        }
    }

    pub fn rules(self) -> ModeRules {
        match self {
            Self::Classic => ModeRules {
                rows: 10,
                cols: 13,
                colors: 7,
                start_rows: 4,
                disabled_rows: 1,
                move_frames: 4,
                easing: Easing::Linear,
                cursor_min_y: 1,
                cursor_max_x: 11,
                cursor_max_y: 8,
                rising: true,
            },
            Self::Jewels => ModeRules {
                rows: 8,
                cols: 8,
                colors: 7,
                start_rows: 8,
                disabled_rows: 0,
                move_frames: 8,
                easing: Easing::OutQuad,
                cursor_min_y: 0,
                cursor_max_x: 7,
                cursor_max_y: 7,
                rising: false,
            },
            Self::Drop => ModeRules {
                rows: 9,
                cols: 8,
                colors: 4,
                start_rows: 4,
                disabled_rows: 1,
                move_frames: 4,
                easing: Easing::Linear,
                cursor_min_y: 1,
                cursor_max_x: 7,
                cursor_max_y: 7,
                rising: true,
            },
        }
    }
}

/// Per-mode defaults the engine is parameterised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRules {
    pub rows: usize,
    pub cols: usize,
    /// Palette size used when rolling random tiles.
    pub colors: u8,
    /// Rows filled at the start of a game, counted from the bottom.
    pub start_rows: usize,
    /// Bottom rows excluded from match scanning; tiles there are not yet
    /// fully in play, though gravity slides tiles through them.
    pub disabled_rows: usize,
    /// Ticks of motion per tile of distance for swaps and falls.
    pub move_frames: u16,
    pub easing: Easing,
    pub cursor_min_y: usize,
    pub cursor_max_x: usize,
    pub cursor_max_y: usize,
    /// Whether the bump counter and speed clock run.
    pub rising: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_range_stays_inside_playable_rows() {
        for mode in GameMode::ALL {
            let r = mode.rules();
            assert!(r.cursor_max_y < r.rows - r.disabled_rows);
            assert!(r.cursor_max_x < r.cols);
            assert!(r.start_rows <= r.rows);
        }
    }
}
