//! paneltui — Tetris Attack-style tile-swapping match-3 puzzle in the terminal.

mod app;
mod game;
mod grid;
mod highscores;
mod input;
mod mode;
mod sound;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use mode::GameMode;

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub mode: GameMode,
    pub seed: Option<u64>,
    pub bell: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        mode: args.mode,
        seed: args.seed,
        bell: args.bell,
    };
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// Tetris Attack-style puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "paneltui",
    version,
    about = "Tile-swapping match-3 puzzle in the terminal. Line up three of a colour to clear them before the rising field reaches the top.",
    long_about = "Paneltui is a terminal puzzle game in the Tetris Attack family.\n\n\
        Swap adjacent tiles to line up runs of three or more of one colour; matched tiles \
        clear and everything above falls. In the classic mode the whole field rises, \
        speeding up over time. The jewels mode plays on a self-contained board where \
        unmatched swaps bounce back, and the drop mode is about picking up and dropping \
        whole colour runs.\n\n\
        CONTROLS (normal):\n  Arrows      Move cursor   Space/X   Swap / select / drop\n  B           Bump the field up   C / Z     Pick up (drop mode)\n  P           Pause    Q / Esc   Quit\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor\n\n\
        Hold a movement key to keep the cursor moving. Use --theme to load a btop-style \
        theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Game mode: classic (rising field), jewels (self-contained board), or
    /// drop (pick up and place colour runs).
    #[arg(short, long, default_value = "classic")]
    pub mode: GameMode,

    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Seed the tile RNG; identical seeds and inputs replay identically.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Ring the terminal bell on matches.
    #[arg(long)]
    pub bell: bool,

    /// Skip main menu and start a game immediately.
    #[arg(long)]
    pub no_menu: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
