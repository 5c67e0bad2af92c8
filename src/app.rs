//! App: terminal init, main loop, tick and key handling.

use crate::game::GameSession;
use crate::highscores;
use crate::input::{Action, key_to_action};
use crate::mode::GameMode;
use crate::sound::{SoundCue, Sounds};
use crate::theme::Theme;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Delay before cursor movement starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// Time between repeated moves while holding; half the initial cooldown.
const REPEAT_INTERVAL_MS: u64 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    HighScores,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    Mode,
    Start,
    HighScores,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub selected_mode: GameMode,
    pub animation_start: Instant,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            current_tab: MenuTab::Mode,
            selected_mode: GameMode::Classic,
            animation_start: Instant::now(),
        }
    }
}

fn mode_index(mode: GameMode) -> usize {
    match mode {
        GameMode::Classic => 0,
        GameMode::Jewels => 1,
        GameMode::Drop => 2,
    }
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    session: GameSession,
    screen: Screen,
    sounds: Sounds,
    last_tick: Instant,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    menu_state: MenuState,
    quit_selected: QuitOption,
    /// Top-10 tables, indexed like GameMode::ALL.
    high_scores: [Vec<u32>; 3],
    /// The current game's score has been folded into the table.
    score_recorded: bool,
    /// TachyonFX fade over cells mid-clear-animation.
    clear_effect: Option<Effect>,
    clear_effect_time: Option<Instant>,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let session = GameSession::new(config.mode, config.seed);
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let high_scores = [
            highscores::load(GameMode::Classic),
            highscores::load(GameMode::Jewels),
            highscores::load(GameMode::Drop),
        ];
        let sounds = Sounds::new(config.bell);
        Ok(Self {
            menu_state: MenuState {
                selected_mode: config.mode,
                ..MenuState::default()
            },
            config,
            theme,
            session,
            screen,
            sounds,
            last_tick: Instant::now(),
            repeat_state: None,
            last_repeat_fire: None,
            quit_selected: QuitOption::Resume,
            high_scores,
            score_recorded: false,
            clear_effect: None,
            clear_effect_time: None,
        })
    }

    fn start_game(&mut self, mode: GameMode) {
        self.config.mode = mode;
        self.session = GameSession::new(mode, self.config.seed);
        self.screen = Screen::Playing;
        self.score_recorded = false;
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.clear_effect = None;
        self.clear_effect_time = None;
        self.last_tick = Instant::now();
    }

    /// Fold the finished game's score into its mode's table and persist it.
    fn record_score(&mut self) {
        if self.score_recorded {
            return;
        }
        self.score_recorded = true;
        let idx = mode_index(self.session.mode);
        highscores::insert(&mut self.high_scores[idx], self.session.score);
        let _ = highscores::save(self.session.mode, &self.high_scores[idx]);
    }

    fn play_cues(&mut self) {
        for cue in self.session.drain_cues() {
            self.sounds.play(cue);
        }
    }

    fn apply_action(&mut self, action: Action) {
        if self.session.game_over || self.session.game_over_pending() {
            return;
        }
        match action {
            Action::Move(dir) => {
                self.session.move_cursor(dir);
            }
            Action::Swap | Action::Accept => self.session.do_switch(),
            Action::Bump => self.session.bump(),
            Action::PickUp => self.session.pick_up(),
            _ => {}
        }
        self.play_cues();
    }

    /// DAS-style hold-to-repeat for cursor movement only.
    fn tick_repeat(&mut self) {
        let now = Instant::now();
        let Some((action, first)) = self.repeat_state else {
            return;
        };
        if !matches!(action, Action::Move(_)) {
            return;
        }
        if first.elapsed() < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let next = self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            self.apply_action(action);
            self.last_repeat_fire = Some(now);
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
                PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Attempt to enable enhanced keyboard for Release events
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let tick_interval = Duration::from_secs_f64(1.0 / f64::from(crate::game::FPS));
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.session,
                    &self.theme,
                    &self.menu_state,
                    self.quit_selected,
                    &self.high_scores,
                    now,
                    &mut self.clear_effect,
                    &mut self.clear_effect_time,
                );
            })?;

            if !self.session.grid.any_matched() {
                self.clear_effect = None;
                self.clear_effect_time = None;
            }

            // Limit event polling to hit ~60 FPS rendering
            let frame_duration = Duration::from_millis(16);
            let timeout = frame_duration.saturating_sub(now.elapsed());

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        let action = key_to_action(key);

                        // Ignore OS repeats; our own DAS/ARR handles holding.
                        if key.kind != KeyEventKind::Press {
                            if key.kind == KeyEventKind::Release
                                && self.repeat_state.map(|(a, _)| a) == Some(action)
                            {
                                self.repeat_state = None;
                                self.last_repeat_fire = None;
                            }
                            continue;
                        }
                        if self.repeat_state.map(|(a, _)| a) == Some(action) {
                            continue;
                        }

                        match self.screen {
                            Screen::Menu => {
                                if self.handle_menu_key(action) {
                                    return Ok(());
                                }
                            }
                            Screen::HighScores => {
                                if matches!(action, Action::Exit | Action::Accept | Action::Swap) {
                                    self.sounds.play(SoundCue::Menu);
                                    self.screen = Screen::Menu;
                                }
                            }
                            Screen::Playing => match action {
                                Action::Pause | Action::Exit => {
                                    self.sounds.play(SoundCue::Menu);
                                    self.screen = Screen::QuitMenu;
                                    self.quit_selected = QuitOption::Resume;
                                    self.repeat_state = None;
                                }
                                Action::None => {}
                                _ => {
                                    self.apply_action(action);
                                    if matches!(action, Action::Move(_)) {
                                        self.repeat_state = Some((action, Instant::now()));
                                        self.last_repeat_fire = None;
                                    }
                                }
                            },
                            Screen::QuitMenu => match action {
                                Action::Move(crate::game::Direction::Down) => {
                                    self.quit_selected = match self.quit_selected {
                                        QuitOption::Resume => QuitOption::MainMenu,
                                        QuitOption::MainMenu => QuitOption::Exit,
                                        QuitOption::Exit => QuitOption::Resume,
                                    };
                                }
                                Action::Move(crate::game::Direction::Up) => {
                                    self.quit_selected = match self.quit_selected {
                                        QuitOption::Resume => QuitOption::Exit,
                                        QuitOption::MainMenu => QuitOption::Resume,
                                        QuitOption::Exit => QuitOption::MainMenu,
                                    };
                                }
                                Action::Accept | Action::Swap => {
                                    self.sounds.play(SoundCue::Menu);
                                    match self.quit_selected {
                                        QuitOption::Resume => self.screen = Screen::Playing,
                                        QuitOption::MainMenu => {
                                            self.record_score();
                                            self.screen = Screen::Menu;
                                        }
                                        QuitOption::Exit => {
                                            self.record_score();
                                            return Ok(());
                                        }
                                    }
                                }
                                Action::Pause | Action::Exit => {
                                    self.screen = Screen::Playing;
                                }
                                _ => {}
                            },
                            Screen::GameOver => match action {
                                Action::Exit => {
                                    self.sounds.play(SoundCue::Menu);
                                    self.screen = Screen::Menu;
                                }
                                Action::Accept | Action::Swap => {
                                    self.sounds.play(SoundCue::Menu);
                                    let mode = self.session.mode;
                                    self.start_game(mode);
                                }
                                _ => {}
                            },
                        }
                    }
                }
            }

            if matches!(self.screen, Screen::Playing) {
                self.tick_repeat();
                if self.last_tick.elapsed() >= tick_interval {
                    self.last_tick = Instant::now();
                    self.session.tick();
                    self.play_cues();
                }
                if self.session.game_over {
                    self.record_score();
                    self.screen = Screen::GameOver;
                }
            }
        }
    }

    /// Returns true when the app should exit.
    fn handle_menu_key(&mut self, action: Action) -> bool {
        use crate::game::Direction;
        match action {
            Action::Exit => return true,
            Action::Move(Direction::Left) => {
                if self.menu_state.current_tab == MenuTab::Mode {
                    self.menu_state.selected_mode = match self.menu_state.selected_mode {
                        GameMode::Classic => GameMode::Drop,
                        GameMode::Jewels => GameMode::Classic,
                        GameMode::Drop => GameMode::Jewels,
                    };
                }
            }
            Action::Move(Direction::Right) => {
                if self.menu_state.current_tab == MenuTab::Mode {
                    self.menu_state.selected_mode = match self.menu_state.selected_mode {
                        GameMode::Classic => GameMode::Jewels,
                        GameMode::Jewels => GameMode::Drop,
                        GameMode::Drop => GameMode::Classic,
                    };
                }
            }
            Action::Move(Direction::Down) => {
                self.menu_state.current_tab = match self.menu_state.current_tab {
                    MenuTab::Mode => MenuTab::Start,
                    MenuTab::Start => MenuTab::HighScores,
                    MenuTab::HighScores => MenuTab::Quit,
                    MenuTab::Quit => MenuTab::Mode,
                };
            }
            Action::Move(Direction::Up) => {
                self.menu_state.current_tab = match self.menu_state.current_tab {
                    MenuTab::Mode => MenuTab::Quit,
                    MenuTab::Start => MenuTab::Mode,
                    MenuTab::HighScores => MenuTab::Start,
                    MenuTab::Quit => MenuTab::HighScores,
                };
            }
            Action::Accept | Action::Swap => {
                self.sounds.play(SoundCue::Menu);
                match self.menu_state.current_tab {
                    MenuTab::Mode | MenuTab::Start => {
                        let mode = self.menu_state.selected_mode;
                        self.start_game(mode);
                    }
                    MenuTab::HighScores => self.screen = Screen::HighScores,
                    MenuTab::Quit => return true,
                }
            }
            _ => {}
        }
        false
    }
}
