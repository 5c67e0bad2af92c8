//! Layout and drawing: menu, playfield, sidebar, pause, game over, high scores.

use crate::app::{MenuState, MenuTab, QuitOption, Screen};
use crate::game::GameSession;
use crate::grid::BLOCK_SIZE;
use crate::mode::GameMode;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

const SIDEBAR_WIDTH: u16 = 26;
/// Each tile is two terminal cells wide.
const CELL_W: u16 = 2;

/// Duration of the clear fade; roughly the engine's whole clear animation.
const CLEAR_FADE_MS: u32 = 550;

/// Playfield size in terminal cells (border included) for a session's grid.
fn playfield_pixel_size(session: &GameSession) -> (u16, u16) {
    let w = session.grid.cols() as u16 * CELL_W;
    let h = session.grid.rows() as u16;
    (w + 2, h + 2)
}

/// Playfield inner rect (board only, no border); matches draw_game's layout.
fn playfield_board_rect(area: Rect, session: &GameSession) -> Rect {
    let (pw, ph) = playfield_pixel_size(session);
    let total_w = pw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(ph) / 2;
    Rect {
        x: x + 1,
        y: y + 1,
        width: (session.grid.cols() as u16 * CELL_W).min(area.width.saturating_sub(2)),
        height: (session.grid.rows() as u16).min(area.height.saturating_sub(2)),
    }
}

/// Draw current screen (menu, game, overlays). While cells are mid-clear,
/// applies a TachyonFX fade over them and updates `clear_effect` /
/// `clear_effect_time`.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    session: &GameSession,
    theme: &Theme,
    menu_state: &MenuState,
    quit_selected: QuitOption,
    high_scores: &[Vec<u32>; 3],
    now: Instant,
    clear_effect: &mut Option<Effect>,
    clear_effect_time: &mut Option<Instant>,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu_state, area, now),
        Screen::HighScores => draw_high_scores(frame, theme, high_scores, area),
        Screen::Playing => {
            draw_game(frame, session, theme, area, high_scores);
            if session.grid.any_matched() {
                apply_clear_effect(frame, session, theme, area, clear_effect, clear_effect_time, now);
            }
            if session.game_over_pending() {
                draw_game_over_flash(frame, session, area);
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, session, theme, area, high_scores);
            draw_quit_menu(frame, theme, area, quit_selected);
        }
        Screen::GameOver => {
            draw_game(frame, session, theme, area, high_scores);
            draw_game_over(frame, session, theme, area, high_scores);
        }
    }
}

/// Create or update the clear fade effect and process it: matched cells fade
/// toward the background while their clear animation plays.
fn apply_clear_effect(
    frame: &mut Frame,
    session: &GameSession,
    theme: &Theme,
    area: Rect,
    clear_effect: &mut Option<Effect>,
    clear_effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let board_rect = playfield_board_rect(area, session);
    let delta = clear_effect_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *clear_effect_time = Some(now);

    if clear_effect.is_none() {
        let mut clearing = HashSet::new();
        for r in 0..session.grid.rows() {
            for c in 0..session.grid.cols() {
                if session.grid.get(r, c).is_some_and(crate::grid::Cell::matched) {
                    let x0 = board_rect.x + c as u16 * CELL_W;
                    let y = board_rect.y + r as u16;
                    for x in x0..(x0 + CELL_W).min(board_rect.x + board_rect.width) {
                        clearing.insert((x, y));
                    }
                }
            }
        }
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board_rect);
        *clear_effect = Some(effect);
    }

    if let Some(effect) = clear_effect {
        frame.render_effect(effect, board_rect, tfx_delta);
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, menu_state: &MenuState, area: Rect, now: Instant) {
    let popup_w = 44u16;
    let popup_h = 16u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(
            " panel ",
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            " tui ",
            Style::default()
                .fg(theme.main_fg)
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    let highlight_style = Style::default()
        .fg(Color::Black)
        .bg(theme.title)
        .add_modifier(Modifier::BOLD);
    let normal_style = Style::default().fg(theme.main_fg);
    let tab_style = |tab: MenuTab| {
        if menu_state.current_tab == tab {
            highlight_style
        } else {
            normal_style
        }
    };

    let mode_line = Line::from(vec![
        Span::styled(" Mode ", tab_style(MenuTab::Mode)),
        Span::raw("   "),
        Span::styled(
            format!("< {} >", menu_state.selected_mode.label()),
            Style::default().fg(theme.title),
        ),
    ]);

    let blink_on = now.duration_since(menu_state.animation_start).as_millis() % 1000 < 600;
    let hint_style = if blink_on {
        Style::default().fg(theme.main_fg)
    } else {
        Style::default().fg(theme.inactive_fg)
    };

    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        mode_line.alignment(Alignment::Center),
        Line::from(""),
        Line::from(Span::styled(" Start ", tab_style(MenuTab::Start))),
        Line::from(""),
        Line::from(Span::styled(" High Scores ", tab_style(MenuTab::HighScores))),
        Line::from(""),
        Line::from(Span::styled(" Quit ", tab_style(MenuTab::Quit))),
        Line::from(""),
        Line::from(Span::styled(
            " Arrows — navigate    Enter — select ",
            hint_style,
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_high_scores(frame: &mut Frame, theme: &Theme, high_scores: &[Vec<u32>; 3], area: Rect) {
    let popup_w = 48u16;
    let popup_h = 17u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(
            " High Scores ",
            Style::default().fg(theme.title),
        ));
    let inner = block.inner(popup);
    block.render(popup, frame.buffer_mut());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(inner);

    for (i, mode) in GameMode::ALL.iter().enumerate() {
        let mut lines = vec![
            Line::from(Span::styled(
                mode.label(),
                Style::default()
                    .fg(theme.title)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        let table = &high_scores[i];
        if table.is_empty() {
            lines.push(Line::from(Span::styled(
                "—",
                Style::default().fg(theme.inactive_fg),
            )));
        }
        for (rank, score) in table.iter().enumerate() {
            lines.push(Line::from(Span::styled(
                format!("{:2}. {}", rank + 1, score),
                Style::default().fg(theme.main_fg),
            )));
        }
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(columns[i], frame.buffer_mut());
    }
}

/// Draw game: playfield + sidebar; use full area and center the board.
fn draw_game(
    frame: &mut Frame,
    session: &GameSession,
    theme: &Theme,
    area: Rect,
    high_scores: &[Vec<u32>; 3],
) {
    let (pw, ph) = playfield_pixel_size(session);
    let total_w = pw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let active = vert[1];

    let (playfield_area, sidebar_area) = {
        let inner = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
            .split(active);
        (inner[0], inner[1])
    };

    draw_playfield(frame, session, theme, playfield_area);
    draw_sidebar(frame, session, theme, sidebar_area, high_scores);
}

fn draw_playfield(frame: &mut Frame, session: &GameSession, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(
            format!(" paneltui — {} ", session.mode.label()),
            Style::default().fg(theme.title),
        ));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let rows = session.grid.rows();
    let cols = session.grid.cols();
    let board = Rect {
        x: inner.x,
        y: inner.y,
        width: (cols as u16 * CELL_W).min(inner.width),
        height: (rows as u16).min(inner.height),
    };

    // Two passes into a cell plot: resting tiles at their slots, then moving
    // tiles at their interpolated position on top.
    let mut plot: Vec<Option<(u8, &'static str)>> = vec![None; rows * cols];
    for pass in 0..2 {
        for r in 0..rows {
            for c in 0..cols {
                let Some(cell) = session.grid.get(r, c) else {
                    continue;
                };
                if !cell.alive || (cell.moving() != (pass == 1)) {
                    continue;
                }
                let (dr, dc) = if cell.moving() {
                    let rr = ((cell.px.1 + BLOCK_SIZE / 2) / BLOCK_SIZE)
                        .clamp(0, rows as i32 - 1) as usize;
                    let cc = ((cell.px.0 + BLOCK_SIZE / 2) / BLOCK_SIZE)
                        .clamp(0, cols as i32 - 1) as usize;
                    (rr, cc)
                } else {
                    (r, c)
                };
                // half-cell glyph; drawn twice per tile
                let sym = match cell.clear_frame() {
                    Some(f) if f >= 6 => "░",
                    Some(f) if f >= 3 => "▒",
                    Some(_) => "▓",
                    None => "█",
                };
                plot[dr * cols + dc] = Some((cell.color, sym));
            }
        }
    }

    let cursor = session.cursor;
    let cursor_cells: [(usize, usize); 2] = [(cursor.y1, cursor.x1), (cursor.y2, cursor.x2)];
    let anchor_selected = session.jewels_selected();
    let disabled_from = rows - session.rules.disabled_rows;

    let buf = frame.buffer_mut();
    for r in 0..rows {
        for c in 0..cols {
            let x0 = board.x + c as u16 * CELL_W;
            let y = board.y + r as u16;
            if x0 + CELL_W > board.x + board.width || y >= board.y + board.height {
                continue;
            }
            let under_cursor = cursor_cells.contains(&(r, c));
            let is_anchor = anchor_selected && (r, c) == (cursor.y2, cursor.x2);
            let mut style = Style::default().bg(theme.bg);
            if under_cursor {
                style = style.bg(if is_anchor { theme.title } else { theme.cursor });
            }
            let (sym, fg) = match plot[r * cols + c] {
                Some((color, sym)) => {
                    // leave a sliver of cursor backlight visible on tiles
                    let sym = if under_cursor && sym == "█" { "▓" } else { sym };
                    (sym, theme.tile_color(color))
                }
                None => (" ", theme.bg),
            };
            let mut style = style.fg(fg);
            if r >= disabled_from {
                style = style.add_modifier(Modifier::DIM);
            }
            for i in 0..CELL_W {
                buf[(x0 + i, y)].set_symbol(sym).set_style(style);
            }
        }
    }
}

fn draw_sidebar(
    frame: &mut Frame,
    session: &GameSession,
    theme: &Theme,
    area: Rect,
    high_scores: &[Vec<u32>; 3],
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" status ", Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let best = high_scores[match session.mode {
        GameMode::Classic => 0,
        GameMode::Jewels => 1,
        GameMode::Drop => 2,
    }]
    .first()
    .copied()
    .unwrap_or(0);

    let label = Style::default().fg(theme.inactive_fg);
    let value = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Score ", label),
            Span::styled(format!("{}", session.score), value),
        ]),
        Line::from(vec![
            Span::styled("Best  ", label),
            Span::styled(format!("{}", best), value),
        ]),
    ];
    if session.rules.rising {
        lines.push(Line::from(vec![
            Span::styled("Speed ", label),
            Span::styled(format!("{}", session.speed), value),
        ]));
    }
    if let Some((color, amount)) = session.held() {
        lines.push(Line::from(vec![
            Span::styled("Held  ", label),
            Span::styled("██", Style::default().fg(theme.tile_color(color))),
            Span::styled(format!(" x{}", amount), value),
        ]));
    }
    lines.push(Line::from(""));
    let help: &[&str] = match session.mode {
        GameMode::Classic => &["Arrows  move", "Space   swap pair", "B       bump field"],
        GameMode::Jewels => &["Space   select", "Arrows  swap / move", "B       cancel"],
        GameMode::Drop => &["Arrows  move", "C       pick up", "Space   drop"],
    };
    for h in help {
        lines.push(Line::from(Span::styled(*h, label)));
    }

    let rise_rows: u16 = if session.rules.rising { 2 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(rise_rows)])
        .split(inner);

    Paragraph::new(lines).render(chunks[0], frame.buffer_mut());

    if session.rules.rising {
        let ratio = (session.bump_pixels.max(0) as f64 / BLOCK_SIZE as f64).min(1.0);
        Paragraph::new(Line::from(Span::styled("rise", label)))
            .render(
                Rect {
                    height: 1,
                    ..chunks[1]
                },
                frame.buffer_mut(),
            );
        let gauge_area = Rect {
            y: chunks[1].y + 1,
            height: chunks[1].height.saturating_sub(1),
            ..chunks[1]
        };
        let gauge = Gauge::default()
            .ratio(ratio)
            .gauge_style(Style::default().fg(theme.title).bg(theme.bg));
        gauge.render(gauge_area, frame.buffer_mut());
    }
}

/// Flash shown while the game-over countdown runs.
fn draw_game_over_flash(frame: &mut Frame, session: &GameSession, area: Rect) {
    let board = playfield_board_rect(area, session);
    let y = board.y + board.height / 2;
    let label = " GAME OVER ";
    let x = board.x + board.width.saturating_sub(label.len() as u16) / 2;
    let rect = Rect {
        x,
        y,
        width: (label.len() as u16).min(board.width),
        height: 1,
    };
    Paragraph::new(Line::from(Span::styled(
        label,
        Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD),
    )))
    .render(rect, frame.buffer_mut());
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, area: Rect, selected: QuitOption) {
    let popup_w = 30u16;
    let popup_h = 9u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let highlight = Style::default()
        .fg(Color::Black)
        .bg(theme.title)
        .add_modifier(Modifier::BOLD);
    let normal = Style::default().fg(theme.main_fg);
    let style_for = |opt: QuitOption| if selected == opt { highlight } else { normal };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(" Resume ", style_for(QuitOption::Resume))),
        Line::from(Span::styled(" Main menu ", style_for(QuitOption::MainMenu))),
        Line::from(Span::styled(" Exit ", style_for(QuitOption::Exit))),
        Line::from(""),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(
    frame: &mut Frame,
    session: &GameSession,
    theme: &Theme,
    area: Rect,
    high_scores: &[Vec<u32>; 3],
) {
    let popup_w = 34u16;
    let popup_h = 10u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let table = &high_scores[match session.mode {
        GameMode::Classic => 0,
        GameMode::Jewels => 1,
        GameMode::Drop => 2,
    }];
    let best = table.first().copied().unwrap_or(0);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", session.score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Best: {} ", best),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if session.score > 0 && best == session.score {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Enter — Try again    Q — Title ",
        Style::default().fg(theme.main_fg),
    )));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" paneltui ", Style::default().fg(theme.title))),
    );
    p.render(popup, frame.buffer_mut());
}
