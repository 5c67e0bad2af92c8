//! Key bindings: normal and vim-style.

use crate::game::Direction;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Abstract action consumed by the engine each tick. The engine never reads
/// raw input devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    Swap,
    Bump,
    PickUp,
    Pause,
    Accept,
    Exit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and
/// vim (hjkl) layouts.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Exit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Left | KeyCode::Char('h') => Action::Move(Direction::Left),
        KeyCode::Right | KeyCode::Char('l') => Action::Move(Direction::Right),
        KeyCode::Up | KeyCode::Char('k') => Action::Move(Direction::Up),
        KeyCode::Down | KeyCode::Char('j') => Action::Move(Direction::Down),
        KeyCode::Char(' ') | KeyCode::Char('x') => Action::Swap,
        KeyCode::Char('b') => Action::Bump,
        KeyCode::Char('c') | KeyCode::Char('z') => Action::PickUp,
        KeyCode::Enter => Action::Accept,
        _ => Action::None,
    }
}
