//! Tile grid and per-cell state: colour/alive flags, the mark-then-clear
//! state machine, and sub-cell motion interpolation for swaps and falls.

use crate::sound::SoundCue;

/// Sub-cell pixels per tile; motion and the rise accumulator count in these.
pub const BLOCK_SIZE: i32 = 8;
/// A marked cell plays this many animation frames before it is vacated.
pub const CLEAR_FRAMES: i8 = 8;
/// Ticks between clear-animation frames.
pub const CLEAR_TICK_TIME: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    OutQuad,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Self::Linear => t,
            Self::OutQuad => t * (2.0 - t),
        }
    }
}

/// In-flight interpolation from one canonical tile position to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub elapsed: u16,
    pub duration: u16,
    pub easing: Easing,
}

/// The mark-then-clear state machine. A cell marked for clearing is immutable
/// to swaps, gravity and further match scans until it is vacated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Resting,
    /// `frame` runs -1..=CLEAR_FRAMES, advanced every CLEAR_TICK_TIME ticks.
    /// The cell is only vacated once the last frame has played.
    Matched { clear_timer: u8, frame: i8 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub alive: bool,
    /// Palette index; meaningless while `alive` is false.
    pub color: u8,
    pub phase: Phase,
    /// Current sprite position in sub-cell pixels.
    pub px: (i32, i32),
    pub motion: Option<Motion>,
    /// Play a landing cue exactly once when the current motion completes.
    pub sound_after_move: bool,
    /// Back-reference for speculative swaps: where to return this tile if the
    /// swap it arrived by produced no match.
    pub return_to: Option<(usize, usize)>,
}

impl Cell {
    fn resting_at(row: usize, col: usize) -> Self {
        Self {
            alive: false,
            color: 0,
            phase: Phase::Resting,
            px: home_px(row, col),
            motion: None,
            sound_after_move: false,
            return_to: None,
        }
    }

    pub fn matched(&self) -> bool {
        matches!(self.phase, Phase::Matched { .. })
    }

    pub fn moving(&self) -> bool {
        self.motion.is_some()
    }

    /// Eligible for run comparison: not yet visibly mid-clear-animation.
    pub fn comparable(&self) -> bool {
        match self.phase {
            Phase::Resting => true,
            Phase::Matched { clear_timer, frame } => clear_timer == 0 && frame <= 0,
        }
    }

    /// Clear-animation frame for rendering, if any has played.
    pub fn clear_frame(&self) -> Option<i8> {
        match self.phase {
            Phase::Matched { frame, .. } if frame >= 0 => Some(frame),
            _ => None,
        }
    }
}

/// Canonical pixel position of a grid slot.
pub fn home_px(row: usize, col: usize) -> (i32, i32) {
    (col as i32 * BLOCK_SIZE, row as i32 * BLOCK_SIZE)
}

/// How a swap (or fall) should be animated.
#[derive(Debug, Clone, Copy)]
pub struct MoveAnim {
    /// Ticks of motion per tile of Manhattan distance.
    pub frames_per_cell: u16,
    pub easing: Easing,
    /// Flag the moved tiles to play a landing cue when they settle.
    pub land_sound: bool,
}

/// Fixed-size field of cells stored as a flat row-major buffer.
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        let cells = (0..rows * cols)
            .map(|i| Cell::resting_at(i / cols, i % cols))
            .collect();
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn idx(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// None when out of range; callers at board edges rely on that.
    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get(self.idx(row, col))
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        if row < self.rows && col < self.cols {
            let i = self.idx(row, col);
            self.cells.get_mut(i)
        } else {
            None
        }
    }

    /// Put a tile (or a hole) at rest in its canonical position, dropping all
    /// animation and match state. Out of range is a no-op.
    pub fn set_cell(&mut self, row: usize, col: usize, alive: bool, color: u8) {
        if let Some(cell) = self.get_mut(row, col) {
            *cell = Cell {
                alive,
                color,
                ..Cell::resting_at(row, col)
            };
        }
    }

    /// Reset a cell to an empty hole.
    pub fn clear_cell(&mut self, row: usize, col: usize) {
        if let Some(cell) = self.get_mut(row, col) {
            *cell = Cell::resting_at(row, col);
        }
    }

    /// Run equality for match scanning: same colour, same liveness, and
    /// neither cell visibly mid-clear-animation.
    pub fn cells_equal(&self, a: (usize, usize), b: (usize, usize)) -> bool {
        let (Some(ca), Some(cb)) = (self.get(a.0, a.1), self.get(b.0, b.1)) else {
            return false;
        };
        ca.color == cb.color && ca.alive == cb.alive && ca.comparable() && cb.comparable()
    }

    /// Exchange colour and alive state between two cells. Refused when either
    /// cell is marked for clearing; out-of-range coordinates are a no-op.
    /// With `anim`, both live tiles get interpolated motion whose duration is
    /// proportional to the Manhattan distance between the slots.
    pub fn swap_cells(
        &mut self,
        a: (usize, usize),
        b: (usize, usize),
        anim: Option<MoveAnim>,
    ) -> bool {
        if a == b {
            return true;
        }
        let (Some(ca), Some(cb)) = (
            self.get(a.0, a.1).copied(),
            self.get(b.0, b.1).copied(),
        ) else {
            return false;
        };
        if ca.matched() || cb.matched() {
            return false;
        }

        let dist = a.0.abs_diff(b.0) + a.1.abs_diff(b.1);
        let place = |dst: (usize, usize), src: (usize, usize), payload: Cell, old: Cell| {
            let mut cell = old;
            cell.alive = payload.alive;
            cell.color = payload.color;
            cell.motion = None;
            cell.sound_after_move = false;
            cell.px = home_px(dst.0, dst.1);
            if let Some(m) = anim {
                if cell.alive {
                    let duration = (m.frames_per_cell * dist as u16).max(1);
                    cell.px = home_px(src.0, src.1);
                    cell.motion = Some(Motion {
                        from: cell.px,
                        to: home_px(dst.0, dst.1),
                        elapsed: 0,
                        duration,
                        easing: m.easing,
                    });
                    cell.sound_after_move = m.land_sound;
                }
            }
            cell
        };

        let new_a = place(a, b, cb, ca);
        let new_b = place(b, a, ca, cb);
        if let Some(cell) = self.get_mut(a.0, a.1) {
            *cell = new_a;
        }
        if let Some(cell) = self.get_mut(b.0, b.1) {
            *cell = new_b;
        }
        true
    }

    /// Any cell with in-flight position interpolation.
    pub fn any_moving(&self) -> bool {
        self.cells.iter().any(Cell::moving)
    }

    /// Any cell marked for clearing.
    pub fn any_matched(&self) -> bool {
        self.cells.iter().any(Cell::matched)
    }

    /// Advance every cell's clear-animation frame and position interpolation
    /// by one tick. Returns whether anything is still animating; the engine
    /// freezes match scanning, clearing, gravity and the rise while it is.
    pub fn animate_step(&mut self, cues: &mut Vec<SoundCue>) -> bool {
        let mut animating = false;
        for cell in &mut self.cells {
            if let Phase::Matched { clear_timer, frame } = &mut cell.phase {
                if *frame < CLEAR_FRAMES {
                    animating = true;
                    if *clear_timer > 0 {
                        *clear_timer -= 1;
                    }
                    if *clear_timer == 0 {
                        *clear_timer = CLEAR_TICK_TIME;
                        *frame += 1;
                    }
                }
            }
            if let Some(m) = &mut cell.motion {
                m.elapsed += 1;
                if m.elapsed >= m.duration {
                    cell.px = m.to;
                    cell.motion = None;
                    if cell.sound_after_move {
                        cell.sound_after_move = false;
                        cues.push(SoundCue::Land);
                    }
                } else {
                    let t = f32::from(m.elapsed) / f32::from(m.duration);
                    let e = m.easing.apply(t);
                    cell.px = (
                        m.from.0 + ((m.to.0 - m.from.0) as f32 * e).round() as i32,
                        m.from.1 + ((m.to.1 - m.from.1) as f32 * e).round() as i32,
                    );
                    animating = true;
                }
            }
        }
        animating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_refused_when_matched() {
        let mut grid = Grid::new(4, 4);
        grid.set_cell(1, 1, true, 2);
        grid.set_cell(1, 2, true, 5);
        grid.get_mut(1, 1).unwrap().phase = Phase::Matched {
            clear_timer: 0,
            frame: -1,
        };
        assert!(!grid.swap_cells((1, 1), (1, 2), None));
        assert_eq!(grid.get(1, 1).unwrap().color, 2);
        assert_eq!(grid.get(1, 2).unwrap().color, 5);
    }

    #[test]
    fn test_swap_out_of_range_is_noop() {
        let mut grid = Grid::new(4, 4);
        grid.set_cell(0, 3, true, 1);
        assert!(!grid.swap_cells((0, 3), (0, 4), None));
        assert!(grid.get(0, 3).unwrap().alive);
    }

    #[test]
    fn test_swap_exchanges_colour_and_alive() {
        let mut grid = Grid::new(4, 4);
        grid.set_cell(2, 0, true, 3);
        assert!(grid.swap_cells((2, 0), (2, 1), None));
        assert!(!grid.get(2, 0).unwrap().alive);
        let moved = grid.get(2, 1).unwrap();
        assert!(moved.alive);
        assert_eq!(moved.color, 3);
        assert_eq!(moved.px, home_px(2, 1));
    }

    #[test]
    fn test_animated_swap_sets_motion_proportional_to_distance() {
        let mut grid = Grid::new(6, 4);
        grid.set_cell(1, 2, true, 4);
        let anim = MoveAnim {
            frames_per_cell: 4,
            easing: Easing::Linear,
            land_sound: false,
        };
        assert!(grid.swap_cells((1, 2), (4, 2), Some(anim)));
        let moved = grid.get(4, 2).unwrap();
        let m = moved.motion.unwrap();
        assert_eq!(m.duration, 12);
        assert_eq!(moved.px, home_px(1, 2));
        assert_eq!(m.to, home_px(4, 2));
        // the vacated slot does not animate
        assert!(grid.get(1, 2).unwrap().motion.is_none());
    }

    #[test]
    fn test_motion_completes_and_lands_once() {
        let mut grid = Grid::new(4, 4);
        grid.set_cell(0, 0, true, 1);
        let anim = MoveAnim {
            frames_per_cell: 2,
            easing: Easing::Linear,
            land_sound: true,
        };
        grid.swap_cells((0, 0), (2, 0), Some(anim));
        let mut cues = Vec::new();
        let mut steps = 0;
        while grid.animate_step(&mut cues) {
            steps += 1;
            assert!(steps < 10);
        }
        assert_eq!(cues, vec![SoundCue::Land]);
        let cell = grid.get(2, 0).unwrap();
        assert_eq!(cell.px, home_px(2, 0));
        assert!(!cell.moving());
        cues.clear();
        grid.animate_step(&mut cues);
        assert!(cues.is_empty());
    }

    #[test]
    fn test_clear_animation_advances_to_terminal_frame() {
        let mut grid = Grid::new(2, 2);
        grid.set_cell(0, 0, true, 0);
        grid.get_mut(0, 0).unwrap().phase = Phase::Matched {
            clear_timer: 0,
            frame: -1,
        };
        let mut cues = Vec::new();
        let mut ticks = 0;
        while grid.animate_step(&mut cues) {
            ticks += 1;
            assert!(ticks < 100);
        }
        let cell = grid.get(0, 0).unwrap();
        assert_eq!(cell.clear_frame(), Some(CLEAR_FRAMES));
        assert!(!cell.comparable());
    }
}
