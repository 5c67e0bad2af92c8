//! The simulation engine: match detection, clearing and scoring, gravity,
//! the rising field, and per-tick orchestration for the three game modes.
//!
//! Everything here is tick-counted; the engine advances exactly once per
//! frame and never touches the wall clock. While any cell is animating, match
//! scanning, clearing, gravity and the rise are frozen for that tick. The two
//! exceptions, specific to the jewels mode, are the revert-unmatched pass and
//! the top-row refill, which run every tick.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use crate::grid::{BLOCK_SIZE, Cell, Easing, Grid, MoveAnim, Phase};
use crate::mode::{GameMode, ModeRules};
use crate::sound::SoundCue;

/// Engine ticks per second; all pacing counts in these.
pub const FPS: u32 = 60;

pub const POINTS_PER_BLOCK: u32 = 10;
pub const POINTS_PER_COMBO_BLOCK: u32 = 15;
pub const POINTS_PER_BUMP: u32 = 5;

/// Base ticks between rise increments, shortened as speed grows.
pub const BUMP_TIME: u32 = 30;
pub const SPEED_TIME: u32 = 3600;
pub const SPEED_PER_LEVEL: u32 = 2;
pub const MAX_SPEED: u32 = 12;

const GAME_OVER_DELAY: u32 = FPS * 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// The two cells eligible for the next swap. `(x1, y1)` is the cell under the
/// player's control; `(x2, y2)` is its partner (right neighbour in classic,
/// the selection anchor in jewels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

/// One game's worth of simulation state. Owns the grid, the score, the
/// cursor and the RNG; a fresh session is built per game.
pub struct GameSession {
    pub mode: GameMode,
    pub rules: ModeRules,
    pub grid: Grid,
    pub score: u32,
    pub cursor: Cursor,
    pub speed: u32,
    speed_timer: u32,
    bump_timer: u32,
    /// Sub-pixel rise accumulator; a full BLOCK_SIZE shifts the field up.
    pub bump_pixels: i32,
    pub animating: bool,
    /// Countdown to the terminal state; 0 means not triggered.
    pub game_over_timer: u32,
    pub game_over: bool,
    jewels_select: bool,
    held_color: Option<u8>,
    held_amount: u32,
    rng: StdRng,
    cues: Vec<SoundCue>,
}

impl GameSession {
    pub fn new(mode: GameMode, seed: Option<u64>) -> Self {
        let rules = mode.rules();
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let mut session = Self {
            mode,
            rules,
            grid: Grid::new(rules.rows, rules.cols),
            score: 0,
            cursor: Cursor {
                x1: 0,
                y1: 0,
                x2: 0,
                y2: 0,
            },
            speed: 1,
            speed_timer: SPEED_TIME,
            bump_timer: 0,
            bump_pixels: 0,
            animating: false,
            game_over_timer: 0,
            game_over: false,
            jewels_select: false,
            held_color: None,
            held_amount: 0,
            rng,
            cues: Vec::new(),
        };
        session.init_board();
        session
    }

    fn init_board(&mut self) {
        let rows = self.rules.rows;
        let first = rows - self.rules.start_rows;
        match self.mode {
            GameMode::Classic => {
                for r in first..rows {
                    self.fill_row_random(r);
                }
            }
            GameMode::Jewels => {
                // reject starting layouts that already contain matches
                loop {
                    for r in first..rows {
                        for c in 0..self.rules.cols {
                            let color = self.rng.gen_range(0..self.rules.colors);
                            self.grid.set_cell(r, c, true, color);
                        }
                    }
                    if !self.has_any_matches() {
                        break;
                    }
                }
            }
            GameMode::Drop => {
                for r in first..rows {
                    for c in 0..self.rules.cols {
                        let color = self.rng.gen_range(0..self.rules.colors);
                        self.grid.set_cell(r, c, true, color);
                    }
                }
                self.held_color = None;
                self.held_amount = 0;
            }
        }
        self.cursor.x1 = (self.rules.cols / 2).saturating_sub(1);
        self.cursor.y1 = rows
            .saturating_sub(self.rules.start_rows + 1)
            .clamp(self.rules.cursor_min_y, self.rules.cursor_max_y);
        self.set_cursor();
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) {
        if self.game_over {
            return;
        }
        self.animating = self.grid.animate_step(&mut self.cues);
        if self.game_over_timer > 0 {
            self.game_over_timer -= 1;
            if self.game_over_timer == 0 {
                self.game_over = true;
            }
            return;
        }
        match self.mode {
            GameMode::Classic => {
                if !self.animating {
                    self.clear_matches();
                    self.scan_matches();
                    self.rise_step();
                    self.gravity();
                }
            }
            GameMode::Jewels => {
                if !self.animating {
                    self.clear_matches();
                    self.scan_matches();
                }
                // these two run even while the field animates
                self.return_pass();
                self.refill_top();
                if !self.animating {
                    self.gravity();
                    self.stalemate_check();
                }
            }
            GameMode::Drop => {
                // no scan pass: matches only form via the flood at drop time
                if !self.animating {
                    self.clear_matches();
                    self.rise_step();
                    self.gravity();
                }
                self.set_cursor();
            }
        }
    }

    /// Drain the sound cues raised since the last call.
    pub fn drain_cues(&mut self) -> Vec<SoundCue> {
        std::mem::take(&mut self.cues)
    }

    pub fn held(&self) -> Option<(u8, u32)> {
        self.held_color.map(|c| (c, self.held_amount))
    }

    pub fn jewels_selected(&self) -> bool {
        self.jewels_select
    }

    /// The game-over countdown has been armed but not yet elapsed.
    pub fn game_over_pending(&self) -> bool {
        self.game_over_timer > 0
    }

    fn scan_row_limit(&self) -> usize {
        self.grid.rows() - self.rules.disabled_rows
    }

    fn move_anim(&self, land_sound: bool) -> MoveAnim {
        MoveAnim {
            frames_per_cell: self.rules.move_frames,
            easing: self.rules.easing,
            land_sound,
        }
    }

    fn can_touch(&self, at: (usize, usize)) -> bool {
        self.grid
            .get(at.0, at.1)
            .is_some_and(|c| !c.moving() && !c.matched())
    }

    // ---- match detection ----

    /// Number of consecutive cells past `(row, col)` that continue its run
    /// along `axis`. A result > 1 means a scoreable run of three or more.
    pub fn match_run_length(&self, row: usize, col: usize, axis: Axis) -> usize {
        let mut count = 0;
        match axis {
            Axis::Horizontal => {
                for c in col + 1..self.grid.cols() {
                    if self.grid.cells_equal((row, col), (row, c)) {
                        count += 1;
                    } else {
                        break;
                    }
                }
            }
            Axis::Vertical => {
                for r in row + 1..self.scan_row_limit() {
                    if self.grid.cells_equal((row, col), (r, col)) {
                        count += 1;
                    } else {
                        break;
                    }
                }
            }
        }
        count
    }

    /// Read-only probe used by stalemate detection and the board generator.
    pub fn has_any_matches(&self) -> bool {
        for r in 0..self.scan_row_limit() {
            for c in 0..self.grid.cols() {
                if !self.grid.get(r, c).is_some_and(|cell| cell.alive) {
                    continue;
                }
                if self.match_run_length(r, c, Axis::Horizontal) > 1
                    || self.match_run_length(r, c, Axis::Vertical) > 1
                {
                    return true;
                }
            }
        }
        false
    }

    fn mark(&mut self, row: usize, col: usize) {
        if let Some(cell) = self.grid.get_mut(row, col) {
            if cell.alive && matches!(cell.phase, Phase::Resting) {
                cell.phase = Phase::Matched {
                    clear_timer: 0,
                    frame: -1,
                };
            }
        }
    }

    /// Mark every run of three or more for clearing. Both axes are checked
    /// per cell, so an L- or T-shaped cluster is marked as the union of its
    /// runs. Fires one match cue per pass regardless of run count.
    fn scan_matches(&mut self) {
        let limit = self.scan_row_limit();
        let mut new_match = false;
        for r in 0..limit {
            for c in 0..self.grid.cols() {
                if !self.grid.get(r, c).is_some_and(|cell| cell.alive) {
                    continue;
                }
                let run = self.match_run_length(r, c, Axis::Horizontal);
                if run > 1 {
                    for k in c..=c + run {
                        self.mark(r, k);
                    }
                    new_match = true;
                }
                let run = self.match_run_length(r, c, Axis::Vertical);
                if run > 1 {
                    for k in r..=r + run {
                        self.mark(k, c);
                    }
                    new_match = true;
                }
            }
        }
        if new_match {
            self.cues.push(SoundCue::Match);
        }
    }

    /// Flood-mark every cell 4-connected to `(row, col)` with its colour.
    /// Used by drop mode when a drop forms a vertical run.
    fn match_adjacent(&mut self, row: usize, col: usize) {
        let limit = self.scan_row_limit();
        let Some(origin) = self.grid.get(row, col).copied() else {
            return;
        };
        if !origin.alive || row >= limit {
            return;
        }
        let color = origin.color;
        let mut seen = HashSet::new();
        let mut stack = vec![(row, col)];
        seen.insert((row, col));
        while let Some((r, c)) = stack.pop() {
            self.mark(r, c);
            let neighbours = [
                (r.wrapping_sub(1), c),
                (r + 1, c),
                (r, c.wrapping_sub(1)),
                (r, c + 1),
            ];
            for (nr, nc) in neighbours {
                if nr >= limit || nc >= self.grid.cols() || seen.contains(&(nr, nc)) {
                    continue;
                }
                let same = self
                    .grid
                    .get(nr, nc)
                    .is_some_and(|n| n.alive && n.comparable() && n.color == color);
                if same {
                    seen.insert((nr, nc));
                    stack.push((nr, nc));
                }
            }
        }
    }

    // ---- clearing and scoring ----

    /// Vacate every cell still marked from the previous pass and tally
    /// points: N * POINTS_PER_BLOCK plus a combo bonus per cell beyond the
    /// third. Only called once nothing animates, i.e. every marked cell has
    /// played its full clear animation.
    fn clear_matches(&mut self) {
        let mut cleared: u32 = 0;
        for r in 0..self.scan_row_limit() {
            for c in 0..self.grid.cols() {
                if self.grid.get(r, c).is_some_and(Cell::matched) {
                    self.grid.clear_cell(r, c);
                    cleared += 1;
                }
            }
        }
        if cleared > 2 {
            self.score += cleared * POINTS_PER_BLOCK;
            self.score += cleared.saturating_sub(3) * POINTS_PER_COMBO_BLOCK;
        }
    }

    // ---- gravity ----

    /// Compact each column: find the lowest gap and slide every tile above it
    /// down by the gap size, as animated swaps. Re-run every non-animating
    /// tick, so multi-row collapses cascade over several ticks.
    fn gravity(&mut self) {
        let rows = self.grid.rows();
        let anim = MoveAnim {
            frames_per_cell: self.rules.move_frames,
            easing: Easing::Linear,
            land_sound: true,
        };
        for col in 0..self.grid.cols() {
            let Some(bottom) = (0..rows)
                .rev()
                .find(|&r| self.grid.get(r, col).is_some_and(|c| !c.alive))
            else {
                continue;
            };
            let mut top = bottom;
            while top > 0 && self.grid.get(top - 1, col).is_some_and(|c| !c.alive) {
                top -= 1;
            }
            let gap = bottom - top + 1;
            for r in (0..top).rev() {
                let stop = self
                    .grid
                    .get(r, col)
                    .is_none_or(|c| !c.alive || c.matched());
                if stop {
                    break;
                }
                self.grid.swap_cells((r, col), (r + gap, col), Some(anim));
            }
        }
    }

    // ---- rising field ----

    /// Advance the bump counter, shift the field when a full tile height has
    /// accumulated, and accelerate over time.
    fn rise_step(&mut self) {
        if self.bump_timer > 0 {
            self.bump_timer -= 1;
        }
        if self.bump_timer == 0 {
            self.bump_pixels += 1;
            self.bump_timer = BUMP_TIME.saturating_sub(self.speed * SPEED_PER_LEVEL);
        }
        if self.bump_pixels >= BLOCK_SIZE && self.add_layer() {
            self.bump_pixels -= BLOCK_SIZE;
        }
        if self.speed_timer > 0 {
            self.speed_timer -= 1;
        }
        if self.speed < MAX_SPEED && self.speed_timer == 0 {
            self.speed += 1;
            self.speed_timer = SPEED_TIME;
        }
    }

    /// Shift the whole field up one row and inject a fresh bottom row.
    /// Arms the game-over countdown when the top fills up. Refused while the
    /// field animates.
    pub fn add_layer(&mut self) -> bool {
        if self.animating {
            return false;
        }
        let rows = self.grid.rows();
        for c in 0..self.grid.cols() {
            if self.grid.get(1, c).is_some_and(|cell| cell.alive) {
                self.game_over_timer = GAME_OVER_DELAY;
            }
        }
        if self.cursor.y1 > self.rules.cursor_min_y {
            self.cursor.y1 -= 1;
        }
        for c in 0..self.grid.cols() {
            for r in 1..rows {
                self.grid.swap_cells((r, c), (r - 1, c), None);
            }
        }
        self.fill_row_random(rows - 1);
        self.set_cursor();
        true
    }

    /// Fill one row with random colours such that no tile equals its left
    /// neighbour or the settled tile above it.
    fn fill_row_random(&mut self, row: usize) {
        let mut last: Option<u8> = None;
        for c in 0..self.rules.cols {
            let above = (row > 0)
                .then(|| self.grid.get(row - 1, c))
                .flatten()
                .filter(|cell| cell.alive)
                .map(|cell| cell.color);
            let mut color = self.rng.gen_range(0..self.rules.colors);
            while Some(color) == last || Some(color) == above {
                color = self.rng.gen_range(0..self.rules.colors);
            }
            self.grid.set_cell(row, c, true, color);
            last = Some(color);
        }
    }

    // ---- jewels mode ----

    /// Stream random tiles into empty top-row cells. Runs every tick, even
    /// while the field animates.
    fn refill_top(&mut self) {
        for c in 0..self.rules.cols {
            let open = self
                .grid
                .get(0, c)
                .is_some_and(|cell| !cell.alive && !cell.matched() && !cell.moving());
            if open {
                let color = self.rng.gen_range(0..self.rules.colors);
                self.grid.set_cell(0, c, true, color);
            }
        }
    }

    /// Undo speculative swaps that settled without producing a match. Runs
    /// every tick; a back-reference is resolved once both endpoints stop
    /// moving.
    fn return_pass(&mut self) {
        for r in 0..self.grid.rows() {
            for c in 0..self.grid.cols() {
                let Some(cell) = self.grid.get(r, c) else {
                    continue;
                };
                let Some((pr, pc)) = cell.return_to else {
                    continue;
                };
                if cell.moving() {
                    continue;
                }
                let partner = self.grid.get(pr, pc);
                if partner.is_some_and(Cell::moving) {
                    continue;
                }
                let keep = cell.matched() || partner.is_some_and(Cell::matched);
                if let Some(cell) = self.grid.get_mut(r, c) {
                    cell.return_to = None;
                }
                if !keep {
                    let anim = self.move_anim(false);
                    self.grid.swap_cells((r, c), (pr, pc), Some(anim));
                    self.cues.push(SoundCue::Switch);
                }
            }
        }
    }

    fn has_gaps(&self) -> bool {
        for r in 0..self.grid.rows() {
            for c in 0..self.grid.cols() {
                if self.grid.get(r, c).is_some_and(|cell| !cell.alive) {
                    return true;
                }
            }
        }
        false
    }

    /// Exhaustive trial-swap probe: does any single adjacent swap produce a
    /// match? Each trial is swapped straight back.
    fn has_switch_match(&mut self) -> bool {
        for r in 0..self.grid.rows() {
            for c in 0..self.grid.cols() {
                for other in [(r, c + 1), (r + 1, c)] {
                    if other.0 >= self.grid.rows() || other.1 >= self.grid.cols() {
                        continue;
                    }
                    if !self.grid.swap_cells((r, c), other, None) {
                        continue;
                    }
                    let found = self.has_any_matches();
                    self.grid.swap_cells((r, c), other, None);
                    if found {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Jewels terminal check: no empty cell to shuffle and no legal move.
    /// Deferred until every tile has settled; the trial swaps must not touch
    /// in-flight motion.
    fn stalemate_check(&mut self) {
        if self.game_over_timer > 0 || self.grid.any_moving() {
            return;
        }
        if !self.has_gaps() && !self.has_switch_match() {
            self.game_over_timer = GAME_OVER_DELAY;
        }
    }

    // ---- drop mode ----

    /// Lift the contiguous same-colour run below the cursor into the held
    /// stack. Only the held colour may be added once holding.
    pub fn pick_up(&mut self) {
        if self.mode != GameMode::Drop {
            return;
        }
        let col = self.cursor.x1;
        let row = self.cursor.y1;
        if row == self.grid.rows() - 1 {
            return;
        }
        let Some(cell) = self.grid.get(row, col).copied() else {
            return;
        };
        if !cell.alive || cell.matched() {
            return;
        }
        let color = cell.color;
        match self.held_color {
            Some(held) if held != color => return,
            None => self.held_color = Some(color),
            _ => {}
        }
        let limit = self.scan_row_limit();
        for r in row..limit {
            let stop = self
                .grid
                .get(r, col)
                .is_none_or(|c| !c.alive || c.color != color || c.matched());
            if stop {
                break;
            }
            if let Some(c) = self.grid.get_mut(r, col) {
                c.alive = false;
            }
            self.held_amount += 1;
        }
        self.cues.push(SoundCue::Switch);
    }

    /// Eject the held tiles into the cursor's column, then flood-match if the
    /// drop formed a vertical run.
    fn drop_held(&mut self) {
        if self.held_amount == 0 {
            return;
        }
        let Some(color) = self.held_color else {
            return;
        };
        let col = self.cursor.x1;
        let mut i = self.cursor.y1;
        let mut remaining = self.held_amount;
        while i > 0 && remaining > 0 {
            let free = self.grid.get(i, col).is_some_and(|c| !c.alive);
            if free {
                if let Some(c) = self.grid.get_mut(i, col) {
                    c.alive = true;
                    c.color = color;
                }
                remaining -= 1;
            }
            i -= 1;
        }
        self.held_amount = remaining;
        let top = i + 1;
        if self.match_run_length(top, col, Axis::Vertical) > 1 {
            self.match_adjacent(top, col);
            self.cues.push(SoundCue::Match);
        }
        if self.held_amount == 0 {
            self.held_color = None;
        }
    }

    // ---- cursor and input ----

    /// Recompute the cursor partner per mode. Drop mode snaps the cursor to
    /// the top tile of its column.
    pub fn set_cursor(&mut self) {
        match self.mode {
            GameMode::Classic => {
                self.cursor.x2 = self.cursor.x1 + 1;
                self.cursor.y2 = self.cursor.y1;
            }
            GameMode::Jewels => {
                if !self.jewels_select {
                    self.cursor.x2 = self.cursor.x1;
                    self.cursor.y2 = self.cursor.y1;
                }
            }
            GameMode::Drop => {
                let col = self.cursor.x1;
                let mut y = self.rules.cursor_min_y;
                for r in (0..=self.rules.cursor_max_y).rev() {
                    if self.grid.get(r, col).is_some_and(|c| !c.alive) {
                        y = (r + 1).clamp(self.rules.cursor_min_y, self.rules.cursor_max_y);
                        break;
                    }
                }
                self.cursor.y1 = y;
                self.cursor.x2 = self.cursor.x1;
                self.cursor.y2 = self.cursor.y1;
            }
        }
    }

    /// Move the cursor one cell, clamped to the playable range. In jewels, a
    /// direction while a cell is selected performs the speculative swap with
    /// that neighbour instead. Returns whether anything happened.
    pub fn move_cursor(&mut self, dir: Direction) -> bool {
        if self.mode == GameMode::Jewels && self.jewels_select {
            return self.jewels_swap_toward(dir);
        }
        let (mut x, mut y) = (self.cursor.x1, self.cursor.y1);
        match dir {
            Direction::Left if x > 0 => x -= 1,
            Direction::Right if x < self.rules.cursor_max_x => x += 1,
            Direction::Up if y > self.rules.cursor_min_y => y -= 1,
            Direction::Down if y < self.rules.cursor_max_y => y += 1,
            _ => return false,
        }
        self.cursor.x1 = x;
        self.cursor.y1 = y;
        self.set_cursor();
        self.cues.push(SoundCue::Switch);
        true
    }

    /// The swap-trigger input, per mode: classic swaps the cursor pair,
    /// jewels toggles the selection anchor, drop ejects the held tiles.
    pub fn do_switch(&mut self) {
        match self.mode {
            GameMode::Classic => {
                let a = (self.cursor.y1, self.cursor.x1);
                let b = (self.cursor.y2, self.cursor.x2);
                if self.can_touch(a) && self.can_touch(b) {
                    let anim = self.move_anim(false);
                    if self.grid.swap_cells(a, b, Some(anim)) {
                        self.cues.push(SoundCue::Switch);
                    }
                }
            }
            GameMode::Jewels => {
                if self.jewels_select {
                    self.jewels_select = false;
                } else {
                    self.jewels_select = true;
                    self.cursor.x2 = self.cursor.x1;
                    self.cursor.y2 = self.cursor.y1;
                }
                self.cues.push(SoundCue::Switch);
            }
            GameMode::Drop => self.drop_held(),
        }
    }

    fn jewels_swap_toward(&mut self, dir: Direction) -> bool {
        let (ar, ac) = (self.cursor.y2, self.cursor.x2);
        let (dr, dc): (i32, i32) = match dir {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        };
        let nr = ar as i32 + dr;
        let nc = ac as i32 + dc;
        if nr < self.rules.cursor_min_y as i32
            || nr > self.rules.cursor_max_y as i32
            || nc < 0
            || nc > self.rules.cursor_max_x as i32
        {
            return false;
        }
        let (nr, nc) = (nr as usize, nc as usize);
        if !self.can_touch((ar, ac)) || !self.can_touch((nr, nc)) {
            self.jewels_select = false;
            return false;
        }
        let anim = self.move_anim(false);
        if !self.grid.swap_cells((ar, ac), (nr, nc), Some(anim)) {
            self.jewels_select = false;
            return false;
        }
        if let Some(cell) = self.grid.get_mut(nr, nc) {
            cell.return_to = Some((ar, ac));
        }
        self.cursor.x1 = nc;
        self.cursor.y1 = nr;
        self.jewels_select = false;
        self.set_cursor();
        self.cues.push(SoundCue::Switch);
        true
    }

    /// Manual rise: shift the field one row now for a small bonus. In jewels
    /// this cancels the selection instead.
    pub fn bump(&mut self) {
        match self.mode {
            GameMode::Classic | GameMode::Drop => {
                if self.add_layer() {
                    self.score += POINTS_PER_BUMP;
                }
            }
            GameMode::Jewels => {
                self.jewels_select = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CLEAR_FRAMES;

    fn blank(mode: GameMode) -> GameSession {
        let mut s = GameSession::new(mode, Some(7));
        for r in 0..s.grid.rows() {
            for c in 0..s.grid.cols() {
                s.grid.clear_cell(r, c);
            }
        }
        s
    }

    fn colors_of(s: &GameSession) -> Vec<(bool, u8)> {
        let mut out = Vec::new();
        for r in 0..s.grid.rows() {
            for c in 0..s.grid.cols() {
                let cell = s.grid.get(r, c).unwrap();
                out.push((cell.alive, if cell.alive { cell.color } else { 0 }));
            }
        }
        out
    }

    #[test]
    fn test_run_of_three_marks_whole_run() {
        let mut s = blank(GameMode::Classic);
        for c in 0..3 {
            s.grid.set_cell(5, c, true, 2);
        }
        s.scan_matches();
        for c in 0..3 {
            assert!(s.grid.get(5, c).unwrap().matched(), "col {c}");
        }
        assert!(s.drain_cues().contains(&SoundCue::Match));
    }

    #[test]
    fn test_run_of_two_never_matches() {
        let mut s = blank(GameMode::Classic);
        s.grid.set_cell(5, 0, true, 2);
        s.grid.set_cell(5, 1, true, 2);
        s.scan_matches();
        assert!(!s.grid.get(5, 0).unwrap().matched());
        assert!(!s.grid.get(5, 1).unwrap().matched());
        assert!(s.drain_cues().is_empty());
    }

    #[test]
    fn test_l_cluster_marks_union_of_runs() {
        let mut s = blank(GameMode::Classic);
        // horizontal arm at row 5, vertical arm down column 0
        for c in 0..3 {
            s.grid.set_cell(5, c, true, 4);
        }
        s.grid.set_cell(6, 0, true, 4);
        s.grid.set_cell(7, 0, true, 4);
        s.scan_matches();
        let marked: usize = (0..s.grid.rows())
            .flat_map(|r| (0..s.grid.cols()).map(move |c| (r, c)))
            .filter(|&(r, c)| s.grid.get(r, c).unwrap().matched())
            .count();
        assert_eq!(marked, 5);
    }

    #[test]
    fn test_matches_never_originate_in_disabled_rows() {
        let mut s = blank(GameMode::Classic);
        let bottom = s.grid.rows() - 1;
        for c in 0..3 {
            s.grid.set_cell(bottom, c, true, 3);
        }
        s.scan_matches();
        for c in 0..3 {
            assert!(!s.grid.get(bottom, c).unwrap().matched());
        }
    }

    #[test]
    fn test_combo_scoring() {
        let mut s = blank(GameMode::Classic);
        for c in 0..3 {
            s.grid.set_cell(5, c, true, 1);
            s.mark(5, c);
        }
        s.clear_matches();
        assert_eq!(s.score, 3 * POINTS_PER_BLOCK);

        let mut s = blank(GameMode::Classic);
        for c in 0..5 {
            s.grid.set_cell(5, c, true, 1);
            s.mark(5, c);
        }
        s.clear_matches();
        assert_eq!(s.score, 5 * POINTS_PER_BLOCK + 2 * POINTS_PER_COMBO_BLOCK);
        assert!(!s.grid.get(5, 0).unwrap().alive);
    }

    #[test]
    fn test_gravity_without_gaps_is_a_noop() {
        let mut s = blank(GameMode::Classic);
        let bottom = s.grid.rows() - 1;
        for r in [bottom - 2, bottom - 1, bottom] {
            s.grid.set_cell(r, 3, true, 1);
        }
        let before = colors_of(&s);
        s.gravity();
        assert_eq!(colors_of(&s), before);
        for r in [bottom - 2, bottom - 1, bottom] {
            assert!(!s.grid.get(r, 3).unwrap().moving());
        }
    }

    #[test]
    fn test_gravity_reaches_a_fixed_point() {
        let mut s = blank(GameMode::Classic);
        s.grid.set_cell(2, 4, true, 5);
        s.gravity();
        let mut cues = Vec::new();
        while s.grid.animate_step(&mut cues) {}
        let bottom = s.grid.rows() - 1;
        assert!(s.grid.get(bottom, 4).unwrap().alive);
        assert!(!s.grid.get(2, 4).unwrap().alive);
        assert!(cues.contains(&SoundCue::Land));
        let settled = colors_of(&s);
        s.gravity();
        assert_eq!(colors_of(&s), settled);
    }

    #[test]
    fn test_animation_freezes_scan_and_gravity() {
        let mut s = blank(GameMode::Classic);
        for c in 0..3 {
            s.grid.set_cell(5, c, true, 2);
        }
        // unrelated motion elsewhere keeps the field frozen
        s.grid.set_cell(8, 10, true, 0);
        let anim = s.move_anim(false);
        s.grid.swap_cells((8, 10), (8, 11), Some(anim));

        s.tick();
        assert!(s.animating);
        for c in 0..3 {
            let cell = s.grid.get(5, c).unwrap();
            assert!(!cell.matched());
            assert!(cell.alive, "gravity must not run while animating");
        }
        // motion lasts move_frames ticks; once it settles the scan marks
        for _ in 0..s.rules.move_frames {
            s.tick();
        }
        for c in 0..3 {
            assert!(s.grid.get(5, c).unwrap().matched());
        }
    }

    #[test]
    fn test_scenario_a_strip_clears_and_scores() {
        let mut s = blank(GameMode::Classic);
        for c in 0..3 {
            s.grid.set_cell(5, c, true, 2);
        }
        s.tick();
        for c in 0..3 {
            assert!(s.grid.get(5, c).unwrap().matched());
        }
        let mut ticks = 0;
        while s.score == 0 {
            s.tick();
            ticks += 1;
            assert!(ticks < 100, "clear animation never completed");
        }
        assert_eq!(s.score, 3 * POINTS_PER_BLOCK);
        for c in 0..3 {
            assert!(!s.grid.get(5, c).unwrap().alive);
        }
    }

    #[test]
    fn test_scenario_b_bump_counter_and_layer_shift() {
        let mut s = GameSession::new(GameMode::Classic, Some(11));
        s.bump_timer = 1;
        s.bump_pixels = 0;
        s.tick();
        assert_eq!(s.bump_timer, BUMP_TIME - s.speed * SPEED_PER_LEVEL);
        assert_eq!(s.bump_pixels, 1);

        let before = colors_of(&s);
        let cols = s.grid.cols();
        s.bump_pixels = BLOCK_SIZE;
        s.bump_timer = 5;
        s.tick();
        assert_eq!(s.bump_pixels, 0);
        let after = colors_of(&s);
        // every row moved up one
        for r in 1..s.grid.rows() {
            for c in 0..cols {
                assert_eq!(after[(r - 1) * cols + c], before[r * cols + c]);
            }
        }
        // fresh bottom row: alive, and never equal to the tile above
        let bottom = s.grid.rows() - 1;
        for c in 0..cols {
            let new = s.grid.get(bottom, c).unwrap();
            assert!(new.alive);
            let above = s.grid.get(bottom - 1, c).unwrap();
            if above.alive {
                assert_ne!(new.color, above.color);
            }
        }
    }

    #[test]
    fn test_layer_injection_is_deterministic_for_a_seed() {
        let mut a = GameSession::new(GameMode::Classic, Some(99));
        let mut b = GameSession::new(GameMode::Classic, Some(99));
        assert_eq!(colors_of(&a), colors_of(&b));
        for _ in 0..3 {
            a.add_layer();
            b.add_layer();
        }
        assert_eq!(colors_of(&a), colors_of(&b));
    }

    /// 2x2 colour tiling: full board, no run of three reachable by any
    /// single swap.
    fn stalemate_board(s: &mut GameSession) {
        for r in 0..s.grid.rows() {
            for c in 0..s.grid.cols() {
                let color = (2 * (r % 2) + c % 2) as u8;
                s.grid.set_cell(r, c, true, color);
            }
        }
    }

    #[test]
    fn test_scenario_c_jewels_stalemate_arms_game_over() {
        let mut s = GameSession::new(GameMode::Jewels, Some(5));
        stalemate_board(&mut s);
        assert!(!s.has_any_matches());
        s.tick();
        assert_eq!(s.game_over_timer, GAME_OVER_DELAY);
        let mut remaining = s.game_over_timer;
        while remaining > 0 {
            s.tick();
            remaining -= 1;
        }
        assert!(s.game_over);
    }

    #[test]
    fn test_jewels_swap_without_match_is_reverted() {
        let mut s = GameSession::new(GameMode::Jewels, Some(5));
        stalemate_board(&mut s);
        let before = colors_of(&s);
        s.cursor.x1 = 3;
        s.cursor.y1 = 3;
        s.set_cursor();
        s.do_switch();
        assert!(s.jewels_selected());
        assert!(s.move_cursor(Direction::Right));
        // swapped for now
        assert_ne!(colors_of(&s), before);
        assert!(s.grid.get(3, 4).unwrap().return_to.is_some());
        for _ in 0..s.rules.move_frames {
            s.tick();
        }
        // no match formed, so the pair swapped straight back
        assert_eq!(colors_of(&s), before);
        assert!(s.grid.get(3, 4).unwrap().return_to.is_none());
    }

    #[test]
    fn test_jewels_swap_with_match_sticks() {
        let mut s = GameSession::new(GameMode::Jewels, Some(5));
        stalemate_board(&mut s);
        // swapping (0,0) right will line up three 5s
        s.grid.set_cell(0, 0, true, 5);
        s.grid.set_cell(0, 2, true, 5);
        s.grid.set_cell(0, 3, true, 5);
        s.cursor.x1 = 0;
        s.cursor.y1 = 0;
        s.set_cursor();
        s.do_switch();
        assert!(s.move_cursor(Direction::Right));
        for _ in 0..s.rules.move_frames {
            s.tick();
        }
        assert!(s.grid.get(0, 1).unwrap().matched());
        assert!(s.grid.get(0, 1).unwrap().return_to.is_none());
    }

    #[test]
    fn test_jewels_refill_runs_while_animating() {
        let mut s = GameSession::new(GameMode::Jewels, Some(5));
        stalemate_board(&mut s);
        s.grid.clear_cell(0, 3);
        // unrelated motion keeps the field animating
        let anim = s.move_anim(false);
        s.grid.swap_cells((5, 5), (5, 6), Some(anim));
        s.tick();
        assert!(s.animating);
        assert!(
            s.grid.get(0, 3).unwrap().alive,
            "refill is exempt from the freeze"
        );
    }

    #[test]
    fn test_drop_pick_up_and_flood_match() {
        let mut s = blank(GameMode::Drop);
        for r in [5, 6, 7] {
            s.grid.set_cell(r, 2, true, 1);
        }
        s.cursor.x1 = 2;
        s.set_cursor();
        assert_eq!(s.cursor.y1, 5);
        s.pick_up();
        assert_eq!(s.held(), Some((1, 3)));
        for r in [5, 6, 7] {
            assert!(!s.grid.get(r, 2).unwrap().alive);
        }
        // picking a different colour while holding is refused
        s.grid.set_cell(7, 2, true, 0);
        s.set_cursor();
        s.pick_up();
        assert_eq!(s.held(), Some((1, 3)));

        s.cursor.x1 = 4;
        s.set_cursor();
        s.do_switch();
        assert_eq!(s.held(), None);
        for r in [5, 6, 7] {
            let cell = s.grid.get(r, 4).unwrap();
            assert!(cell.alive);
            assert_eq!(cell.color, 1);
            assert!(cell.matched(), "dropped run of three flood-matches");
        }
        assert!(s.drain_cues().contains(&SoundCue::Match));
    }

    #[test]
    fn test_classic_cursor_pair_and_clamps() {
        let mut s = GameSession::new(GameMode::Classic, Some(3));
        s.cursor.x1 = s.rules.cursor_max_x;
        s.cursor.y1 = s.rules.cursor_min_y;
        s.set_cursor();
        assert_eq!(s.cursor.x2, s.cursor.x1 + 1);
        assert!(!s.move_cursor(Direction::Right));
        assert!(!s.move_cursor(Direction::Up));
        assert!(s.move_cursor(Direction::Down));
    }

    #[test]
    fn test_manual_bump_scores() {
        let mut s = GameSession::new(GameMode::Classic, Some(3));
        let before = s.score;
        s.bump();
        assert_eq!(s.score, before + POINTS_PER_BUMP);
    }

    #[test]
    fn test_clear_frame_cap() {
        let mut s = blank(GameMode::Classic);
        for c in 0..3 {
            s.grid.set_cell(5, c, true, 2);
        }
        s.scan_matches();
        let mut cues = Vec::new();
        while s.grid.animate_step(&mut cues) {}
        for c in 0..3 {
            assert_eq!(s.grid.get(5, c).unwrap().clear_frame(), Some(CLEAR_FRAMES));
        }
    }
}
