//! Persist per-mode top-10 high score tables (XDG config or
//! ~/.config/paneltui). Each mode gets its own file, one score per line,
//! highest first.

use crate::mode::GameMode;
use anyhow::Result;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

pub const TABLE_SIZE: usize = 10;

/// Returns the path to a mode's high score file (config dir / paneltui / name).
fn config_path(mode: GameMode) -> Result<PathBuf> {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if xdg.is_empty() {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".config")
        } else {
            PathBuf::from(xdg)
        }
    } else {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    Ok(base.join("paneltui").join(mode.highscore_file()))
}

/// Load a mode's table from disk; empty on missing or unparseable file.
pub fn load(mode: GameMode) -> Vec<u32> {
    let path = match config_path(mode) {
        Ok(p) => p,
        Err(_) => return Vec::new(),
    };
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    let mut scores: Vec<u32> = content
        .lines()
        .take(TABLE_SIZE)
        .filter_map(|l| l.trim().parse().ok())
        .collect();
    scores.sort_unstable_by(|a, b| b.cmp(a));
    scores
}

/// Save a mode's table to disk. Creates the config directory if needed.
pub fn save(mode: GameMode, scores: &[u32]) -> Result<()> {
    let path = config_path(mode)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = fs::File::create(path)?;
    for score in scores.iter().take(TABLE_SIZE) {
        writeln!(f, "{}", score)?;
    }
    Ok(())
}

/// Insert a score into a sorted table, keeping the top ten. Zero scores are
/// not worth recording.
pub fn insert(scores: &mut Vec<u32>, score: u32) {
    if score == 0 {
        return;
    }
    let pos = scores.partition_point(|&s| s >= score);
    scores.insert(pos, score);
    scores.truncate(TABLE_SIZE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order() {
        let mut t = vec![50, 30, 10];
        insert(&mut t, 40);
        assert_eq!(t, vec![50, 40, 30, 10]);
        insert(&mut t, 60);
        assert_eq!(t, vec![60, 50, 40, 30, 10]);
    }

    #[test]
    fn test_insert_truncates_to_ten() {
        let mut t: Vec<u32> = (1..=10).rev().map(|n| n * 10).collect();
        insert(&mut t, 55);
        assert_eq!(t.len(), TABLE_SIZE);
        assert_eq!(t[5], 55);
        assert_eq!(*t.last().unwrap(), 20);
    }

    #[test]
    fn test_insert_ignores_zero() {
        let mut t = vec![10];
        insert(&mut t, 0);
        assert_eq!(t, vec![10]);
    }
}
