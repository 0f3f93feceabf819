use super::layout::{adjacent_stages, stage_bounds};
use super::model::ViewJob;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Left,
    Right,
    Up,
    Down,
    First,
    Last,
}

impl Move {
    /// Arrow keys, vi-style `hjkl` and `g`/`G`.
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return None;
        }
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => Some(Self::Left),
            KeyCode::Right | KeyCode::Char('l') => Some(Self::Right),
            KeyCode::Up | KeyCode::Char('k') => Some(Self::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Self::Down),
            KeyCode::Char('g') | KeyCode::Home => Some(Self::First),
            KeyCode::Char('G') | KeyCode::End => Some(Self::Last),
            _ => None,
        }
    }
}

/// Selection in a stage-grouped job list.
///
/// `depth` is the row within the current stage. Horizontal moves keep it, so
/// going back to a taller stage restores the previous row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub idx: usize,
    pub depth: usize,
}

impl Cursor {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn selected<'a>(&self, jobs: &'a [ViewJob]) -> Option<&'a ViewJob> {
        jobs.get(self.idx)
    }

    /// Pulls the cursor back inside `jobs` after a snapshot shrank.
    pub fn clamp(&mut self, jobs: &[ViewJob]) {
        if self.idx >= jobs.len() {
            self.idx = jobs.len().saturating_sub(1);
        }
        if let Some(job) = jobs.get(self.idx) {
            let (lower, _) = stage_bounds(jobs, &job.stage);
            self.depth = self.idx - lower;
        }
    }

    /// Applies a key press; keys that are not moves leave the cursor alone.
    pub fn navigate<'a>(&mut self, jobs: &'a [ViewJob], key: &KeyEvent) -> Option<&'a ViewJob> {
        match Move::from_key(key) {
            Some(mv) => self.apply(jobs, mv),
            None => self.selected(jobs),
        }
    }

    pub fn apply<'a>(&mut self, jobs: &'a [ViewJob], mv: Move) -> Option<&'a ViewJob> {
        if self.idx >= jobs.len() {
            self.clamp(jobs);
        }
        let stage = jobs.get(self.idx)?.stage.as_str();

        match mv {
            Move::Left | Move::Right => {
                let (prev, next) = adjacent_stages(jobs, stage);
                let target = if mv == Move::Left { prev } else { next };
                let (lower, upper) = stage_bounds(jobs, target);
                self.idx = lower + self.depth.min(upper - lower);
            }
            Move::Up | Move::Down | Move::First | Move::Last => {
                let (lower, upper) = stage_bounds(jobs, stage);
                let max = upper - lower;
                let depth = self.depth.min(max);
                self.depth = match mv {
                    Move::Down => (depth + 1).min(max),
                    Move::Up => depth.saturating_sub(1),
                    Move::First => 0,
                    _ => max,
                };
                self.idx = lower + self.depth;
            }
        }
        jobs.get(self.idx)
    }
}
