use super::model::ViewJob;
use itertools::Itertools;
use ratatui::layout::Rect;
use std::collections::HashMap;
use std::fmt;

/// Inner text width of a box.
pub const MAX_TITLE: u16 = 20;
pub const BOX_WIDTH: u16 = MAX_TITLE + 2;
pub const HEADER_HEIGHT: u16 = 3;
pub const JOB_HEIGHT: u16 = 4;
pub const ROW_SPACING: u16 = 5;
/// Cells kept free between neighbouring columns for the connector rails.
pub const CONNECTOR_GAP: u16 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoxKey {
    Stage(String),
    Job { stage: String, name: String },
}

impl BoxKey {
    pub fn job(job: &ViewJob) -> Self {
        Self::Job {
            stage: job.stage.clone(),
            name: job.name.clone(),
        }
    }
}

impl fmt::Display for BoxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage(stage) => write!(f, "stage-{}", stage),
            Self::Job { name, .. } => write!(f, "jobs-{}", name),
        }
    }
}

pub type BoxMap = HashMap<BoxKey, Rect>;

/// Distinct stage names in order of first appearance.
pub fn stage_names(jobs: &[ViewJob]) -> Vec<&str> {
    jobs.iter().map(|j| j.stage.as_str()).unique().collect()
}

/// First and last index (inclusive) of `stage` in a stage-grouped list.
pub fn stage_bounds(jobs: &[ViewJob], stage: &str) -> (usize, usize) {
    if jobs.len() < 2 {
        return (0, 0);
    }
    let lower = jobs.iter().position(|j| j.stage == stage);
    let upper = jobs.iter().rposition(|j| j.stage == stage);
    match (lower, upper) {
        (Some(lower), Some(upper)) => (lower, upper),
        _ => (0, 0),
    }
}

/// Stages before and after `stage`; at either end the stage itself.
pub fn adjacent_stages<'a>(jobs: &'a [ViewJob], stage: &'a str) -> (&'a str, &'a str) {
    let stages = stage_names(jobs);
    let Some(pos) = stages.iter().position(|s| *s == stage) else {
        return (stage, stage);
    };
    let prev = pos
        .checked_sub(1)
        .and_then(|p| stages.get(p))
        .copied()
        .unwrap_or(stage);
    let next = stages.get(pos + 1).copied().unwrap_or(stage);
    (prev, next)
}

/// Boxes for every stage header and job: one column per stage, jobs
/// stacked below their header.
///
/// Headers never overlap the first job row, and boxes leave at least
/// `CONNECTOR_GAP` cells to the next column. Boxes may run past the bottom
/// of `canvas`; the renderer clips them.
pub fn compute_boxes(jobs: &[ViewJob], canvas: Rect) -> BoxMap {
    let mut boxes = BoxMap::new();
    let stages = stage_names(jobs);
    if stages.is_empty() {
        return boxes;
    }

    let column = canvas.width / stages.len() as u16;
    let width = if stages.len() > 1 {
        BOX_WIDTH.min(column.saturating_sub(CONNECTOR_GAP))
    } else {
        BOX_WIDTH.min(column)
    };
    let top = (canvas.height / 6).max(HEADER_HEIGHT + 1);

    for (stage_idx, stage) in stages.iter().enumerate() {
        let x = canvas.x.saturating_add(column.saturating_mul(stage_idx as u16));
        boxes.insert(
            BoxKey::Stage(stage.to_string()),
            Rect::new(x, canvas.y + top.saturating_sub(4), width, HEADER_HEIGHT),
        );

        for (row, job) in jobs.iter().filter(|j| j.stage == *stage).enumerate() {
            let y = canvas
                .y
                .saturating_add(top)
                .saturating_add(ROW_SPACING.saturating_mul(row as u16));
            boxes.insert(BoxKey::job(job), Rect::new(x, y, width, JOB_HEIGHT));
        }
    }
    boxes
}
