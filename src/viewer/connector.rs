use super::layout::{stage_names, BoxKey, BoxMap};
use super::model::ViewJob;
use crate::error::{Error, Result};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;

fn symbol_at(buf: &Buffer, x: i32, y: i32) -> &str {
    match (u16::try_from(x), u16::try_from(y)) {
        (Ok(x), Ok(y)) => buf.cell((x, y)).map(|c| c.symbol()).unwrap_or(""),
        _ => "",
    }
}

fn put(buf: &mut Buffer, x: i32, y: i32, symbol: &str, style: Style) {
    if let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) {
        if let Some(cell) = buf.cell_mut((x, y)) {
            cell.set_symbol(symbol).set_style(style);
        }
    }
}

/// Connector width for a gap (in cells) between neighbouring stage columns.
pub fn padding_for_gap(gap: u16) -> u16 {
    match gap {
        0..=3 => 1,
        4..=6 => 2,
        _ => 3,
    }
}

fn job_box(jobs: &[ViewJob], boxes: &BoxMap, idx: usize) -> Result<Rect> {
    jobs.get(idx)
        .and_then(|job| boxes.get(&BoxKey::job(job)))
        .copied()
        .ok_or(Error::BoxNotFound(idx))
}

/// Padding shared by all connectors of a frame, from the narrowest gap
/// between the last job of a stage and the first job of the next.
pub fn determine_padding(jobs: &[ViewJob], boxes: &BoxMap) -> Result<u16> {
    let mut narrowest: Option<u16> = None;
    for idx in 1..jobs.len() {
        if jobs[idx - 1].stage == jobs[idx].stage {
            continue;
        }
        let a = job_box(jobs, boxes, idx - 1)?;
        let b = job_box(jobs, boxes, idx)?;
        let gap = b.x.saturating_sub(a.x + a.width);
        narrowest = Some(narrowest.map_or(gap, |n| n.min(gap)));
    }
    Ok(narrowest.map_or(1, padding_for_gap))
}

/// Draws the connector between two boxes that follow each other in the
/// job list.
///
/// Boxes in different columns get a horizontal line from `a` to `b`. Boxes
/// stacked in one column get a branch off the vertical rails left of the
/// column (from the previous stage) and right of it (to the next stage).
/// Junction glyphs already on screen are merged instead of overwritten.
pub fn link(
    buf: &mut Buffer,
    a: Rect,
    b: Rect,
    padding: u16,
    is_first_stage: bool,
    is_last_stage: bool,
    style: Style,
) {
    let (x1, y1, w, h) = (a.x as i32, a.y as i32, a.width as i32, a.height as i32);
    let (x2, y2) = (b.x as i32, b.y as i32);
    let p = padding.max(1) as i32;
    let mid = h / 2;

    if x1 != x2 {
        for x in (x1 + w)..x2 {
            put(buf, x, y2 + mid, "═", style);
        }
        if y1 != y2 {
            // rail coming up from the lower rows of the previous stage
            put(buf, x1 + w + p - 1, y2 + mid, "╦", style);
        }
        return;
    }

    if !is_first_stage {
        let rail = x2 - p;
        let junction = if symbol_at(buf, rail, y1 + mid) == "╚" {
            "╠"
        } else {
            "╦"
        };
        put(buf, rail, y1 + mid, junction, style);
        for i in 1..p {
            put(buf, x2 - i, y2 + mid, "═", style);
        }
        put(buf, rail, y2 + mid, "╚", style);
        for y in (y1 + mid + 1)..(y2 + mid) {
            put(buf, rail, y, "║", style);
        }
    }

    if !is_last_stage {
        let rail = x2 + w + p - 1;
        if symbol_at(buf, rail, y1 + mid) == "╝" {
            put(buf, rail, y1 + mid, "╣", style);
        }
        for i in 0..(p - 1) {
            put(buf, x2 + w + i, y2 + mid, "═", style);
        }
        put(buf, rail, y2 + mid, "╝", style);
        for y in (y1 + mid + 1)..(y2 + mid) {
            put(buf, rail, y, "║", style);
        }
    }
}

/// Links every consecutive pair of jobs. Fails without drawing further if a
/// job has no box.
pub fn link_jobs(buf: &mut Buffer, jobs: &[ViewJob], boxes: &BoxMap, style: Style) -> Result<()> {
    let padding = determine_padding(jobs, boxes)?;
    let stages = stage_names(jobs);
    let first = stages.first().copied();
    let last = stages.last().copied();

    for idx in 1..jobs.len() {
        let a = job_box(jobs, boxes, idx - 1)?;
        let b = job_box(jobs, boxes, idx)?;
        let stage = Some(jobs[idx].stage.as_str());
        link(buf, a, b, padding, stage == first, stage == last, style);
    }
    Ok(())
}
