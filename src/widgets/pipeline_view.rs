use crate::error::{Error, Result};
use crate::gitlab::models::JobStatus;
use crate::theme;
use crate::viewer::connector::link_jobs;
use crate::viewer::layout::{compute_boxes, stage_names, BoxKey, BoxMap};
use crate::viewer::model::{format_duration, stage_status, ViewJob};
use chrono::{DateTime, Utc};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::border;
use ratatui::widgets::{Block, Widget};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn status_color(status: JobStatus, allow_failure: bool) -> Color {
    match status {
        JobStatus::Success => theme::pipeline::SUCCESS,
        JobStatus::Failed if allow_failure => theme::pipeline::ALLOWED_FAILURE,
        JobStatus::Failed => theme::pipeline::FAILED,
        JobStatus::Running => theme::pipeline::RUNNING,
        JobStatus::Pending | JobStatus::WaitingForResource | JobStatus::Preparing => {
            theme::pipeline::PENDING
        }
        JobStatus::Manual => theme::pipeline::MANUAL,
        JobStatus::Canceled | JobStatus::Canceling => theme::pipeline::CANCELED,
        JobStatus::Skipped => theme::pipeline::SKIPPED,
        JobStatus::Created | JobStatus::Scheduled | JobStatus::Unknown => {
            theme::pipeline::CREATED
        }
    }
}

/// Cuts `s` to `max_width` display columns, marking the cut with `…`.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        out.push(ch);
        width += w;
    }
    if max_width > 0 {
        out.push('…');
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Writes `text` if the row is on screen, clipped at the right edge.
fn put_str(buf: &mut Buffer, x: u16, y: u16, text: &str, style: Style) {
    let area = buf.area;
    if y < area.top() || y >= area.bottom() || x < area.left() || x >= area.right() {
        return;
    }
    buf.set_stringn(x, y, text, (area.right() - x) as usize, style);
}

fn draw_box(buf: &mut Buffer, rect: Rect, set: border::Set, style: Style) {
    if rect.width < 2 || rect.height < 2 {
        return;
    }
    let inner = (rect.width - 2) as usize;
    let bottom = rect.y + rect.height - 1;
    let top_line = format!(
        "{}{}{}",
        set.top_left,
        set.horizontal_top.repeat(inner),
        set.top_right
    );
    let bottom_line = format!(
        "{}{}{}",
        set.bottom_left,
        set.horizontal_bottom.repeat(inner),
        set.bottom_right
    );
    put_str(buf, rect.x, rect.y, &top_line, style);
    for y in rect.y + 1..bottom {
        put_str(buf, rect.x, y, set.vertical_left, style);
        put_str(buf, rect.x + rect.width - 1, y, set.vertical_right, style);
    }
    put_str(buf, rect.x, bottom, &bottom_line, style);
}

/// Stage columns of job boxes linked by connector lines.
pub struct PipelineGraph<'a> {
    jobs: &'a [ViewJob],
    selected: Option<usize>,
    now: DateTime<Utc>,
    block: Option<Block<'a>>,
    highlight_style: Style,
}

impl<'a> PipelineGraph<'a> {
    pub fn new(jobs: &'a [ViewJob]) -> Self {
        Self {
            jobs,
            selected: None,
            now: Utc::now(),
            block: None,
            highlight_style: Style::default().add_modifier(Modifier::BOLD),
        }
    }

    pub fn selected(mut self, idx: usize) -> Self {
        self.selected = Some(idx);
        self
    }

    /// Reference time for the duration of running jobs.
    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn highlight_style(mut self, style: Style) -> Self {
        self.highlight_style = style;
        self
    }

    /// Paints the graph and returns the boxes it placed.
    pub fn render(mut self, area: Rect, buf: &mut Buffer) -> Result<BoxMap> {
        let inner = match self.block.take() {
            Some(b) => {
                let inner = b.inner(area);
                b.render(area, buf);
                inner
            }
            None => area,
        };

        if inner.width < 1 || inner.height < 1 {
            return Ok(BoxMap::new());
        }

        if self.jobs.is_empty() {
            let msg = "Loading jobs...";
            let x = inner.left() + inner.width.saturating_sub(msg.len() as u16) / 2;
            put_str(buf, x, inner.top() + inner.height / 2, msg, Style::default().fg(theme::TEXT_DIM));
            return Ok(BoxMap::new());
        }

        // rows that do not fit are cut at the edge of `inner`
        let mut canvas = Buffer::empty(inner);
        let boxes = self.render_graph(inner, &mut canvas)?;
        buf.merge(&canvas);
        Ok(boxes)
    }

    fn render_graph(&self, inner: Rect, buf: &mut Buffer) -> Result<BoxMap> {
        let boxes = compute_boxes(self.jobs, inner);

        for stage in stage_names(self.jobs) {
            let rect = boxes
                .get(&BoxKey::Stage(stage.to_string()))
                .copied()
                .unwrap_or_default();
            let status = stage_status(self.jobs.iter().filter(|j| j.stage == stage));
            self.render_header(buf, rect, stage, status);
        }

        for (idx, job) in self.jobs.iter().enumerate() {
            let rect = boxes
                .get(&BoxKey::job(job))
                .copied()
                .ok_or(Error::BoxNotFound(idx))?;
            self.render_job(buf, rect, job, self.selected == Some(idx));
        }

        link_jobs(buf, self.jobs, &boxes, Style::default().fg(theme::BORDER))?;
        Ok(boxes)
    }

    fn render_header(&self, buf: &mut Buffer, rect: Rect, stage: &str, status: JobStatus) {
        draw_box(buf, rect, border::ROUNDED, Style::default().fg(theme::BORDER));
        let inner = rect.width.saturating_sub(2) as usize;
        let title = truncate_str(&capitalize(stage), inner);
        let offset = (inner - title.width()) / 2;
        put_str(
            buf,
            rect.x + 1 + offset as u16,
            rect.y + 1,
            &title,
            Style::default()
                .fg(status_color(status, false))
                .add_modifier(Modifier::BOLD),
        );
    }

    fn render_job(&self, buf: &mut Buffer, rect: Rect, job: &ViewJob, selected: bool) {
        let color = status_color(job.status, job.allow_failure);
        let (set, border_style) = if selected {
            (border::THICK, Style::default().fg(color))
        } else {
            (border::PLAIN, Style::default().fg(theme::BORDER))
        };
        draw_box(buf, rect, set, border_style);

        let text_width = rect.width.saturating_sub(4) as usize;
        if text_width == 0 {
            return;
        }
        let x = rect.x + 2;

        let label = if job.is_bridge() {
            format!("{} »", job.name)
        } else {
            job.name.clone()
        };
        let label_style = if selected {
            self.highlight_style.fg(theme::TEXT_BRIGHT)
        } else {
            Style::default().fg(theme::TEXT)
        };
        put_str(buf, x, rect.y + 1, &truncate_str(&label, text_width), label_style);

        let status = truncate_str(&format!("{} {}", job.symbol(), job.status), text_width);
        put_str(buf, x, rect.y + 2, &status, Style::default().fg(color));

        if let Some(duration) = job.duration(self.now) {
            let text = format_duration(duration);
            if status.width() + 1 + text.width() <= text_width {
                let dx = x + (text_width - text.width()) as u16;
                put_str(buf, dx, rect.y + 2, &text, Style::default().fg(theme::TEXT_DIM));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitlab::fake::{bridge, job};

    fn rows(buf: &Buffer) -> Vec<String> {
        (0..buf.area.height)
            .map(|y| {
                (0..buf.area.width)
                    .map(|x| buf[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect()
    }

    /// 9 jobs over build (4), test (3) and deploy (2), the last one a bridge.
    fn fixture() -> Vec<ViewJob> {
        let mut lint = job(2, "lint", "build", JobStatus::Failed);
        lint.allow_failure = true;
        let mut downstream = bridge(9, "downstream", "deploy", Some(77));
        downstream.status = JobStatus::Created;
        vec![
            job(1, "compile", "build", JobStatus::Success).into(),
            lint.into(),
            job(3, "docs", "build", JobStatus::Success).into(),
            job(4, "assets", "build", JobStatus::Skipped).into(),
            job(5, "unit", "test", JobStatus::Running).into(),
            job(6, "integration", "test", JobStatus::Pending).into(),
            job(7, "e2e", "test", JobStatus::Manual).into(),
            job(8, "staging", "deploy", JobStatus::Created).into(),
            downstream.into(),
        ]
    }

    #[test]
    fn nine_job_pipeline_frame() {
        let jobs = fixture();
        let area = Rect::new(0, 0, 89, 26);
        let mut buf = Buffer::empty(area);
        let boxes = PipelineGraph::new(&jobs)
            .selected(0)
            .render(area, &mut buf)
            .unwrap();
        assert_eq!(boxes.len(), 12);

        let expected = [
            "╭────────────────────╮       ╭────────────────────╮       ╭────────────────────╮         ",
            "│       Build        │       │        Test        │       │       Deploy       │         ",
            "╰────────────────────╯       ╰────────────────────╯       ╰────────────────────╯         ",
            "                                                                                         ",
            "┏━━━━━━━━━━━━━━━━━━━━┓       ┌────────────────────┐       ┌────────────────────┐         ",
            "┃ compile            ┃       │ unit               │       │ staging            │         ",
            "┃ ✔ success          ┃══╦═╦══│ ● running          │══╦═╦══│ ○ created          │         ",
            "┗━━━━━━━━━━━━━━━━━━━━┛  ║ ║  └────────────────────┘  ║ ║  └────────────────────┘         ",
            "                        ║ ║                          ║ ║                                 ",
            "┌────────────────────┐  ║ ║  ┌────────────────────┐  ║ ║  ┌────────────────────┐         ",
            "│ lint               │  ║ ║  │ integration        │  ║ ║  │ downstream »       │         ",
            "│ ! failed           │══╣ ╠══│ ● pending          │══╣ ╚══│ ○ created          │         ",
            "└────────────────────┘  ║ ║  └────────────────────┘  ║    └────────────────────┘         ",
            "                        ║ ║                          ║                                   ",
            "┌────────────────────┐  ║ ║  ┌────────────────────┐  ║                                   ",
            "│ docs               │  ║ ║  │ e2e                │  ║                                   ",
            "│ ✔ success          │══╣ ╚══│ ■ manual           │══╝                                   ",
            "└────────────────────┘  ║    └────────────────────┘                                      ",
            "                        ║                                                                ",
            "┌────────────────────┐  ║                                                                ",
            "│ assets             │  ║                                                                ",
            "│ » skipped          │══╝                                                                ",
            "└────────────────────┘                                                                   ",
            "                                                                                         ",
            "                                                                                         ",
            "                                                                                         ",
        ];
        assert_eq!(rows(&buf), expected);
    }

    #[test]
    fn running_jobs_show_elapsed_time() {
        let now = chrono::Utc::now();
        let mut running = job(1, "unit", "test", JobStatus::Running);
        running.started_at = Some(now - chrono::Duration::seconds(65));
        let jobs: Vec<ViewJob> = vec![running.into()];
        let area = Rect::new(0, 0, 30, 24);
        let mut buf = Buffer::empty(area);
        PipelineGraph::new(&jobs).now(now).render(area, &mut buf).unwrap();
        assert_eq!(rows(&buf)[6], "│ ● running    01:05 │        ");
    }

    #[test]
    fn status_colors_follow_the_visual_encoding() {
        use crate::theme::{aurora, frost, snow_storm};
        assert_eq!(status_color(JobStatus::Success, false), aurora::NORD14);
        assert_eq!(status_color(JobStatus::Failed, false), aurora::NORD11);
        assert_eq!(status_color(JobStatus::Failed, true), aurora::NORD12);
        assert_eq!(status_color(JobStatus::Running, false), frost::NORD9);
        assert_eq!(status_color(JobStatus::Pending, false), aurora::NORD13);
        assert_eq!(status_color(JobStatus::Manual, false), snow_storm::NORD4);
    }

    fn staged_pairs() -> Vec<ViewJob> {
        ["build", "test", "lint", "deploy"]
            .iter()
            .enumerate()
            .flat_map(|(i, stage)| {
                let id = i as u64 * 2;
                [
                    job(id + 1, &format!("{}0", stage), stage, JobStatus::Success).into(),
                    job(id + 2, &format!("{}1", stage), stage, JobStatus::Success).into(),
                ]
            })
            .collect()
    }

    #[test]
    fn connectors_leave_box_borders_intact_on_narrow_screens() {
        let jobs = staged_pairs();
        let area = Rect::new(0, 0, 78, 16);
        let mut buf = Buffer::empty(area);
        let boxes = PipelineGraph::new(&jobs).render(area, &mut buf).unwrap();

        for job in &jobs {
            let r = boxes[&BoxKey::job(job)];
            assert_eq!(buf[(r.left(), r.top())].symbol(), "┌", "{}", job.name);
            assert_eq!(buf[(r.right() - 1, r.top())].symbol(), "┐", "{}", job.name);
            assert_eq!(buf[(r.left(), r.bottom() - 1)].symbol(), "└", "{}", job.name);
            assert_eq!(buf[(r.right() - 1, r.bottom() - 1)].symbol(), "┘", "{}", job.name);
            assert_eq!(buf[(r.right() - 1, r.top() + 2)].symbol(), "│", "{}", job.name);
        }
        let row6: String = (15..20).map(|x| buf[(x, 6)].symbol()).collect();
        assert_eq!(row6, "│╦═╦│");
    }

    #[test]
    fn short_areas_clip_the_graph() {
        let jobs = staged_pairs();
        let mut buf = Buffer::empty(Rect::new(0, 0, 78, 14));
        for y in 9..14 {
            buf.set_string(0, y, "x".repeat(78), Style::default());
        }
        let area = Rect::new(0, 0, 78, 9);
        PipelineGraph::new(&jobs).render(area, &mut buf).unwrap();

        let all = rows(&buf);
        assert!(all[0].starts_with("╭──────────────╮"));
        assert!(all[1].contains("Build"));
        assert!(all[5].starts_with("│ build0       │"));
        for row in &all[9..] {
            assert_eq!(row, &"x".repeat(78));
        }
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(truncate_str("integration-tests-postgres", 18), "integration-tests…");
        assert_eq!(truncate_str("short", 18), "short");
    }

    #[test]
    fn empty_job_list_draws_a_placeholder() {
        let area = Rect::new(0, 0, 30, 5);
        let mut buf = Buffer::empty(area);
        let boxes = PipelineGraph::new(&[]).render(area, &mut buf).unwrap();
        assert!(boxes.is_empty());
        assert_eq!(rows(&buf)[2], "       Loading jobs...        ");
    }
}
