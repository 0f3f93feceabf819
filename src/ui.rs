use crate::error::Result;
use crate::theme;
use crate::viewer::{JobAction, Mode, Modal, ViewerState};
use crate::widgets::log_view::LogView;
use crate::widgets::pipeline_view::{status_color, PipelineGraph};
use itertools::Itertools;
use lazy_static::lazy_static;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

lazy_static! {
    pub static ref HINT_STYLE: Style = Style::default().fg(theme::ACCENT);
}

const NORMAL_HINTS: &str =
    " hjkl move  Enter logs/open  Esc back  ^D cancel  ^R/^P retry/play  ^Space tail  ^Q quit";
const LOGS_HINTS: &str = " Enter/Esc close  PgUp/PgDn scroll  ^Q quit";
const MODAL_HINTS: &str = " y/n answer  ←/→ choose  Enter confirm  Esc dismiss";

pub fn draw(f: &mut Frame, state: &mut ViewerState) -> Result<()> {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_title(f, chunks[0], state);

    let graph_area = if matches!(state.mode, Mode::Logs(_)) {
        let halves = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);
        draw_logs(f, halves[1], state);
        halves[0]
    } else {
        chunks[1]
    };
    draw_graph(f, graph_area, state)?;
    draw_footer(f, chunks[2], state);

    if let Mode::Modal(modal) = &state.mode {
        draw_modal(f, f.area(), modal);
    }
    Ok(())
}

fn create_title<'a>(title: &'a str, hint: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw(format!(" {} ", title)),
        Span::styled(hint, *HINT_STYLE),
    ])
}

fn draw_title(f: &mut Frame, target: Rect, state: &ViewerState) {
    let breadcrumb = state.stack.iter().map(|p| p.to_string()).join(" › ");
    let mut spans = vec![
        Span::styled(
            " Pipeline ",
            Style::default()
                .fg(theme::TEXT_BRIGHT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(breadcrumb, Style::default().fg(theme::ACCENT)),
    ];
    if !state.header.project.is_empty() {
        spans.push(Span::styled(
            format!("  {} @ {}", state.header.project, state.header.ref_name),
            Style::default().fg(theme::TEXT),
        ));
    }
    if let Some(job) = state.selected() {
        spans.push(Span::styled(
            format!("  {} {} {}", job.name, job.symbol(), job.status),
            Style::default().fg(status_color(job.status, job.allow_failure)),
        ));
    }
    let title =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(theme::BG_ELEVATED));
    f.render_widget(title, target);
}

fn draw_graph(f: &mut Frame, target: Rect, state: &mut ViewerState) -> Result<()> {
    let mut block = Block::default().borders(Borders::ALL).title(create_title(
        "Jobs",
        " Enter=logs ",
    ));
    if matches!(state.mode, Mode::Normal) {
        block = block.border_type(BorderType::Thick);
    }

    let graph = PipelineGraph::new(&state.jobs)
        .selected(state.cursor.idx)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    let boxes = graph.render(target, f.buffer_mut())?;
    state.boxes = boxes;
    Ok(())
}

fn draw_logs(f: &mut Frame, target: Rect, state: &mut ViewerState) {
    let Mode::Logs(session) = &mut state.mode else {
        return;
    };
    let status = match (&session.log.error, session.log.finished) {
        (Some(_), _) => " failed ",
        (None, true) => " finished ",
        (None, false) if session.log.is_following() => " following ",
        (None, false) => " paused ",
    };
    let title = format!("Logs - {}", session.job_name);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Thick)
        .title(create_title(&title, status));
    f.render_stateful_widget(LogView::new().block(block), target, &mut session.log);
}

fn draw_footer(f: &mut Frame, target: Rect, state: &ViewerState) {
    let line = match &state.banner {
        Some(error) => Line::from(Span::styled(
            format!(" {}", error),
            Style::default()
                .fg(theme::ERROR)
                .add_modifier(Modifier::BOLD),
        )),
        None => {
            let hints = match state.mode {
                Mode::Logs(_) => LOGS_HINTS,
                Mode::Modal(_) => MODAL_HINTS,
                _ => NORMAL_HINTS,
            };
            Line::from(Span::styled(hints, Style::default().fg(theme::TEXT_DIM)))
        }
    };
    f.render_widget(Paragraph::new(line), target);
}

fn button(label: &str, active: bool) -> Span<'_> {
    let style = if active {
        Style::default()
            .fg(theme::TEXT_BRIGHT)
            .bg(theme::BORDER)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme::TEXT_DIM)
    };
    Span::styled(label, style)
}

fn draw_modal(f: &mut Frame, target: Rect, modal: &Modal) {
    let color = match modal.action {
        JobAction::Cancel => theme::ERROR,
        JobAction::Retry | JobAction::Play => theme::SUCCESS,
    };
    let block = Block::default()
        .title(format!(" {} job ", modal.action.verb()))
        .borders(Borders::ALL)
        .border_type(BorderType::Thick)
        .border_style(Style::default().fg(color));

    let question = format!(
        "{} job '{}' (#{})?",
        modal.action.verb(),
        modal.target.name,
        modal.target.id
    );
    let text = vec![
        Line::from(question),
        Line::from(""),
        Line::from(vec![
            button("[ Yes ]", modal.confirm),
            Span::raw("   "),
            button("[ No ]", !modal.confirm),
        ]),
    ];
    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(ratatui::layout::Alignment::Center)
        .wrap(Wrap { trim: true });

    let area = centered_rect(50, 7, target);
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

/// helper function to create a centered rect of the given size inside `r`
fn centered_rect(size_x: u16, size_y: u16, r: Rect) -> Rect {
    let size_x = std::cmp::min(size_x, r.width);
    let size_y = std::cmp::min(size_y, r.height);

    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((r.height - size_y) / 2),
            Constraint::Min(size_y),
            Constraint::Length((r.height - size_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((r.width - size_x) / 2),
            Constraint::Min(size_x),
            Constraint::Length((r.width - size_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
