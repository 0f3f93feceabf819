use crate::theme;
use crate::viewer::model::format_duration;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, StatefulWidget, Widget};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub timestamp: Option<String>,
    pub styled: Vec<(String, Style)>,
    /// Section run time, set on the header line of a closed section.
    pub duration: Option<String>,
}

impl LogLine {
    pub fn text(&self) -> String {
        self.styled.iter().map(|(s, _)| s.as_str()).collect()
    }
}

/// Lines kept in a log pane; older output is dropped from the front.
pub const MAX_LINES: usize = 50_000;

/// Trace of one log session with its scroll position.
#[derive(Debug, Default)]
pub struct LogState {
    parser: TraceParser,
    /// Top line while detached from the tail; `None` follows new output.
    scroll: Option<usize>,
    visible_height: usize,
    pub finished: bool,
    pub error: Option<String>,
}

impl LogState {
    /// Parses the lines `chunk` completes. A trailing partial line waits for
    /// the next chunk or for `finish`.
    pub fn push(&mut self, chunk: &str) {
        let dropped = self.parser.feed(chunk);
        if let Some(top) = self.scroll.as_mut() {
            *top = top.saturating_sub(dropped);
        }
    }

    pub fn finish(&mut self, error: Option<String>) {
        self.parser.flush();
        self.finished = true;
        self.error = error;
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.parser.lines
    }

    pub fn is_following(&self) -> bool {
        self.scroll.is_none()
    }

    fn max_top(&self) -> usize {
        self.lines().len().saturating_sub(self.visible_height.max(1))
    }

    pub fn top(&self) -> usize {
        let max = self.max_top();
        self.scroll.map_or(max, |s| s.min(max))
    }

    pub fn page_up(&mut self) {
        let page = self.visible_height.max(1);
        self.scroll = Some(self.top().saturating_sub(page));
    }

    pub fn page_down(&mut self) {
        let top = self.top() + self.visible_height.max(1);
        self.scroll = if top >= self.max_top() { None } else { Some(top) };
    }
}

/// Splits a runner timestamp prefix (`2024-01-15T10:30:45.123456Z 00O `)
/// off a trace line.
fn strip_log_prefix(line: &str) -> (Option<&str>, &str) {
    if line.len() > 32
        && line.as_bytes().get(4) == Some(&b'-')
        && line.as_bytes().get(10) == Some(&b'T')
    {
        let ts = line.get(11..19);
        match line.get(28..).and_then(|s| s.find(' ')) {
            Some(pos) => (ts, line.get(28 + pos + 1..).unwrap_or("")),
            None => (ts, line),
        }
    } else {
        (None, line)
    }
}

/// `<timestamp>:<name>[options]` after a section keyword.
fn parse_marker(marker: &str) -> Option<(u64, &str)> {
    let (ts, name) = marker.split_once(':')?;
    let name = name.split('[').next().unwrap_or(name);
    Some((ts.parse().ok()?, name))
}

/// Removes every SGR escape; used to spot lines that only carry codes.
fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Parses a raw job trace: section markers are removed, the run time of a
/// section is attached to its header line, blank lines are dropped.
pub fn parse_trace(raw: &str) -> Vec<LogLine> {
    let mut parser = TraceParser::default();
    parser.feed(raw);
    parser.flush();
    parser.lines
}

/// Line-by-line trace parser fed with arbitrary chunks.
#[derive(Debug, Default)]
struct TraceParser {
    partial: String,
    lines: Vec<LogLine>,
    /// Lines dropped from the front of `lines`.
    dropped: usize,
    /// Open sections: start time and absolute index of the header line.
    open: HashMap<String, (u64, Option<usize>)>,
}

impl TraceParser {
    /// Returns how many old lines were dropped to stay under `MAX_LINES`.
    fn feed(&mut self, chunk: &str) -> usize {
        self.partial.push_str(chunk);
        let Some(end) = self.partial.rfind('\n') else {
            return 0;
        };
        let complete: String = self.partial.drain(..=end).collect();
        for line in complete.lines() {
            self.parse_line(line);
        }
        self.trim()
    }

    fn flush(&mut self) -> usize {
        let rest = std::mem::take(&mut self.partial);
        for line in rest.lines() {
            self.parse_line(line);
        }
        self.trim()
    }

    /// Drops in batches so long traces do not shift the buffer on every line.
    fn trim(&mut self) -> usize {
        if self.lines.len() <= MAX_LINES + MAX_LINES / 8 {
            return 0;
        }
        let excess = self.lines.len() - MAX_LINES;
        self.lines.drain(..excess);
        self.dropped += excess;
        excess
    }

    fn parse_line(&mut self, raw_line: &str) {
        let (ts, body) = strip_log_prefix(raw_line);
        let mut rest = body.replace("\x1b[0K", "");

        loop {
            if let Some(pos) = rest.find("section_start:") {
                let (marker, after) = split_marker(&rest[pos + 14..]);
                if let Some((start, name)) = parse_marker(marker) {
                    let header = if strip_ansi(after).trim().is_empty() {
                        None
                    } else {
                        Some(self.dropped + self.lines.len())
                    };
                    self.open.insert(name.to_string(), (start, header));
                }
                rest = after.to_string();
            } else if let Some(pos) = rest.find("section_end:") {
                let (marker, after) = split_marker(&rest[pos + 12..]);
                if let Some((end, name)) = parse_marker(marker) {
                    if let Some((start, Some(idx))) = self.open.remove(name) {
                        let line = idx
                            .checked_sub(self.dropped)
                            .and_then(|i| self.lines.get_mut(i));
                        if let Some(line) = line {
                            let seconds = end.saturating_sub(start) as i64;
                            line.duration =
                                Some(format_duration(chrono::Duration::seconds(seconds)));
                        }
                    }
                }
                rest = after.to_string();
            } else {
                break;
            }
        }

        let rest = rest.trim_end_matches('\r');
        if strip_ansi(rest).trim().is_empty() {
            return;
        }
        self.lines.push(LogLine {
            timestamp: ts.map(String::from),
            styled: parse_ansi_to_styled(rest),
            duration: None,
        });
    }
}

/// Marker text up to the carriage return, and what follows it.
fn split_marker(s: &str) -> (&str, &str) {
    match s.find('\r') {
        Some(pos) => (&s[..pos], &s[pos + 1..]),
        None => (s.trim_end(), ""),
    }
}

pub fn parse_ansi_to_styled(line: &str) -> Vec<(String, Style)> {
    let mut segments = Vec::new();
    let mut current_style = Style::default();
    let mut current_text = String::new();
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                let mut code = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == ';' {
                        code.push(c);
                        chars.next();
                    } else {
                        if c == 'm' {
                            chars.next();
                        }
                        break;
                    }
                }
                if !current_text.is_empty() {
                    segments.push((std::mem::take(&mut current_text), current_style));
                }
                current_style = apply_sgr(current_style, &code);
            }
        } else {
            current_text.push(ch);
        }
    }
    if !current_text.is_empty() {
        segments.push((current_text, current_style));
    }
    if segments.is_empty() {
        segments.push((String::new(), Style::default()));
    }
    segments
}

fn ansi_color(code: u8) -> Option<Color> {
    Some(match code {
        30 | 90 => theme::TEXT_DIM,
        31 | 91 => theme::ERROR,
        32 | 92 => theme::SUCCESS,
        33 | 93 => theme::pipeline::PENDING,
        34 | 94 => theme::frost::NORD9,
        35 | 95 => theme::aurora::NORD15,
        36 | 96 => theme::ACCENT,
        37 | 97 => theme::TEXT,
        _ => return None,
    })
}

/// Folds one SGR parameter list into `style`.
fn apply_sgr(style: Style, code: &str) -> Style {
    code.split(';').fold(style, |style, part| match part {
        "" | "0" => Style::default(),
        "1" => style.add_modifier(Modifier::BOLD),
        "3" => style.add_modifier(Modifier::ITALIC),
        "4" => style.add_modifier(Modifier::UNDERLINED),
        "22" => style.remove_modifier(Modifier::BOLD),
        "39" => style.fg(Color::Reset),
        other => match other.parse::<u8>().ok().and_then(ansi_color) {
            Some(color) => style.fg(color),
            None => style,
        },
    })
}

/// Scrollable pane showing a parsed job trace.
#[derive(Default)]
pub struct LogView<'a> {
    block: Option<Block<'a>>,
}

impl<'a> LogView<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl StatefulWidget for LogView<'_> {
    type State = LogState;

    fn render(mut self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let inner = match self.block.take() {
            Some(b) => {
                let inner = b.inner(area);
                b.render(area, buf);
                inner
            }
            None => area,
        };
        if inner.width < 1 || inner.height < 1 {
            return;
        }
        state.visible_height = inner.height as usize;

        if state.lines().is_empty() {
            let msg = match (&state.error, state.finished) {
                (Some(e), _) => format!("Error: {}", e),
                (None, true) => "Job has no log output".to_string(),
                (None, false) => "Waiting for log output...".to_string(),
            };
            buf.set_stringn(
                inner.x + 1,
                inner.y,
                &msg,
                inner.width.saturating_sub(1) as usize,
                Style::default().fg(theme::TEXT_DIM),
            );
            return;
        }

        let top = state.top();
        let dim = Style::default().fg(theme::TEXT_DIM);
        let lines: Vec<Line> = state
            .lines()
            .iter()
            .skip(top)
            .take(inner.height as usize)
            .map(|line| {
                let mut spans = Vec::with_capacity(line.styled.len() + 2);
                if let Some(ts) = &line.timestamp {
                    spans.push(Span::styled(format!("{} ", ts), dim));
                }
                spans.extend(
                    line.styled
                        .iter()
                        .map(|(text, style)| Span::styled(text.clone(), *style)),
                );
                if let Some(d) = &line.duration {
                    spans.push(Span::styled(format!("  {}", d), dim));
                }
                Line::from(spans)
            })
            .collect();
        Paragraph::new(lines).render(inner, buf);
    }
}
