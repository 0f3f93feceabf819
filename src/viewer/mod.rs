pub mod connector;
pub mod event;
pub mod layout;
pub mod model;
pub mod navigator;
pub mod poll;
pub mod stack;

use crate::error::{Error, Result};
use crate::gitlab::models::JobStatus;
use crate::gitlab::trace::stream_job_trace;
use crate::gitlab::PipelineApi;
use crate::ui;
use crate::util::cancel::CancelToken;
use crate::widgets::log_view::LogState;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use event::{spawn_input_reader, Event, Snapshot, TraceWriter};
use layout::BoxMap;
use model::ViewJob;
use navigator::Cursor;
use poll::{PollCommand, PollLoop, Signal};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use stack::{PipelineRef, PipelineStack};
use std::io::{self, Stdout, Write};
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Project and ref the viewer was started for, shown in the title.
#[derive(Debug, Clone, Default)]
pub struct Header {
    pub project: String,
    pub ref_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Cancel,
    Retry,
    Play,
}

impl JobAction {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Cancel => "Cancel",
            Self::Retry => "Retry",
            Self::Play => "Play",
        }
    }
}

/// Yes/No confirmation for a job action.
#[derive(Debug, Clone)]
pub struct Modal {
    pub action: JobAction,
    pub target: ViewJob,
    /// `true` while "Yes" is highlighted.
    pub confirm: bool,
}

#[derive(Debug)]
pub struct LogSession {
    pub id: u64,
    pub job_name: String,
    pub cancel: CancelToken,
    pub log: LogState,
}

#[derive(Debug)]
pub enum Mode {
    Normal,
    Logs(LogSession),
    Modal(Modal),
    /// Full-screen UI handed back to the shell while a trace is tailed on
    /// stdout.
    Suspended { session: u64, cancel: CancelToken },
}

/// Trace stream to start on a background thread.
#[derive(Debug, Clone)]
pub struct TraceRequest {
    pub session: u64,
    pub project: String,
    pub sha: String,
    /// Pipeline the job was picked in.
    pub pipeline_id: u64,
    pub job_name: String,
    pub cancel: CancelToken,
}

/// Side effects requested by the state machine, carried out by the runtime.
#[derive(Debug)]
pub enum Command {
    Quit,
    Poll(Signal),
    StreamTrace(TraceRequest),
    Suspend(TraceRequest),
    Resume,
}

pub struct ViewerState {
    pub jobs: Vec<ViewJob>,
    pub cursor: Cursor,
    /// Boxes of the last frame.
    pub boxes: BoxMap,
    pub stack: PipelineStack,
    pub mode: Mode,
    /// Error of the last failed job action; cleared by the next key.
    pub banner: Option<String>,
    pub header: Header,
    generation: u64,
    next_session: u64,
}

fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

impl ViewerState {
    pub fn new(root: PipelineRef, header: Header) -> Self {
        Self {
            jobs: Vec::new(),
            cursor: Cursor::default(),
            boxes: BoxMap::new(),
            stack: PipelineStack::new(root),
            mode: Mode::Normal,
            banner: None,
            header,
            generation: 0,
            next_session: 0,
        }
    }

    pub fn selected(&self) -> Option<&ViewJob> {
        self.cursor.selected(&self.jobs)
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.mode, Mode::Suspended { .. })
    }

    fn signal(&mut self, command: PollCommand) -> Command {
        self.generation += 1;
        Command::Poll(Signal {
            generation: self.generation,
            command,
        })
    }

    fn trace_request(&mut self, job: &ViewJob) -> Option<TraceRequest> {
        let sha = job.commit_sha()?.to_string();
        self.next_session += 1;
        let top = self.stack.top();
        Some(TraceRequest {
            session: self.next_session,
            project: top.project.clone(),
            sha,
            pipeline_id: top.id,
            job_name: job.name.clone(),
            cancel: CancelToken::new(),
        })
    }

    pub fn handle_event(&mut self, event: Event, api: &dyn PipelineApi) -> Result<Vec<Command>> {
        match event {
            Event::Jobs(snapshot) => {
                self.apply_snapshot(snapshot);
                Ok(Vec::new())
            }
            Event::Key(key) => Ok(self.handle_key(&key, api)),
            Event::Resize | Event::Tick => Ok(Vec::new()),
            Event::Trace { session, chunk } => {
                if let Mode::Logs(log) = &mut self.mode {
                    if log.id == session {
                        log.log.push(&chunk);
                    }
                }
                Ok(Vec::new())
            }
            Event::TraceEnded { session, error } => {
                match &mut self.mode {
                    Mode::Logs(log) if log.id == session => log.log.finish(error),
                    Mode::Suspended { session: id, .. } if *id == session => {
                        self.banner = error;
                    }
                    _ => {}
                }
                Ok(Vec::new())
            }
            Event::Fatal(e) => Err(e),
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        if snapshot.generation != self.generation || &snapshot.pipeline != self.stack.top() {
            log::debug!(
                "dropping stale snapshot of {} (generation {}, current {})",
                snapshot.pipeline,
                snapshot.generation,
                self.generation
            );
            return;
        }
        self.jobs = snapshot.jobs;
        self.cursor.clamp(&self.jobs);
    }

    pub fn handle_key(&mut self, key: &KeyEvent, api: &dyn PipelineApi) -> Vec<Command> {
        if self.is_suspended() {
            return self.handle_suspended_key(key);
        }
        if is_ctrl(key, 'q') {
            return vec![Command::Quit];
        }
        match self.mode {
            Mode::Normal => {
                self.banner = None;
                self.handle_normal_key(key)
            }
            Mode::Logs(_) => self.handle_logs_key(key),
            Mode::Modal(_) => self.handle_modal_key(key, api),
            Mode::Suspended { .. } => Vec::new(),
        }
    }

    fn handle_normal_key(&mut self, key: &KeyEvent) -> Vec<Command> {
        if is_ctrl(key, ' ') {
            return self.suspend();
        }
        if is_ctrl(key, 'd') {
            return self.open_modal(JobAction::Cancel);
        }
        if is_ctrl(key, 'r') || is_ctrl(key, 'p') {
            let action = match self.selected() {
                Some(job) if job.status == JobStatus::Manual => JobAction::Play,
                _ => JobAction::Retry,
            };
            return self.open_modal(action);
        }

        match key.code {
            KeyCode::Enter => self.enter(),
            KeyCode::Esc | KeyCode::Char('q') => self.back(),
            _ => {
                self.cursor.navigate(&self.jobs, key);
                Vec::new()
            }
        }
    }

    /// Opens the logs of a job, or the child pipeline of a bridge.
    fn enter(&mut self) -> Vec<Command> {
        let Some(job) = self.selected().cloned() else {
            return Vec::new();
        };

        if job.is_bridge() {
            let Some(downstream) = job.downstream() else {
                self.banner = Some(format!("{} has not triggered a pipeline yet", job.name));
                return Vec::new();
            };
            let project = downstream
                .project_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| self.stack.top().project.clone());
            let child = PipelineRef::new(downstream.id, project);
            log::info!("entering child pipeline {} of {}", child, job.name);
            self.stack.push(child.clone());
            self.reset_view();
            return vec![self.signal(PollCommand::Switch(child))];
        }

        let Some(request) = self.trace_request(&job) else {
            self.banner = Some(format!("{} has no commit to stream logs for", job.name));
            return Vec::new();
        };
        log::info!("opening logs of {} (session {})", job.name, request.session);
        self.mode = Mode::Logs(LogSession {
            id: request.session,
            job_name: job.name.clone(),
            cancel: request.cancel.clone(),
            log: LogState::default(),
        });
        vec![Command::StreamTrace(request)]
    }

    /// Returns to the parent pipeline, or quits at the root.
    fn back(&mut self) -> Vec<Command> {
        if self.stack.pop().is_none() {
            return vec![Command::Quit];
        }
        let parent = self.stack.top().clone();
        log::info!("back to pipeline {}", parent);
        self.reset_view();
        vec![self.signal(PollCommand::Switch(parent))]
    }

    fn reset_view(&mut self) {
        self.jobs.clear();
        self.boxes.clear();
        self.cursor.reset();
    }

    fn open_modal(&mut self, action: JobAction) -> Vec<Command> {
        let Some(target) = self.selected().cloned() else {
            return Vec::new();
        };
        if target.is_bridge() || (action == JobAction::Cancel && !target.status.is_cancelable()) {
            return Vec::new();
        }
        self.mode = Mode::Modal(Modal {
            action,
            target,
            confirm: true,
        });
        vec![self.signal(PollCommand::Hold)]
    }

    fn handle_modal_key(&mut self, key: &KeyEvent, api: &dyn PipelineApi) -> Vec<Command> {
        let Mode::Modal(modal) = &mut self.mode else {
            return Vec::new();
        };
        let confirmed = match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
                modal.confirm = !modal.confirm;
                return Vec::new();
            }
            KeyCode::Char('y') => true,
            KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => false,
            KeyCode::Enter => modal.confirm,
            _ => return Vec::new(),
        };

        let modal = modal.clone();
        self.mode = Mode::Normal;
        if !confirmed {
            return vec![self.signal(PollCommand::Release)];
        }

        self.perform(&modal, api);
        vec![
            self.signal(PollCommand::Release),
            self.signal(PollCommand::Refresh),
        ]
    }

    /// Runs the confirmed action and swaps the job for the state the API
    /// returned. Failures end up in the banner.
    fn perform(&mut self, modal: &Modal, api: &dyn PipelineApi) {
        let project = self.stack.top().project.clone();
        let target = &modal.target;
        log::info!("{} job {} (#{})", modal.action.verb(), target.name, target.id);
        let result = match modal.action {
            JobAction::Cancel => api.cancel_job(&project, target.id),
            JobAction::Retry | JobAction::Play => {
                api.play_or_retry_job(&project, target.id, target.status)
            }
        };
        match result {
            Ok(job) => {
                if let Some(slot) = self.jobs.iter_mut().find(|j| j.id == target.id) {
                    *slot = ViewJob::from(job);
                }
            }
            Err(e) => {
                log::warn!("{} of job #{} failed: {}", modal.action.verb(), target.id, e);
                self.banner = Some(format!("{} {} failed: {}", modal.action.verb(), target.name, e));
            }
        }
    }

    fn handle_logs_key(&mut self, key: &KeyEvent) -> Vec<Command> {
        let Mode::Logs(session) = &mut self.mode else {
            return Vec::new();
        };
        match key.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => {
                log::info!("closing log session {}", session.id);
                session.cancel.cancel();
                self.mode = Mode::Normal;
            }
            KeyCode::PageUp => session.log.page_up(),
            KeyCode::PageDown => session.log.page_down(),
            _ => {}
        }
        Vec::new()
    }

    fn suspend(&mut self) -> Vec<Command> {
        let Some(job) = self.selected().cloned() else {
            return Vec::new();
        };
        if job.is_bridge() {
            return Vec::new();
        }
        let Some(request) = self.trace_request(&job) else {
            return Vec::new();
        };
        log::info!("tailing {} outside the UI (session {})", job.name, request.session);
        self.mode = Mode::Suspended {
            session: request.session,
            cancel: request.cancel.clone(),
        };
        vec![Command::Suspend(request)]
    }

    fn handle_suspended_key(&mut self, key: &KeyEvent) -> Vec<Command> {
        if key.code != KeyCode::Enter {
            return Vec::new();
        }
        if let Mode::Suspended { cancel, .. } = &self.mode {
            cancel.cancel();
        }
        self.mode = Mode::Normal;
        vec![Command::Resume]
    }
}

type Term = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

pub fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show)?;
    Ok(())
}

/// Shows the pipeline `root` until the user quits or a fatal error occurs.
/// The terminal is restored in both cases.
pub fn run(
    api: Arc<dyn PipelineApi>,
    root: PipelineRef,
    header: Header,
    interval: Duration,
) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, api, root, header, interval);
    restore_terminal()?;
    result
}

fn event_loop(
    terminal: &mut Term,
    api: Arc<dyn PipelineApi>,
    root: PipelineRef,
    header: Header,
    interval: Duration,
) -> Result<()> {
    use yansi::Paint;

    let (event_tx, event_rx) = mpsc::sync_channel(0);
    let (signal_tx, signal_rx) = mpsc::channel();

    PollLoop::new(api.clone(), root.clone(), signal_rx, event_tx.clone(), interval).spawn();
    spawn_input_reader(event_tx.clone());

    let mut state = ViewerState::new(root, header);
    loop {
        if !state.is_suspended() {
            let mut drawn = Ok(());
            terminal.draw(|f| drawn = ui::draw(f, &mut state))?;
            drawn?;
        }

        let event = event_rx
            .recv()
            .map_err(|_| Error::Disconnected("event"))?;
        for command in state.handle_event(event, api.as_ref())? {
            match command {
                Command::Quit => return Ok(()),
                Command::Poll(signal) => {
                    log::debug!("sending {:?}", signal);
                    signal_tx
                        .send(signal)
                        .map_err(|_| Error::Disconnected("poll"))?;
                }
                Command::StreamTrace(request) => {
                    spawn_trace(api.clone(), request, event_tx.clone());
                }
                Command::Suspend(request) => {
                    restore_terminal()?;
                    println!(
                        "{}",
                        format!("Tailing {}; press Enter to return", request.job_name).dim()
                    );
                    spawn_tail(api.clone(), request, event_tx.clone());
                }
                Command::Resume => {
                    enable_raw_mode()?;
                    execute!(io::stdout(), EnterAlternateScreen)?;
                    terminal.clear()?;
                }
            }
        }
    }
}

fn trace_result(request: &TraceRequest, result: Result<()>) -> Option<String> {
    match result {
        Err(e) if !request.cancel.is_cancelled() => {
            log::warn!("trace of {} failed: {}", request.job_name, e);
            Some(e.to_string())
        }
        _ => None,
    }
}

/// Streams a trace into the log pane of session `request.session`.
fn spawn_trace(api: Arc<dyn PipelineApi>, request: TraceRequest, events: SyncSender<Event>) {
    thread::spawn(move || {
        let mut writer = TraceWriter::new(request.session, events.clone());
        let result = stream_job_trace(
            api.as_ref(),
            &request.cancel,
            &mut writer,
            &request.project,
            &request.sha,
            Some(request.pipeline_id),
            &request.job_name,
        );
        let error = trace_result(&request, result);
        log::debug!("log session {} ended", request.session);
        let _ = events.send(Event::TraceEnded {
            session: request.session,
            error,
        });
    });
}

/// Streams a trace straight to stdout while the UI is suspended.
fn spawn_tail(api: Arc<dyn PipelineApi>, request: TraceRequest, events: SyncSender<Event>) {
    use yansi::Paint;

    thread::spawn(move || {
        let mut stdout = io::stdout();
        let result = stream_job_trace(
            api.as_ref(),
            &request.cancel,
            &mut stdout,
            &request.project,
            &request.sha,
            Some(request.pipeline_id),
            &request.job_name,
        );
        let error = trace_result(&request, result);
        if !request.cancel.is_cancelled() {
            let note = match &error {
                Some(e) => format!("Log stream failed: {}", e).red().to_string(),
                None => "Job finished; press Enter to return".dim().to_string(),
            };
            let _ = writeln!(stdout, "\n{}", note);
        }
        let _ = events.send(Event::TraceEnded {
            session: request.session,
            error,
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitlab::fake::{bridge, job, FakeApi};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn fixture() -> (ViewerState, FakeApi) {
        let jobs = vec![
            job(1, "compile", "build", JobStatus::Success),
            job(2, "unit", "test", JobStatus::Running),
            job(3, "e2e", "test", JobStatus::Manual),
        ];
        let bridges = vec![bridge(4, "child", "deploy", Some(40)), bridge(5, "later", "deploy", None)];
        let api = FakeApi::with_pipeline(1, jobs.clone(), bridges.clone());

        let mut state = ViewerState::new(PipelineRef::new(1, "g/p"), Header::default());
        state.jobs = model::group_by_stage(model::normalize(jobs, bridges));
        (state, api)
    }

    fn select(state: &mut ViewerState, idx: usize) {
        state.cursor = Cursor { idx, depth: 0 };
        state.cursor.clamp(&state.jobs);
    }

    fn poll_commands(commands: &[Command]) -> Vec<PollCommand> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::Poll(signal) => Some(signal.command.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn enter_on_bridge_drills_into_the_child_pipeline() {
        let (mut state, api) = fixture();
        select(&mut state, 3);
        let commands = state.handle_key(&key(KeyCode::Enter), &api);

        let child = PipelineRef::new(40, "2");
        assert_eq!(poll_commands(&commands), vec![PollCommand::Switch(child.clone())]);
        assert_eq!(state.stack.top(), &child);
        assert!(state.jobs.is_empty());
        assert_eq!(state.cursor, Cursor::default());
        assert!(matches!(state.mode, Mode::Normal));
    }

    #[test]
    fn bridge_without_child_pipeline_sets_the_banner() {
        let (mut state, api) = fixture();
        select(&mut state, 4);
        assert!(state.handle_key(&key(KeyCode::Enter), &api).is_empty());
        assert!(state.stack.is_root());
        assert!(state.banner.is_some());

        state.handle_key(&key(KeyCode::Char('j')), &api);
        assert!(state.banner.is_none());
    }

    #[test]
    fn escape_pops_the_stack_then_quits() {
        let (mut state, api) = fixture();
        state.stack.push(PipelineRef::new(40, "2"));

        let commands = state.handle_key(&key(KeyCode::Esc), &api);
        assert_eq!(
            poll_commands(&commands),
            vec![PollCommand::Switch(PipelineRef::new(1, "g/p"))]
        );
        assert!(state.stack.is_root());

        let commands = state.handle_key(&key(KeyCode::Char('q')), &api);
        assert!(matches!(commands.as_slice(), [Command::Quit]));
    }

    #[test]
    fn snapshots_from_before_a_switch_are_dropped() {
        let (mut state, api) = fixture();
        let stale = state.jobs.clone();
        select(&mut state, 3);
        state.handle_key(&key(KeyCode::Enter), &api);

        let commands = state
            .handle_event(
                Event::Jobs(Snapshot {
                    generation: 0,
                    pipeline: PipelineRef::new(1, "g/p"),
                    jobs: stale,
                }),
                &api,
            )
            .unwrap();
        assert!(commands.is_empty());
        assert!(state.jobs.is_empty());

        let fresh = vec![ViewJob::from(job(50, "child-job", "build", JobStatus::Pending))];
        state
            .handle_event(
                Event::Jobs(Snapshot {
                    generation: 1,
                    pipeline: PipelineRef::new(40, "2"),
                    jobs: fresh,
                }),
                &api,
            )
            .unwrap();
        assert_eq!(state.jobs[0].id, 50);
    }

    #[test]
    fn enter_on_job_opens_a_log_session() {
        let (mut state, api) = fixture();
        select(&mut state, 1);
        let commands = state.handle_key(&key(KeyCode::Enter), &api);

        let request = match commands.as_slice() {
            [Command::StreamTrace(request)] => request.clone(),
            other => panic!("unexpected commands {:?}", other),
        };
        assert_eq!(request.job_name, "unit");
        assert_eq!(request.project, "g/p");
        assert_eq!(request.sha, crate::gitlab::fake::SHA);
        assert_eq!(request.pipeline_id, 1);

        for (session, chunk) in [(request.session, "hello\n"), (request.session + 7, "stale\n")] {
            state
                .handle_event(
                    Event::Trace {
                        session,
                        chunk: chunk.to_string(),
                    },
                    &api,
                )
                .unwrap();
        }
        match &state.mode {
            Mode::Logs(session) => {
                let texts: Vec<_> = session.log.lines().iter().map(|l| l.text()).collect();
                assert_eq!(texts, vec!["hello"]);
            }
            other => panic!("expected logs, got {:?}", other),
        }

        state.handle_key(&key(KeyCode::Esc), &api);
        assert!(matches!(state.mode, Mode::Normal));
        assert!(request.cancel.is_cancelled());
    }

    #[test]
    fn confirmed_cancel_replaces_the_job() {
        let (mut state, api) = fixture();
        select(&mut state, 1);

        let commands = state.handle_key(&ctrl('d'), &api);
        assert_eq!(poll_commands(&commands), vec![PollCommand::Hold]);
        assert!(matches!(state.mode, Mode::Modal(Modal { action: JobAction::Cancel, .. })));

        let commands = state.handle_key(&key(KeyCode::Char('y')), &api);
        assert_eq!(
            poll_commands(&commands),
            vec![PollCommand::Release, PollCommand::Refresh]
        );
        assert_eq!(api.calls().last().map(String::as_str), Some("cancel g/p 2"));
        assert_eq!(state.jobs[1].status, JobStatus::Canceled);
        assert!(matches!(state.mode, Mode::Normal));
    }

    #[test]
    fn cancel_needs_an_active_job() {
        let (mut state, api) = fixture();
        select(&mut state, 0);
        assert!(state.handle_key(&ctrl('d'), &api).is_empty());
        assert!(matches!(state.mode, Mode::Normal));
    }

    #[test]
    fn manual_jobs_are_played() {
        let (mut state, api) = fixture();
        select(&mut state, 2);
        state.handle_key(&ctrl('r'), &api);
        assert!(matches!(state.mode, Mode::Modal(Modal { action: JobAction::Play, .. })));

        state.handle_key(&key(KeyCode::Enter), &api);
        assert_eq!(
            api.calls().last().map(String::as_str),
            Some("play_or_retry g/p 3 manual")
        );
        assert_eq!(state.jobs[2].id, 1003);
        assert_eq!(state.jobs[2].status, JobStatus::Pending);
    }

    #[test]
    fn dismissed_modal_makes_no_call() {
        let (mut state, api) = fixture();
        select(&mut state, 0);
        state.handle_key(&ctrl('p'), &api);

        state.handle_key(&key(KeyCode::Right), &api);
        let commands = state.handle_key(&key(KeyCode::Enter), &api);
        assert_eq!(poll_commands(&commands), vec![PollCommand::Release]);
        assert!(api.calls().iter().all(|c| !c.starts_with("play_or_retry")));
        assert!(matches!(state.mode, Mode::Normal));
    }

    #[test]
    fn failed_action_shows_a_banner() {
        let (mut state, mut api) = fixture();
        api.fail_actions = true;
        select(&mut state, 1);
        state.handle_key(&ctrl('d'), &api);
        state.handle_key(&key(KeyCode::Enter), &api);

        assert!(matches!(state.mode, Mode::Normal));
        assert_eq!(state.jobs[1].status, JobStatus::Running);
        let banner = state.banner.clone().unwrap();
        assert!(banner.starts_with("Cancel unit failed"));
    }

    #[test]
    fn ctrl_space_suspends_until_enter() {
        let (mut state, api) = fixture();
        select(&mut state, 1);
        let commands = state.handle_key(&ctrl(' '), &api);
        let request = match commands.as_slice() {
            [Command::Suspend(request)] => request.clone(),
            other => panic!("unexpected commands {:?}", other),
        };
        assert!(state.is_suspended());

        assert!(state.handle_key(&key(KeyCode::Char('x')), &api).is_empty());
        assert!(state.handle_key(&ctrl('q'), &api).is_empty());

        let commands = state.handle_key(&key(KeyCode::Enter), &api);
        assert!(matches!(commands.as_slice(), [Command::Resume]));
        assert!(request.cancel.is_cancelled());
        assert!(matches!(state.mode, Mode::Normal));
    }

    #[test]
    fn ctrl_q_quits_from_any_mode() {
        let (mut state, api) = fixture();
        select(&mut state, 1);
        state.handle_key(&key(KeyCode::Enter), &api);
        let commands = state.handle_key(&ctrl('q'), &api);
        assert!(matches!(commands.as_slice(), [Command::Quit]));
    }

    #[test]
    fn fatal_events_end_the_viewer() {
        let (mut state, api) = fixture();
        let result = state.handle_event(Event::Fatal(Error::EmptyPipeline(1)), &api);
        assert!(matches!(result, Err(Error::EmptyPipeline(1))));
    }
}
