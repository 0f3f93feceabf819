use super::event::{Event, Snapshot};
use super::model::{deduplicate, group_by_stage, normalize, ViewJob};
use super::stack::PipelineRef;
use crate::error::{Error, Result};
use crate::gitlab::PipelineApi;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Recheck interval while a confirmation dialog holds polling.
const HOLD_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollCommand {
    /// Fetch again now.
    Refresh,
    /// Follow another pipeline (drill-down or back up).
    Switch(PipelineRef),
    /// Stop fetching until `Release`.
    Hold,
    Release,
}

/// A poll command stamped with the viewer's signal counter, echoed back in
/// snapshots so results fetched before the command can be told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub generation: u64,
    pub command: PollCommand,
}

/// Fetches, normalizes and deduplicates the jobs of one pipeline.
///
/// A pipeline without any job or bridge is an error: there is nothing the
/// viewer could show.
pub fn fetch_jobs(api: &dyn PipelineApi, pipeline: &PipelineRef) -> Result<Vec<ViewJob>> {
    let (jobs, bridges) = api.pipeline_jobs(&pipeline.project, pipeline.id)?;
    if jobs.is_empty() && bridges.is_empty() {
        return Err(Error::EmptyPipeline(pipeline.id));
    }
    Ok(group_by_stage(deduplicate(normalize(jobs, bridges))))
}

/// Background fetch loop for the pipeline on top of the stack. At most one
/// request is in flight; the loop sleeps between fetches until the refresh
/// interval passes or a signal arrives.
pub struct PollLoop {
    api: Arc<dyn PipelineApi>,
    current: PipelineRef,
    signals: Receiver<Signal>,
    events: SyncSender<Event>,
    interval: Duration,
    generation: u64,
    held: bool,
}

impl PollLoop {
    pub fn new(
        api: Arc<dyn PipelineApi>,
        root: PipelineRef,
        signals: Receiver<Signal>,
        events: SyncSender<Event>,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            current: root,
            signals,
            events,
            interval,
            generation: 0,
            held: false,
        }
    }

    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    /// Runs until the viewer hangs up or a fetch fails. Failures are sent
    /// as `Event::Fatal`.
    pub fn run(mut self) {
        loop {
            if self.held {
                if !self.wait(HOLD_INTERVAL) {
                    return;
                }
                continue;
            }

            let event = match fetch_jobs(self.api.as_ref(), &self.current) {
                Ok(jobs) => {
                    log::debug!("pipeline {}: {} jobs", self.current, jobs.len());
                    Event::Jobs(Snapshot {
                        generation: self.generation,
                        pipeline: self.current.clone(),
                        jobs,
                    })
                }
                Err(e) => {
                    log::error!("fetching jobs of pipeline {} failed: {}", self.current, e);
                    let _ = self.events.send(Event::Fatal(e));
                    return;
                }
            };
            if self.events.send(event).is_err() {
                return;
            }

            if !self.wait(self.interval) {
                return;
            }
        }
    }

    /// Waits for a signal or the timeout, then applies everything queued.
    /// Returns `false` once the viewer is gone.
    fn wait(&mut self, timeout: Duration) -> bool {
        match self.signals.recv_timeout(timeout) {
            Ok(signal) => self.apply(signal),
            Err(RecvTimeoutError::Timeout) => return true,
            Err(RecvTimeoutError::Disconnected) => return false,
        }
        while let Ok(signal) = self.signals.try_recv() {
            self.apply(signal);
        }
        true
    }

    fn apply(&mut self, signal: Signal) {
        log::debug!("poll signal {:?}", signal);
        self.generation = signal.generation;
        match signal.command {
            PollCommand::Refresh => {}
            PollCommand::Switch(pipeline) => self.current = pipeline,
            PollCommand::Hold => self.held = true,
            PollCommand::Release => self.held = false,
        }
    }
}
