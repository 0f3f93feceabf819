use super::model::ViewJob;
use super::stack::PipelineRef;
use crate::error::{Error, Result};
use crossterm::event::{self as term, KeyEventKind};
use std::io;
use std::sync::mpsc::SyncSender;
use std::thread;
use std::time::Duration;

/// Redraw cadence when nothing else happens.
pub const HEARTBEAT: Duration = Duration::from_secs(1);

/// Jobs of one pipeline as fetched by the poll loop.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Generation of the last poll signal seen before fetching.
    pub generation: u64,
    pub pipeline: PipelineRef,
    pub jobs: Vec<ViewJob>,
}

/// Everything the viewer loop reacts to, merged into one channel.
#[derive(Debug)]
pub enum Event {
    Jobs(Snapshot),
    Key(term::KeyEvent),
    Resize,
    Tick,
    Trace { session: u64, chunk: String },
    TraceEnded { session: u64, error: Option<String> },
    Fatal(Error),
}

/// Reads terminal input on its own thread, sending a `Tick` whenever a
/// heartbeat passes without input.
pub fn spawn_input_reader(events: SyncSender<Event>) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        let event = match read_input() {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                let _ = events.send(Event::Fatal(e));
                return;
            }
        };
        if events.send(event).is_err() {
            return;
        }
    })
}

fn read_input() -> Result<Option<Event>> {
    if !term::poll(HEARTBEAT)? {
        return Ok(Some(Event::Tick));
    }
    Ok(match term::read()? {
        term::Event::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        term::Event::Resize(_, _) => Some(Event::Resize),
        _ => None,
    })
}

/// `Write` adapter forwarding trace bytes of one log session to the loop.
pub struct TraceWriter {
    session: u64,
    events: SyncSender<Event>,
}

impl TraceWriter {
    pub fn new(session: u64, events: SyncSender<Event>) -> Self {
        Self { session, events }
    }
}

impl io::Write for TraceWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let chunk = String::from_utf8_lossy(buf).into_owned();
        self.events
            .send(Event::Trace {
                session: self.session,
                chunk,
            })
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "viewer closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
