//! Process capture: run a command and collect both output streams.
//!
//! Two reader threads drain stdout and stderr so neither pipe can fill up and
//! stall the child. They forward chunks over a channel to the coordinating
//! thread, which also polls the child against the deadline and the
//! cancellation flag. Stream order within each stream is preserved; the
//! interleaving between streams is not.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crate::crash::ProcessOutcome;

/// How often the child is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long to wait for the streams to close after the child exits.
const STREAM_GRACE: Duration = Duration::from_secs(5);
const READ_CHUNK: usize = 8 * 1024;

/// Errors launching or waiting on the captured process.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Child process has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("Failed to wait for child process: {0}")]
    Wait(#[source] std::io::Error),
}

/// The two captured streams of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTranscript {
    /// stdout
    pub primary: String,
    /// stderr
    pub secondary: String,
}

impl RawTranscript {
    /// Primary then secondary, separated by a newline when needed.
    pub fn combined(&self) -> String {
        if self.secondary.is_empty() {
            return self.primary.clone();
        }
        let mut out = String::with_capacity(self.primary.len() + self.secondary.len() + 1);
        out.push_str(&self.primary);
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&self.secondary);
        out
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A command to run under capture.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    program: OsString,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
}

impl CaptureRequest {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout: None,
            cancel: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Kill the child once `flag` becomes true.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_canceled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Result of a captured run.
#[derive(Debug, Clone)]
pub struct CapturedRun {
    pub transcript: RawTranscript,
    pub outcome: ProcessOutcome,
    pub started_at: SystemTime,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Primary,
    Secondary,
}

enum StreamEvent {
    Chunk(Stream, Vec<u8>),
    Closed(Stream),
}

/// Collects chunks from both readers.
#[derive(Default)]
struct Collector {
    primary: Vec<u8>,
    secondary: Vec<u8>,
    open: usize,
}

impl Collector {
    fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Chunk(Stream::Primary, bytes) => self.primary.extend_from_slice(&bytes),
            StreamEvent::Chunk(Stream::Secondary, bytes) => {
                self.secondary.extend_from_slice(&bytes)
            }
            StreamEvent::Closed(_) => self.open = self.open.saturating_sub(1),
        }
    }

    fn into_transcript(self) -> RawTranscript {
        RawTranscript {
            primary: String::from_utf8_lossy(&self.primary).into_owned(),
            secondary: String::from_utf8_lossy(&self.secondary).into_owned(),
        }
    }
}

/// Run `request` to completion, timeout or cancellation.
///
/// Timeout and cancellation are not errors: the child is killed and the
/// outcome records why.
pub fn run_captured(request: &CaptureRequest) -> Result<CapturedRun, CaptureError> {
    let started_at = SystemTime::now();
    let start = Instant::now();

    let mut command = Command::new(&request.program);
    command
        .args(&request.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &request.current_dir {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|source| CaptureError::Spawn {
        program: request.program.to_string_lossy().into_owned(),
        source,
    })?;
    tracing::debug!(program = ?request.program, pid = child.id(), "captured process started");

    let stdout = child.stdout.take().ok_or(CaptureError::MissingPipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(CaptureError::MissingPipe("stderr"))?;

    let (tx, rx) = mpsc::channel();
    spawn_reader(Stream::Primary, stdout, tx.clone());
    spawn_reader(Stream::Secondary, stderr, tx);

    let mut collector = Collector {
        open: 2,
        ..Collector::default()
    };
    let deadline = request.timeout.map(|t| start + t);
    let mut timed_out = false;
    let mut canceled = false;

    let status = loop {
        // Waiting on the channel doubles as the poll interval
        if let Ok(event) = rx.recv_timeout(POLL_INTERVAL) {
            collector.apply(event);
            while let Ok(event) = rx.try_recv() {
                collector.apply(event);
            }
        }

        if let Some(status) = child.try_wait().map_err(CaptureError::Wait)? {
            break status;
        }
        if request.is_canceled() {
            canceled = true;
            break kill(&mut child)?;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            timed_out = true;
            break kill(&mut child)?;
        }
        // Streams closed but the child lingers: just sleep out the interval
        if collector.open == 0 {
            thread::sleep(POLL_INTERVAL);
        }
    };

    let grace_end = Instant::now() + STREAM_GRACE;
    while collector.open > 0 {
        let remaining = grace_end.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(event) => collector.apply(event),
            Err(_) => {
                tracing::warn!(
                    open_streams = collector.open,
                    "output streams still open after process exit, keeping partial output"
                );
                break;
            }
        }
    }

    let mut outcome = ProcessOutcome::from_status(status);
    outcome.timed_out = timed_out;
    outcome.canceled = canceled;

    let run = CapturedRun {
        transcript: collector.into_transcript(),
        outcome,
        started_at,
        duration: start.elapsed(),
    };
    tracing::debug!(
        exit_code = run.outcome.exit_code,
        timed_out,
        canceled,
        bytes = run.transcript.len(),
        elapsed_ms = run.duration.as_millis() as u64,
        "captured process finished"
    );
    Ok(run)
}

fn kill(child: &mut Child) -> Result<ExitStatus, CaptureError> {
    // Already exited between try_wait and kill
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "kill failed");
    }
    child.wait().map_err(CaptureError::Wait)
}

fn spawn_reader<R>(stream: Stream, mut reader: R, tx: Sender<StreamEvent>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(StreamEvent::Chunk(stream, buf[..n].to_vec())).is_err() {
                        return;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(?stream, error = %e, "output stream read failed");
                    break;
                }
            }
        }
        // Coordinator may have given up already
        let _ = tx.send(StreamEvent::Closed(stream));
    });
}
