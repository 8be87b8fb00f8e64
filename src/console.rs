use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Prompt shown when a program reads input without giving one.
pub const DEFAULT_INPUT_PROMPT: &str = "Input: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Output,
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputReply {
    Line(String),
    Cancelled,
}

/// The program's view of the outside world. Everything a script prints or
/// reads goes through one of these.
pub trait Console: Send {
    fn write(&mut self, text: &str);

    fn write_line(&mut self, text: &str, severity: Severity);

    /// Blocks until a line is available or the read is cancelled.
    fn request_input(&mut self, prompt: &str) -> InputReply;

    fn clear(&mut self) {}
}

/// Terminal console. Warnings and errors go to stderr.
#[derive(Debug, Default)]
pub struct StdConsole;

impl StdConsole {
    pub fn new() -> Self {
        Self
    }
}

impl Console for StdConsole {
    fn write(&mut self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    fn write_line(&mut self, text: &str, severity: Severity) {
        match severity {
            Severity::Warning | Severity::Error => eprintln!("{}", text),
            _ => println!("{}", text),
        }
    }

    fn request_input(&mut self, prompt: &str) -> InputReply {
        print!("{}", prompt);
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => InputReply::Cancelled,
            Ok(_) => InputReply::Line(line.trim_end_matches(&['\n', '\r'][..]).to_string()),
            Err(error) => {
                tracing::warn!(%error, "failed to read from stdin");
                InputReply::Cancelled
            }
        }
    }

    fn clear(&mut self) {
        print!("\x1B[2J\x1B[1;1H");
        let _ = io::stdout().flush();
    }
}

#[derive(Debug, Default)]
struct TranscriptState {
    output: String,
    messages: Vec<(Severity, String)>,
    prompts: Vec<String>,
    clears: usize,
}

/// Shared record of everything written to a [`ScriptedConsole`].
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    state: Arc<Mutex<TranscriptState>>,
}

impl Transcript {
    /// Program output: `print`/`etb3` text exactly as written.
    pub fn output(&self) -> String {
        self.state.lock().output.clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.state.lock().output.lines().map(str::to_string).collect()
    }

    /// Lines written with a severity other than `Output`.
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.state.lock().messages.clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.state.lock().prompts.clone()
    }

    pub fn clears(&self) -> usize {
        self.state.lock().clears
    }
}

/// Console fed from a fixed list of input lines. Once the list runs out every
/// read is cancelled.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    transcript: Transcript,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            transcript: Transcript::default(),
        }
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

impl Console for ScriptedConsole {
    fn write(&mut self, text: &str) {
        self.transcript.state.lock().output.push_str(text);
    }

    fn write_line(&mut self, text: &str, severity: Severity) {
        let mut state = self.transcript.state.lock();
        if severity == Severity::Output {
            state.output.push_str(text);
            state.output.push('\n');
        } else {
            state.messages.push((severity, text.to_string()));
        }
    }

    fn request_input(&mut self, prompt: &str) -> InputReply {
        self.transcript.state.lock().prompts.push(prompt.to_string());
        match self.inputs.pop_front() {
            Some(line) => InputReply::Line(line),
            None => InputReply::Cancelled,
        }
    }

    fn clear(&mut self) {
        self.transcript.state.lock().clears += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Write(String),
    Line(String, Severity),
    Prompt(String),
    Clear,
}

/// Console whose output is streamed to another thread and whose input is
/// supplied by an [`InputSender`].
pub struct ChannelConsole {
    events: Sender<ConsoleEvent>,
    replies: Receiver<InputReply>,
}

/// Answers reads on the paired [`ChannelConsole`].
#[derive(Clone)]
pub struct InputSender {
    replies: Sender<InputReply>,
}

impl ChannelConsole {
    pub fn new() -> (Self, Receiver<ConsoleEvent>, InputSender) {
        let (event_tx, event_rx) = channel::unbounded();
        let (reply_tx, reply_rx) = channel::unbounded();
        let console = Self {
            events: event_tx,
            replies: reply_rx,
        };
        (console, event_rx, InputSender { replies: reply_tx })
    }

    fn emit(&self, event: ConsoleEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("console event dropped, receiver gone");
        }
    }
}

impl Console for ChannelConsole {
    fn write(&mut self, text: &str) {
        self.emit(ConsoleEvent::Write(text.to_string()));
    }

    fn write_line(&mut self, text: &str, severity: Severity) {
        self.emit(ConsoleEvent::Line(text.to_string(), severity));
    }

    fn request_input(&mut self, prompt: &str) -> InputReply {
        self.emit(ConsoleEvent::Prompt(prompt.to_string()));
        self.replies.recv().unwrap_or(InputReply::Cancelled)
    }

    fn clear(&mut self) {
        self.emit(ConsoleEvent::Clear);
    }
}

impl InputSender {
    pub fn send_line(&self, line: impl Into<String>) -> bool {
        self.replies.send(InputReply::Line(line.into())).is_ok()
    }

    pub fn cancel(&self) -> bool {
        self.replies.send(InputReply::Cancelled).is_ok()
    }
}

type Canceller = Arc<dyn Fn() + Send + Sync>;

/// Stops a run from any thread. The evaluator checks the flag before each
/// statement; the optional canceller unblocks a pending input read.
#[derive(Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    canceller: Option<Canceller>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self {
            flag,
            canceller: None,
        }
    }

    pub fn with_canceller(mut self, cancel: impl Fn() + Send + Sync + 'static) -> Self {
        self.canceller = Some(Arc::new(cancel));
        self
    }

    /// Cancels pending reads on `sender` when stopped.
    pub fn cancelling(self, sender: &InputSender) -> Self {
        let sender = sender.clone();
        self.with_canceller(move || {
            sender.cancel();
        })
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        if let Some(cancel) = &self.canceller {
            cancel();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("stopped", &self.is_stopped())
            .field("cancels_input", &self.canceller.is_some())
            .finish()
    }
}
