//! Statement-stepping debug sessions.
//!
//! The evaluator runs on a worker thread and parks in a [`StatementHook`]
//! whenever a pause rule fires. The controller talks to it over two channels:
//! commands go down, events come back. Each controller call blocks until the
//! worker reports its next event, so from the host's side the session is a
//! plain synchronous state machine.

use crate::config::InterpreterConfig;
use crate::console::{Console, InputReply, Severity, StopHandle};
use crate::error::FlexError;
use crate::evaluator::{Evaluator, StatementHook};
use crate::runner::compile;
use crate::stdlib::Registry;
use crossbeam::channel::{self, Receiver, Sender};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugState {
    Idle,
    Preparing,
    Paused,
    Running,
    Completed,
    Stopped,
}

impl fmt::Display for DebugState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DebugState::Idle => "idle",
            DebugState::Preparing => "preparing",
            DebugState::Paused => "paused",
            DebugState::Running => "running",
            DebugState::Completed => "completed",
            DebugState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Pause at the very next statement.
    Into,
    /// Pause at the next statement not inside a deeper call.
    Over,
    /// Pause once the current function has returned.
    Out,
    /// Pause only at breakpoints.
    Continue,
}

#[derive(Debug, Error)]
pub enum DebugError {
    #[error("cannot {command} while the session is {state}")]
    InvalidState {
        command: &'static str,
        state: DebugState,
    },
    #[error("failed to start debug worker")]
    Spawn(#[source] std::io::Error),
    #[error("debug worker exited unexpectedly")]
    WorkerLost,
}

/// What the host sees at a pause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSnapshot {
    pub line: usize,
    /// Index of the top-level statement being executed.
    pub cursor: usize,
    pub call_depth: usize,
    /// Current-frame bindings, rendered.
    pub variables: Vec<(String, String)>,
    /// Innermost call first, ending with `<main>`.
    pub call_stack: Vec<String>,
}

impl DebugSnapshot {
    fn capture(evaluator: &Evaluator, line: usize) -> Self {
        let variables = evaluator
            .bindings()
            .into_iter()
            .map(|(name, value)| (name, format!("{:?}", value)))
            .collect();

        let mut call_stack: Vec<String> = evaluator
            .call_stack()
            .iter()
            .rev()
            .map(|frame| format!("{} (called at line {})", frame.name, frame.line))
            .collect();
        call_stack.push("<main>".to_string());

        Self {
            line,
            cursor: evaluator.cursor(),
            call_depth: evaluator.call_depth(),
            variables,
            call_stack,
        }
    }
}

/// The host's editor or terminal.
pub trait SourceView {
    /// Lines that should pause execution. Read again on every resume.
    fn breakpoints(&self) -> BTreeSet<usize>;

    fn highlight_line(&mut self, line: usize);

    fn show_snapshot(&mut self, snapshot: &DebugSnapshot);

    fn clear_highlight(&mut self) {}
}

enum Command {
    Resume {
        mode: StepMode,
        breakpoints: BTreeSet<usize>,
    },
    Input(InputReply),
    Stop,
}

enum Event {
    Paused(DebugSnapshot),
    AwaitingInput { prompt: String },
    Finished(Result<(), FlexError>),
}

struct Session {
    commands: Sender<Command>,
    events: Receiver<Event>,
    worker: Option<JoinHandle<()>>,
    stop: StopHandle,
}

impl Session {
    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("debug worker panicked");
            }
        }
    }
}

pub struct DebugController<V: SourceView> {
    view: V,
    registry: Arc<Registry>,
    config: InterpreterConfig,
    state: DebugState,
    session: Option<Session>,
    snapshot: Option<DebugSnapshot>,
    pending_prompt: Option<String>,
    last_error: Option<FlexError>,
}

impl<V: SourceView> DebugController<V> {
    pub fn new(view: V, registry: Arc<Registry>, config: InterpreterConfig) -> Self {
        Self {
            view,
            registry,
            config,
            state: DebugState::Idle,
            session: None,
            snapshot: None,
            pending_prompt: None,
            last_error: None,
        }
    }

    /// Compiles `source` and pauses at its first statement. A program that
    /// fails to compile ends the session straight away in `Stopped`.
    pub fn debug(&mut self, source: &str, console: Box<dyn Console>) -> Result<DebugState, DebugError> {
        if matches!(
            self.state,
            DebugState::Preparing | DebugState::Paused | DebugState::Running
        ) {
            return Err(DebugError::InvalidState {
                command: "start a session",
                state: self.state,
            });
        }
        self.teardown();
        self.snapshot = None;
        self.last_error = None;
        self.state = DebugState::Preparing;

        let (command_tx, command_rx) = channel::unbounded();
        let (event_tx, event_rx) = channel::unbounded();
        let flag = Arc::new(AtomicBool::new(false));

        let canceller = command_tx.clone();
        let stop = StopHandle::from_flag(Arc::clone(&flag)).with_canceller(move || {
            let _ = canceller.send(Command::Stop);
        });

        let worker = Worker {
            source: source.to_string(),
            console,
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
            flag,
            commands: command_rx,
            events: event_tx,
        };
        let handle = thread::Builder::new()
            .name("flex-debug".to_string())
            .spawn(move || worker.run())
            .map_err(|error| {
                self.state = DebugState::Stopped;
                DebugError::Spawn(error)
            })?;

        self.session = Some(Session {
            commands: command_tx,
            events: event_rx,
            worker: Some(handle),
            stop,
        });
        tracing::debug!("debug session started");
        self.wait_for_event()
    }

    pub fn step_into(&mut self) -> Result<DebugState, DebugError> {
        self.resume_with(StepMode::Into, "step into")
    }

    pub fn step_over(&mut self) -> Result<DebugState, DebugError> {
        self.resume_with(StepMode::Over, "step over")
    }

    pub fn step_out(&mut self) -> Result<DebugState, DebugError> {
        self.resume_with(StepMode::Out, "step out")
    }

    /// Runs until the next breakpoint or the end of the program.
    pub fn resume(&mut self) -> Result<DebugState, DebugError> {
        self.resume_with(StepMode::Continue, "continue")
    }

    /// Answers the read the program is blocked on.
    pub fn provide_input(&mut self, line: &str) -> Result<DebugState, DebugError> {
        if self.pending_prompt.is_none() {
            return Err(DebugError::InvalidState {
                command: "provide input",
                state: self.state,
            });
        }
        self.send(Command::Input(InputReply::Line(line.to_string())))?;
        self.pending_prompt = None;
        self.wait_for_event()
    }

    /// Ends the session from any state. A pending input read is cancelled.
    pub fn stop(&mut self) -> DebugState {
        if let Some(mut session) = self.session.take() {
            session.stop.stop();
            for event in session.events.iter() {
                if let Event::Finished(result) = event {
                    self.record(result);
                    break;
                }
            }
            session.join();
            tracing::debug!("debug session stopped");
        }
        self.pending_prompt = None;
        self.view.clear_highlight();
        self.state = DebugState::Stopped;
        self.state
    }

    /// Handle that stops the session from another thread, e.g. while
    /// `resume` is blocked on a long-running loop.
    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.session.as_ref().map(|session| session.stop.clone())
    }

    pub fn state(&self) -> DebugState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&DebugSnapshot> {
        self.snapshot.as_ref()
    }

    /// The error that ended the last session, unless it was stopped on request.
    pub fn last_error(&self) -> Option<&FlexError> {
        self.last_error.as_ref()
    }

    pub fn awaiting_input(&self) -> Option<&str> {
        self.pending_prompt.as_deref()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    fn resume_with(&mut self, mode: StepMode, command: &'static str) -> Result<DebugState, DebugError> {
        if self.state != DebugState::Paused {
            return Err(DebugError::InvalidState {
                command,
                state: self.state,
            });
        }
        let breakpoints = self.view.breakpoints();
        self.view.clear_highlight();
        self.send(Command::Resume { mode, breakpoints })?;
        self.state = DebugState::Running;
        self.wait_for_event()
    }

    fn send(&mut self, command: Command) -> Result<(), DebugError> {
        let sent = self
            .session
            .as_ref()
            .is_some_and(|session| session.commands.send(command).is_ok());
        if sent {
            Ok(())
        } else {
            self.lose_worker();
            Err(DebugError::WorkerLost)
        }
    }

    fn wait_for_event(&mut self) -> Result<DebugState, DebugError> {
        let event = match self.session.as_ref() {
            Some(session) => session.events.recv(),
            None => return Err(DebugError::WorkerLost),
        };

        match event {
            Ok(Event::Paused(snapshot)) => {
                tracing::trace!(line = snapshot.line, depth = snapshot.call_depth, "paused");
                self.view.highlight_line(snapshot.line);
                self.view.show_snapshot(&snapshot);
                self.snapshot = Some(snapshot);
                self.state = DebugState::Paused;
            }
            Ok(Event::AwaitingInput { prompt }) => {
                self.pending_prompt = Some(prompt);
                self.state = DebugState::Running;
            }
            Ok(Event::Finished(result)) => {
                self.record(result);
                self.teardown();
                self.view.clear_highlight();
            }
            Err(_) => {
                self.lose_worker();
                return Err(DebugError::WorkerLost);
            }
        }
        Ok(self.state)
    }

    fn record(&mut self, result: Result<(), FlexError>) {
        self.pending_prompt = None;
        match result {
            Ok(()) => self.state = DebugState::Completed,
            Err(error) => {
                if !error.is_halt() {
                    self.last_error = Some(error);
                }
                self.state = DebugState::Stopped;
            }
        }
    }

    fn lose_worker(&mut self) {
        tracing::warn!("debug worker disconnected");
        self.teardown();
        self.pending_prompt = None;
        self.state = DebugState::Stopped;
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.join();
        }
    }
}

impl<V: SourceView> Drop for DebugController<V> {
    fn drop(&mut self) {
        if self.session.is_some() {
            self.stop();
        }
    }
}

/// Everything the worker thread needs; the evaluator itself is built on
/// the worker because its environments are not `Send`.
struct Worker {
    source: String,
    console: Box<dyn Console>,
    registry: Arc<Registry>,
    config: InterpreterConfig,
    flag: Arc<AtomicBool>,
    commands: Receiver<Command>,
    events: Sender<Event>,
}

impl Worker {
    fn run(self) {
        let Worker {
            source,
            console,
            registry,
            config,
            flag,
            commands,
            events,
        } = self;

        let result = compile(&source).and_then(|program| {
            let console = DebugConsole {
                inner: console,
                commands: commands.clone(),
                events: events.clone(),
            };
            let mut evaluator = Evaluator::new(registry, Box::new(console), config);
            evaluator.use_stop_flag(flag);
            evaluator.set_hook(Box::new(Stepper {
                commands,
                events: events.clone(),
                mode: StepMode::Into,
                origin_depth: 0,
                breakpoints: BTreeSet::new(),
                last_seen: None,
            }));
            evaluator.execute_program(&program).map(|_| ())
        });

        if events.send(Event::Finished(result)).is_err() {
            tracing::warn!("debug controller went away before the run finished");
        }
    }
}

/// Pause logic, run before every statement.
struct Stepper {
    commands: Receiver<Command>,
    events: Sender<Event>,
    mode: StepMode,
    /// Call depth when the current step was issued.
    origin_depth: usize,
    breakpoints: BTreeSet<usize>,
    /// Line and call depth of the previous statement. Cleared at each loop
    /// iteration so a breakpoint fires once per arrival at its line.
    last_seen: Option<(usize, usize)>,
}

impl Stepper {
    fn should_pause(&self, line: usize, depth: usize) -> bool {
        let arrived = self.last_seen != Some((line, depth));
        if arrived && self.breakpoints.contains(&line) {
            return true;
        }
        match self.mode {
            StepMode::Into => true,
            StepMode::Over => depth <= self.origin_depth,
            StepMode::Out => depth < self.origin_depth,
            StepMode::Continue => false,
        }
    }
}

impl StatementHook for Stepper {
    fn before_statement(&mut self, evaluator: &Evaluator, line: usize) -> Result<(), FlexError> {
        let depth = evaluator.call_depth();
        let pause = self.should_pause(line, depth);
        self.last_seen = Some((line, depth));
        if !pause {
            return Ok(());
        }

        let snapshot = DebugSnapshot::capture(evaluator, line);
        if self.events.send(Event::Paused(snapshot)).is_err() {
            return Err(FlexError::halted());
        }

        loop {
            match self.commands.recv() {
                Ok(Command::Resume { mode, breakpoints }) => {
                    self.mode = mode;
                    self.origin_depth = depth;
                    self.breakpoints = breakpoints;
                    return Ok(());
                }
                // A reply with no read outstanding
                Ok(Command::Input(_)) => continue,
                Ok(Command::Stop) | Err(_) => return Err(FlexError::halted()),
            }
        }
    }

    fn loop_iteration(&mut self) {
        self.last_seen = None;
    }
}

/// Forwards output to the host console and turns reads into
/// `AwaitingInput` events answered by the controller.
struct DebugConsole {
    inner: Box<dyn Console>,
    commands: Receiver<Command>,
    events: Sender<Event>,
}

impl Console for DebugConsole {
    fn write(&mut self, text: &str) {
        self.inner.write(text);
    }

    fn write_line(&mut self, text: &str, severity: Severity) {
        self.inner.write_line(text, severity);
    }

    fn request_input(&mut self, prompt: &str) -> InputReply {
        let event = Event::AwaitingInput {
            prompt: prompt.to_string(),
        };
        if self.events.send(event).is_err() {
            return InputReply::Cancelled;
        }

        loop {
            match self.commands.recv() {
                Ok(Command::Input(reply)) => return reply,
                Ok(Command::Resume { .. }) => continue,
                Ok(Command::Stop) | Err(_) => return InputReply::Cancelled,
            }
        }
    }

    fn clear(&mut self) {
        self.inner.clear();
    }
}
