use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt::Write as _;
use thiserror::Error;

/// Character-offset range into the source plus the line it starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Self { start, end, line }
    }

    pub fn single(pos: usize, line: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
            line,
        }
    }

    /// Covers `self` through the end of `other`, keeping the starting line.
    pub fn to(&self, other: &Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Runtime,
    InputCancelled,
    /// Raised when a host stop command interrupts the run.
    Halted,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Lexical => "Lexical Error",
            ErrorKind::Syntax => "Syntax Error",
            ErrorKind::Runtime => "Runtime Error",
            ErrorKind::InputCancelled => "Input Cancelled",
            ErrorKind::Halted => "Stopped",
        }
    }

    fn color(&self) -> Color {
        match self {
            ErrorKind::Lexical => Color::Red,
            ErrorKind::Syntax => Color::Yellow,
            ErrorKind::Runtime => Color::Magenta,
            ErrorKind::InputCancelled | ErrorKind::Halted => Color::Cyan,
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FlexError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Option<Span>,
    /// Where a syntax error was detected, already quoted: `'foo'` or `end`.
    pub near: Option<String>,
    pub help: Option<String>,
}

impl FlexError {
    pub fn new(kind: ErrorKind, span: Option<Span>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            near: None,
            help: None,
        }
    }

    pub fn lexical(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lexical, Some(span), message)
    }

    pub fn syntax(span: Span, near: String, message: impl Into<String>) -> Self {
        Self {
            near: Some(near),
            ..Self::new(ErrorKind::Syntax, Some(span), message)
        }
    }

    pub fn runtime(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, Some(span), message)
    }

    /// A runtime error raised away from any source position (inside a native).
    /// The evaluator attaches the call site afterwards.
    pub fn native(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, None, message)
    }

    pub fn input_cancelled() -> Self {
        Self::new(ErrorKind::InputCancelled, None, "Input cancelled")
    }

    pub fn halted() -> Self {
        Self::new(ErrorKind::Halted, None, "Execution stopped")
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_span_if_absent(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn line(&self) -> Option<usize> {
        self.span.map(|span| span.line)
    }

    pub fn is_halt(&self) -> bool {
        self.kind == ErrorKind::Halted
    }

    /// One-line rendering for consoles: `[line 3] Runtime Error: Division by zero`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(line) = self.line() {
            let _ = write!(out, "[line {}] ", line);
        }
        out.push_str(self.kind.label());
        if let Some(near) = &self.near {
            let _ = write!(out, " at {}", near);
        }
        let _ = write!(out, ": {}", self.message);
        out
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<repl>");
        let color = self.kind.color();
        let span = self.span.unwrap_or_default();

        let mut message = format!("{}: {}", self.kind.label().fg(color), self.message);
        if let Some(near) = &self.near {
            message = format!("{} (at {})", message, near);
        }

        let mut report_builder = Report::build(ReportKind::Error, filename, span.start)
            .with_message(message);

        if self.span.is_some() {
            report_builder = report_builder.with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(&self.message)
                    .with_color(color),
            );
        }

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        if let Err(error) = report_builder
            .finish()
            .eprint((filename, Source::from(source)))
        {
            tracing::warn!(%error, "failed to render diagnostic");
            eprintln!("{}", self.describe());
        }
    }
}
