//! Error types and reporting

use crate::ast::{SourceSymbol, Span};
use crate::interp::RuntimeError;
use std::io::Write;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompileError>;

/// Any failure surfaced by the pipeline.
///
/// `Lexer` and `Parser` are syntactic. `Semantic` covers every static error
/// raised while building a program and always carries the offending node.
/// `Runtime` is only produced by evaluators that are already compiled.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("Lexer error at {span}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span}: {message}")]
    Parser { message: String, span: Span },

    #[error("{}:{}: {message}\n{}", .symbol.line, .symbol.column, .symbol.snippet())]
    Semantic {
        message: String,
        symbol: SourceSymbol,
    },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {message}")]
    Io { message: String },
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    /// Static error attached to a source node
    pub fn semantic(message: impl Into<String>, symbol: &SourceSymbol) -> Self {
        Self::Semantic {
            message: message.into(),
            symbol: symbol.clone(),
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Errors raised before evaluation; never re-wrapped at call sites
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            Self::Lexer { .. } | Self::Parser { .. } | Self::Semantic { .. }
        )
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } => Some(*span),
            Self::Parser { span, .. } => Some(*span),
            Self::Semantic { symbol, .. } => Some(symbol.span),
            Self::Runtime(err) => err.location.as_ref().map(|loc| loc.span),
            Self::Io { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lexer { message, .. } => message,
            Self::Parser { message, .. } => message,
            Self::Semantic { message, .. } => message,
            Self::Runtime(err) => &err.message,
            Self::Io { message } => message,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Lexer { .. } => "Lexer",
            Self::Parser { .. } => "Parser",
            Self::Semantic { .. } => "Semantic",
            Self::Runtime(_) => "Runtime",
            Self::Io { .. } => "IO",
        }
    }
}

/// Report error with ariadne on stderr
pub fn report_error(filename: &str, source: &str, error: &CompileError) {
    if write_report(filename, source, error, true, std::io::stderr()).is_err() {
        eprintln!("{error}");
    }
}

/// Render a report without colors, for tests and the REPL transcript
pub fn render_error(filename: &str, source: &str, error: &CompileError) -> String {
    let mut buffer = Vec::new();
    match write_report(filename, source, error, false, &mut buffer) {
        Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
        Err(_) => error.to_string(),
    }
}

fn write_report(
    filename: &str,
    source: &str,
    error: &CompileError,
    color: bool,
    out: impl Write,
) -> std::io::Result<()> {
    use ariadne::{Color, Config, Label, Report, ReportKind, Source};

    let kind = error.kind_name();
    let range = error.span().map(|s| s.start..s.end).unwrap_or(0..0);
    let mut report = Report::build(ReportKind::Error, (filename, range.clone()))
        .with_config(Config::default().with_color(color));

    if error.span().is_some() {
        report = report
            .with_message(format!("{kind} error"))
            .with_label(
                Label::new((filename, range))
                    .with_message(error.message())
                    .with_color(Color::Red),
            );
    } else {
        report = report.with_message(format!("{kind} error: {}", error.message()));
    }

    if let CompileError::Runtime(err) = error {
        for cause in err.causes() {
            report = report.with_note(cause);
        }
    }

    report
        .finish()
        .write((filename, Source::from(source)), out)
}
