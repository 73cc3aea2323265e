//! Source location tracking

use serde::{Deserialize, Serialize};
use std::fmt;

/// A byte span in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

/// Where a node came from: its originating text plus 1-based line/column.
///
/// Every diagnostic raised by the pipeline carries one of these so the
/// host can render the offending snippet without going back to the source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceSymbol {
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub span: Span,
}

impl SourceSymbol {
    pub fn new(text: impl Into<String>, line: usize, column: usize, span: Span) -> Self {
        Self {
            text: text.into(),
            line,
            column,
            span,
        }
    }

    /// First line of the originating text, for one-line diagnostics
    pub fn snippet(&self) -> &str {
        self.text.lines().next().unwrap_or("").trim_end()
    }
}

impl fmt::Display for SourceSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: '{}'", self.line, self.column, self.snippet())
    }
}

/// Maps byte offsets to line/column pairs
#[derive(Debug, Clone)]
pub struct LineIndex<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
}

impl<'src> LineIndex<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            source,
            line_starts,
        }
    }

    /// 1-based (line, column) of a byte offset
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }

    pub fn symbol(&self, span: Span) -> SourceSymbol {
        let (line, column) = self.position(span.start);
        let end = span.end.min(self.source.len());
        let text = self.source.get(span.start..end).unwrap_or("");
        SourceSymbol::new(text, line, column, span)
    }
}

/// A value with source metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub meta: SourceSymbol,
}

impl<T> Spanned<T> {
    pub fn new(node: T, meta: SourceSymbol) -> Self {
        Self { node, meta }
    }

    pub fn span(&self) -> Span {
        self.meta.span
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            meta: self.meta,
        }
    }
}
