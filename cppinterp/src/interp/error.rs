//! Runtime errors for the interpreter

use crate::ast::SourceSymbol;
use crate::error::CompileError;
use std::fmt;

/// Longest call chain kept on an error
pub const MAX_CALL_CHAIN: usize = 64;

/// Runtime error during interpretation
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Source node that was executing, when known
    pub location: Option<SourceSymbol>,
    /// Error that escaped a call made from `location`
    pub cause: Option<Box<CompileError>>,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Name missing from the runtime scope
    UndefinedVariable,
    /// No overload (or more than one) for the runtime argument types
    NoMatchingOverload,
    /// Overload with the same parameter types already registered
    DuplicateOverload,
    /// Callee did not evaluate to a callable
    NotCallable,
    /// Value of an unexpected type reached a native operation
    TypeError,
    /// Division or remainder by zero
    DivisionByZero,
    /// Call depth limit exceeded
    StackOverflow,
    /// `break`/`continue` escaped every loop
    LoopControl,
    /// Non-void function body ended without `return`
    MissingReturn,
    /// User function invoked before its body was compiled
    FunctionNotBuilt,
    /// User function body compiled twice
    FunctionAlreadyBuilt,
    /// Type has no constructor for the request
    NotConstructible,
    /// Symbol already bound in the runtime scope
    AlreadyDefined,
    /// A call failed; see `cause`
    CallFailed,
    /// Output sink failure
    IoError,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
            location: None,
            cause: None,
        }
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            format!("Variable not found '{name}'"),
        )
    }

    pub fn no_matching_overload(types: &[String]) -> Self {
        Self::new(
            ErrorKind::NoMatchingOverload,
            format!("Overload for [{}] doesn't exist", types.join(", ")),
        )
    }

    pub fn duplicate_overload(name: &str, types: &[String]) -> Self {
        Self::new(
            ErrorKind::DuplicateOverload,
            format!("Overload {name}({}) already exists", types.join(", ")),
        )
    }

    pub fn not_callable(type_name: &str) -> Self {
        Self::new(
            ErrorKind::NotCallable,
            format!("Expected callable symbol, got '{type_name}'"),
        )
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(
            ErrorKind::TypeError,
            format!("type error: expected {expected}, got {got}"),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero")
    }

    pub fn stack_overflow(depth: usize) -> Self {
        Self::new(
            ErrorKind::StackOverflow,
            format!("stack overflow: call depth exceeded {depth}"),
        )
    }

    pub fn loop_control(signal: &str) -> Self {
        Self::new(
            ErrorKind::LoopControl,
            format!("'{signal}' can only be used in a loop construct"),
        )
    }

    pub fn missing_return(function: &str) -> Self {
        Self::new(
            ErrorKind::MissingReturn,
            format!("Return statement missing in '{function}'"),
        )
    }

    pub fn function_not_built(name: &str) -> Self {
        Self::new(
            ErrorKind::FunctionNotBuilt,
            format!("function '{name}' was called before its body was built"),
        )
    }

    pub fn function_already_built(name: &str) -> Self {
        Self::new(
            ErrorKind::FunctionAlreadyBuilt,
            format!("function '{name}' was already built"),
        )
    }

    pub fn not_constructible(type_name: &str) -> Self {
        Self::new(
            ErrorKind::NotConstructible,
            format!("Type '{type_name}' can not be instantiated"),
        )
    }

    pub fn already_defined(name: &str) -> Self {
        Self::new(
            ErrorKind::AlreadyDefined,
            format!("'{name}' was already defined"),
        )
    }

    pub fn io_error(msg: &str) -> Self {
        Self::new(ErrorKind::IoError, format!("IO error: {msg}"))
    }

    /// Wrap an error that escaped a call made at `site`. Chains stop growing
    /// at [`MAX_CALL_CHAIN`] frames; deeper failures pass through unchanged.
    pub fn call_failed(site: &SourceSymbol, cause: CompileError) -> Self {
        let detail = match cause {
            CompileError::Runtime(inner) if inner.chain_len() >= MAX_CALL_CHAIN => return inner,
            CompileError::Runtime(ref inner) => inner.root_cause().message.clone(),
            ref other => other.message().to_string(),
        };
        RuntimeError {
            kind: ErrorKind::CallFailed,
            message: format!("call to '{}' failed: {detail}", site.snippet()),
            location: Some(site.clone()),
            cause: Some(Box::new(cause)),
        }
    }

    /// Number of errors in this chain, counting `self`
    pub fn chain_len(&self) -> usize {
        match self.cause.as_deref() {
            Some(CompileError::Runtime(inner)) => 1 + inner.chain_len(),
            Some(_) => 2,
            None => 1,
        }
    }

    pub fn at(mut self, location: &SourceSymbol) -> Self {
        self.location = Some(location.clone());
        self
    }

    /// The innermost error of a wrapped chain
    pub fn root_cause(&self) -> &RuntimeError {
        match self.cause.as_deref() {
            Some(CompileError::Runtime(inner)) => inner.root_cause(),
            _ => self,
        }
    }

    /// One line per wrapped cause, outermost first
    pub fn causes(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut next = self.cause.as_deref();
        while let Some(err) = next {
            match err {
                CompileError::Runtime(inner) => {
                    let line = match &inner.location {
                        Some(loc) => format!("at {loc}: {}", inner.message),
                        None => inner.message.clone(),
                    };
                    lines.push(line);
                    next = inner.cause.as_deref();
                }
                other => {
                    lines.push(other.to_string());
                    next = None;
                }
            }
        }
        lines
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "Runtime error at {loc}: {}", self.message),
            None => write!(f, "Runtime error: {}", self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn site(text: &str, line: usize) -> SourceSymbol {
        SourceSymbol::new(text, line, 1, Span::new(0, text.len()))
    }

    #[test]
    fn test_constructors_set_kind() {
        assert_eq!(
            RuntimeError::undefined_variable("x").kind,
            ErrorKind::UndefinedVariable
        );
        assert_eq!(
            RuntimeError::division_by_zero().kind,
            ErrorKind::DivisionByZero
        );
        assert_eq!(
            RuntimeError::loop_control("break").kind,
            ErrorKind::LoopControl
        );
        assert_eq!(
            RuntimeError::function_not_built("f").kind,
            ErrorKind::FunctionNotBuilt
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            RuntimeError::undefined_variable("x").message,
            "Variable not found 'x'"
        );
        assert_eq!(
            RuntimeError::no_matching_overload(&["int".into(), "bool".into()]).message,
            "Overload for [int, bool] doesn't exist"
        );
        assert_eq!(
            RuntimeError::loop_control("continue").message,
            "'continue' can only be used in a loop construct"
        );
    }

    #[test]
    fn test_display_without_location() {
        let err = RuntimeError::division_by_zero();
        assert_eq!(format!("{err}"), "Runtime error: division by zero");
    }

    #[test]
    fn test_display_with_location() {
        let err = RuntimeError::division_by_zero().at(&site("a / b", 4));
        assert_eq!(format!("{err}"), "Runtime error at 4:1: 'a / b': division by zero");
    }

    #[test]
    fn test_call_failed_chain() {
        let inner = RuntimeError::division_by_zero();
        let middle = RuntimeError::call_failed(&site("div(1, 0)", 2), inner.into());
        let outer = RuntimeError::call_failed(&site("run()", 7), middle.into());

        assert_eq!(outer.kind, ErrorKind::CallFailed);
        assert_eq!(outer.root_cause().kind, ErrorKind::DivisionByZero);
        let causes = outer.causes();
        assert_eq!(causes.len(), 2);
        assert!(causes[0].starts_with("at 2:1: 'div(1, 0)'"));
        assert_eq!(causes[1], "division by zero");
    }

    #[test]
    fn test_call_chain_is_capped() {
        let mut err = RuntimeError::stack_overflow(10_000);
        for line in 0..200 {
            err = RuntimeError::call_failed(&site("f(n - 1)", line), err.into());
        }
        assert_eq!(err.chain_len(), MAX_CALL_CHAIN);
        assert_eq!(err.root_cause().kind, ErrorKind::StackOverflow);
        assert!(err.message.ends_with("stack overflow: call depth exceeded 10000"));
    }

    #[test]
    fn test_call_failed_message_includes_cause() {
        let err = RuntimeError::call_failed(&site("f()", 1), RuntimeError::division_by_zero().into());
        assert_eq!(err.message, "call to 'f()' failed: division by zero");
    }
}
