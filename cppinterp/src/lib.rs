//! cppinterp
//!
//! Tree-walking interpreter for a small, strictly typed subset of C++:
//! built-in scalar types, strings, plain classes with fields, overloaded
//! functions, references, and structured control flow.

pub mod ast;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod repl;
mod stack;

pub use ast::Span;
pub use error::{CompileError, Result};
pub use interp::{InterpreterConfig, Program, Session, parse_and_build, parse_and_build_with};
