//! Tree-walking interpreter
//!
//! A program is processed in three stages over a shared pair of scopes:
//!
//! 1. [`stage1`] registers class types.
//! 2. [`stage2`] binds global variables and function overloads.
//! 3. [`stage3`] compiles every body and initializer into closures.
//!
//! [`Program`] runs the result.

pub mod builtins;
mod error;
pub mod function;
mod program;
pub mod scope;
pub mod stage1;
pub mod stage2;
pub mod stage3;
pub mod types;
mod value;

pub use builtins::{OutputSink, stdout_sink};
pub use error::{ErrorKind, MAX_CALL_CHAIN, RuntimeError};
pub use function::{DEFAULT_MAX_CALL_DEPTH, set_max_call_depth};
pub use program::{
    InterpreterConfig, Program, Session, execute, parse_and_build, parse_and_build_with,
    parse_ast,
};
pub use value::{CallableValue, ObjectValue, Value, ValueRef, new_ref};
