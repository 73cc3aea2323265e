//! Entry points: build a program from source and run it

use super::builtins::{OutputSink, base_value_scope, stdout_sink};
use super::error::RuntimeError;
use super::function::{DEFAULT_MAX_CALL_DEPTH, set_max_call_depth};
use super::scope::{Checkpoint, ScopeRef, child_scope};
use super::stage1::{base_type_scope, collect_types};
use super::stage2::shape_globals;
use super::stage3::{Step, StepKind, compile_program};
use super::types::TypeRef;
use super::value::{Value, ValueRef};
use crate::ast::{Program as Ast, ReplInput, Spanned, Stmt, build_program, build_repl_input};
use crate::error::Result;
use crate::lexer::tokenize;
use crate::parser::{parse, parse_repl};
use std::cell::Cell;
use std::rc::Rc;

/// Interpreter settings
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Function `execute` runs
    pub entry: String,
    /// Nested user function calls allowed before failing
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            entry: "main".to_string(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Parse, check and compile `source`, printing to stdout
pub fn parse_and_build(source: &str) -> Result<Program> {
    parse_and_build_with(source, stdout_sink(), InterpreterConfig::default())
}

pub fn parse_and_build_with(
    source: &str,
    output: OutputSink,
    config: InterpreterConfig,
) -> Result<Program> {
    let ast = parse_ast(source)?;
    let mut program = Program::new(output, config)?;
    program.load(ast.items)?;
    Ok(program)
}

/// Run `entry` in `program`
pub fn execute(program: &Program, entry: &str) -> Result<i32> {
    program.execute(entry)
}

/// Front end only: tokens, raw tree, AST
pub fn parse_ast(source: &str) -> Result<Ast> {
    let tokens = tokenize(source)?;
    let unit = parse(source, tokens)?;
    build_program(unit)
}

/// Executable handle: type scope, global scope and top-level steps
pub struct Program {
    types: ScopeRef<TypeRef>,
    globals: ScopeRef<ValueRef>,
    steps: Vec<Step>,
    initialized: Cell<bool>,
    config: InterpreterConfig,
}

impl Program {
    /// Empty program with the built-ins bound
    pub fn new(output: OutputSink, config: InterpreterConfig) -> Result<Self> {
        Ok(Program {
            types: child_scope(&base_type_scope()),
            globals: child_scope(&base_value_scope(&output)?),
            steps: Vec::new(),
            initialized: Cell::new(false),
            config,
        })
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn globals(&self) -> &ScopeRef<ValueRef> {
        &self.globals
    }

    pub fn types(&self) -> &ScopeRef<TypeRef> {
        &self.types
    }

    /// Run stages 1-3 over top-level statements; the compiled steps are
    /// queued until the next [`Program::initialize`]
    fn load(&mut self, items: Vec<Spanned<Stmt>>) -> Result<()> {
        let tree = collect_types(items, &self.types)?;
        let shaped = shape_globals(tree, &self.globals)?;
        let compiled = compile_program(shaped)?;
        self.steps.extend(compiled.steps);
        Ok(())
    }

    /// Run global initializers once, in program order
    pub fn initialize(&self) -> Result<()> {
        if self.initialized.replace(true) {
            return Ok(());
        }
        set_max_call_depth(self.config.max_call_depth);
        for step in &self.steps {
            (step.eval)(&self.globals)?;
        }
        Ok(())
    }

    /// Invoke the configured entry function
    pub fn run(&self) -> Result<i32> {
        self.execute(&self.config.entry)
    }

    /// Invoke the zero-argument function `entry`. An `int` result is the exit
    /// code; any other result maps to 0.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn execute(&self, entry: &str) -> Result<i32> {
        self.initialize()?;
        set_max_call_depth(self.config.max_call_depth);

        let Some(target) = self.globals.borrow().try_get(entry) else {
            return Err(RuntimeError::undefined_variable(entry).into());
        };
        let callable = match &*target.borrow() {
            Value::Callable(callable) => callable.clone(),
            other => return Err(RuntimeError::not_callable(&other.type_name()).into()),
        };
        let result = callable.invoke(&[])?;
        let code = match *result.borrow() {
            Value::Int32(code) => code,
            _ => 0,
        };
        tracing::debug!(code, "exit");
        Ok(code)
    }
}

/// Persistent interactive session: every input extends the same program
pub struct Session {
    program: Program,
}

impl Session {
    pub fn new(output: OutputSink, config: InterpreterConfig) -> Result<Self> {
        let program = Program::new(output, config)?;
        program.initialized.set(true);
        Ok(Session { program })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Compile and run one input. Returns the value when the whole input is
    /// a single expression. An input that fails leaves no definitions behind.
    pub fn eval(&mut self, source: &str) -> Result<Option<ValueRef>> {
        let tokens = tokenize(source)?;
        let unit = parse_repl(source, tokens)?;
        let (items, bare) = match build_repl_input(unit)? {
            ReplInput::Expr(expr) => {
                let meta = expr.meta.clone();
                (vec![Spanned::new(Stmt::Expr(expr), meta)], true)
            }
            ReplInput::Statements(stmts) => (stmts, false),
        };

        let rollback = Rollback::capture(&self.program);
        let result = self.run_input(items, bare);
        if result.is_err() {
            rollback.restore(&self.program);
        }
        result
    }

    fn run_input(&mut self, items: Vec<Spanned<Stmt>>, bare: bool) -> Result<Option<ValueRef>> {
        let first = self.program.steps.len();
        let result = self.program.load(items);
        // steps are only kept for the input that produced them
        let steps: Vec<Step> = self.program.steps.drain(first..).collect();
        result?;

        set_max_call_depth(self.program.config.max_call_depth);
        let mut echoed = None;
        for step in &steps {
            let value = (step.eval)(&self.program.globals)?;
            if bare && step.kind == StepKind::Expression && !value.borrow().ty().is_void() {
                echoed = Some(value);
            }
        }
        Ok(echoed)
    }
}

/// Definitions as they were before an interactive input
struct Rollback {
    types: Checkpoint<TypeRef>,
    globals: Checkpoint<ValueRef>,
    /// Overload sets are extended in place
    callables: Vec<(ValueRef, Value)>,
}

impl Rollback {
    fn capture(program: &Program) -> Self {
        let globals = program.globals.borrow().checkpoint();
        let callables = globals
            .values()
            .filter_map(|value| match &*value.borrow() {
                callable @ Value::Callable(_) => Some((Rc::clone(value), callable.clone())),
                _ => None,
            })
            .collect();
        Rollback {
            types: program.types.borrow().checkpoint(),
            globals,
            callables,
        }
    }

    fn restore(self, program: &Program) {
        program.types.borrow_mut().restore(self.types);
        program.globals.borrow_mut().restore(self.globals);
        for (slot, callable) in self.callables {
            *slot.borrow_mut() = callable;
        }
        tracing::debug!("rolled back failed input");
    }
}
