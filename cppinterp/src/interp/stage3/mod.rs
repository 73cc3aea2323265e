//! Stage 3: compilation and evaluation
//!
//! Every expression compiles once into an evaluator closure paired with its
//! static type. Statements compile into closures returning a [`Signal`],
//! paired with the control outcomes reachable from them, which is what the
//! return-type checks of a function build work from.

mod expr;
mod stmt;

use super::error::RuntimeError;
use super::function::{BodyEval, Function, FunctionRef, UserFunction};
use super::scope::{Scope, ScopeRef};
use super::stage2::{ShapedItem, ShapedProgram};
use super::types::TypeRef;
use super::value::{Value, ValueRef, new_ref};
use crate::ast::{Expr, SourceSymbol, Spanned};
use crate::error::{CompileError, Result};
use crate::stack;
use std::rc::Rc;

/// Runtime scope
pub type ValueScope = ScopeRef<ValueRef>;
/// Compile-time scope of locals
pub type TypeScope = ScopeRef<TypeRef>;

pub type ExprEval = Box<dyn Fn(&ValueScope) -> Result<ValueRef>>;
pub type StmtEval = Box<dyn Fn(&ValueScope) -> Result<Signal>>;

/// Control outcome of running a statement
pub enum Signal {
    None,
    Return(ValueRef),
    Break,
    Continue,
}

impl Signal {
    fn keyword(&self) -> &'static str {
        match self {
            Signal::None => "none",
            Signal::Return(_) => "return",
            Signal::Break => "break",
            Signal::Continue => "continue",
        }
    }
}

/// Statically reachable outcome of a statement
#[derive(Debug, Clone)]
pub enum Reachable {
    Return(TypeRef, SourceSymbol),
    Break(SourceSymbol),
    Continue(SourceSymbol),
    /// Control can fall through to the next statement
    None,
}

pub struct CompiledExpr {
    pub eval: ExprEval,
    pub ty: TypeRef,
    /// Candidate overloads when `ty` is `Callable`
    pub overloads: Vec<FunctionRef>,
}

pub struct CompiledStmt {
    pub eval: StmtEval,
    pub results: Vec<Reachable>,
}

impl CompiledStmt {
    fn falls_through(&self) -> bool {
        self.results.iter().any(|r| matches!(r, Reachable::None))
    }
}

/// What a name statically refers to
pub(crate) enum Symbol {
    Variable(TypeRef),
    Callable(Vec<FunctionRef>),
}

/// Compiles against the type scope and the global value scope
pub struct Compiler {
    types: TypeScope,
    globals: ValueScope,
}

/// Role of a compiled top-level item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Global initializer
    Initializer,
    /// Bare expression whose value an interactive session echoes
    Expression,
    Statement,
}

/// Compiled top-level item, run in program order
pub struct Step {
    pub kind: StepKind,
    pub eval: ExprEval,
}

pub struct CompiledProgram {
    pub steps: Vec<Step>,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn compile_program(shaped: ShapedProgram) -> Result<CompiledProgram> {
    let compiler = Compiler::new(shaped.types, Rc::clone(&shaped.values));
    let mut steps = Vec::new();
    for item in shaped.items {
        match item {
            ShapedItem::Function(function) => compiler.build_function(&function)?,
            ShapedItem::Init { name, value, meta } => {
                let assign = Spanned::new(
                    Expr::Assign {
                        target: Box::new(Spanned::new(Expr::Atom(name.node), name.meta)),
                        value: Box::new(value),
                    },
                    meta,
                );
                let compiled = compiler.compile_expr(&assign, &Scope::new().into_ref())?;
                steps.push(Step {
                    kind: StepKind::Initializer,
                    eval: compiled.eval,
                });
            }
            ShapedItem::Expr(expr) => {
                let compiled = compiler.compile_expr(&expr, &Scope::new().into_ref())?;
                steps.push(Step {
                    kind: StepKind::Expression,
                    eval: compiled.eval,
                });
            }
            ShapedItem::Stmt(stmt) => {
                let eval = compiler.compile_top_level(&stmt)?;
                steps.push(Step {
                    kind: StepKind::Statement,
                    eval,
                });
            }
        }
    }
    tracing::debug!(steps = steps.len(), "compiled program");
    Ok(CompiledProgram { steps })
}

impl Compiler {
    pub fn new(types: TypeScope, globals: ValueScope) -> Self {
        Compiler { types, globals }
    }

    pub(crate) fn lookup(&self, locals: &TypeScope, name: &str) -> Option<Symbol> {
        if let Some(ty) = locals.borrow().try_get(name) {
            return Some(Symbol::Variable(ty));
        }
        let value = self.globals.borrow().try_get(name)?;
        let value = value.borrow();
        match &*value {
            Value::Callable(callable) => Some(Symbol::Callable(callable.overloads().to_vec())),
            other => Some(Symbol::Variable(other.ty())),
        }
    }

    /// Build a function body against a fresh parameter scope
    pub fn build_function(&self, function: &Rc<UserFunction>) -> Result<()> {
        let _span = tracing::debug_span!("build", function = %function.name()).entered();
        function.build_body(&self.globals, |f| self.compile_body(f))
    }

    fn compile_body(&self, function: &UserFunction) -> Result<BodyEval> {
        let locals = Scope::new().into_ref();
        for param in function.parameters() {
            if !locals
                .borrow_mut()
                .try_bind(param.name.clone(), TypeRef::clone(&param.ty))
            {
                return Err(CompileError::semantic(
                    format!("Duplicate parameter name '{}'", param.name),
                    function.meta(),
                ));
            }
        }

        let body = self.compile_block(&function.body().node, &locals, false)?;
        let declared = TypeRef::clone(function.return_type());
        for result in &body.results {
            match result {
                Reachable::Break(meta) => {
                    return Err(CompileError::semantic(
                        "'break' can only be used inside a loop",
                        meta,
                    ));
                }
                Reachable::Continue(meta) => {
                    return Err(CompileError::semantic(
                        "'continue' can only be used inside a loop",
                        meta,
                    ));
                }
                Reachable::Return(ty, meta) if declared.is_void() && !ty.is_void() => {
                    return Err(CompileError::semantic(
                        format!("Void function '{}' can not return a value", function.name()),
                        meta,
                    ));
                }
                Reachable::Return(ty, meta) if **ty != *declared => {
                    return Err(CompileError::semantic(
                        format!(
                            "Incompatible return type. Expected '{}' got '{}'",
                            declared.name(),
                            ty.name()
                        ),
                        meta,
                    ));
                }
                Reachable::Return(..) | Reachable::None => {}
            }
        }
        let returns = body
            .results
            .iter()
            .any(|r| matches!(r, Reachable::Return(..)));
        if !declared.is_void() && !returns {
            return Err(CompileError::semantic(
                "Non void function must return a value",
                function.meta(),
            ));
        }

        let eval = body.eval;
        let returns_void = declared.is_void();
        let name = function.name().to_string();
        Ok(body_eval(move |frame| match eval(frame)? {
            // returned by value
            Signal::Return(value) => Ok(new_ref(value.borrow().deep_copy())),
            Signal::None if returns_void => Ok(new_ref(Value::Void)),
            Signal::None => Err(RuntimeError::missing_return(&name).into()),
            signal => Err(RuntimeError::loop_control(signal.keyword()).into()),
        }))
    }

    /// Statement outside any function, run directly in the global scope
    fn compile_top_level(&self, stmt: &Spanned<crate::ast::Stmt>) -> Result<ExprEval> {
        let compiled = self.compile_stmt(stmt, &Scope::new().into_ref())?;
        for result in &compiled.results {
            match result {
                Reachable::Return(_, meta) => {
                    return Err(CompileError::semantic(
                        "'return' can only be used inside a function",
                        meta,
                    ));
                }
                Reachable::Break(meta) => {
                    return Err(CompileError::semantic(
                        "'break' can only be used inside a loop",
                        meta,
                    ));
                }
                Reachable::Continue(meta) => {
                    return Err(CompileError::semantic(
                        "'continue' can only be used inside a loop",
                        meta,
                    ));
                }
                Reachable::None => {}
            }
        }
        let eval = compiled.eval;
        Ok(expr_eval(move |scope| match eval(scope)? {
            Signal::None => Ok(new_ref(Value::Void)),
            signal => Err(RuntimeError::loop_control(signal.keyword()).into()),
        }))
    }
}

/// Attach `meta` to a runtime error that has no location yet
pub(crate) fn locate(err: CompileError, meta: &SourceSymbol) -> CompileError {
    match err {
        CompileError::Runtime(inner) if inner.location.is_none() => inner.at(meta).into(),
        other => other,
    }
}

/// Conditions accept any value except `void` and function names
pub(crate) fn check_condition(ty: &TypeRef, meta: &SourceSymbol) -> Result<()> {
    if ty.is_void() || ty.is_callable() {
        return Err(CompileError::semantic(
            format!("Value of type '{}' can not be used as a condition", ty.name()),
            meta,
        ));
    }
    Ok(())
}

pub(crate) fn incompatible(expected: &TypeRef, got: &TypeRef, meta: &SourceSymbol) -> CompileError {
    CompileError::semantic(
        format!(
            "Incompatible types. Expected '{}' got '{}'",
            expected.name(),
            got.name()
        ),
        meta,
    )
}

fn expr_eval(eval: impl Fn(&ValueScope) -> Result<ValueRef> + 'static) -> ExprEval {
    Box::new(move |scope| stack::guarded(|| eval(scope)))
}

fn stmt_eval(eval: impl Fn(&ValueScope) -> Result<Signal> + 'static) -> StmtEval {
    Box::new(move |scope| stack::guarded(|| eval(scope)))
}

fn body_eval(eval: impl Fn(&ValueScope) -> Result<ValueRef> + 'static) -> BodyEval {
    Rc::new(eval)
}

#[cfg(test)]
mod tests;
