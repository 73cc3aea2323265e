//! Statement compilation

use super::{
    CompiledExpr, CompiledStmt, Compiler, Reachable, Signal, StmtEval, TypeScope, ValueScope,
    check_condition, incompatible, locate, stmt_eval,
};
use crate::ast::{Block, Expr, ForStmt, IfStmt, SourceSymbol, Spanned, Stmt, VarDef, WhileStmt};
use crate::error::{CompileError, Result};
use crate::interp::error::RuntimeError;
use crate::interp::scope::child_scope;
use crate::interp::stage1::lookup_type;
use crate::interp::types::{self, Construct, MemberFlags, TypeRef};
use crate::interp::value::{Value, ValueRef, new_ref};
use crate::stack;
use std::rc::Rc;

impl Compiler {
    pub fn compile_stmt(&self, stmt: &Spanned<Stmt>, locals: &TypeScope) -> Result<CompiledStmt> {
        stack::guarded(|| self.compile_stmt_inner(stmt, locals))
    }

    fn compile_stmt_inner(&self, stmt: &Spanned<Stmt>, locals: &TypeScope) -> Result<CompiledStmt> {
        let meta = &stmt.meta;
        match &stmt.node {
            Stmt::Expr(expr) => {
                let eval = self.compile_expr(expr, locals)?.eval;
                Ok(CompiledStmt {
                    eval: stmt_eval(move |scope| {
                        eval(scope)?;
                        Ok(Signal::None)
                    }),
                    results: vec![Reachable::None],
                })
            }
            Stmt::VarDef(def) => self.compile_var_def(def, locals),
            Stmt::Block(block) => self.compile_block(block, locals, true),
            Stmt::If(if_stmt) => self.compile_if(if_stmt, locals),
            Stmt::While(while_stmt) => self.compile_while(while_stmt, locals),
            Stmt::For(for_stmt) => self.compile_for(for_stmt, locals),
            Stmt::Return(value) => self.compile_return(value.as_ref(), locals, meta),
            Stmt::Break => Ok(CompiledStmt {
                eval: stmt_eval(|_| Ok(Signal::Break)),
                results: vec![Reachable::Break(meta.clone())],
            }),
            Stmt::Continue => Ok(CompiledStmt {
                eval: stmt_eval(|_| Ok(Signal::Continue)),
                results: vec![Reachable::Continue(meta.clone())],
            }),
            Stmt::FuncDef(_) => Err(CompileError::semantic(
                "Functions can only be defined at the top level",
                meta,
            )),
            Stmt::ClassDef(_) => Err(CompileError::semantic(
                "Classes can only be defined at the top level",
                meta,
            )),
        }
    }

    /// `new_scope` is false for function bodies, whose parameters already
    /// live in a fresh scope
    pub fn compile_block(
        &self,
        block: &Block,
        locals: &TypeScope,
        new_scope: bool,
    ) -> Result<CompiledStmt> {
        let scope = if new_scope {
            child_scope(locals)
        } else {
            Rc::clone(locals)
        };

        let mut evals: Vec<StmtEval> = Vec::with_capacity(block.stmts.len());
        let mut results = Vec::new();
        let mut reachable = true;
        for stmt in &block.stmts {
            let compiled = self.compile_stmt(stmt, &scope)?;
            if reachable {
                let falls_through = compiled.falls_through();
                results.extend(
                    compiled
                        .results
                        .into_iter()
                        .filter(|r| !matches!(r, Reachable::None)),
                );
                reachable = falls_through;
            }
            evals.push(compiled.eval);
        }
        if reachable {
            results.push(Reachable::None);
        }

        Ok(CompiledStmt {
            eval: stmt_eval(move |scope| {
                let frame = if new_scope {
                    child_scope(scope)
                } else {
                    Rc::clone(scope)
                };
                for eval in &evals {
                    match eval(&frame)? {
                        Signal::None => {}
                        signal => return Ok(signal),
                    }
                }
                Ok(Signal::None)
            }),
            results,
        })
    }

    fn compile_var_def(&self, def: &VarDef, locals: &TypeScope) -> Result<CompiledStmt> {
        let ty = lookup_type(&self.types, &def.ty.node.name, &def.ty.meta)?;
        let name = def.name.node.clone();
        // the initializer can not see the variable it initializes
        let init = def
            .init
            .as_ref()
            .map(|init| self.compile_expr(init, locals))
            .transpose()?;
        if let Some(init) = &init
            && *init.ty != *ty
        {
            return Err(incompatible(&ty, &init.ty, &def.name.meta));
        }
        if !locals.borrow_mut().try_bind(name.clone(), TypeRef::clone(&ty)) {
            return Err(CompileError::semantic(
                format!("'{name}' was already defined"),
                &def.name.meta,
            ));
        }
        let meta = def.name.meta.clone();

        if def.ty.node.is_reference {
            let Some(CompiledExpr { eval: init, .. }) = init else {
                return Err(CompileError::semantic(
                    format!("Declaration of reference variable '{name}' required an initializer"),
                    &def.name.meta,
                ));
            };
            return Ok(CompiledStmt {
                eval: stmt_eval(move |scope| {
                    let target = init(scope)?;
                    bind(scope, &name, target, &meta)?;
                    Ok(Signal::None)
                }),
                results: vec![Reachable::None],
            });
        }

        let assign = ty
            .get_function("operator=", MemberFlags::PUBLIC_INSTANCE)
            .filter(|_| init.is_some());
        let init = init.map(|c| c.eval);
        Ok(CompiledStmt {
            eval: stmt_eval(move |scope| {
                let initial = init.as_ref().map(|eval| eval(scope)).transpose()?;
                let instance = ty.create().map_err(|err| locate(err, &meta))?;
                bind(scope, &name, Rc::clone(&instance), &meta)?;
                if let (Some(value), Some(assign)) = (initial, &assign) {
                    assign
                        .invoke(&instance, &[value])
                        .map_err(|err| locate(err, &meta))?;
                }
                Ok(Signal::None)
            }),
            results: vec![Reachable::None],
        })
    }

    fn compile_if(&self, if_stmt: &IfStmt, locals: &TypeScope) -> Result<CompiledStmt> {
        let mut branches = Vec::with_capacity(if_stmt.branches.len());
        let mut results = Vec::new();
        for (cond, body) in &if_stmt.branches {
            let cond_compiled = self.compile_expr(cond, locals)?;
            check_condition(&cond_compiled.ty, &cond.meta)?;
            let body = self.compile_block(&body.node, locals, true)?;
            results.extend(body.results);
            branches.push((cond_compiled.eval, body.eval));
        }
        let else_eval = match &if_stmt.else_block {
            Some(block) => {
                let compiled = self.compile_block(&block.node, locals, true)?;
                results.extend(compiled.results);
                Some(compiled.eval)
            }
            None => {
                results.push(Reachable::None);
                None
            }
        };

        Ok(CompiledStmt {
            eval: stmt_eval(move |scope| {
                for (cond, body) in &branches {
                    if cond(scope)?.borrow().to_bool() {
                        return body(scope);
                    }
                }
                match &else_eval {
                    Some(body) => body(scope),
                    None => Ok(Signal::None),
                }
            }),
            results,
        })
    }

    fn compile_while(&self, while_stmt: &WhileStmt, locals: &TypeScope) -> Result<CompiledStmt> {
        let cond = self.compile_expr(&while_stmt.cond, locals)?;
        check_condition(&cond.ty, &while_stmt.cond.meta)?;
        let body = self.compile_block(&while_stmt.body.node, locals, true)?;
        let results = loop_results(body.results);
        let (cond, body, do_while) = (cond.eval, body.eval, while_stmt.do_while);

        Ok(CompiledStmt {
            eval: stmt_eval(move |scope| {
                let mut first = do_while;
                loop {
                    if !first && !cond(scope)?.borrow().to_bool() {
                        break;
                    }
                    first = false;
                    match body(scope)? {
                        Signal::Break => break,
                        Signal::Return(value) => return Ok(Signal::Return(value)),
                        Signal::Continue | Signal::None => {}
                    }
                }
                Ok(Signal::None)
            }),
            results,
        })
    }

    fn compile_for(&self, for_stmt: &ForStmt, locals: &TypeScope) -> Result<CompiledStmt> {
        let scope = child_scope(locals);
        let init = for_stmt
            .init
            .as_ref()
            .map(|init| self.compile_stmt(init, &scope))
            .transpose()?
            .map(|c| c.eval);
        let cond = match &for_stmt.cond {
            Some(cond) => {
                let compiled = self.compile_expr(cond, &scope)?;
                check_condition(&compiled.ty, &cond.meta)?;
                Some(compiled.eval)
            }
            None => None,
        };
        let step = for_stmt
            .step
            .as_ref()
            .map(|step| self.compile_expr(step, &scope))
            .transpose()?
            .map(|c| c.eval);
        let body = self.compile_block(&for_stmt.body.node, &scope, true)?;
        let results = loop_results(body.results);
        let body = body.eval;

        Ok(CompiledStmt {
            eval: stmt_eval(move |scope| {
                let frame = child_scope(scope);
                if let Some(init) = &init {
                    init(&frame)?;
                }
                loop {
                    if let Some(cond) = &cond
                        && !cond(&frame)?.borrow().to_bool()
                    {
                        break;
                    }
                    match body(&frame)? {
                        Signal::Break => break,
                        Signal::Return(value) => return Ok(Signal::Return(value)),
                        Signal::Continue | Signal::None => {}
                    }
                    if let Some(step) = &step {
                        step(&frame)?;
                    }
                }
                Ok(Signal::None)
            }),
            results,
        })
    }

    fn compile_return(
        &self,
        value: Option<&Spanned<Expr>>,
        locals: &TypeScope,
        meta: &SourceSymbol,
    ) -> Result<CompiledStmt> {
        let Some(value) = value else {
            return Ok(CompiledStmt {
                eval: stmt_eval(|_| Ok(Signal::Return(new_ref(Value::Void)))),
                results: vec![Reachable::Return(types::void(), meta.clone())],
            });
        };
        let compiled = self.compile_expr(value, locals)?;
        let eval = compiled.eval;
        Ok(CompiledStmt {
            eval: stmt_eval(move |scope| Ok(Signal::Return(eval(scope)?))),
            results: vec![Reachable::Return(compiled.ty, meta.clone())],
        })
    }
}

/// Loops absorb `break` and `continue` and may always fall through
fn loop_results(body: Vec<Reachable>) -> Vec<Reachable> {
    let mut results: Vec<Reachable> = body
        .into_iter()
        .filter(|r| matches!(r, Reachable::Return(..)))
        .collect();
    results.push(Reachable::None);
    results
}

fn bind(scope: &ValueScope, name: &str, value: ValueRef, meta: &SourceSymbol) -> Result<()> {
    if scope.borrow_mut().try_bind(name.to_string(), value) {
        Ok(())
    } else {
        Err(RuntimeError::already_defined(name).at(meta).into())
    }
}
