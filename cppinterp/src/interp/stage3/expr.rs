//! Expression compilation

use super::{CompiledExpr, Compiler, Symbol, TypeScope, expr_eval, incompatible, locate};
use crate::ast::{BinOp, BoolOp, Expr, Literal, SourceSymbol, Spanned};
use crate::error::{CompileError, Result};
use crate::interp::error::{ErrorKind, RuntimeError};
use crate::interp::function::{Function, FunctionRef};
use crate::interp::types::{self, MemberFlags, MemberInfo, TypeRef, type_names};
use crate::interp::value::{Value, ValueRef, new_ref};
use crate::stack;
use std::rc::Rc;
use std::sync::Arc;

impl Compiler {
    pub fn compile_expr(&self, expr: &Spanned<Expr>, locals: &TypeScope) -> Result<CompiledExpr> {
        stack::guarded(|| self.compile_expr_inner(expr, locals))
    }

    fn compile_expr_inner(&self, expr: &Spanned<Expr>, locals: &TypeScope) -> Result<CompiledExpr> {
        let meta = &expr.meta;
        match &expr.node {
            Expr::Literal(literal) => Ok(compile_literal(literal)),
            Expr::Atom(name) => self.compile_atom(name, locals, meta),
            Expr::Assign { target, value } => self.compile_assign(target, value, locals, meta),
            Expr::Binary { left, op, right } => self.compile_binary(left, *op, right, locals, meta),
            Expr::Unary { op, expr } => {
                let operand = self.compile_expr(expr, locals)?;
                self.compile_operator_call(operand, &op.function_name(), op.symbol(), false, meta)
            }
            Expr::Suffix { op, expr } => {
                let operand = self.compile_expr(expr, locals)?;
                self.compile_operator_call(operand, &op.function_name(), op.symbol(), true, meta)
            }
            Expr::Member { instance, member } => self.compile_member(instance, member, locals),
            Expr::Call { callee, args } => self.compile_call(callee, args, locals, meta),
        }
    }

    fn compile_atom(&self, name: &str, locals: &TypeScope, meta: &SourceSymbol) -> Result<CompiledExpr> {
        let symbol = self.lookup(locals, name).ok_or_else(|| {
            CompileError::semantic(format!("Undefined value '{name}'"), meta)
        })?;
        let (ty, overloads) = match symbol {
            Symbol::Variable(ty) => (ty, Vec::new()),
            Symbol::Callable(overloads) => (types::callable(), overloads),
        };
        let name = name.to_string();
        let meta = meta.clone();
        Ok(CompiledExpr {
            eval: expr_eval(move |scope| {
                scope
                    .borrow()
                    .try_get(&name)
                    .ok_or_else(|| RuntimeError::undefined_variable(&name).at(&meta).into())
            }),
            ty,
            overloads,
        })
    }

    fn compile_assign(
        &self,
        target: &Spanned<Expr>,
        value: &Spanned<Expr>,
        locals: &TypeScope,
        meta: &SourceSymbol,
    ) -> Result<CompiledExpr> {
        if !matches!(target.node, Expr::Atom(_) | Expr::Member { .. }) {
            return Err(CompileError::semantic(
                "Target of an assignment must be an identifier or a member accessor",
                &target.meta,
            ));
        }
        let target = self.compile_expr(target, locals)?;
        let value = self.compile_expr(value, locals)?;
        if target.ty.is_callable() {
            return Err(CompileError::semantic("Can not assign to callable", meta));
        }
        if *target.ty != *value.ty {
            return Err(incompatible(&target.ty, &value.ty, meta));
        }
        if target
            .ty
            .get_function("operator=", MemberFlags::PUBLIC_INSTANCE)
            .is_none()
        {
            return Err(CompileError::semantic(
                format!("Type '{}' can not be assigned to", target.ty.name()),
                meta,
            ));
        }

        let (target_eval, value_eval) = (target.eval, value.eval);
        let meta = meta.clone();
        Ok(CompiledExpr {
            eval: expr_eval(move |scope| {
                let rhs = value_eval(scope)?;
                let lhs = target_eval(scope)?;
                let runtime_type = lhs.borrow().ty();
                let Some(assign) = runtime_type.get_function("operator=", MemberFlags::PUBLIC_INSTANCE)
                else {
                    return Err(RuntimeError::new(
                        ErrorKind::TypeError,
                        format!("Type '{}' can not be assigned to", runtime_type.name()),
                    )
                    .at(&meta)
                    .into());
                };
                assign
                    .invoke(&lhs, &[Rc::clone(&rhs)])
                    .map_err(|err| locate(err, &meta))?;
                Ok(rhs)
            }),
            ty: target.ty,
            overloads: Vec::new(),
        })
    }

    fn compile_binary(
        &self,
        left: &Spanned<Expr>,
        op: BinOp,
        right: &Spanned<Expr>,
        locals: &TypeScope,
        meta: &SourceSymbol,
    ) -> Result<CompiledExpr> {
        let left = self.compile_expr(left, locals)?;
        let right = self.compile_expr(right, locals)?;
        let name = op.function_name();

        if let BinOp::Boolean(bool_op) = op {
            let overloaded = left
                .ty
                .get_function(&name, MemberFlags::PUBLIC_INSTANCE)
                .is_some();
            if !overloaded {
                super::check_condition(&left.ty, meta)?;
                super::check_condition(&right.ty, meta)?;
                return Ok(short_circuit(bool_op, left, right));
            }
        }

        let overload = left
            .ty
            .get_function(&name, MemberFlags::PUBLIC_INSTANCE)
            .and_then(|info| info.get_overload(Some(&left.ty), &[TypeRef::clone(&right.ty)]))
            .ok_or_else(|| {
                CompileError::semantic(
                    format!(
                        "Type '{}' does not have a matching operator '{}' for '{}'",
                        left.ty.name(),
                        op.symbol(),
                        right.ty.name()
                    ),
                    meta,
                )
            })?;

        let ty = TypeRef::clone(overload.return_type());
        let (left_eval, right_eval) = (left.eval, right.eval);
        let meta = meta.clone();
        Ok(CompiledExpr {
            eval: expr_eval(move |scope| {
                let lhs = left_eval(scope)?;
                let rhs = right_eval(scope)?;
                overload
                    .invoke(Some(&lhs), &[rhs])
                    .map_err(|err| locate(err, &meta))
            }),
            ty,
            overloads: Vec::new(),
        })
    }

    /// Prefix operators take no argument; postfix ones take a dummy `int`
    fn compile_operator_call(
        &self,
        operand: CompiledExpr,
        name: &str,
        symbol: &str,
        postfix: bool,
        meta: &SourceSymbol,
    ) -> Result<CompiledExpr> {
        let arg_types = if postfix { vec![types::int32()] } else { Vec::new() };
        let overload = operand
            .ty
            .get_function(name, MemberFlags::PUBLIC_INSTANCE)
            .and_then(|info| info.get_overload(Some(&operand.ty), &arg_types))
            .ok_or_else(|| {
                let kind = if postfix { "suffix" } else { "unary" };
                CompileError::semantic(
                    format!(
                        "Type '{}' does not implement {kind} operator '{symbol}'",
                        operand.ty.name()
                    ),
                    meta,
                )
            })?;

        let ty = TypeRef::clone(overload.return_type());
        let eval = operand.eval;
        let meta = meta.clone();
        Ok(CompiledExpr {
            eval: expr_eval(move |scope| {
                let value = eval(scope)?;
                let args = if postfix {
                    vec![new_ref(Value::Int32(0))]
                } else {
                    Vec::new()
                };
                overload
                    .invoke(Some(&value), &args)
                    .map_err(|err| locate(err, &meta))
            }),
            ty,
            overloads: Vec::new(),
        })
    }

    fn compile_member(
        &self,
        instance: &Spanned<Expr>,
        member: &Spanned<String>,
        locals: &TypeScope,
    ) -> Result<CompiledExpr> {
        let instance = self.compile_expr(instance, locals)?;
        let info = instance
            .ty
            .get_member(&member.node, MemberFlags::PUBLIC_INSTANCE)
            .ok_or_else(|| {
                CompileError::semantic(
                    format!(
                        "Type '{}' does not have a member '{}'",
                        instance.ty.name(),
                        member.node
                    ),
                    &member.meta,
                )
            })?;

        let overloads: Vec<FunctionRef> = match &info {
            MemberInfo::Function(functions) => functions
                .functions
                .iter()
                .map(|f| Rc::new(Arc::clone(f)) as FunctionRef)
                .collect(),
            MemberInfo::Field { .. } => Vec::new(),
        };
        let ty = info.member_type();
        let eval = instance.eval;
        let meta = member.meta.clone();
        Ok(CompiledExpr {
            eval: expr_eval(move |scope| {
                let object = eval(scope)?;
                info.get_value(&object).map_err(|err| locate(err, &meta))
            }),
            ty,
            overloads,
        })
    }

    fn compile_call(
        &self,
        callee: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        locals: &TypeScope,
        meta: &SourceSymbol,
    ) -> Result<CompiledExpr> {
        let callee = self.compile_expr(callee, locals)?;
        if !callee.ty.is_callable() {
            return Err(CompileError::semantic("Symbol is not a function", meta));
        }
        let args = args
            .iter()
            .map(|arg| self.compile_expr(arg, locals))
            .collect::<Result<Vec<_>>>()?;
        let arg_types: Vec<TypeRef> = args.iter().map(|a| TypeRef::clone(&a.ty)).collect();

        let mut candidates = callee.overloads.iter().filter(|f| f.parameters_match(&arg_types));
        let overload = match (candidates.next(), candidates.next()) {
            (Some(overload), None) => overload,
            _ => {
                return Err(CompileError::semantic(
                    format!("No matching overload: [{}]", type_names(&arg_types).join(", ")),
                    meta,
                ));
            }
        };
        let ty = TypeRef::clone(overload.return_type());

        let callee_eval = callee.eval;
        let arg_evals: Vec<_> = args.into_iter().map(|a| a.eval).collect();
        let meta = meta.clone();
        Ok(CompiledExpr {
            eval: expr_eval(move |scope| {
                let target = callee_eval(scope)?;
                let values = arg_evals
                    .iter()
                    .map(|eval| eval(scope))
                    .collect::<Result<Vec<ValueRef>>>()?;
                let callable = match &*target.borrow() {
                    Value::Callable(callable) => callable.clone(),
                    other => {
                        return Err(RuntimeError::not_callable(&other.type_name())
                            .at(&meta)
                            .into());
                    }
                };
                callable.invoke(&values).map_err(|err| {
                    if err.is_static() {
                        err
                    } else {
                        RuntimeError::call_failed(&meta, err).into()
                    }
                })
            }),
            ty,
            overloads: Vec::new(),
        })
    }
}

fn compile_literal(literal: &Literal) -> CompiledExpr {
    let value = match literal {
        Literal::Int(n) => Value::Int32(*n),
        Literal::Long(n) => Value::Int64(*n),
        Literal::Char(c) => Value::Char(*c),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
    };
    let ty = value.ty();
    CompiledExpr {
        eval: expr_eval(move |_| Ok(new_ref(value.clone()))),
        ty,
        overloads: Vec::new(),
    }
}

/// `&&`/`||` on types without their own operator: the right side may not run
fn short_circuit(op: BoolOp, left: CompiledExpr, right: CompiledExpr) -> CompiledExpr {
    let (left_eval, right_eval) = (left.eval, right.eval);
    CompiledExpr {
        eval: expr_eval(move |scope| {
            let lhs = left_eval(scope)?.borrow().to_bool();
            let result = match (op, lhs) {
                (BoolOp::And, false) => false,
                (BoolOp::Or, true) => true,
                _ => right_eval(scope)?.borrow().to_bool(),
            };
            Ok(new_ref(Value::Bool(result)))
        }),
        ty: types::boolean(),
        overloads: Vec::new(),
    }
}
