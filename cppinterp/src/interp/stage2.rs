//! Stage 2: global shaping
//!
//! Binds every global variable to a default instance and every function
//! name to a callable carrying its declared overloads, before any body or
//! initializer is compiled. Initializers are deferred to stage 3.

use super::function::{Function, FunctionRef, Parameter, UserFunction};
use super::scope::ScopeRef;
use super::stage1::{SymbolTree, lookup_type};
use super::types::{Construct, TypeRef};
use super::value::{CallableValue, Value, ValueRef, new_ref};
use crate::ast::{Expr, FuncDef, SourceSymbol, Spanned, Stmt, VarDef};
use crate::error::{CompileError, Result};
use std::rc::Rc;

/// Top-level item after shaping
pub enum ShapedItem {
    /// Bare expression, evaluated in order with the initializers
    Expr(Spanned<Expr>),
    /// Deferred `name = value` for a global defined with an initializer
    Init {
        name: Spanned<String>,
        value: Spanned<Expr>,
        meta: SourceSymbol,
    },
    /// Function whose body stage 3 has to build
    Function(Rc<UserFunction>),
    /// Any other statement, run in order (interactive input only)
    Stmt(Spanned<Stmt>),
}

pub struct ShapedProgram {
    pub types: ScopeRef<TypeRef>,
    pub values: ScopeRef<ValueRef>,
    pub items: Vec<ShapedItem>,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn shape_globals(tree: SymbolTree, values: &ScopeRef<ValueRef>) -> Result<ShapedProgram> {
    let types = tree.types;
    let mut items = Vec::with_capacity(tree.items.len());
    for item in tree.items {
        let meta = item.meta;
        match item.node {
            Stmt::Expr(expr) => items.push(ShapedItem::Expr(expr)),
            Stmt::VarDef(def) => {
                if let Some(init) = shape_variable(def, &types, values, &meta)? {
                    items.push(init);
                }
            }
            Stmt::FuncDef(def) => {
                let function = shape_function(def, &types, values, meta)?;
                items.push(ShapedItem::Function(function));
            }
            node => items.push(ShapedItem::Stmt(Spanned::new(node, meta))),
        }
    }
    Ok(ShapedProgram {
        types,
        values: Rc::clone(values),
        items,
    })
}

fn shape_variable(
    def: VarDef,
    types: &ScopeRef<TypeRef>,
    values: &ScopeRef<ValueRef>,
    meta: &SourceSymbol,
) -> Result<Option<ShapedItem>> {
    let VarDef { ty, name, init } = def;
    let declared = lookup_type(types, &ty.node.name, &ty.meta)?;
    if ty.node.is_reference {
        return Err(CompileError::semantic(
            format!("Global reference variable '{}' is not supported", name.node),
            &name.meta,
        ));
    }
    let instance = declared.create()?;
    if !values.borrow_mut().try_bind(name.node.clone(), instance) {
        return Err(CompileError::semantic(
            format!("'{}' was already defined", name.node),
            &name.meta,
        ));
    }
    tracing::trace!(name = %name.node, ty = %declared, "global");
    Ok(init.map(|value| ShapedItem::Init {
        name,
        value,
        meta: meta.clone(),
    }))
}

fn shape_function(
    def: FuncDef,
    types: &ScopeRef<TypeRef>,
    values: &ScopeRef<ValueRef>,
    meta: SourceSymbol,
) -> Result<Rc<UserFunction>> {
    let FuncDef {
        name,
        return_type,
        params,
        body,
    } = def;

    if return_type.node.is_reference {
        return Err(CompileError::semantic(
            format!("Return type '{}' is a reference type", return_type.node),
            &return_type.meta,
        ));
    }
    let returns = lookup_type(types, &return_type.node.name, &return_type.meta)?;

    let mut parameters: Vec<Parameter> = Vec::with_capacity(params.len());
    for param in params {
        if parameters.iter().any(|p| p.name == param.name.node) {
            return Err(CompileError::semantic(
                format!("Duplicate parameter name '{}'", param.name.node),
                &param.name.meta,
            ));
        }
        let ty = lookup_type(types, &param.ty.node.name, &param.ty.meta)?;
        parameters.push(Parameter {
            name: param.name.node,
            ty,
            is_reference: param.ty.node.is_reference,
        });
    }

    let function = Rc::new(UserFunction::new(
        name.node.clone(),
        returns,
        parameters,
        body,
        meta,
    ));
    let overload: FunctionRef = function.clone();

    let existing = values.borrow().try_get(&name.node);
    match existing {
        Some(value) => match &mut *value.borrow_mut() {
            Value::Callable(callable) => callable
                .add_overload(overload)
                .map_err(|err| CompileError::semantic(err.message(), &name.meta))?,
            _ => {
                return Err(CompileError::semantic(
                    format!("'{}' was already defined", name.node),
                    &name.meta,
                ));
            }
        },
        None => {
            let mut callable = CallableValue::new(name.node.clone());
            callable.add_overload(overload)?;
            values
                .borrow_mut()
                .try_bind(name.node.clone(), new_ref(Value::Callable(callable)));
        }
    }
    tracing::trace!(signature = %function.signature(), "function");
    Ok(function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build_program;
    use crate::interp::builtins::{OutputSink, base_value_scope};
    use crate::interp::scope::child_scope;
    use crate::interp::stage1::{base_type_scope, collect_types};
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use std::cell::RefCell;

    fn shape(source: &str) -> Result<ShapedProgram> {
        let raw = parse(source, tokenize(source)?)?;
        let program = build_program(raw)?;
        let tree = collect_types(program.items, &child_scope(&base_type_scope()))?;
        let sink: OutputSink = Rc::new(RefCell::new(Vec::<u8>::new()));
        let values = child_scope(&base_value_scope(&sink)?);
        shape_globals(tree, &values)
    }

    fn global(program: &ShapedProgram, name: &str) -> ValueRef {
        program.values.borrow().try_get(name).expect("global is bound")
    }

    #[test]
    fn test_globals_get_default_instances() {
        let program = shape("int x; string s; bool b;").unwrap();
        assert!(matches!(*global(&program, "x").borrow(), Value::Int32(0)));
        assert!(matches!(&*global(&program, "s").borrow(), Value::Str(s) if s.is_empty()));
        assert!(program.items.is_empty());
    }

    #[test]
    fn test_initializer_is_deferred() {
        let program = shape("int x = 5;").unwrap();
        assert!(matches!(*global(&program, "x").borrow(), Value::Int32(0)));
        assert!(matches!(program.items[0], ShapedItem::Init { .. }));
    }

    #[test]
    fn test_unknown_type() {
        let err = shape("Missing m;").err().unwrap();
        assert_eq!(err.message(), "Type 'Missing' does not exist");
    }

    #[test]
    fn test_duplicate_global() {
        let err = shape("int x; long x;").err().unwrap();
        assert_eq!(err.message(), "'x' was already defined");
    }

    #[test]
    fn test_functions_become_callables() {
        let program = shape("int f(int a) { return a; } int f(long a) { return 0; }").unwrap();
        let f = global(&program, "f");
        let Value::Callable(callable) = &*f.borrow() else {
            panic!("f is not callable");
        };
        assert_eq!(callable.overloads().len(), 2);
        assert_eq!(program.items.len(), 2);
    }

    #[test]
    fn test_duplicate_overload() {
        let err = shape("int f(int a) { return a; } int f(int b) { return b; }").err().unwrap();
        assert_eq!(err.message(), "Overload f(int) already exists");
        assert!(err.is_static());
    }

    #[test]
    fn test_overload_differing_only_by_reference_is_duplicate() {
        assert!(shape("void f(int a) {} void f(int& a) {}").is_err());
    }

    #[test]
    fn test_function_name_clashes_with_variable() {
        let err = shape("int f; int f() { return 0; }").err().unwrap();
        assert_eq!(err.message(), "'f' was already defined");
    }

    #[test]
    fn test_reference_return_type_rejected() {
        let err = shape("int& f(int& a) { return a; }").err().unwrap();
        assert_eq!(err.message(), "Return type 'int&' is a reference type");
    }

    #[test]
    fn test_duplicate_parameter_name() {
        let err = shape("int f(int a, long a) { return 0; }").err().unwrap();
        assert_eq!(err.message(), "Duplicate parameter name 'a'");
    }

    #[test]
    fn test_user_print_overload_extends_builtin() {
        let program = shape("void print(bool a, bool b) {}").unwrap();
        let print = global(&program, "print");
        let Value::Callable(callable) = &*print.borrow() else {
            panic!("print is not callable");
        };
        assert_eq!(callable.overloads().len(), 6);
    }
}
