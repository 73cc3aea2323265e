//! Base value scope: host functions that write to the output sink

use super::error::RuntimeError;
use super::function::{FunctionRef, HostFunction, Parameter};
use super::scope::{Scope, ScopeRef};
use super::types::{self, TypeRef};
use super::value::{CallableValue, Value, ValueRef, new_ref};
use crate::error::Result;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Text stream the `print` family writes to. Owned by the host.
pub type OutputSink = Rc<RefCell<dyn Write>>;

pub fn stdout_sink() -> OutputSink {
    Rc::new(RefCell::new(std::io::stdout()))
}

/// How a printed value is rendered
#[derive(Clone, Copy)]
enum Format {
    Display,
    /// `1`/`0` for booleans
    Numeric,
}

fn print_function(name: &str, ty: TypeRef, format: Format, sink: &OutputSink) -> FunctionRef {
    let sink = Rc::clone(sink);
    Rc::new(HostFunction::new(
        name,
        types::void(),
        vec![Parameter::value("value", ty)],
        move |args| {
            let text = match (format, args.first().map(|a| a.borrow().clone())) {
                (Format::Numeric, Some(Value::Bool(b))) => u8::from(b).to_string(),
                (_, Some(value)) => value.to_string(),
                (_, None) => return Err(RuntimeError::no_matching_overload(&[]).into()),
            };
            let mut out = sink.borrow_mut();
            writeln!(out, "{text}")
                .and_then(|()| out.flush())
                .map_err(|e| RuntimeError::io_error(&e.to_string()))?;
            Ok(new_ref(Value::Void))
        },
    ))
}

fn callable(name: &str, overloads: Vec<FunctionRef>) -> Result<ValueRef> {
    let mut callable = CallableValue::new(name);
    for function in overloads {
        callable.add_overload(function)?;
    }
    Ok(new_ref(Value::Callable(callable)))
}

/// Root value scope holding the built-in functions
pub fn base_value_scope(sink: &OutputSink) -> Result<ScopeRef<ValueRef>> {
    let printable = [
        types::int32(),
        types::int64(),
        types::boolean(),
        types::char(),
        types::string(),
    ];
    let mut scope = Scope::new();

    let print = printable
        .iter()
        .map(|ty| print_function("print", TypeRef::clone(ty), Format::Display, sink))
        .collect();
    scope.try_bind("print", callable("print", print)?);

    for ty in &printable {
        let name = format!("print_{}", ty.name());
        let function = print_function(&name, TypeRef::clone(ty), Format::Numeric, sink);
        scope.try_bind(name.clone(), callable(&name, vec![function])?);
    }

    tracing::debug!(names = ?scope.local_names(), "base value scope");
    Ok(scope.into_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> (Rc<RefCell<Vec<u8>>>, OutputSink) {
        let buffer = Rc::new(RefCell::new(Vec::new()));
        let sink: OutputSink = buffer.clone();
        (buffer, sink)
    }

    fn call(scope: &ScopeRef<ValueRef>, name: &str, arg: Value) {
        let value = scope.borrow().try_get(name).unwrap();
        let Value::Callable(callable) = &*value.borrow() else {
            panic!("{name} is not callable");
        };
        callable.invoke(&[new_ref(arg)]).unwrap();
    }

    #[test]
    fn test_print_overloads() {
        let (buffer, sink) = capture();
        let scope = base_value_scope(&sink).unwrap();
        call(&scope, "print", Value::Int32(42));
        call(&scope, "print", Value::Int64(-1));
        call(&scope, "print", Value::Bool(true));
        call(&scope, "print", Value::Char(b'x'));
        call(&scope, "print", Value::Str("hi".into()));
        assert_eq!(String::from_utf8(buffer.borrow().clone()).unwrap(), "42\n-1\ntrue\nx\nhi\n");
    }

    #[test]
    fn test_print_bool_is_numeric() {
        let (buffer, sink) = capture();
        let scope = base_value_scope(&sink).unwrap();
        call(&scope, "print_bool", Value::Bool(true));
        call(&scope, "print_bool", Value::Bool(false));
        assert_eq!(String::from_utf8(buffer.borrow().clone()).unwrap(), "1\n0\n");
    }

    #[test]
    fn test_typed_print_names() {
        let (_, sink) = capture();
        let scope = base_value_scope(&sink).unwrap();
        let names = scope.borrow().local_names();
        assert_eq!(
            names,
            vec!["print", "print_bool", "print_char", "print_int", "print_long", "print_string"]
        );
    }

    #[test]
    fn test_typed_print_rejects_other_types() {
        let (_, sink) = capture();
        let scope = base_value_scope(&sink).unwrap();
        let value = scope.borrow().try_get("print_int").unwrap();
        let Value::Callable(callable) = &*value.borrow() else {
            panic!("print_int is not callable");
        };
        assert!(callable.invoke(&[new_ref(Value::Bool(true))]).is_err());
    }
}
