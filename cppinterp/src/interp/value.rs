//! Runtime values for the interpreter

use super::error::RuntimeError;
use super::function::FunctionRef;
use super::types::{self, TypeRef, type_names};
use crate::error::Result;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared, mutable storage for one value. References alias the same cell.
pub type ValueRef = Rc<RefCell<Value>>;

pub fn new_ref(value: Value) -> ValueRef {
    Rc::new(RefCell::new(value))
}

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Void,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Char(u8),
    Str(String),
    /// Overload set, optionally bound to a receiver
    Callable(CallableValue),
    Object(ObjectValue),
}

/// Instance of a compound type; fields in declaration order
#[derive(Debug, Clone)]
pub struct ObjectValue {
    pub ty: TypeRef,
    pub fields: Vec<(String, ValueRef)>,
}

impl Value {
    pub fn ty(&self) -> TypeRef {
        match self {
            Value::Void => types::void(),
            Value::Bool(_) => types::boolean(),
            Value::Int32(_) => types::int32(),
            Value::Int64(_) => types::int64(),
            Value::Char(_) => types::char(),
            Value::Str(_) => types::string(),
            Value::Callable(_) => types::callable(),
            Value::Object(object) => TypeRef::clone(&object.ty),
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> String {
        self.ty().name().to_string()
    }

    /// Truth value used by conditions and `&&`/`||`
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Void => false,
            Value::Bool(b) => *b,
            Value::Int32(n) => *n != 0,
            Value::Int64(n) => *n != 0,
            Value::Char(c) => *c != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Callable(_) | Value::Object(_) => true,
        }
    }

    /// Value with fresh storage for every field
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Object(object) => Value::Object(ObjectValue {
                ty: TypeRef::clone(&object.ty),
                fields: object
                    .fields
                    .iter()
                    .map(|(name, value)| (name.clone(), new_ref(value.borrow().deep_copy())))
                    .collect(),
            }),
            other => other.clone(),
        }
    }

    /// Overwrite in place. Objects assign field by field so outstanding
    /// references to their fields stay valid.
    pub fn assign_from(&mut self, source: Value) -> Result<()> {
        match (self, source) {
            (Value::Object(target), Value::Object(source)) if *target.ty == *source.ty => {
                for ((_, slot), (_, value)) in target.fields.iter().zip(source.fields) {
                    let value = value.borrow().deep_copy();
                    slot.borrow_mut().assign_from(value)?;
                }
                Ok(())
            }
            (target, source) if *target.ty() == *source.ty() => {
                *target = source;
                Ok(())
            }
            (target, source) => {
                Err(RuntimeError::type_error(&target.type_name(), &source.type_name()).into())
            }
        }
    }

    /// Source-like rendering: strings and chars quoted
    pub fn string_rep(&self) -> String {
        match self {
            Value::Str(s) => format!("{s:?}"),
            Value::Char(c) => format!("'{}'", char::from(*c).escape_default()),
            Value::Object(object) => {
                let fields: Vec<String> = object
                    .fields
                    .iter()
                    .map(|(name, value)| format!("{name}: {}", value.borrow().string_rep()))
                    .collect();
                format!("{} {{ {} }}", object.ty.name(), fields.join(", "))
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int32(n) => write!(f, "{n}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::Char(c) => write!(f, "{}", char::from(*c)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Callable(callable) => write!(f, "<function {}>", callable.name),
            Value::Object(_) => write!(f, "{}", self.string_rep()),
        }
    }
}

/// Named overload set
#[derive(Clone)]
pub struct CallableValue {
    pub name: String,
    /// Receiver for member functions
    pub instance: Option<ValueRef>,
    overloads: Vec<FunctionRef>,
}

impl CallableValue {
    pub fn new(name: impl Into<String>) -> Self {
        CallableValue {
            name: name.into(),
            instance: None,
            overloads: Vec::new(),
        }
    }

    pub fn bound(name: impl Into<String>, instance: ValueRef, overloads: Vec<FunctionRef>) -> Self {
        CallableValue {
            name: name.into(),
            instance: Some(instance),
            overloads,
        }
    }

    pub fn overloads(&self) -> &[FunctionRef] {
        &self.overloads
    }

    /// Register another overload. Parameter types must differ from every
    /// existing overload; reference-ness is not part of the comparison.
    pub fn add_overload(&mut self, function: FunctionRef) -> Result<()> {
        let types: Vec<TypeRef> = function
            .parameters()
            .iter()
            .map(|p| TypeRef::clone(&p.ty))
            .collect();
        if self.overloads.iter().any(|f| f.parameters_match(&types)) {
            return Err(RuntimeError::duplicate_overload(&self.name, &type_names(&types)).into());
        }
        self.overloads.push(function);
        Ok(())
    }

    /// The unique overload accepting `arg_types`
    pub fn find_overload(&self, arg_types: &[TypeRef]) -> Option<FunctionRef> {
        let mut matches = self.overloads.iter().filter(|f| f.parameters_match(arg_types));
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(Rc::clone(first))
    }

    /// Dispatch on the runtime types of `args`
    pub fn invoke(&self, args: &[ValueRef]) -> Result<ValueRef> {
        let arg_types: Vec<TypeRef> = args.iter().map(|a| a.borrow().ty()).collect();
        let Some(function) = self.find_overload(&arg_types) else {
            return Err(RuntimeError::no_matching_overload(&type_names(&arg_types)).into());
        };
        function.invoke(self.instance.as_ref(), args)
    }
}

impl fmt::Debug for CallableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let signatures: Vec<String> = self.overloads.iter().map(|o| o.signature()).collect();
        f.debug_struct("CallableValue")
            .field("name", &self.name)
            .field("bound", &self.instance.is_some())
            .field("overloads", &signatures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Visibility;
    use crate::interp::function::{HostFunction, Parameter};
    use crate::interp::types::{Construct, CppType, Field};

    fn echo(name: &str, ty: TypeRef) -> FunctionRef {
        Rc::new(HostFunction::new(
            name,
            TypeRef::clone(&ty),
            vec![Parameter::value("x", ty)],
            |args| Ok(Rc::clone(&args[0])),
        ))
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int32(42).to_string(), "42");
        assert_eq!(Value::Int64(-7).to_string(), "-7");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Char(b'a').to_string(), "a");
        assert_eq!(Value::Str("hi".into()).to_string(), "hi");
    }

    #[test]
    fn test_string_rep_quotes() {
        assert_eq!(Value::Str("hi".into()).string_rep(), "\"hi\"");
        assert_eq!(Value::Char(b'\n').string_rep(), "'\\n'");
        assert_eq!(Value::Int32(3).string_rep(), "3");
    }

    #[test]
    fn test_value_truthy() {
        assert!(Value::Bool(true).to_bool());
        assert!(!Value::Bool(false).to_bool());
        assert!(Value::Int32(-1).to_bool());
        assert!(!Value::Int64(0).to_bool());
        assert!(!Value::Char(0).to_bool());
        assert!(!Value::Void.to_bool());
        assert!(!Value::Str(String::new()).to_bool());
        assert!(Value::Str("x".into()).to_bool());
    }

    #[test]
    fn test_assign_same_type() {
        let mut target = Value::Int32(1);
        target.assign_from(Value::Int32(9)).unwrap();
        assert!(matches!(target, Value::Int32(9)));
    }

    #[test]
    fn test_assign_rejects_other_type() {
        let mut target = Value::Int32(1);
        assert!(target.assign_from(Value::Int64(9)).is_err());
        assert!(matches!(target, Value::Int32(1)));
    }

    #[test]
    fn test_object_assignment_keeps_field_storage() {
        let pair = CppType::compound(
            "Pair",
            vec![Field {
                name: "a".into(),
                ty: types::int32(),
                visibility: Visibility::Public,
            }],
        );
        let target = pair.create().unwrap();
        let field = match &*target.borrow() {
            Value::Object(object) => Rc::clone(&object.fields[0].1),
            _ => unreachable!(),
        };
        let source = pair.create().unwrap();
        if let Value::Object(object) = &*source.borrow() {
            *object.fields[0].1.borrow_mut() = Value::Int32(4);
        }
        let snapshot = source.borrow().deep_copy();
        target.borrow_mut().assign_from(snapshot).unwrap();
        assert!(matches!(*field.borrow(), Value::Int32(4)));
        assert_eq!(target.borrow().string_rep(), "Pair { a: 4 }");
    }

    #[test]
    fn test_deep_copy_detaches_fields() {
        let pair = CppType::compound(
            "Pair",
            vec![Field {
                name: "a".into(),
                ty: types::int32(),
                visibility: Visibility::Public,
            }],
        );
        let original = pair.create().unwrap();
        let copy = original.borrow().deep_copy();
        if let Value::Object(object) = &copy {
            *object.fields[0].1.borrow_mut() = Value::Int32(8);
        }
        assert_eq!(original.borrow().string_rep(), "Pair { a: 0 }");
    }

    #[test]
    fn test_overload_dispatch() {
        let mut callable = CallableValue::new("echo");
        callable.add_overload(echo("echo", types::int32())).unwrap();
        callable.add_overload(echo("echo", types::string())).unwrap();

        let result = callable.invoke(&[new_ref(Value::Str("s".into()))]).unwrap();
        assert!(matches!(&*result.borrow(), Value::Str(s) if s == "s"));

        let err = callable.invoke(&[new_ref(Value::Bool(true))]).unwrap_err();
        assert_eq!(err.message(), "Overload for [bool] doesn't exist");
    }

    #[test]
    fn test_duplicate_overload_rejected() {
        let mut callable = CallableValue::new("echo");
        callable.add_overload(echo("echo", types::int32())).unwrap();
        assert!(callable.add_overload(echo("echo", types::int32())).is_err());
        assert_eq!(callable.overloads().len(), 1);
    }
}
