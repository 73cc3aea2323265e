//! Native member functions of the built-in types
//!
//! Every operator is an instance method: the left operand (or the sole
//! operand of a unary operator) is the receiver. Postfix `++`/`--` take a
//! dummy `int` argument, as in C++.

use super::{TypeKind, TypeRef};
use crate::interp::error::RuntimeError;
use crate::interp::function::{NativeFn, NativeFunction, Parameter};
use crate::interp::types;
use crate::interp::value::{Value, ValueRef, new_ref};
use crate::error::Result;
use std::rc::Rc;
use std::sync::Arc;

/// Integer-like scalar stored in a [`Value`]
trait IntScalar: Copy + PartialEq + PartialOrd + 'static {
    const ZERO: Self;
    const ONE: Self;

    fn ty() -> TypeRef;
    fn from_value(value: &Value) -> Option<Self>;
    fn into_value(self) -> Value;

    fn add(self, other: Self) -> Self;
    fn sub(self, other: Self) -> Self;
    fn mul(self, other: Self) -> Self;
    fn div(self, other: Self) -> Self;
    fn rem(self, other: Self) -> Self;
    fn neg(self) -> Self;
    fn and(self, other: Self) -> Self;
    fn or(self, other: Self) -> Self;
    fn xor(self, other: Self) -> Self;
    fn not(self) -> Self;
}

macro_rules! int_scalar {
    ($t:ty, $variant:ident, $ty:path) => {
        impl IntScalar for $t {
            const ZERO: Self = 0;
            const ONE: Self = 1;

            fn ty() -> TypeRef {
                $ty()
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(n) => Some(*n),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn add(self, other: Self) -> Self {
                self.wrapping_add(other)
            }

            fn sub(self, other: Self) -> Self {
                self.wrapping_sub(other)
            }

            fn mul(self, other: Self) -> Self {
                self.wrapping_mul(other)
            }

            fn div(self, other: Self) -> Self {
                self.wrapping_div(other)
            }

            fn rem(self, other: Self) -> Self {
                self.wrapping_rem(other)
            }

            fn neg(self) -> Self {
                self.wrapping_neg()
            }

            fn and(self, other: Self) -> Self {
                self & other
            }

            fn or(self, other: Self) -> Self {
                self | other
            }

            fn xor(self, other: Self) -> Self {
                self ^ other
            }

            fn not(self) -> Self {
                !self
            }
        }
    };
}

int_scalar!(i32, Int32, types::int32);
int_scalar!(i64, Int64, types::int64);
int_scalar!(u8, Char, types::char);

/// Member functions for a built-in type
pub(super) fn builtin_functions(kind: TypeKind) -> Vec<Arc<NativeFunction>> {
    let functions = match kind {
        TypeKind::Int32 => integer_functions::<i32>(),
        TypeKind::Int64 => integer_functions::<i64>(),
        TypeKind::Char => integer_functions::<u8>(),
        TypeKind::Bool => bool_functions(),
        TypeKind::String => string_functions(),
        TypeKind::Void | TypeKind::Callable | TypeKind::Compound => Vec::new(),
    };
    functions.into_iter().map(Arc::new).collect()
}

/// Generated `operator=` of a compound type
pub(super) fn compound_functions(ty: &TypeRef) -> Vec<Arc<NativeFunction>> {
    vec![Arc::new(method(ty, "operator=", ty, vec![operand(ty)], assign))]
}

fn method(
    owner: &TypeRef,
    name: &str,
    return_type: &TypeRef,
    params: Vec<Parameter>,
    body: NativeFn,
) -> NativeFunction {
    NativeFunction::method(name, owner, TypeRef::clone(return_type), params, body)
}

fn operand(ty: &TypeRef) -> Parameter {
    Parameter::value("other", TypeRef::clone(ty))
}

fn receiver(instance: Option<&ValueRef>) -> Result<&ValueRef> {
    instance.ok_or_else(|| RuntimeError::type_error("instance", "none").into())
}

fn argument(args: &[ValueRef], index: usize) -> Result<&ValueRef> {
    args.get(index)
        .ok_or_else(|| RuntimeError::no_matching_overload(&[]).into())
}

fn scalar<T: IntScalar>(value: &ValueRef) -> Result<T> {
    let value = value.borrow();
    T::from_value(&value).ok_or_else(|| {
        RuntimeError::type_error(T::ty().name(), &value.type_name()).into()
    })
}

fn operands<T: IntScalar>(instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<(T, T)> {
    Ok((scalar(receiver(instance)?)?, scalar(argument(args, 0)?)?))
}

// ============================================
// Integers
// ============================================

fn integer_functions<T: IntScalar>() -> Vec<NativeFunction> {
    let ty = T::ty();
    let boolean = types::boolean();
    let int32 = types::int32();
    let binary = |name: &str, ret: &TypeRef, body: NativeFn| {
        method(&ty, name, ret, vec![operand(&ty)], body)
    };
    vec![
        binary("operator+", &ty, arith::<T, AddOp>),
        binary("operator-", &ty, arith::<T, SubOp>),
        binary("operator*", &ty, arith::<T, MulOp>),
        binary("operator/", &ty, arith::<T, DivOp>),
        binary("operator%", &ty, arith::<T, RemOp>),
        binary("operator&", &ty, arith::<T, AndOp>),
        binary("operator|", &ty, arith::<T, OrOp>),
        binary("operator^", &ty, arith::<T, XorOp>),
        binary("operator==", &boolean, compare::<T, EqOp>),
        binary("operator!=", &boolean, compare::<T, NeOp>),
        binary("operator<", &boolean, compare::<T, LtOp>),
        binary("operator<=", &boolean, compare::<T, LeOp>),
        binary("operator>", &boolean, compare::<T, GtOp>),
        binary("operator>=", &boolean, compare::<T, GeOp>),
        binary("operator=", &ty, assign),
        method(&ty, "operator++", &ty, Vec::new(), prefix_step::<T, IncOp>),
        method(&ty, "operator--", &ty, Vec::new(), prefix_step::<T, DecOp>),
        method(&ty, "operator++", &ty, vec![Parameter::value("", TypeRef::clone(&int32))], postfix_step::<T, IncOp>),
        method(&ty, "operator--", &ty, vec![Parameter::value("", int32)], postfix_step::<T, DecOp>),
        method(&ty, "operator-", &ty, Vec::new(), negate::<T>),
        method(&ty, "operator+", &ty, Vec::new(), identity::<T>),
        method(&ty, "operator~", &ty, Vec::new(), complement::<T>),
    ]
}

/// Binary integer operation selected at compile time
trait ArithKind {
    fn apply<T: IntScalar>(a: T, b: T) -> Result<T>;
}

struct AddOp;
struct SubOp;
struct MulOp;
struct DivOp;
struct RemOp;
struct AndOp;
struct OrOp;
struct XorOp;

impl ArithKind for AddOp {
    fn apply<T: IntScalar>(a: T, b: T) -> Result<T> {
        Ok(a.add(b))
    }
}

impl ArithKind for SubOp {
    fn apply<T: IntScalar>(a: T, b: T) -> Result<T> {
        Ok(a.sub(b))
    }
}

impl ArithKind for MulOp {
    fn apply<T: IntScalar>(a: T, b: T) -> Result<T> {
        Ok(a.mul(b))
    }
}

impl ArithKind for DivOp {
    fn apply<T: IntScalar>(a: T, b: T) -> Result<T> {
        if b == T::ZERO {
            return Err(RuntimeError::division_by_zero().into());
        }
        Ok(a.div(b))
    }
}

impl ArithKind for RemOp {
    fn apply<T: IntScalar>(a: T, b: T) -> Result<T> {
        if b == T::ZERO {
            return Err(RuntimeError::division_by_zero().into());
        }
        Ok(a.rem(b))
    }
}

impl ArithKind for AndOp {
    fn apply<T: IntScalar>(a: T, b: T) -> Result<T> {
        Ok(a.and(b))
    }
}

impl ArithKind for OrOp {
    fn apply<T: IntScalar>(a: T, b: T) -> Result<T> {
        Ok(a.or(b))
    }
}

impl ArithKind for XorOp {
    fn apply<T: IntScalar>(a: T, b: T) -> Result<T> {
        Ok(a.xor(b))
    }
}

fn arith<T: IntScalar, K: ArithKind>(
    instance: Option<&ValueRef>,
    args: &[ValueRef],
) -> Result<ValueRef> {
    let (a, b) = operands::<T>(instance, args)?;
    Ok(new_ref(K::apply(a, b)?.into_value()))
}

trait CompareKind {
    fn test<T: IntScalar>(a: T, b: T) -> bool;
}

struct EqOp;
struct NeOp;
struct LtOp;
struct LeOp;
struct GtOp;
struct GeOp;

impl CompareKind for EqOp {
    fn test<T: IntScalar>(a: T, b: T) -> bool {
        a == b
    }
}

impl CompareKind for NeOp {
    fn test<T: IntScalar>(a: T, b: T) -> bool {
        a != b
    }
}

impl CompareKind for LtOp {
    fn test<T: IntScalar>(a: T, b: T) -> bool {
        a < b
    }
}

impl CompareKind for LeOp {
    fn test<T: IntScalar>(a: T, b: T) -> bool {
        a <= b
    }
}

impl CompareKind for GtOp {
    fn test<T: IntScalar>(a: T, b: T) -> bool {
        a > b
    }
}

impl CompareKind for GeOp {
    fn test<T: IntScalar>(a: T, b: T) -> bool {
        a >= b
    }
}

fn compare<T: IntScalar, K: CompareKind>(
    instance: Option<&ValueRef>,
    args: &[ValueRef],
) -> Result<ValueRef> {
    let (a, b) = operands::<T>(instance, args)?;
    Ok(new_ref(Value::Bool(K::test(a, b))))
}

trait StepKind {
    fn step<T: IntScalar>(value: T) -> T;
}

struct IncOp;
struct DecOp;

impl StepKind for IncOp {
    fn step<T: IntScalar>(value: T) -> T {
        value.add(T::ONE)
    }
}

impl StepKind for DecOp {
    fn step<T: IntScalar>(value: T) -> T {
        value.sub(T::ONE)
    }
}

/// `++x`: mutate and return the same object
fn prefix_step<T: IntScalar, K: StepKind>(
    instance: Option<&ValueRef>,
    _args: &[ValueRef],
) -> Result<ValueRef> {
    let instance = receiver(instance)?;
    let next = K::step(scalar::<T>(instance)?);
    *instance.borrow_mut() = next.into_value();
    Ok(Rc::clone(instance))
}

/// `x++`: mutate and return a copy of the old value
fn postfix_step<T: IntScalar, K: StepKind>(
    instance: Option<&ValueRef>,
    _args: &[ValueRef],
) -> Result<ValueRef> {
    let instance = receiver(instance)?;
    let old = scalar::<T>(instance)?;
    *instance.borrow_mut() = K::step(old).into_value();
    Ok(new_ref(old.into_value()))
}

fn negate<T: IntScalar>(instance: Option<&ValueRef>, _args: &[ValueRef]) -> Result<ValueRef> {
    Ok(new_ref(scalar::<T>(receiver(instance)?)?.neg().into_value()))
}

fn identity<T: IntScalar>(instance: Option<&ValueRef>, _args: &[ValueRef]) -> Result<ValueRef> {
    Ok(new_ref(scalar::<T>(receiver(instance)?)?.into_value()))
}

fn complement<T: IntScalar>(instance: Option<&ValueRef>, _args: &[ValueRef]) -> Result<ValueRef> {
    Ok(new_ref(scalar::<T>(receiver(instance)?)?.not().into_value()))
}

// ============================================
// Shared
// ============================================

/// `a = b` for any type: overwrite in place, return the receiver
fn assign(instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<ValueRef> {
    let instance = receiver(instance)?;
    // snapshot first; `x = x` shares one cell
    let source = argument(args, 0)?.borrow().deep_copy();
    instance.borrow_mut().assign_from(source)?;
    Ok(Rc::clone(instance))
}

// ============================================
// bool
// ============================================

fn boolean(value: &ValueRef) -> Result<bool> {
    match &*value.borrow() {
        Value::Bool(b) => Ok(*b),
        other => Err(RuntimeError::type_error("bool", &other.type_name()).into()),
    }
}

fn bool_functions() -> Vec<NativeFunction> {
    let ty = types::boolean();
    vec![
        method(&ty, "operator==", &ty, vec![operand(&ty)], bool_eq),
        method(&ty, "operator!=", &ty, vec![operand(&ty)], bool_ne),
        method(&ty, "operator=", &ty, vec![operand(&ty)], assign),
        method(&ty, "operator!", &ty, Vec::new(), bool_not),
    ]
}

fn bool_eq(instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<ValueRef> {
    let a = boolean(receiver(instance)?)?;
    let b = boolean(argument(args, 0)?)?;
    Ok(new_ref(Value::Bool(a == b)))
}

fn bool_ne(instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<ValueRef> {
    let a = boolean(receiver(instance)?)?;
    let b = boolean(argument(args, 0)?)?;
    Ok(new_ref(Value::Bool(a != b)))
}

fn bool_not(instance: Option<&ValueRef>, _args: &[ValueRef]) -> Result<ValueRef> {
    Ok(new_ref(Value::Bool(!boolean(receiver(instance)?)?)))
}

// ============================================
// string
// ============================================

fn text(value: &ValueRef) -> Result<String> {
    match &*value.borrow() {
        Value::Str(s) => Ok(s.clone()),
        other => Err(RuntimeError::type_error("string", &other.type_name()).into()),
    }
}

fn string_functions() -> Vec<NativeFunction> {
    let ty = types::string();
    let boolean = types::boolean();
    let int32 = types::int32();
    vec![
        method(&ty, "operator+", &ty, vec![operand(&ty)], string_concat),
        method(&ty, "operator=", &ty, vec![operand(&ty)], assign),
        method(&ty, "operator==", &boolean, vec![operand(&ty)], string_eq),
        method(&ty, "operator!=", &boolean, vec![operand(&ty)], string_ne),
        method(&ty, "size", &int32, Vec::new(), string_size),
        method(&ty, "length", &int32, Vec::new(), string_size),
    ]
}

fn string_concat(instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<ValueRef> {
    let mut joined = text(receiver(instance)?)?;
    joined.push_str(&text(argument(args, 0)?)?);
    Ok(new_ref(Value::Str(joined)))
}

fn string_eq(instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<ValueRef> {
    let equal = text(receiver(instance)?)? == text(argument(args, 0)?)?;
    Ok(new_ref(Value::Bool(equal)))
}

fn string_ne(instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<ValueRef> {
    let equal = text(receiver(instance)?)? == text(argument(args, 0)?)?;
    Ok(new_ref(Value::Bool(!equal)))
}

fn string_size(instance: Option<&ValueRef>, _args: &[ValueRef]) -> Result<ValueRef> {
    let len = text(receiver(instance)?)?.len();
    Ok(new_ref(Value::Int32(i32::try_from(len).unwrap_or(i32::MAX))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::function::Function;
    use crate::interp::types::{CppType, MemberFlags};

    fn call(ty: &TypeRef, name: &str, receiver: &ValueRef, args: &[ValueRef]) -> Result<ValueRef> {
        let functions = CppType::get_function(ty, name, MemberFlags::PUBLIC_INSTANCE)
            .expect("function exists");
        functions.invoke(receiver, args)
    }

    fn int(n: i32) -> ValueRef {
        new_ref(Value::Int32(n))
    }

    fn as_int(value: &ValueRef) -> i32 {
        match *value.borrow() {
            Value::Int32(n) => n,
            ref other => panic!("expected int, got {other:?}"),
        }
    }

    #[test]
    fn test_integer_arithmetic() {
        let ty = types::int32();
        assert_eq!(as_int(&call(&ty, "operator+", &int(2), &[int(3)]).unwrap()), 5);
        assert_eq!(as_int(&call(&ty, "operator-", &int(2), &[int(3)]).unwrap()), -1);
        assert_eq!(as_int(&call(&ty, "operator*", &int(4), &[int(3)]).unwrap()), 12);
        assert_eq!(as_int(&call(&ty, "operator/", &int(7), &[int(2)]).unwrap()), 3);
        assert_eq!(as_int(&call(&ty, "operator%", &int(7), &[int(2)]).unwrap()), 1);
        assert_eq!(as_int(&call(&ty, "operator^", &int(6), &[int(3)]).unwrap()), 5);
    }

    #[test]
    fn test_integer_overflow_wraps() {
        let ty = types::int32();
        let result = call(&ty, "operator+", &int(i32::MAX), &[int(1)]).unwrap();
        assert_eq!(as_int(&result), i32::MIN);
        let result = call(&ty, "operator/", &int(i32::MIN), &[int(-1)]).unwrap();
        assert_eq!(as_int(&result), i32::MIN);
    }

    #[test]
    fn test_division_by_zero() {
        let ty = types::int32();
        let err = call(&ty, "operator/", &int(1), &[int(0)]).unwrap_err();
        assert_eq!(err.message(), "division by zero");
        assert!(call(&ty, "operator%", &int(1), &[int(0)]).is_err());
    }

    #[test]
    fn test_comparison_returns_bool() {
        let ty = types::int32();
        let result = call(&ty, "operator<=", &int(2), &[int(2)]).unwrap();
        assert!(matches!(*result.borrow(), Value::Bool(true)));
    }

    #[test]
    fn test_prefix_increment_returns_same_object() {
        let ty = types::int32();
        let x = int(1);
        let result = call(&ty, "operator++", &x, &[]).unwrap();
        assert!(Rc::ptr_eq(&x, &result));
        assert_eq!(as_int(&x), 2);
    }

    #[test]
    fn test_postfix_decrement_returns_old_value() {
        let ty = types::int32();
        let x = int(5);
        let result = call(&ty, "operator--", &x, &[int(0)]).unwrap();
        assert_eq!(as_int(&result), 5);
        assert_eq!(as_int(&x), 4);
    }

    #[test]
    fn test_assignment_mutates_in_place() {
        let ty = types::int32();
        let x = int(1);
        let result = call(&ty, "operator=", &x, &[int(9)]).unwrap();
        assert!(Rc::ptr_eq(&x, &result));
        assert_eq!(as_int(&x), 9);
    }

    #[test]
    fn test_self_assignment() {
        let ty = types::int32();
        let x = int(3);
        call(&ty, "operator=", &x, &[Rc::clone(&x)]).unwrap();
        assert_eq!(as_int(&x), 3);
    }

    #[test]
    fn test_long_and_char_share_operator_set() {
        let long = types::int64();
        let result = call(&long, "operator*", &new_ref(Value::Int64(1 << 40)), &[new_ref(Value::Int64(4))]).unwrap();
        assert!(matches!(*result.borrow(), Value::Int64(n) if n == 1 << 42));

        let ch = types::char();
        let c = new_ref(Value::Char(b'a'));
        call(&ch, "operator++", &c, &[]).unwrap();
        assert!(matches!(*c.borrow(), Value::Char(b'b')));
    }

    #[test]
    fn test_unary_minus_and_complement() {
        let ty = types::int32();
        assert_eq!(as_int(&call(&ty, "operator-", &int(4), &[]).unwrap()), -4);
        assert_eq!(as_int(&call(&ty, "operator~", &int(0), &[]).unwrap()), -1);
        assert_eq!(as_int(&call(&ty, "operator+", &int(4), &[]).unwrap()), 4);
    }

    #[test]
    fn test_bool_operators() {
        let ty = types::boolean();
        let t = new_ref(Value::Bool(true));
        let result = call(&ty, "operator!", &t, &[]).unwrap();
        assert!(matches!(*result.borrow(), Value::Bool(false)));
        let result = call(&ty, "operator!=", &t, &[new_ref(Value::Bool(false))]).unwrap();
        assert!(matches!(*result.borrow(), Value::Bool(true)));
    }

    #[test]
    fn test_string_operators() {
        let ty = types::string();
        let hello = new_ref(Value::Str("hello".into()));
        let size = call(&ty, "size", &hello, &[]).unwrap();
        assert_eq!(as_int(&size), 5);

        let joined = call(&ty, "operator+", &hello, &[new_ref(Value::Str("!".into()))]).unwrap();
        assert!(matches!(&*joined.borrow(), Value::Str(s) if s == "hello!"));

        let same = call(&ty, "operator==", &hello, &[new_ref(Value::Str("hello".into()))]).unwrap();
        assert!(matches!(*same.borrow(), Value::Bool(true)));
    }

    #[test]
    fn test_wrong_receiver_is_type_error() {
        let ty = types::int32();
        let plus = ty
            .get_function("operator+", MemberFlags::PUBLIC_INSTANCE)
            .unwrap()
            .get_overload(Some(&ty), &[types::int32()])
            .unwrap();
        let err = plus.invoke(Some(&new_ref(Value::Bool(true))), &[int(1)]).unwrap_err();
        assert!(err.message().contains("type error"));
    }
}
