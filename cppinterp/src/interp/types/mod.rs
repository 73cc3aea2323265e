//! Type system
//!
//! Every type is a shared, immutable [`CppType`] behind a [`TypeRef`]. Built-in
//! types are process-wide statics; compound types are created by stage 1.
//! Equality is nominal: two types are equal when their names are.

mod operators;

use super::function::{Function, NativeFunction};
use super::value::{CallableValue, ObjectValue, Value, ValueRef, new_ref};
use super::error::{ErrorKind, RuntimeError};
use crate::ast::Visibility;
use crate::error::Result;
use bitflags::bitflags;
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, LazyLock, OnceLock, Weak};

/// Shared handle to a type
pub type TypeRef = Arc<CppType>;

bitflags! {
    /// Which members a lookup may see
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct MemberFlags: u8 {
        const PUBLIC = 1 << 0;
        const NON_PUBLIC = 1 << 1;
        const INSTANCE = 1 << 2;
        const STATIC = 1 << 3;

        const PUBLIC_INSTANCE = Self::PUBLIC.bits() | Self::INSTANCE.bits();
    }
}

impl MemberFlags {
    fn of_instance_member(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Public => MemberFlags::PUBLIC_INSTANCE,
            Visibility::Private | Visibility::Protected => {
                MemberFlags::NON_PUBLIC | MemberFlags::INSTANCE
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Bool,
    Int32,
    Int64,
    Char,
    String,
    /// Static type of a function-name expression
    Callable,
    Compound,
}

/// Data member of a compound type
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constructor {
    /// Zero arguments
    Default,
    /// One argument of the same type
    Copy,
}

pub struct CppType {
    name: String,
    kind: TypeKind,
    fields: Vec<Field>,
    /// Compound types generate their members against this handle on lookup
    this: Weak<CppType>,
    /// Built-in operator table
    functions: OnceLock<Vec<Arc<NativeFunction>>>,
}

static VOID: LazyLock<TypeRef> = LazyLock::new(|| CppType::builtin("void", TypeKind::Void));
static BOOL: LazyLock<TypeRef> = LazyLock::new(|| CppType::builtin("bool", TypeKind::Bool));
static INT32: LazyLock<TypeRef> = LazyLock::new(|| CppType::builtin("int", TypeKind::Int32));
static INT64: LazyLock<TypeRef> = LazyLock::new(|| CppType::builtin("long", TypeKind::Int64));
static CHAR: LazyLock<TypeRef> = LazyLock::new(|| CppType::builtin("char", TypeKind::Char));
static STRING: LazyLock<TypeRef> =
    LazyLock::new(|| CppType::builtin("string", TypeKind::String));
static CALLABLE: LazyLock<TypeRef> =
    LazyLock::new(|| CppType::builtin("Callable", TypeKind::Callable));

pub fn void() -> TypeRef {
    Arc::clone(&VOID)
}

pub fn boolean() -> TypeRef {
    Arc::clone(&BOOL)
}

pub fn int32() -> TypeRef {
    Arc::clone(&INT32)
}

pub fn int64() -> TypeRef {
    Arc::clone(&INT64)
}

pub fn char() -> TypeRef {
    Arc::clone(&CHAR)
}

pub fn string() -> TypeRef {
    Arc::clone(&STRING)
}

pub fn callable() -> TypeRef {
    Arc::clone(&CALLABLE)
}

/// Built-in types bound in the base type scope, by declared spelling
pub fn builtins() -> Vec<TypeRef> {
    vec![void(), boolean(), int32(), int64(), char(), string()]
}

impl CppType {
    fn builtin(name: &str, kind: TypeKind) -> TypeRef {
        Arc::new(CppType {
            name: name.to_string(),
            kind,
            fields: Vec::new(),
            this: Weak::new(),
            functions: OnceLock::new(),
        })
    }

    /// Create a compound type with generated default/copy constructors and `operator=`
    pub fn compound(name: impl Into<String>, fields: Vec<Field>) -> TypeRef {
        let name = name.into();
        Arc::new_cyclic(|this| CppType {
            name,
            kind: TypeKind::Compound,
            fields,
            this: Weak::clone(this),
            functions: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_void(&self) -> bool {
        self.kind == TypeKind::Void
    }

    pub fn is_callable(&self) -> bool {
        self.kind == TypeKind::Callable
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Nominal equality
    pub fn equals(&self, other: &CppType) -> bool {
        self.name == other.name
    }

    pub fn constructors(&self) -> &'static [Constructor] {
        match self.kind {
            TypeKind::Callable => &[],
            TypeKind::Void => &[Constructor::Default],
            _ => &[Constructor::Default, Constructor::Copy],
        }
    }

    /// Member and operator functions
    pub fn functions(&self) -> Vec<Arc<NativeFunction>> {
        match self.kind {
            TypeKind::Compound => self
                .this
                .upgrade()
                .map(|this| operators::compound_functions(&this))
                .unwrap_or_default(),
            kind => self
                .functions
                .get_or_init(|| operators::builtin_functions(kind))
                .clone(),
        }
    }

    /// All functions called `name` visible under `flags`
    pub fn get_function(&self, name: &str, flags: MemberFlags) -> Option<MemberFunctionInfo> {
        if !flags.contains(MemberFlags::PUBLIC_INSTANCE) {
            return None;
        }
        let functions: Vec<_> = self
            .functions()
            .into_iter()
            .filter(|f| f.name() == name)
            .collect();
        if functions.is_empty() {
            None
        } else {
            Some(MemberFunctionInfo {
                name: name.to_string(),
                functions,
            })
        }
    }

    /// Field or member function called `name` visible under `flags`
    pub fn get_member(&self, name: &str, flags: MemberFlags) -> Option<MemberInfo> {
        let field = self.fields.iter().enumerate().find(|(_, f)| {
            f.name == name && flags.contains(MemberFlags::of_instance_member(f.visibility))
        });
        if let Some((index, field)) = field {
            return Some(MemberInfo::Field {
                name: field.name.clone(),
                ty: Arc::clone(&field.ty),
                index,
            });
        }
        self.get_function(name, flags).map(MemberInfo::Function)
    }
}

/// Construction; these need the shared handle so objects can record their type
pub trait Construct {
    /// Default instance
    fn create(&self) -> Result<ValueRef>;
    /// Independent copy of `source`
    fn copy_of(&self, source: &ValueRef) -> Result<ValueRef>;
}

impl Construct for TypeRef {
    fn create(&self) -> Result<ValueRef> {
        let value = match self.kind {
            TypeKind::Void => Value::Void,
            TypeKind::Bool => Value::Bool(false),
            TypeKind::Int32 => Value::Int32(0),
            TypeKind::Int64 => Value::Int64(0),
            TypeKind::Char => Value::Char(0),
            TypeKind::String => Value::Str(String::new()),
            TypeKind::Callable => {
                return Err(RuntimeError::not_constructible(&self.name).into());
            }
            TypeKind::Compound => {
                let fields = self
                    .fields
                    .iter()
                    .map(|field| Ok((field.name.clone(), field.ty.create()?)))
                    .collect::<Result<Vec<_>>>()?;
                Value::Object(ObjectValue {
                    ty: Arc::clone(self),
                    fields,
                })
            }
        };
        Ok(new_ref(value))
    }

    fn copy_of(&self, source: &ValueRef) -> Result<ValueRef> {
        let source_type = source.borrow().ty();
        if !self.constructors().contains(&Constructor::Copy) || *source_type != **self {
            return Err(RuntimeError::new(
                ErrorKind::NotConstructible,
                format!(
                    "Type '{}' has no constructor taking '{}'",
                    self.name,
                    source_type.name()
                ),
            )
            .into());
        }
        let copy = source.borrow().deep_copy();
        Ok(new_ref(copy))
    }
}

impl PartialEq for CppType {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for CppType {}

// Member functions point back at their owner, so Debug prints the name only
impl fmt::Debug for CppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CppType({})", self.name)
    }
}

impl fmt::Display for CppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Same-named member functions of one type
#[derive(Debug, Clone)]
pub struct MemberFunctionInfo {
    pub name: String,
    pub functions: Vec<Arc<NativeFunction>>,
}

impl MemberFunctionInfo {
    /// The unique function whose receiver and parameter types match exactly
    pub fn get_overload(
        &self,
        instance_type: Option<&TypeRef>,
        arg_types: &[TypeRef],
    ) -> Option<Arc<NativeFunction>> {
        let mut matches = self
            .functions
            .iter()
            .filter(|f| f.same_instance_type(instance_type) && f.parameters_match(arg_types));
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(Arc::clone(first))
    }

    /// Resolve against the runtime types of `instance` and `args`, then call
    pub fn invoke(&self, instance: &ValueRef, args: &[ValueRef]) -> Result<ValueRef> {
        let instance_type = instance.borrow().ty();
        let arg_types: Vec<TypeRef> = args.iter().map(|a| a.borrow().ty()).collect();
        match self.get_overload(Some(&instance_type), &arg_types) {
            Some(function) => function.invoke(Some(instance), args),
            None => Err(RuntimeError::no_matching_overload(&type_names(&arg_types)).into()),
        }
    }

    /// Callable value bound to `instance`
    pub fn bind(&self, instance: &ValueRef) -> CallableValue {
        let overloads = self
            .functions
            .iter()
            .map(|f| Rc::new(Arc::clone(f)) as Rc<dyn Function>)
            .collect();
        CallableValue::bound(self.name.clone(), Rc::clone(instance), overloads)
    }
}

/// Result of a member lookup
#[derive(Debug, Clone)]
pub enum MemberInfo {
    Field {
        name: String,
        ty: TypeRef,
        index: usize,
    },
    Function(MemberFunctionInfo),
}

impl MemberInfo {
    /// Static type of `instance.member`
    pub fn member_type(&self) -> TypeRef {
        match self {
            MemberInfo::Field { ty, .. } => Arc::clone(ty),
            MemberInfo::Function(_) => callable(),
        }
    }

    /// Fetch the member from an evaluated instance; fields alias the object's storage
    pub fn get_value(&self, instance: &ValueRef) -> Result<ValueRef> {
        match self {
            MemberInfo::Field { name, index, .. } => match &*instance.borrow() {
                Value::Object(object) => object
                    .fields
                    .get(*index)
                    .map(|(_, value)| Rc::clone(value))
                    .ok_or_else(|| RuntimeError::undefined_variable(name).into()),
                other => Err(RuntimeError::type_error("object", &other.type_name()).into()),
            },
            MemberInfo::Function(info) => Ok(new_ref(Value::Callable(info.bind(instance)))),
        }
    }
}

/// Type names for diagnostics
pub fn type_names(types: &[TypeRef]) -> Vec<String> {
    types.iter().map(|t| t.name().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_singletons() {
        assert!(Arc::ptr_eq(&int32(), &int32()));
        assert!(Arc::ptr_eq(&string(), &string()));
    }

    #[test]
    fn test_nominal_equality() {
        assert_eq!(int32(), int32());
        assert_ne!(int32(), int64());
        let a = CppType::compound("Point", Vec::new());
        let b = CppType::compound("Point", Vec::new());
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_default_instances() {
        assert!(matches!(*int32().create().unwrap().borrow(), Value::Int32(0)));
        assert!(matches!(*boolean().create().unwrap().borrow(), Value::Bool(false)));
        assert!(matches!(*void().create().unwrap().borrow(), Value::Void));
        assert!(matches!(&*string().create().unwrap().borrow(), Value::Str(s) if s.is_empty()));
    }

    #[test]
    fn test_callable_not_constructible() {
        assert!(callable().create().is_err());
        assert!(callable().constructors().is_empty());
    }

    #[test]
    fn test_copy_constructor_makes_independent_value() {
        let original = new_ref(Value::Int32(7));
        let copy = int32().copy_of(&original).unwrap();
        *copy.borrow_mut() = Value::Int32(9);
        assert!(matches!(*original.borrow(), Value::Int32(7)));
    }

    #[test]
    fn test_copy_constructor_rejects_other_type() {
        let original = new_ref(Value::Bool(true));
        assert!(int32().copy_of(&original).is_err());
        assert!(void().copy_of(&new_ref(Value::Void)).is_err());
    }

    #[test]
    fn test_compound_type_is_released() {
        let point = CppType::compound("Point", Vec::new());
        let assign = point
            .get_function("operator=", MemberFlags::PUBLIC_INSTANCE)
            .unwrap();
        assert_eq!(assign.functions.len(), 1);
        drop(assign);
        let handle = Arc::downgrade(&point);
        drop(point);
        assert!(handle.upgrade().is_none());
    }

    #[test]
    fn test_get_function_groups_overloads() {
        let minus = int32()
            .get_function("operator-", MemberFlags::PUBLIC_INSTANCE)
            .unwrap();
        // binary and unary minus
        assert_eq!(minus.functions.len(), 2);
        assert!(int32().get_function("operator&&", MemberFlags::PUBLIC_INSTANCE).is_none());
        assert!(int32().get_function("operator+", MemberFlags::STATIC).is_none());
    }

    #[test]
    fn test_get_overload_exact_match() {
        let plus = int32()
            .get_function("operator+", MemberFlags::PUBLIC_INSTANCE)
            .unwrap();
        let ty = int32();
        assert!(plus.get_overload(Some(&ty), &[int32()]).is_some());
        assert!(plus.get_overload(Some(&ty), &[int64()]).is_none());
        assert!(plus.get_overload(Some(&ty), &[int32(), int32()]).is_none());
        assert!(plus.get_overload(None, &[int32()]).is_none());
        assert!(plus.get_overload(Some(&int64()), &[int32()]).is_none());
    }

    #[test]
    fn test_postfix_and_prefix_overloads_are_distinct() {
        let inc = int32()
            .get_function("operator++", MemberFlags::PUBLIC_INSTANCE)
            .unwrap();
        let ty = int32();
        assert!(inc.get_overload(Some(&ty), &[]).is_some());
        assert!(inc.get_overload(Some(&ty), &[int32()]).is_some());
    }

    #[test]
    fn test_bool_operator_set() {
        let ty = boolean();
        for name in ["operator==", "operator!=", "operator!", "operator="] {
            assert!(ty.get_function(name, MemberFlags::PUBLIC_INSTANCE).is_some(), "{name}");
        }
        assert!(ty.get_function("operator+", MemberFlags::PUBLIC_INSTANCE).is_none());
    }

    #[test]
    fn test_string_methods() {
        let ty = string();
        for name in ["operator+", "operator=", "size", "length"] {
            assert!(ty.get_function(name, MemberFlags::PUBLIC_INSTANCE).is_some(), "{name}");
        }
        let size = ty.get_member("size", MemberFlags::PUBLIC_INSTANCE).unwrap();
        assert_eq!(size.member_type(), callable());
    }

    #[test]
    fn test_compound_fields_respect_visibility() {
        let point = CppType::compound(
            "Point",
            vec![
                Field {
                    name: "x".into(),
                    ty: int32(),
                    visibility: Visibility::Public,
                },
                Field {
                    name: "secret".into(),
                    ty: int32(),
                    visibility: Visibility::Private,
                },
            ],
        );
        let x = point.get_member("x", MemberFlags::PUBLIC_INSTANCE).unwrap();
        assert_eq!(x.member_type(), int32());
        assert!(point.get_member("secret", MemberFlags::PUBLIC_INSTANCE).is_none());
        assert!(point
            .get_member("secret", MemberFlags::NON_PUBLIC | MemberFlags::INSTANCE)
            .is_some());
    }

    #[test]
    fn test_compound_field_aliases_object_storage() {
        let point = CppType::compound(
            "Point",
            vec![Field {
                name: "x".into(),
                ty: int32(),
                visibility: Visibility::Public,
            }],
        );
        let object = point.create().unwrap();
        let x = point.get_member("x", MemberFlags::PUBLIC_INSTANCE).unwrap();
        let field = x.get_value(&object).unwrap();
        *field.borrow_mut() = Value::Int32(5);
        let again = x.get_value(&object).unwrap();
        assert!(matches!(*again.borrow(), Value::Int32(5)));
    }
}
