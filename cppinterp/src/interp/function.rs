//! Callable functions
//!
//! Three kinds live behind the [`Function`] trait: native member functions of
//! the built-in and compound types, host functions supplied by the embedding
//! program (the `print` family), and user functions defined in source.

use super::error::{ErrorKind, RuntimeError};
use super::scope::{Scope, ScopeRef, child_scope};
use super::types::{Construct, TypeRef};
use super::value::ValueRef;
use crate::ast::{Block, SourceSymbol, Spanned};
use crate::error::Result;
use crate::stack;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

/// Default limit on nested user function calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
    static CALL_LIMIT: Cell<usize> = const { Cell::new(DEFAULT_MAX_CALL_DEPTH) };
}

/// Set the call depth limit for user functions on this thread
pub fn set_max_call_depth(limit: usize) {
    CALL_LIMIT.with(|cell| cell.set(limit));
}

/// Counts one level of user function nesting while alive
struct CallDepthGuard;

impl CallDepthGuard {
    fn enter() -> Result<Self> {
        let limit = CALL_LIMIT.with(Cell::get);
        CALL_DEPTH.with(|depth| {
            if depth.get() >= limit {
                return Err(RuntimeError::stack_overflow(limit).into());
            }
            depth.set(depth.get() + 1);
            Ok(CallDepthGuard)
        })
    }
}

impl Drop for CallDepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Declared parameter
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    pub is_reference: bool,
}

impl Parameter {
    pub fn value(name: impl Into<String>, ty: TypeRef) -> Self {
        Parameter {
            name: name.into(),
            ty,
            is_reference: false,
        }
    }

    pub fn reference(name: impl Into<String>, ty: TypeRef) -> Self {
        Parameter {
            name: name.into(),
            ty,
            is_reference: true,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amp = if self.is_reference { "&" } else { "" };
        write!(f, "{}{amp}", self.ty.name())
    }
}

pub trait Function {
    fn name(&self) -> &str;

    fn return_type(&self) -> &TypeRef;

    /// Receiver type; `None` for free functions
    fn instance_type(&self) -> Option<&TypeRef>;

    fn parameters(&self) -> &[Parameter];

    fn invoke(&self, instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<ValueRef>;

    /// Parameter types equal `arg_types` position by position
    fn parameters_match(&self, arg_types: &[TypeRef]) -> bool {
        let params = self.parameters();
        params.len() == arg_types.len()
            && params.iter().zip(arg_types).all(|(p, ty)| *p.ty == **ty)
    }

    /// `name(int, long&)`
    fn signature(&self) -> String {
        let params: Vec<String> = self.parameters().iter().map(|p| p.to_string()).collect();
        format!("{}({})", self.name(), params.join(", "))
    }
}

pub type FunctionRef = Rc<dyn Function>;

impl<F: Function + ?Sized> Function for Arc<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn return_type(&self) -> &TypeRef {
        (**self).return_type()
    }

    fn instance_type(&self) -> Option<&TypeRef> {
        (**self).instance_type()
    }

    fn parameters(&self) -> &[Parameter] {
        (**self).parameters()
    }

    fn invoke(&self, instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<ValueRef> {
        (**self).invoke(instance, args)
    }
}

/// Native body: `(receiver, arguments) -> result`
pub type NativeFn = fn(Option<&ValueRef>, &[ValueRef]) -> Result<ValueRef>;

/// Member function implemented in Rust
#[derive(Clone)]
pub struct NativeFunction {
    name: String,
    return_type: TypeRef,
    instance_type: Option<TypeRef>,
    parameters: Vec<Parameter>,
    body: NativeFn,
}

impl NativeFunction {
    pub fn method(
        name: impl Into<String>,
        owner: &TypeRef,
        return_type: TypeRef,
        parameters: Vec<Parameter>,
        body: NativeFn,
    ) -> Self {
        NativeFunction {
            name: name.into(),
            return_type,
            instance_type: Some(TypeRef::clone(owner)),
            parameters,
            body,
        }
    }

    pub fn same_instance_type(&self, instance_type: Option<&TypeRef>) -> bool {
        match (&self.instance_type, instance_type) {
            (Some(own), Some(other)) => **own == **other,
            (None, None) => true,
            _ => false,
        }
    }
}

impl Function for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    fn instance_type(&self) -> Option<&TypeRef> {
        self.instance_type.as_ref()
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn invoke(&self, instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<ValueRef> {
        if self.instance_type.is_some() && instance.is_none() {
            return Err(RuntimeError::new(
                ErrorKind::TypeError,
                format!("member function '{}' called without an instance", self.name),
            )
            .into());
        }
        (self.body)(instance, args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.signature())
    }
}

type HostBody = Box<dyn Fn(&[ValueRef]) -> Result<ValueRef>>;

/// Free function provided by the host, e.g. `print`
pub struct HostFunction {
    name: String,
    return_type: TypeRef,
    parameters: Vec<Parameter>,
    body: HostBody,
}

impl HostFunction {
    pub fn new(
        name: impl Into<String>,
        return_type: TypeRef,
        parameters: Vec<Parameter>,
        body: impl Fn(&[ValueRef]) -> Result<ValueRef> + 'static,
    ) -> Self {
        HostFunction {
            name: name.into(),
            return_type,
            parameters,
            body: Box::new(body),
        }
    }
}

impl Function for HostFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    fn instance_type(&self) -> Option<&TypeRef> {
        None
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn invoke(&self, instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<ValueRef> {
        if instance.is_some() {
            return Err(RuntimeError::new(
                ErrorKind::TypeError,
                format!("'{}' is not a member function", self.name),
            )
            .into());
        }
        (self.body)(args)
    }
}

/// Compiled body of a user function, run in a fresh frame
pub type BodyEval = Rc<dyn Fn(&ScopeRef<ValueRef>) -> Result<ValueRef>>;

enum BodyState {
    Declared,
    Compiled {
        /// Scope the function was defined in
        closure: Weak<RefCell<Scope<ValueRef>>>,
        eval: BodyEval,
    },
}

/// Function defined in source. Registered in stage 2, body built in stage 3.
pub struct UserFunction {
    name: String,
    return_type: TypeRef,
    parameters: Vec<Parameter>,
    body: Spanned<Block>,
    meta: SourceSymbol,
    state: RefCell<BodyState>,
}

impl UserFunction {
    pub fn new(
        name: impl Into<String>,
        return_type: TypeRef,
        parameters: Vec<Parameter>,
        body: Spanned<Block>,
        meta: SourceSymbol,
    ) -> Self {
        UserFunction {
            name: name.into(),
            return_type,
            parameters,
            body,
            meta,
            state: RefCell::new(BodyState::Declared),
        }
    }

    pub fn body(&self) -> &Spanned<Block> {
        &self.body
    }

    /// Definition site
    pub fn meta(&self) -> &SourceSymbol {
        &self.meta
    }

    pub fn is_built(&self) -> bool {
        matches!(*self.state.borrow(), BodyState::Compiled { .. })
    }

    /// Compile the body once, capturing `closure` as the defining scope
    pub fn build_body(
        &self,
        closure: &ScopeRef<ValueRef>,
        compile: impl FnOnce(&UserFunction) -> Result<BodyEval>,
    ) -> Result<()> {
        if self.is_built() {
            return Err(RuntimeError::function_already_built(&self.name).into());
        }
        let eval = compile(self)?;
        *self.state.borrow_mut() = BodyState::Compiled {
            closure: Rc::downgrade(closure),
            eval,
        };
        Ok(())
    }
}

impl Function for UserFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    fn instance_type(&self) -> Option<&TypeRef> {
        None
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn invoke(&self, instance: Option<&ValueRef>, args: &[ValueRef]) -> Result<ValueRef> {
        if instance.is_some() {
            return Err(RuntimeError::new(
                ErrorKind::TypeError,
                format!("'{}' is not a member function", self.name),
            )
            .into());
        }
        let (closure, eval) = match &*self.state.borrow() {
            BodyState::Declared => {
                return Err(RuntimeError::function_not_built(&self.name).into());
            }
            BodyState::Compiled { closure, eval } => (closure.upgrade(), Rc::clone(eval)),
        };
        let Some(closure) = closure else {
            return Err(RuntimeError::new(
                ErrorKind::FunctionNotBuilt,
                format!("defining scope of '{}' no longer exists", self.name),
            )
            .into());
        };
        if args.len() != self.parameters.len() {
            let types: Vec<String> = args.iter().map(|a| a.borrow().type_name()).collect();
            return Err(RuntimeError::no_matching_overload(&types).into());
        }

        let _guard = CallDepthGuard::enter()?;
        tracing::trace!(function = %self.name, "call");

        let frame = child_scope(&closure);
        for (param, arg) in self.parameters.iter().zip(args) {
            let value = if param.is_reference {
                Rc::clone(arg)
            } else {
                param.ty.copy_of(arg)?
            };
            frame.borrow_mut().try_bind(param.name.clone(), value);
        }
        stack::guarded(|| eval(&frame))
    }
}

impl fmt::Debug for UserFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserFunction")
            .field("signature", &self.signature())
            .field("built", &self.is_built())
            .finish()
    }
}
