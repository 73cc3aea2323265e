//! Stage 1: type collection
//!
//! Registers class and struct declarations as compound types. Every other
//! top-level statement is passed through for stage 2.

use super::scope::{Scope, ScopeRef};
use super::types::{self, CppType, Field, TypeRef};
use crate::ast::{ClassDef, SourceSymbol, Spanned, Stmt};
use crate::error::{CompileError, Result};

/// Populated type scope plus the statements left for stage 2
pub struct SymbolTree {
    pub types: ScopeRef<TypeRef>,
    pub items: Vec<Spanned<Stmt>>,
}

/// Type scope holding the built-in types
pub fn base_type_scope() -> ScopeRef<TypeRef> {
    let mut scope = Scope::new();
    for ty in types::builtins() {
        scope.try_bind(ty.name().to_string(), ty);
    }
    scope.into_ref()
}

/// Resolve a declared type name
pub fn lookup_type(types: &ScopeRef<TypeRef>, name: &str, meta: &SourceSymbol) -> Result<TypeRef> {
    types
        .borrow()
        .try_get(name)
        .ok_or_else(|| CompileError::semantic(format!("Type '{name}' does not exist"), meta))
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn collect_types(items: Vec<Spanned<Stmt>>, types: &ScopeRef<TypeRef>) -> Result<SymbolTree> {
    let mut rest = Vec::with_capacity(items.len());
    for item in items {
        match item.node {
            Stmt::ClassDef(class) => {
                let ty = compound_type(&class, types)?;
                tracing::debug!(name = %ty.name(), fields = ty.fields().len(), "registered type");
                if !types.borrow_mut().try_bind(ty.name().to_string(), ty) {
                    let name = &class.name;
                    return Err(CompileError::semantic(
                        format!("Type '{}' was already defined", name.node),
                        &name.meta,
                    ));
                }
            }
            node => rest.push(Spanned::new(node, item.meta)),
        }
    }
    Ok(SymbolTree {
        types: types.clone(),
        items: rest,
    })
}

fn compound_type(class: &ClassDef, types: &ScopeRef<TypeRef>) -> Result<TypeRef> {
    let name = &class.name;
    if types.borrow().has(&name.node) {
        return Err(CompileError::semantic(
            format!("Type '{}' was already defined", name.node),
            &name.meta,
        ));
    }

    for base in &class.bases {
        lookup_type(types, &base.name.node, &base.name.meta)?;
        tracing::warn!(class = %name.node, base = %base.name.node, "base classes are not inherited");
    }

    let mut fields: Vec<Field> = Vec::with_capacity(class.fields.len());
    for member in &class.fields {
        let decl = &member.decl;
        if decl.ty.node.is_reference {
            return Err(CompileError::semantic(
                format!("Member '{}' can not be a reference", decl.name.node),
                &decl.name.meta,
            ));
        }
        if fields.iter().any(|f| f.name == decl.name.node) {
            return Err(CompileError::semantic(
                format!("Duplicate member '{}'", decl.name.node),
                &decl.name.meta,
            ));
        }
        fields.push(Field {
            name: decl.name.node.clone(),
            ty: lookup_type(types, &decl.ty.node.name, &decl.ty.meta)?,
            visibility: member.visibility,
        });
    }

    for method in &class.methods {
        tracing::warn!(class = %name.node, method = %method.decl.name.node, "member functions are not evaluated");
    }
    if !class.constructors.is_empty() {
        tracing::warn!(class = %name.node, count = class.constructors.len(), "user constructors are not evaluated");
    }
    if class.destructor.is_some() {
        tracing::warn!(class = %name.node, "destructors are not evaluated");
    }

    Ok(CppType::compound(name.node.clone(), fields))
}
