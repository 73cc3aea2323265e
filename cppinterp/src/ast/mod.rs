//! Abstract Syntax Tree definitions
//!
//! The canonical tree the interpreter stages consume. It is produced from the
//! parser's raw tree by [`build`] and never mutated afterwards.

mod build;
mod expr;
mod span;
mod types;

pub use build::{build_program, build_repl_input};
pub use expr::*;
pub use span::*;
pub use types::*;

use serde::{Deserialize, Serialize};

/// A program is a sequence of top-level statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Spanned<Stmt>>,
}

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Spanned<Expr>),
    VarDef(VarDef),
    FuncDef(FuncDef),
    ClassDef(ClassDef),
    Block(Block),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Return(Option<Spanned<Expr>>),
    Break,
    Continue,
}

/// `T name = init;` or `T& name = init;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDef {
    pub ty: Spanned<TypeUsage>,
    pub name: Spanned<String>,
    pub init: Option<Spanned<Expr>>,
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDef {
    pub name: Spanned<String>,
    /// `void` is only legal here
    pub return_type: Spanned<TypeUsage>,
    pub params: Vec<Param>,
    pub body: Spanned<Block>,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeUsage>,
}

/// `{ ... }`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

/// `if`/`else if` chain, flattened into ordered branches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub branches: Vec<(Spanned<Expr>, Spanned<Block>)>,
    pub else_block: Option<Spanned<Block>>,
}

/// `while (cond) body` or `do body while (cond);`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStmt {
    pub cond: Spanned<Expr>,
    pub body: Spanned<Block>,
    pub do_while: bool,
}

/// `for (init; cond; step) body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStmt {
    pub init: Option<Box<Spanned<Stmt>>>,
    pub cond: Option<Spanned<Expr>>,
    pub step: Option<Spanned<Expr>>,
    pub body: Spanned<Block>,
}

/// `class`/`struct` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: Spanned<String>,
    pub bases: Vec<BaseClass>,
    pub fields: Vec<Member<VarDef>>,
    pub methods: Vec<Member<FuncDef>>,
    pub constructors: Vec<Member<FuncDef>>,
    pub destructor: Option<Member<FuncDef>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseClass {
    pub name: Spanned<String>,
    pub visibility: Visibility,
}

/// A class member with the visibility of its section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member<T> {
    pub visibility: Visibility,
    pub decl: T,
}

/// Input accepted by the interactive session
#[derive(Debug, Clone, PartialEq)]
pub enum ReplInput {
    /// Definitions and statements, run in order
    Statements(Vec<Spanned<Stmt>>),
    /// A bare expression whose value is echoed
    Expr(Spanned<Expr>),
}
