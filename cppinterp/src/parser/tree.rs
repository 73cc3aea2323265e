//! Raw parse tree
//!
//! Action target of `grammar.lalrpop`, one node per production. Operators and literals are
//! kept as the tokens that spelled them; `if`/`else if` chains stay nested;
//! class bodies are a flat member list with visibility labels in between.
//! [`crate::ast::build_program`] turns this into the canonical AST.

use crate::ast::Spanned;
use crate::lexer::Token;

/// A parsed translation unit
#[derive(Debug, Clone, PartialEq)]
pub struct RawUnit {
    pub items: Vec<Spanned<RawStmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawExpr {
    /// `IntLit`, `CharLit`, `StringLit`, `True` or `False`
    Literal(Token),
    Ident(String),
    Paren(Box<Spanned<RawExpr>>),
    Assign {
        target: Box<Spanned<RawExpr>>,
        value: Box<Spanned<RawExpr>>,
    },
    Binary {
        left: Box<Spanned<RawExpr>>,
        op: Token,
        right: Box<Spanned<RawExpr>>,
    },
    Prefix {
        op: Token,
        operand: Box<Spanned<RawExpr>>,
    },
    Postfix {
        op: Token,
        operand: Box<Spanned<RawExpr>>,
    },
    Call {
        callee: Box<Spanned<RawExpr>>,
        args: Vec<Spanned<RawExpr>>,
    },
    Member {
        instance: Box<Spanned<RawExpr>>,
        member: Spanned<String>,
    },
}

/// `int`, `Point&`, `void`
#[derive(Debug, Clone, PartialEq)]
pub struct RawType {
    pub name: Spanned<String>,
    pub ampersand: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub stmts: Vec<Spanned<RawStmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawStmt {
    Expr(Spanned<RawExpr>),
    /// Lone `;`
    Empty,
    VarDecl(RawVarDecl),
    FuncDecl(RawFuncDecl),
    ClassDecl(RawClassDecl),
    Block(RawBlock),
    If {
        cond: Spanned<RawExpr>,
        then_branch: Box<Spanned<RawStmt>>,
        else_branch: Option<Box<Spanned<RawStmt>>>,
    },
    While {
        cond: Spanned<RawExpr>,
        body: Box<Spanned<RawStmt>>,
    },
    DoWhile {
        body: Spanned<RawBlock>,
        cond: Spanned<RawExpr>,
    },
    For {
        init: Option<Box<Spanned<RawStmt>>>,
        cond: Option<Spanned<RawExpr>>,
        step: Option<Spanned<RawExpr>>,
        body: Box<Spanned<RawStmt>>,
    },
    Return(Option<Spanned<RawExpr>>),
    Break,
    Continue,
}

/// `(init; cond; step)` of a `for` loop, waiting for its body
#[derive(Debug, Clone, PartialEq)]
pub struct RawForHead {
    pub init: Option<Box<Spanned<RawStmt>>>,
    pub cond: Option<Spanned<RawExpr>>,
    pub step: Option<Spanned<RawExpr>>,
}

impl RawForHead {
    pub fn with_body(self, body: Spanned<RawStmt>) -> RawStmt {
        RawStmt::For {
            init: self.init,
            cond: self.cond,
            step: self.step,
            body: Box::new(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawVarDecl {
    pub ty: RawType,
    pub name: Spanned<String>,
    pub init: Option<Spanned<RawExpr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawParam {
    pub ty: RawType,
    pub name: Spanned<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawFuncDecl {
    pub return_type: RawType,
    pub name: Spanned<String>,
    pub params: Vec<RawParam>,
    pub body: Spanned<RawBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawClassDecl {
    /// `Class` or `Struct`
    pub keyword: Token,
    pub name: Spanned<String>,
    pub bases: Vec<RawBase>,
    pub members: Vec<Spanned<RawMember>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBase {
    /// `Public`, `Private` or `Protected` when written
    pub access: Option<Token>,
    pub name: Spanned<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawMember {
    /// `public:` and friends
    Access(Token),
    Field(RawVarDecl),
    Method(RawFuncDecl),
    Constructor {
        name: Spanned<String>,
        params: Vec<RawParam>,
        body: Spanned<RawBlock>,
    },
    Destructor {
        name: Spanned<String>,
        body: Spanned<RawBlock>,
    },
}
