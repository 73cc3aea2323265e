//! AST construction from the raw parse tree
//!
//! Pure translation. Operator tokens become the grouped operator enums,
//! literal text is decoded, `else if` chains are flattened and single
//! statements in loop/branch position are wrapped in blocks. Disallowed but
//! parseable forms (void variables, mismatched destructors) fail here.

use super::*;
use crate::error::{CompileError, Result};
use crate::lexer::Token;
use crate::parser::tree::*;
use crate::stack;

pub fn build_program(unit: RawUnit) -> Result<Program> {
    let items = unit
        .items
        .into_iter()
        .map(build_stmt)
        .collect::<Result<Vec<_>>>()?;
    Ok(Program { items })
}

/// A lone expression becomes [`ReplInput::Expr`] so its value can be echoed
pub fn build_repl_input(unit: RawUnit) -> Result<ReplInput> {
    let mut items = unit.items;
    if items.len() == 1 && matches!(items[0].node, RawStmt::Expr(_)) {
        if let Some(Spanned {
            node: RawStmt::Expr(expr),
            ..
        }) = items.pop()
        {
            return Ok(ReplInput::Expr(build_expr(expr)?));
        }
    }
    let stmts = items
        .into_iter()
        .map(build_stmt)
        .collect::<Result<Vec<_>>>()?;
    Ok(ReplInput::Statements(stmts))
}

fn build_stmt(stmt: Spanned<RawStmt>) -> Result<Spanned<Stmt>> {
    stack::guarded(|| build_stmt_inner(stmt))
}

fn build_stmt_inner(stmt: Spanned<RawStmt>) -> Result<Spanned<Stmt>> {
    let meta = stmt.meta;
    let node = match stmt.node {
        RawStmt::Expr(expr) => Stmt::Expr(build_expr(expr)?),
        RawStmt::Empty => Stmt::Block(Block::default()),
        RawStmt::VarDecl(decl) => Stmt::VarDef(build_var(decl)?),
        RawStmt::FuncDecl(decl) => Stmt::FuncDef(build_func(decl)?),
        RawStmt::ClassDecl(decl) => Stmt::ClassDef(build_class(decl, &meta)?),
        RawStmt::Block(block) => Stmt::Block(build_block(block)?),
        RawStmt::If {
            cond,
            then_branch,
            else_branch,
        } => Stmt::If(build_if(cond, *then_branch, else_branch)?),
        RawStmt::While { cond, body } => Stmt::While(WhileStmt {
            cond: build_expr(cond)?,
            body: inner_block(*body)?,
            do_while: false,
        }),
        RawStmt::DoWhile { body, cond } => Stmt::While(WhileStmt {
            cond: build_expr(cond)?,
            body: outer_block(body)?,
            do_while: true,
        }),
        RawStmt::For {
            init,
            cond,
            step,
            body,
        } => Stmt::For(ForStmt {
            init: init.map(|s| build_stmt(*s).map(Box::new)).transpose()?,
            cond: cond.map(build_expr).transpose()?,
            step: step.map(build_expr).transpose()?,
            body: inner_block(*body)?,
        }),
        RawStmt::Return(value) => Stmt::Return(value.map(build_expr).transpose()?),
        RawStmt::Break => Stmt::Break,
        RawStmt::Continue => Stmt::Continue,
    };
    Ok(Spanned::new(node, meta))
}

fn build_block(block: RawBlock) -> Result<Block> {
    let stmts = block
        .stmts
        .into_iter()
        .map(build_stmt)
        .collect::<Result<Vec<_>>>()?;
    Ok(Block { stmts })
}

fn outer_block(block: Spanned<RawBlock>) -> Result<Spanned<Block>> {
    Ok(Spanned::new(build_block(block.node)?, block.meta))
}

/// Body of a branch or loop; a single statement gets its own block
fn inner_block(stmt: Spanned<RawStmt>) -> Result<Spanned<Block>> {
    let meta = stmt.meta.clone();
    match build_stmt(stmt)? {
        Spanned {
            node: Stmt::Block(block),
            meta,
        } => Ok(Spanned::new(block, meta)),
        inner => Ok(Spanned::new(Block { stmts: vec![inner] }, meta)),
    }
}

fn build_if(
    cond: Spanned<RawExpr>,
    then_branch: Spanned<RawStmt>,
    else_branch: Option<Box<Spanned<RawStmt>>>,
) -> Result<IfStmt> {
    let mut branches = vec![(build_expr(cond)?, inner_block(then_branch)?)];
    let mut rest = else_branch;
    let mut else_block = None;

    while let Some(next) = rest.take() {
        match *next {
            Spanned {
                node:
                    RawStmt::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                ..
            } => {
                branches.push((build_expr(cond)?, inner_block(*then_branch)?));
                rest = else_branch;
            }
            other => else_block = Some(inner_block(other)?),
        }
    }

    Ok(IfStmt {
        branches,
        else_block,
    })
}

// ============================================================================
// Declarations
// ============================================================================

fn build_type(ty: RawType, allow_void: bool) -> Result<Spanned<TypeUsage>> {
    if !allow_void && ty.name.node == VOID {
        return Err(CompileError::semantic(
            "'void' can not be used here",
            &ty.name.meta,
        ));
    }
    let usage = TypeUsage {
        name: ty.name.node,
        is_reference: ty.ampersand,
    };
    Ok(Spanned::new(usage, ty.name.meta))
}

fn build_var(decl: RawVarDecl) -> Result<VarDef> {
    Ok(VarDef {
        ty: build_type(decl.ty, false)?,
        name: decl.name,
        init: decl.init.map(build_expr).transpose()?,
    })
}

fn build_params(params: Vec<RawParam>) -> Result<Vec<Param>> {
    params
        .into_iter()
        .map(|p| {
            Ok(Param {
                ty: build_type(p.ty, false)?,
                name: p.name,
            })
        })
        .collect()
}

fn build_func(decl: RawFuncDecl) -> Result<FuncDef> {
    Ok(FuncDef {
        name: decl.name,
        return_type: build_type(decl.return_type, true)?,
        params: build_params(decl.params)?,
        body: outer_block(decl.body)?,
    })
}

fn visibility_of(token: &Token) -> Option<Visibility> {
    match token {
        Token::Public => Some(Visibility::Public),
        Token::Private => Some(Visibility::Private),
        Token::Protected => Some(Visibility::Protected),
        _ => None,
    }
}

fn build_class(decl: RawClassDecl, meta: &SourceSymbol) -> Result<ClassDef> {
    // class members and bases default to private, struct ones to public
    let default = if decl.keyword == Token::Struct {
        Visibility::Public
    } else {
        Visibility::Private
    };
    let class_name = decl.name.node.clone();

    let bases = decl
        .bases
        .into_iter()
        .map(|base| BaseClass {
            visibility: base.access.as_ref().and_then(visibility_of).unwrap_or(default),
            name: base.name,
        })
        .collect();

    let mut def = ClassDef {
        name: decl.name,
        bases,
        fields: Vec::new(),
        methods: Vec::new(),
        constructors: Vec::new(),
        destructor: None,
    };
    let mut visibility = default;

    for member in decl.members {
        let member_meta = member.meta;
        match member.node {
            RawMember::Access(token) => {
                visibility = visibility_of(&token).unwrap_or(visibility);
            }
            RawMember::Field(field) => {
                if field.init.is_some() {
                    return Err(CompileError::semantic(
                        format!(
                            "Default member initializer for '{}' is not supported",
                            field.name.node
                        ),
                        &member_meta,
                    ));
                }
                def.fields.push(Member {
                    visibility,
                    decl: build_var(field)?,
                });
            }
            RawMember::Method(method) => def.methods.push(Member {
                visibility,
                decl: build_func(method)?,
            }),
            RawMember::Constructor { name, params, body } => {
                if name.node != class_name {
                    return Err(CompileError::semantic(
                        format!(
                            "Constructor '{}' does not match class '{class_name}'",
                            name.node
                        ),
                        &member_meta,
                    ));
                }
                def.constructors.push(Member {
                    visibility,
                    decl: special_member(name, params, body)?,
                });
            }
            RawMember::Destructor { name, body } => {
                if name.node != class_name {
                    return Err(CompileError::semantic(
                        format!(
                            "Destructor '~{}' does not match class '{class_name}'",
                            name.node
                        ),
                        &member_meta,
                    ));
                }
                if def.destructor.is_some() {
                    return Err(CompileError::semantic(
                        format!("Class '{class_name}' declares more than one destructor"),
                        &member_meta,
                    ));
                }
                def.destructor = Some(Member {
                    visibility,
                    decl: special_member(name, Vec::new(), body)?,
                });
            }
        }
    }

    tracing::trace!(class = %class_name, at = %meta, "built class declaration");
    Ok(def)
}

/// Constructors and destructors are void functions named after the class
fn special_member(
    name: Spanned<String>,
    params: Vec<RawParam>,
    body: Spanned<RawBlock>,
) -> Result<FuncDef> {
    let return_type = Spanned::new(TypeUsage::value(VOID), name.meta.clone());
    Ok(FuncDef {
        name,
        return_type,
        params: build_params(params)?,
        body: outer_block(body)?,
    })
}

// ============================================================================
// Expressions
// ============================================================================

fn build_expr(expr: Spanned<RawExpr>) -> Result<Spanned<Expr>> {
    stack::guarded(|| build_expr_inner(expr))
}

fn build_expr_inner(expr: Spanned<RawExpr>) -> Result<Spanned<Expr>> {
    let meta = expr.meta;
    let node = match expr.node {
        RawExpr::Literal(token) => Expr::Literal(decode_literal(&token, &meta)?),
        RawExpr::Ident(name) => Expr::Atom(name),
        RawExpr::Paren(inner) => return build_expr(*inner),
        RawExpr::Assign { target, value } => Expr::Assign {
            target: Box::new(build_expr(*target)?),
            value: Box::new(build_expr(*value)?),
        },
        RawExpr::Binary { left, op, right } => Expr::Binary {
            op: binary_op(&op, &meta)?,
            left: Box::new(build_expr(*left)?),
            right: Box::new(build_expr(*right)?),
        },
        RawExpr::Prefix { op, operand } => Expr::Unary {
            op: unary_op(&op, &meta)?,
            expr: Box::new(build_expr(*operand)?),
        },
        RawExpr::Postfix { op, operand } => Expr::Suffix {
            op: match op {
                Token::PlusPlus => SuffixOp::Increment,
                Token::MinusMinus => SuffixOp::Decrement,
                other => return Err(unknown_operator(&other, &meta)),
            },
            expr: Box::new(build_expr(*operand)?),
        },
        RawExpr::Call { callee, args } => Expr::Call {
            callee: Box::new(build_expr(*callee)?),
            args: args.into_iter().map(build_expr).collect::<Result<_>>()?,
        },
        RawExpr::Member { instance, member } => Expr::Member {
            instance: Box::new(build_expr(*instance)?),
            member,
        },
    };
    Ok(Spanned::new(node, meta))
}

fn unknown_operator(token: &Token, meta: &SourceSymbol) -> CompileError {
    CompileError::semantic(format!("Unknown operator '{token}'"), meta)
}

fn binary_op(token: &Token, meta: &SourceSymbol) -> Result<BinOp> {
    let op = match token {
        Token::EqEq => BinOp::Equality(EqualityOp::Eq),
        Token::NotEq => BinOp::Equality(EqualityOp::Ne),
        Token::Lt => BinOp::Ordering(OrderingOp::Lt),
        Token::LtEq => BinOp::Ordering(OrderingOp::Le),
        Token::Gt => BinOp::Ordering(OrderingOp::Gt),
        Token::GtEq => BinOp::Ordering(OrderingOp::Ge),
        Token::Amp => BinOp::Bitwise(BitwiseOp::And),
        Token::Pipe => BinOp::Bitwise(BitwiseOp::Or),
        Token::Caret => BinOp::Bitwise(BitwiseOp::Xor),
        Token::AmpAmp => BinOp::Boolean(BoolOp::And),
        Token::PipePipe => BinOp::Boolean(BoolOp::Or),
        Token::Plus => BinOp::Arithmetic(ArithOp::Add),
        Token::Minus => BinOp::Arithmetic(ArithOp::Sub),
        Token::Star => BinOp::Arithmetic(ArithOp::Mul),
        Token::Slash => BinOp::Arithmetic(ArithOp::Div),
        Token::Percent => BinOp::Arithmetic(ArithOp::Rem),
        other => return Err(unknown_operator(other, meta)),
    };
    Ok(op)
}

fn unary_op(token: &Token, meta: &SourceSymbol) -> Result<UnaryOp> {
    let op = match token {
        Token::Bang => UnaryOp::Not,
        Token::Tilde => UnaryOp::BitNot,
        Token::PlusPlus => UnaryOp::Increment,
        Token::MinusMinus => UnaryOp::Decrement,
        Token::Plus => UnaryOp::Plus,
        Token::Minus => UnaryOp::Minus,
        other => return Err(unknown_operator(other, meta)),
    };
    Ok(op)
}

// ============================================================================
// Literals
// ============================================================================

fn decode_literal(token: &Token, meta: &SourceSymbol) -> Result<Literal> {
    match token {
        Token::True => Ok(Literal::Bool(true)),
        Token::False => Ok(Literal::Bool(false)),
        Token::IntLit(text) => decode_int(text, meta),
        Token::CharLit(text) => {
            let bytes = unescape(strip_quotes(text), meta)?;
            match bytes.as_slice() {
                [byte] => Ok(Literal::Char(*byte)),
                _ => Err(CompileError::semantic(
                    format!("Character literal {text} must be a single byte"),
                    meta,
                )),
            }
        }
        Token::StringLit(text) => {
            let bytes = unescape(strip_quotes(text), meta)?;
            Ok(Literal::Str(String::from_utf8_lossy(&bytes).into_owned()))
        }
        other => Err(CompileError::semantic(
            format!("'{other}' is not a literal"),
            meta,
        )),
    }
}

fn decode_int(text: &str, meta: &SourceSymbol) -> Result<Literal> {
    let (digits, long) = match text.strip_suffix(['l', 'L']) {
        Some(digits) => (digits, true),
        None => (text, false),
    };
    let (digits, radix) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(bin) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        (bin, 2)
    } else {
        (digits, 10)
    };

    let out_of_range =
        || CompileError::semantic(format!("Integer literal '{text}' is out of range"), meta);
    if long {
        i64::from_str_radix(digits, radix)
            .map(Literal::Long)
            .map_err(|_| out_of_range())
    } else {
        i32::from_str_radix(digits, radix)
            .map(Literal::Int)
            .map_err(|_| out_of_range())
    }
}

fn strip_quotes(text: &str) -> &str {
    text.get(1..text.len().saturating_sub(1)).unwrap_or("")
}

fn unescape(body: &str, meta: &SourceSymbol) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let byte = match chars.next() {
            Some('n') => b'\n',
            Some('t') => b'\t',
            Some('r') => b'\r',
            Some('0') => b'\0',
            Some('\\') => b'\\',
            Some('\'') => b'\'',
            Some('"') => b'"',
            Some(other) => {
                return Err(CompileError::semantic(
                    format!("Unknown escape sequence '\\{other}'"),
                    meta,
                ));
            }
            None => {
                return Err(CompileError::semantic("Unterminated escape sequence", meta));
            }
        };
        out.push(byte);
    }
    Ok(out)
}
