//! Expression AST nodes

use super::Spanned;
use serde::{Deserialize, Serialize};

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),

    /// Identifier reference
    Atom(String),

    /// `target = value`
    Assign {
        target: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },

    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Prefix operator
    Unary {
        op: UnaryOp,
        expr: Box<Spanned<Expr>>,
    },

    /// Postfix `++`/`--`
    Suffix {
        op: SuffixOp,
        expr: Box<Spanned<Expr>>,
    },

    /// `instance.member`
    Member {
        instance: Box<Spanned<Expr>>,
        member: Spanned<String>,
    },

    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
}

/// Literal value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Char(u8),
    Str(String),
    Bool(bool),
}

/// Binary operator, grouped by category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Equality(EqualityOp),
    Ordering(OrderingOp),
    Bitwise(BitwiseOp),
    Boolean(BoolOp),
    Arithmetic(ArithOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EqualityOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingOp {
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Equality(EqualityOp::Eq) => "==",
            BinOp::Equality(EqualityOp::Ne) => "!=",
            BinOp::Ordering(OrderingOp::Lt) => "<",
            BinOp::Ordering(OrderingOp::Le) => "<=",
            BinOp::Ordering(OrderingOp::Gt) => ">",
            BinOp::Ordering(OrderingOp::Ge) => ">=",
            BinOp::Bitwise(BitwiseOp::And) => "&",
            BinOp::Bitwise(BitwiseOp::Or) => "|",
            BinOp::Bitwise(BitwiseOp::Xor) => "^",
            BinOp::Boolean(BoolOp::And) => "&&",
            BinOp::Boolean(BoolOp::Or) => "||",
            BinOp::Arithmetic(ArithOp::Add) => "+",
            BinOp::Arithmetic(ArithOp::Sub) => "-",
            BinOp::Arithmetic(ArithOp::Mul) => "*",
            BinOp::Arithmetic(ArithOp::Div) => "/",
            BinOp::Arithmetic(ArithOp::Rem) => "%",
        }
    }

    /// Name of the member function implementing this operator
    pub fn function_name(&self) -> String {
        operator_name(self.symbol())
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Prefix operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `++x`
    Increment,
    /// `--x`
    Decrement,
    /// `+x`
    Plus,
    /// `-x`
    Minus,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Increment => "++",
            UnaryOp::Decrement => "--",
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
        }
    }

    pub fn function_name(&self) -> String {
        operator_name(self.symbol())
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Postfix operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuffixOp {
    Increment,
    Decrement,
}

impl SuffixOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            SuffixOp::Increment => "++",
            SuffixOp::Decrement => "--",
        }
    }

    pub fn function_name(&self) -> String {
        operator_name(self.symbol())
    }
}

impl std::fmt::Display for SuffixOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// `operator+`, `operator==`, ...
pub fn operator_name(symbol: &str) -> String {
    format!("operator{symbol}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binop_function_names() {
        assert_eq!(BinOp::Arithmetic(ArithOp::Add).function_name(), "operator+");
        assert_eq!(BinOp::Equality(EqualityOp::Ne).function_name(), "operator!=");
        assert_eq!(BinOp::Ordering(OrderingOp::Ge).function_name(), "operator>=");
        assert_eq!(BinOp::Boolean(BoolOp::And).function_name(), "operator&&");
    }

    #[test]
    fn test_unary_and_suffix_share_operator_names() {
        assert_eq!(UnaryOp::Increment.function_name(), SuffixOp::Increment.function_name());
        assert_eq!(UnaryOp::Minus.function_name(), "operator-");
    }

    #[test]
    fn test_display_symbols() {
        assert_eq!(format!("{}", BinOp::Bitwise(BitwiseOp::Xor)), "^");
        assert_eq!(format!("{}", UnaryOp::BitNot), "~");
        assert_eq!(format!("{}", SuffixOp::Decrement), "--");
    }
}
