//! Token definitions

use logos::Logos;

/// Token of the supported C++ subset
///
/// Literal tokens keep their raw source text; decoding happens during AST
/// construction so that malformed literals are reported with node metadata.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    // Keywords
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("for")]
    For,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("class")]
    Class,
    #[token("struct")]
    Struct,
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Built-in type names
    #[token("void")]
    TyVoid,
    #[token("int")]
    TyInt,
    #[token("long")]
    TyLong,
    #[token("bool")]
    TyBool,
    #[token("char")]
    TyChar,
    #[token("string")]
    TyString,

    // Literals
    /// Decimal, hex (`0x`) or binary (`0b`) integer, optional `L` suffix
    #[regex(r"(0[xX][0-9a-fA-F]+|0[bB][01]+|[0-9]+)[lL]?", |lex| lex.slice().to_string())]
    IntLit(String),
    #[regex(r"'([^'\\\n]|\\.)'", |lex| lex.slice().to_string())]
    CharLit(String),
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice().to_string())]
    StringLit(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    /// Identifier in type position, assigned by the parser before grammar matching
    TypeName(String),

    /// Skipped; only surfaces as an error when unterminated
    #[token("/*", block_comment)]
    BlockComment,

    // Operators
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("=")]
    Eq,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
}

/// Skip to the closing `*/`, or fail at end of input
fn block_comment(lex: &mut logos::Lexer<'_, Token>) -> Result<logos::Skip, ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            Ok(logos::Skip)
        }
        None => {
            lex.bump(lex.remainder().len());
            Err(())
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::Do => write!(f, "do"),
            Token::For => write!(f, "for"),
            Token::Return => write!(f, "return"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Class => write!(f, "class"),
            Token::Struct => write!(f, "struct"),
            Token::Public => write!(f, "public"),
            Token::Private => write!(f, "private"),
            Token::Protected => write!(f, "protected"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::TyVoid => write!(f, "void"),
            Token::TyInt => write!(f, "int"),
            Token::TyLong => write!(f, "long"),
            Token::TyBool => write!(f, "bool"),
            Token::TyChar => write!(f, "char"),
            Token::TyString => write!(f, "string"),
            Token::IntLit(text)
            | Token::CharLit(text)
            | Token::StringLit(text)
            | Token::Ident(text)
            | Token::TypeName(text) => write!(f, "{text}"),
            Token::BlockComment => write!(f, "/*"),
            Token::PlusPlus => write!(f, "++"),
            Token::MinusMinus => write!(f, "--"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::AmpAmp => write!(f, "&&"),
            Token::PipePipe => write!(f, "||"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Caret => write!(f, "^"),
            Token::Bang => write!(f, "!"),
            Token::Tilde => write!(f, "~"),
            Token::Eq => write!(f, "="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Semi => write!(f, ";"),
            Token::Colon => write!(f, ":"),
            Token::Dot => write!(f, "."),
        }
    }
}
