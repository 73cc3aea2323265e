//! Parser implementation using lalrpop

pub mod tree;


use crate::ast::{LineIndex, Span};
use crate::error::{CompileError, Result};
use crate::lexer::Token;
use lalrpop_util::ParseError;
use tree::RawUnit;

lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all)]
    grammar
);

/// Parse a translation unit: only declarations at the top level
pub fn parse(source: &str, tokens: Vec<(Token, Span)>) -> Result<RawUnit> {
    let lines = LineIndex::new(source);
    grammar::UnitParser::new()
        .parse(&lines, triples(tokens))
        .map_err(|e| parse_error(e, source))
}

/// Parse interactive input: any statement, and a final expression may omit its `;`
pub fn parse_repl(source: &str, tokens: Vec<(Token, Span)>) -> Result<RawUnit> {
    let lines = LineIndex::new(source);
    grammar::ReplUnitParser::new()
        .parse(&lines, triples(tokens))
        .map_err(|e| parse_error(e, source))
}

/// Whether a parse failure was caused by input ending too early
pub fn is_incomplete(error: &CompileError, source: &str) -> bool {
    match error {
        CompileError::Parser { span, .. } => span.start >= source.len(),
        _ => false,
    }
}

fn triples(tokens: Vec<(Token, Span)>) -> impl Iterator<Item = (usize, Token, usize)> {
    mark_type_names(tokens)
        .into_iter()
        .map(|(tok, span)| (span.start, tok, span.end))
}

/// Retag identifiers that open a declaration as [`Token::TypeName`]
///
/// At a statement or parameter start, `Point p` and `Point& r =` / `Point& r;`
/// declare; everything else starting with an identifier is an expression.
fn mark_type_names(mut tokens: Vec<(Token, Span)>) -> Vec<(Token, Span)> {
    for i in 0..tokens.len() {
        let at_start = i == 0 || opens_statement(&tokens[i - 1].0);
        if at_start && declares(&tokens[i..]) {
            if let Token::Ident(name) = &mut tokens[i].0 {
                let name = std::mem::take(name);
                tokens[i].0 = Token::TypeName(name);
            }
        }
    }
    tokens
}

fn opens_statement(prev: &Token) -> bool {
    matches!(
        prev,
        Token::Semi
            | Token::LBrace
            | Token::RBrace
            | Token::LParen
            | Token::RParen
            | Token::Comma
            | Token::Colon
            | Token::Else
    )
}

fn declares(rest: &[(Token, Span)]) -> bool {
    let kind = |n: usize| rest.get(n).map(|(t, _)| t);
    match (kind(0), kind(1), kind(2), kind(3)) {
        (Some(Token::Ident(_)), Some(Token::Ident(_)), _, _) => true,
        (Some(Token::Ident(_)), Some(Token::Amp), Some(Token::Ident(_)), next) => {
            matches!(next, Some(Token::Eq | Token::Semi))
        }
        _ => false,
    }
}

fn parse_error(error: ParseError<usize, Token, &'static str>, source: &str) -> CompileError {
    match error {
        ParseError::InvalidToken { location } => {
            CompileError::parser("invalid token", Span::new(location, location + 1))
        }
        ParseError::UnrecognizedEof { expected, .. } => CompileError::parser(
            format!("unexpected end of input, expected {}", one_of(&expected)),
            Span::new(source.len(), source.len()),
        ),
        ParseError::UnrecognizedToken {
            token: (start, token, end),
            expected,
        } => CompileError::parser(
            format!("expected {}, found '{token}'", one_of(&expected)),
            Span::new(start, end),
        ),
        ParseError::ExtraToken {
            token: (start, token, end),
        } => CompileError::parser(format!("unexpected '{token}'"), Span::new(start, end)),
        ParseError::User { error } => CompileError::parser(error, Span::new(0, 0)),
    }
}

/// `"a"`, `"a" or "b"`, `one of "a", "b", "c"`
fn one_of(expected: &[String]) -> String {
    match expected {
        [] => "more input".to_string(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        _ => format!("one of {}", expected.join(", ")),
    }
}
