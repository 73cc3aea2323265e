//! Lexer implementation using logos

mod token;

pub use token::Token;

use crate::ast::Span;
use crate::error::{CompileError, Result};
use logos::Logos;

/// Tokenize source code
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) if lexer.slice().starts_with("/*") => {
                return Err(CompileError::lexer("unterminated block comment", span));
            }
            Err(_) => {
                return Err(CompileError::lexer(
                    format!("unexpected character: {:?}", lexer.slice()),
                    span,
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_keywords() {
        assert_eq!(
            kinds("if else while do for return break continue"),
            vec![
                Token::If,
                Token::Else,
                Token::While,
                Token::Do,
                Token::For,
                Token::Return,
                Token::Break,
                Token::Continue
            ]
        );
    }

    #[test]
    fn test_tokenize_builtin_types() {
        assert_eq!(
            kinds("void int long bool char string"),
            vec![
                Token::TyVoid,
                Token::TyInt,
                Token::TyLong,
                Token::TyBool,
                Token::TyChar,
                Token::TyString
            ]
        );
    }

    #[test]
    fn test_tokenize_integer_literals_keep_text() {
        assert_eq!(
            kinds("123 0x1A 0b1010 7L"),
            vec![
                Token::IntLit("123".into()),
                Token::IntLit("0x1A".into()),
                Token::IntLit("0b1010".into()),
                Token::IntLit("7L".into())
            ]
        );
    }

    #[test]
    fn test_tokenize_char_and_string_literals() {
        assert_eq!(
            kinds(r#"'a' '\n' "hi \"there\"""#),
            vec![
                Token::CharLit("'a'".into()),
                Token::CharLit(r"'\n'".into()),
                Token::StringLit(r#""hi \"there\"""#.into())
            ]
        );
    }

    #[test]
    fn test_tokenize_identifier_not_keyword() {
        assert_eq!(kinds("integer"), vec![Token::Ident("integer".into())]);
        assert_eq!(kinds("int"), vec![Token::TyInt]);
    }

    #[test]
    fn test_tokenize_compound_operators() {
        assert_eq!(
            kinds("++ -- == != <= >= && || & | ^ ~ !"),
            vec![
                Token::PlusPlus,
                Token::MinusMinus,
                Token::EqEq,
                Token::NotEq,
                Token::LtEq,
                Token::GtEq,
                Token::AmpAmp,
                Token::PipePipe,
                Token::Amp,
                Token::Pipe,
                Token::Caret,
                Token::Tilde,
                Token::Bang
            ]
        );
    }

    #[test]
    fn test_tokenize_skips_comments_and_directives() {
        let source = "#include \"runtime.h\"\n// line\nint /* block ** comment */ x;";
        assert_eq!(
            kinds(source),
            vec![Token::TyInt, Token::Ident("x".into()), Token::Semi]
        );
    }

    #[test]
    fn test_tokenize_block_comment_forms() {
        let expected = vec![Token::TyInt];
        assert_eq!(kinds("/* a */ int"), expected);
        assert_eq!(kinds("/* a * b */ int"), expected);
        assert_eq!(kinds("/** doc */ int"), expected);
        assert_eq!(kinds("/* x **/ int"), expected);
        assert_eq!(kinds("/**/int"), expected);
        assert_eq!(kinds("/* one\n two */ int /* three */"), expected);
        assert_eq!(
            kinds("1 / 2"),
            vec![
                Token::IntLit("1".into()),
                Token::Slash,
                Token::IntLit("2".into())
            ]
        );
    }

    #[test]
    fn test_tokenize_unterminated_block_comment() {
        let err = tokenize("int x; /* never closed").unwrap_err();
        assert!(matches!(err, CompileError::Lexer { .. }));
        assert!(err.message().contains("unterminated block comment"), "{err}");
        assert_eq!(err.span(), Some(Span::new(7, 22)));
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("int x").unwrap();
        assert_eq!(tokens[0].1, Span::new(0, 3));
        assert_eq!(tokens[1].1, Span::new(4, 5));
    }

    #[test]
    fn test_tokenize_invalid_character() {
        let err = tokenize("int x = $;").unwrap_err();
        assert!(matches!(err, CompileError::Lexer { .. }));
        assert_eq!(err.span(), Some(Span::new(8, 9)));
    }
}
