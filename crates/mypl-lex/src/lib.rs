//! Character stream to token stream: the first stage of the MyPL pipeline.

mod error;
mod lexer;
mod token;

pub use error::{LexError, LexResult};
pub use lexer::Lexer;
pub use token::{Token, TokenKind};

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_punctuation_and_operators() {
        assert_eq!(
            kinds("(){}[];.,"),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Semicolon,
                TokenKind::Dot,
                TokenKind::Comma,
                TokenKind::Eos,
            ]
        );
        assert_eq!(
            kinds("== != <= >= < >"),
            vec![
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::LessEq,
                TokenKind::GreaterEq,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Eos,
            ]
        );
    }

    #[test]
    fn bare_bang_is_an_error() {
        let err = Lexer::tokenize("!x").unwrap_err();
        assert_eq!(err.message, "expecting '!=' found '!x'");
    }

    #[test]
    fn bang_equal_is_not_equal() {
        assert_eq!(kinds("!="), vec![TokenKind::NotEqual, TokenKind::Eos]);
    }

    #[test]
    fn zero_alone_is_int() {
        assert_eq!(kinds("0"), vec![TokenKind::IntVal, TokenKind::Eos]);
    }

    #[test]
    fn leading_zero_is_an_error() {
        let err = Lexer::tokenize("01").unwrap_err();
        assert_eq!(err.message, "leading zero in number");
    }

    #[test]
    fn doubles_require_a_trailing_digit() {
        let err = Lexer::tokenize("1.").unwrap_err();
        assert_eq!(err.message, "missing digit in 1.");
        assert_eq!(kinds("1.5"), vec![TokenKind::DoubleVal, TokenKind::Eos]);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("struct array if elseif else new return void foo"),
            vec![
                TokenKind::Struct,
                TokenKind::Array,
                TokenKind::If,
                TokenKind::Elseif,
                TokenKind::Else,
                TokenKind::New,
                TokenKind::Return,
                TokenKind::Void,
                TokenKind::Id,
                TokenKind::Eos,
            ]
        );
        assert_eq!(kinds("true false null"), vec![TokenKind::BoolVal, TokenKind::BoolVal, TokenKind::NullVal, TokenKind::Eos]);
    }

    #[test]
    fn strings_and_chars() {
        let toks = Lexer::tokenize("\"hi\" 'a' '\\n'").unwrap();
        assert_eq!(toks[0].lexeme, "hi");
        assert_eq!(toks[1].lexeme, "a");
        assert_eq!(toks[2].lexeme, "\\n");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::tokenize("\"hi").unwrap_err();
        assert_eq!(err.message, "non-terminated string");
    }

    #[test]
    fn empty_char_is_an_error() {
        let err = Lexer::tokenize("''").unwrap_err();
        assert_eq!(err.message, "empty char");
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        assert_eq!(kinds("  # a comment\n  42"), vec![TokenKind::IntVal, TokenKind::Eos]);
    }

    #[test]
    fn column_tracks_last_character_of_a_token() {
        let toks = Lexer::tokenize("foo").unwrap();
        assert_eq!(toks[0].pos.line, 1);
        assert_eq!(toks[0].pos.column, 3);
    }
}
