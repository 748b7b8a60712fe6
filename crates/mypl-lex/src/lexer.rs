use mypl_util::Position;

use crate::error::{LexError, LexResult};
use crate::token::{Token, TokenKind};

/// Converts a MyPL source string into a token stream.
///
/// Line/column tracking is 1-based; the column reported on a token is the
/// column of its *last* character, matching how the reference lexer backs
/// the position out after consuming a multi-character lexeme.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer { chars: source.chars().collect(), pos: 0, line: 1, column: 0 }
    }

    /// Lexes the entire source, returning every token including the
    /// trailing `EOS`.
    pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let done = tok.kind == TokenKind::Eos;
            tokens.push(tok);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        self.column += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError { message: message.into(), pos: Position::new(self.line, self.column.max(1)) }
    }

    fn make(&self, kind: TokenKind, lexeme: String) -> Token {
        Token::new(kind, lexeme, self.line, self.column.max(1))
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> LexResult<Token> {
        self.skip_trivia();
        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::Eos, "", self.line, self.column + 1));
        };
        match c {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ';' => self.single(TokenKind::Semicolon),
            '.' => self.single(TokenKind::Dot),
            ',' => self.single(TokenKind::Comma),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '=' => self.maybe_two(TokenKind::Assign, '=', TokenKind::Equal),
            '<' => self.maybe_two(TokenKind::Less, '=', TokenKind::LessEq),
            '>' => self.maybe_two(TokenKind::Greater, '=', TokenKind::GreaterEq),
            '!' => self.bang(),
            '"' => self.string_literal(),
            '\'' => self.char_literal(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() => self.identifier_or_keyword(),
            other => {
                self.advance();
                Err(self.error(format!("unexpected character '{other}'")))
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> LexResult<Token> {
        let c = self.advance().unwrap();
        Ok(self.make(kind, c.to_string()))
    }

    fn maybe_two(&mut self, single_kind: TokenKind, second: char, double_kind: TokenKind) -> LexResult<Token> {
        let first = self.advance().unwrap();
        if self.peek() == Some(second) {
            self.advance();
            Ok(self.make(double_kind, format!("{first}{second}")))
        } else {
            Ok(self.make(single_kind, first.to_string()))
        }
    }

    fn bang(&mut self) -> LexResult<Token> {
        self.advance();
        if self.peek() == Some('=') {
            self.advance();
            Ok(self.make(TokenKind::NotEqual, "!=".to_string()))
        } else {
            let found = match self.peek() {
                Some(c) => {
                    self.advance();
                    format!("!{c}")
                }
                None => "!".to_string(),
            };
            Err(self.error(format!("expecting '!=' found '{found}'")))
        }
    }

    fn number(&mut self) -> LexResult<Token> {
        let mut lexeme = String::new();
        let first = self.advance().unwrap();
        lexeme.push(first);
        if first == '0' {
            if let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    return Err(self.error("leading zero in number"));
                }
            }
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                lexeme.push(self.advance().unwrap());
            } else {
                break;
            }
        }
        let mut is_double = false;
        if self.peek() == Some('.') {
            is_double = true;
            lexeme.push(self.advance().unwrap());
            match self.peek() {
                Some(c) if c.is_ascii_digit() => {}
                _ => return Err(self.error(format!("missing digit in {lexeme}"))),
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    lexeme.push(self.advance().unwrap());
                } else {
                    break;
                }
            }
        }
        let kind = if is_double { TokenKind::DoubleVal } else { TokenKind::IntVal };
        Ok(self.make(kind, lexeme))
    }

    fn identifier_or_keyword(&mut self) -> LexResult<Token> {
        let mut lexeme = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                lexeme.push(self.advance().unwrap());
            } else {
                break;
            }
        }
        let kind = match lexeme.as_str() {
            "struct" => TokenKind::Struct,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "array" => TokenKind::Array,
            "if" => TokenKind::If,
            "elseif" => TokenKind::Elseif,
            "else" => TokenKind::Else,
            "new" => TokenKind::New,
            "return" => TokenKind::Return,
            "void" => TokenKind::Void,
            "int" => TokenKind::IntType,
            "double" => TokenKind::DoubleType,
            "bool" => TokenKind::BoolType,
            "char" => TokenKind::CharType,
            "string" => TokenKind::StringType,
            "true" | "false" => TokenKind::BoolVal,
            "null" => TokenKind::NullVal,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            _ => TokenKind::Id,
        };
        Ok(self.make(kind, lexeme))
    }

    fn string_literal(&mut self) -> LexResult<Token> {
        self.advance();
        let mut s = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.error("non-terminated string")),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
        Ok(self.make(TokenKind::StringVal, s))
    }

    fn char_literal(&mut self) -> LexResult<Token> {
        self.advance();
        let mut s = String::new();
        match self.peek() {
            Some('\'') => {
                self.advance();
                return Err(self.error("empty char"));
            }
            None | Some('\n') => return Err(self.error("non-terminated char")),
            Some('\\') => {
                self.advance();
                match self.peek() {
                    Some(e @ ('n' | 't')) => {
                        s.push('\\');
                        s.push(e);
                        self.advance();
                    }
                    Some(other) => {
                        s.push('\\');
                        s.push(other);
                        self.advance();
                    }
                    None => return Err(self.error("non-terminated char")),
                }
            }
            Some(c) => {
                s.push(c);
                self.advance();
            }
        }
        match self.peek() {
            Some('\'') => {
                self.advance();
                Ok(self.make(TokenKind::CharVal, s))
            }
            Some(_) => Err(self.error("multi-character char")),
            None => Err(self.error("non-terminated char")),
        }
    }
}
