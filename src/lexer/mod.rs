// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hand-rolled lexer for PanSQL scripts (`spec.md` §4.1).
//!
//! Scripts interleave DSL statements (`load`, `table`, `open`, `map`,
//! `sync`...) with an embedded SQL subset, so an off-the-shelf SQL-dialect
//! tokenizer cannot cover the grammar; this lexer is grounded in the
//! hand-rolled token/position shape of `quarylabs-sqruff`'s `parser-core`
//! lexer rather than any single-dialect SQL crate.

pub mod token;

use crate::error::LexError;
use crate::span::Pos;
pub use token::{Keyword, Token, TokenKind};

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
    pos: Pos,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            chars: src.char_indices().peekable(),
            src,
            pos: Pos::start(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.pos.line += 1;
            self.pos.col = 1;
        } else {
            self.pos.col += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_at(&self, idx: usize) -> Option<char> {
        self.src[idx..].chars().next()
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('-') => {
                    let (idx, _) = *self.chars.peek().unwrap();
                    if self.peek_at(idx + 1) == Some('-') {
                        self.bump();
                        self.bump();
                        while !matches!(self.peek(), None | Some('\n')) {
                            self.bump();
                        }
                    } else {
                        break;
                    }
                }
                Some('/') => {
                    let (idx, _) = *self.chars.peek().unwrap();
                    if self.peek_at(idx + 1) == Some('*') {
                        let start = self.pos;
                        self.bump();
                        self.bump();
                        let mut closed = false;
                        while let Some(c) = self.peek() {
                            if c == '*' {
                                let (idx, _) = *self.chars.peek().unwrap();
                                if self.peek_at(idx + 1) == Some('/') {
                                    self.bump();
                                    self.bump();
                                    closed = true;
                                    break;
                                }
                            }
                            self.bump();
                        }
                        if !closed {
                            return Err(LexError::new(start, "unterminated block comment"));
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                pos: start,
            });
        };

        if c.is_ascii_digit() {
            return self.lex_number(start);
        }
        if c == '\'' {
            return self.lex_string(start);
        }
        if c.is_alphabetic() || c == '_' {
            return self.lex_identifier(start);
        }

        let (sym, len): (&'static str, usize) = match c {
            '<' => {
                let (idx, _) = *self.chars.peek().unwrap();
                match self.peek_at(idx + 1) {
                    Some('=') => ("<=", 2),
                    Some('>') => ("<>", 2),
                    _ => ("<", 1),
                }
            }
            '>' => {
                let (idx, _) = *self.chars.peek().unwrap();
                if self.peek_at(idx + 1) == Some('=') {
                    (">=", 2)
                } else {
                    (">", 1)
                }
            }
            '=' => ("=", 1),
            '+' => ("+", 1),
            '-' => ("-", 1),
            '*' => ("*", 1),
            '/' => ("/", 1),
            '.' => (".", 1),
            ',' => (",", 1),
            ';' => (";", 1),
            '(' => {
                self.bump();
                return Ok(Token {
                    kind: TokenKind::LParen,
                    lexeme: "(".to_string(),
                    pos: start,
                });
            }
            ')' => {
                self.bump();
                return Ok(Token {
                    kind: TokenKind::RParen,
                    lexeme: ")".to_string(),
                    pos: start,
                });
            }
            other => {
                return Err(LexError::new(
                    start,
                    format!("unexpected character '{other}'"),
                ))
            }
        };
        for _ in 0..len {
            self.bump();
        }
        Ok(Token {
            kind: TokenKind::Symbol(sym),
            lexeme: sym.to_string(),
            pos: start,
        })
    }

    fn lex_number(&mut self, start: Pos) -> Result<Token, LexError> {
        let mut lexeme = String::new();
        let mut is_decimal = false;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            lexeme.push(self.bump().unwrap());
        }
        if self.peek() == Some('.') {
            let (idx, _) = *self.chars.peek().unwrap();
            if matches!(self.peek_at(idx + 1), Some(c) if c.is_ascii_digit()) {
                is_decimal = true;
                lexeme.push(self.bump().unwrap());
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    lexeme.push(self.bump().unwrap());
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let (idx, _) = *self.chars.peek().unwrap();
            let next = self.peek_at(idx + 1);
            let exp_start = match next {
                Some('+') | Some('-') => self.peek_at(idx + 2),
                other => other,
            };
            if matches!(exp_start, Some(c) if c.is_ascii_digit()) {
                is_decimal = true;
                lexeme.push(self.bump().unwrap());
                if matches!(self.peek(), Some('+') | Some('-')) {
                    lexeme.push(self.bump().unwrap());
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    lexeme.push(self.bump().unwrap());
                }
            }
        }
        if is_decimal {
            let value: f64 = lexeme
                .parse()
                .map_err(|_| LexError::new(start, format!("malformed decimal literal '{lexeme}'")))?;
            Ok(Token {
                kind: TokenKind::DecimalLiteral(value),
                lexeme,
                pos: start,
            })
        } else {
            let value: i64 = lexeme
                .parse()
                .map_err(|_| LexError::new(start, format!("malformed integer literal '{lexeme}'")))?;
            Ok(Token {
                kind: TokenKind::IntegerLiteral(value),
                lexeme,
                pos: start,
            })
        }
    }

    fn lex_string(&mut self, start: Pos) -> Result<Token, LexError> {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::new(start, "unterminated string literal")),
                Some('\'') => {
                    let (idx, _) = *self.chars.peek().unwrap();
                    if self.peek_at(idx + 1) == Some('\'') {
                        self.bump();
                        self.bump();
                        value.push('\'');
                    } else {
                        self.bump();
                        break;
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        Ok(Token {
            kind: TokenKind::StringLiteral(value.clone()),
            lexeme: format!("'{value}'"),
            pos: start,
        })
    }

    fn lex_identifier(&mut self, start: Pos) -> Result<Token, LexError> {
        let mut lexeme = String::new();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            lexeme.push(self.bump().unwrap());
        }
        // Qualified identifiers (`a.b`) are lexed as separate `Identifier`
        // tokens joined by a `.` symbol token; the parser re-joins them.
        if let Some(kw) = Keyword::from_str(&lexeme) {
            Ok(Token {
                kind: TokenKind::Keyword(kw),
                lexeme,
                pos: start,
            })
        } else {
            Ok(Token {
                kind: TokenKind::Identifier(lexeme.clone()),
                lexeme,
                pos: start,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_keywords_case_insensitively() {
        let ks = kinds("LOAD load Load");
        assert_eq!(
            ks,
            vec![
                TokenKind::Keyword(Keyword::Load),
                TokenKind::Keyword(Keyword::Load),
                TokenKind::Keyword(Keyword::Load),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_qualified_identifier_as_three_tokens() {
        let ks = kinds("p.Vendor");
        assert_eq!(
            ks,
            vec![
                TokenKind::Identifier("p".to_string()),
                TokenKind::Symbol("."),
                TokenKind::Identifier("Vendor".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_string_with_escaped_quote() {
        let ks = kinds("'it''s'");
        assert_eq!(
            ks,
            vec![TokenKind::StringLiteral("it's".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_decimal_and_integer() {
        let ks = kinds("10 3.14 2e10");
        assert_eq!(
            ks,
            vec![
                TokenKind::IntegerLiteral(10),
                TokenKind::DecimalLiteral(3.14),
                TokenKind::DecimalLiteral(2e10),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn skips_line_and_block_comments() {
        let ks = kinds("load -- comment\n/* block */ table");
        assert_eq!(
            ks,
            vec![
                TokenKind::Keyword(Keyword::Load),
                TokenKind::Keyword(Keyword::Table),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_is_fatal() {
        assert!(Lexer::new("'abc").tokenize().is_err());
    }

    #[test]
    fn unterminated_block_comment_is_fatal() {
        assert!(Lexer::new("/* abc").tokenize().is_err());
    }

    #[test]
    fn lexes_comparison_operators() {
        let ks = kinds("<= <> >= < >");
        assert_eq!(
            ks,
            vec![
                TokenKind::Symbol("<="),
                TokenKind::Symbol("<>"),
                TokenKind::Symbol(">="),
                TokenKind::Symbol("<"),
                TokenKind::Symbol(">"),
                TokenKind::Eof
            ]
        );
    }
}
