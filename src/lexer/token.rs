// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::span::Pos;

/// Keywords recognized by the lexer (`spec.md` §4.1). Case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Load,
    Table,
    Stream,
    Open,
    As,
    For,
    Read,
    Write,
    With,
    Select,
    From,
    Join,
    On,
    Where,
    Group,
    By,
    Having,
    Into,
    Map,
    To,
    Sync,
    Abort,
    And,
    Or,
    Not,
    Null,
    Order,
    Asc,
    Desc,
}

impl Keyword {
    pub fn from_str(s: &str) -> Option<Keyword> {
        use Keyword::*;
        Some(match s.to_ascii_lowercase().as_str() {
            "load" => Load,
            "table" => Table,
            "stream" => Stream,
            "open" => Open,
            "as" => As,
            "for" => For,
            "read" => Read,
            "write" => Write,
            "with" => With,
            "select" => Select,
            "from" => From,
            "join" => Join,
            "on" => On,
            "where" => Where,
            "group" => Group,
            "by" => By,
            "having" => Having,
            "into" => Into,
            "map" => Map,
            "to" => To,
            "sync" => Sync,
            "abort" => Abort,
            "and" => And,
            "or" => Or,
            "not" => Not,
            "null" => Null,
            "order" => Order,
            "asc" => Asc,
            "desc" => Desc,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    StringLiteral(String),
    IntegerLiteral(i64),
    DecimalLiteral(f64),
    /// `=` `<>` `<` `<=` `>` `>=` `+` `-` `*` `/` `.` `,`
    Symbol(&'static str),
    LParen,
    RParen,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub pos: Pos,
}

impl Token {
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.lexeme),
        }
    }
}
