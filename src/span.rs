// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source positions shared by the lexer, parser and diagnostics.

/// A single point in the source text, 1-based in both dimensions to match
/// what a human reading the script would point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub const fn start() -> Self {
        Pos { line: 1, col: 1 }
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
