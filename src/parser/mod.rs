// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recursive-descent parser over the hand-rolled token stream
//! (`spec.md` §4.2). One token of lookahead throughout.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Keyword, Lexer, Token, TokenKind};
use crate::span::Pos;

pub struct Parser {
    tokens: Vec<Token>,
    idx: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, idx: 0 }
    }

    /// Lex and parse a whole script in one call — the entry point used by
    /// `compile`.
    pub fn parse_script(src: &str) -> Result<Script, crate::error::CompilerError> {
        let tokens = Lexer::new(src).tokenize()?;
        let mut parser = Parser::new(tokens);
        Ok(parser.script()?)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.idx]
    }

    fn pos(&self) -> Pos {
        self.peek().pos
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.idx].clone();
        if self.idx + 1 < self.tokens.len() {
            self.idx += 1;
        }
        tok
    }

    fn err(&self, expected: impl Into<String>) -> ParseError {
        ParseError::new(self.pos(), expected, self.peek().describe())
    }

    fn is_keyword(&self, kw: Keyword) -> bool {
        matches!(&self.peek().kind, TokenKind::Keyword(k) if *k == kw)
    }

    fn is_symbol(&self, sym: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Symbol(s) if *s == sym)
    }

    fn eat_keyword(&mut self, kw: Keyword) -> Result<(), ParseError> {
        if self.is_keyword(kw) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("{kw:?}")))
        }
    }

    fn eat_symbol(&mut self, sym: &'static str) -> Result<(), ParseError> {
        if self.is_symbol(sym) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("'{sym}'")))
        }
    }

    fn eat_lparen(&mut self) -> Result<(), ParseError> {
        if matches!(self.peek().kind, TokenKind::LParen) {
            self.advance();
            Ok(())
        } else {
            Err(self.err("'('"))
        }
    }

    fn eat_rparen(&mut self) -> Result<(), ParseError> {
        if matches!(self.peek().kind, TokenKind::RParen) {
            self.advance();
            Ok(())
        } else {
            Err(self.err("')'"))
        }
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::Identifier(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            // Keywords may be used loosely as identifiers in a handful of
            // positions (e.g. `read`/`write` never collide with column
            // names in practice), but we keep this strict per `spec.md`
            // §4.1/4.2: identifiers are their own token kind.
            _ => Err(self.err("identifier")),
        }
    }

    fn string_literal(&mut self) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::StringLiteral(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.err("string literal")),
        }
    }

    fn qualified_name(&mut self) -> Result<QualifiedName, ParseError> {
        let first = self.identifier()?;
        if self.is_symbol(".") {
            self.advance();
            let second = self.identifier()?;
            Ok(QualifiedName::qualified(first, second))
        } else {
            Ok(QualifiedName::unqualified(first))
        }
    }

    pub fn script(&mut self) -> Result<Script, ParseError> {
        let mut statements = Vec::new();
        while !matches!(self.peek().kind, TokenKind::Eof) {
            statements.push(self.statement()?);
        }
        Ok(Script { statements })
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        let pos = self.pos();
        let kind = match &self.peek().kind {
            TokenKind::Keyword(Keyword::Load) => self.load_stmt()?,
            TokenKind::Keyword(Keyword::Table) => self.decl_stmt(DeclKind::Table)?,
            TokenKind::Keyword(Keyword::Stream) => self.decl_stmt(DeclKind::Stream)?,
            TokenKind::Keyword(Keyword::Open) => self.open_stmt()?,
            TokenKind::Keyword(Keyword::Select) => self.select_stmt()?,
            TokenKind::Keyword(Keyword::Map) => self.map_stmt()?,
            TokenKind::Keyword(Keyword::Sync) => self.sync_stmt()?,
            TokenKind::Keyword(Keyword::Abort) => self.abort_stmt()?,
            _ => {
                return Err(self.err(
                    "a top-level statement (load, table, stream, open, select, map, sync, abort)",
                ))
            }
        };
        if self.is_symbol(";") {
            self.advance();
        }
        Ok(Statement { kind, pos })
    }

    fn load_stmt(&mut self) -> Result<StatementKind, ParseError> {
        self.eat_keyword(Keyword::Load)?;
        let name = self.identifier()?;
        self.eat_keyword(Keyword::From)?;
        let dict_path = self.string_literal()?;
        Ok(StatementKind::Load { name, dict_path })
    }

    fn decl_stmt(&mut self, kind: DeclKind) -> Result<StatementKind, ParseError> {
        match kind {
            DeclKind::Table => self.eat_keyword(Keyword::Table)?,
            DeclKind::Stream => self.eat_keyword(Keyword::Stream)?,
        }
        let name = self.identifier()?;
        self.eat_keyword(Keyword::For)?;
        let dict_stream = self.qualified_name()?;
        Ok(StatementKind::Decl {
            name,
            kind,
            dict_stream,
        })
    }

    fn open_stmt(&mut self) -> Result<StatementKind, ParseError> {
        self.eat_keyword(Keyword::Open)?;
        let name = self.identifier()?;
        self.eat_keyword(Keyword::As)?;
        let connector = self.identifier()?;
        self.eat_keyword(Keyword::For)?;
        let direction = if self.is_keyword(Keyword::Read) {
            self.advance();
            Direction::Read
        } else if self.is_keyword(Keyword::Write) {
            self.advance();
            Direction::Write
        } else {
            return Err(self.err("'read' or 'write'"));
        };
        let dict_ref = self.identifier()?;
        self.eat_keyword(Keyword::With)?;
        let conn_string = self.string_literal()?;
        Ok(StatementKind::Open {
            name,
            connector,
            direction,
            dict_ref,
            conn_string,
        })
    }

    fn map_stmt(&mut self) -> Result<StatementKind, ParseError> {
        self.eat_keyword(Keyword::Map)?;
        let src = self.qualified_name()?;
        self.eat_keyword(Keyword::To)?;
        let dst = self.qualified_name()?;
        let field_map = if self.is_keyword(Keyword::With) {
            self.advance();
            self.eat_lparen()?;
            let mut pairs = Vec::new();
            loop {
                let dst_field = self.identifier()?;
                self.eat_symbol("=")?;
                let src_field = self.identifier()?;
                pairs.push((dst_field, src_field));
                if self.is_symbol(",") {
                    self.advance();
                    continue;
                }
                break;
            }
            self.eat_rparen()?;
            Some(pairs)
        } else {
            None
        };
        Ok(StatementKind::Map {
            src,
            dst,
            field_map,
        })
    }

    fn sync_stmt(&mut self) -> Result<StatementKind, ParseError> {
        self.eat_keyword(Keyword::Sync)?;
        let reader = self.identifier()?;
        self.eat_keyword(Keyword::To)?;
        let writer = self.identifier()?;
        Ok(StatementKind::Sync { reader, writer })
    }

    fn abort_stmt(&mut self) -> Result<StatementKind, ParseError> {
        self.eat_keyword(Keyword::Abort)?;
        let message = self.string_literal()?;
        Ok(StatementKind::Abort { message })
    }

    fn select_stmt(&mut self) -> Result<StatementKind, ParseError> {
        let query = self.query()?;
        self.eat_keyword(Keyword::Into)?;
        let into_name = self.identifier()?;
        Ok(StatementKind::Select { query, into_name })
    }

    fn query(&mut self) -> Result<Query, ParseError> {
        let pos = self.pos();
        self.eat_keyword(Keyword::Select)?;
        let items = self.select_items()?;
        self.eat_keyword(Keyword::From)?;
        let from = self.from_clause()?;
        let join = if self.is_keyword(Keyword::Join) {
            Some(self.join_clause()?)
        } else {
            None
        };
        let where_clause = if self.is_keyword(Keyword::Where) {
            self.advance();
            Some(self.expr()?)
        } else {
            None
        };
        let mut group_by = Vec::new();
        if self.is_keyword(Keyword::Group) {
            self.advance();
            self.eat_keyword(Keyword::By)?;
            loop {
                group_by.push(self.qualified_name()?);
                if self.is_symbol(",") {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        let having = if self.is_keyword(Keyword::Having) {
            self.advance();
            Some(self.expr()?)
        } else {
            None
        };
        let mut order_by = Vec::new();
        if self.is_keyword(Keyword::Order) {
            self.advance();
            self.eat_keyword(Keyword::By)?;
            loop {
                let column = self.qualified_name()?;
                let direction = if self.is_keyword(Keyword::Desc) {
                    self.advance();
                    OrderDirection::Desc
                } else if self.is_keyword(Keyword::Asc) {
                    self.advance();
                    OrderDirection::Asc
                } else {
                    OrderDirection::Asc
                };
                order_by.push(OrderByItem { column, direction });
                if self.is_symbol(",") {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        Ok(Query {
            items,
            from,
            join,
            where_clause,
            group_by,
            having,
            order_by,
            pos,
        })
    }

    fn select_items(&mut self) -> Result<Vec<SelectItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            let expr = self.expr()?;
            let alias = if self.is_keyword(Keyword::As) {
                self.advance();
                Some(self.identifier()?)
            } else if matches!(self.peek().kind, TokenKind::Identifier(_)) {
                // Bare alias, e.g. `p.Vendor VendorID` (`spec.md` §4.2).
                Some(self.identifier()?)
            } else {
                None
            };
            items.push(SelectItem { expr, alias });
            if self.is_symbol(",") {
                self.advance();
                continue;
            }
            break;
        }
        Ok(items)
    }

    fn from_clause(&mut self) -> Result<FromClause, ParseError> {
        let name = self.identifier()?;
        let alias = if matches!(self.peek().kind, TokenKind::Identifier(_)) {
            Some(self.identifier()?)
        } else {
            None
        };
        Ok(FromClause { name, alias })
    }

    fn join_clause(&mut self) -> Result<JoinClause, ParseError> {
        self.eat_keyword(Keyword::Join)?;
        let table = self.identifier()?;
        let alias = if matches!(self.peek().kind, TokenKind::Identifier(_)) {
            Some(self.identifier()?)
        } else {
            None
        };
        self.eat_keyword(Keyword::On)?;
        let left = self.qualified_name()?;
        self.eat_symbol("=")?;
        let right = self.qualified_name()?;
        Ok(JoinClause {
            table,
            alias,
            left,
            right,
        })
    }

    // --- Expression grammar: or_expr -> and_expr -> not_expr -> compare -> additive -> multiplicative -> atom

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.is_keyword(Keyword::Or) {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Bool(Box::new(left), BoolOp::Or, Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not_expr()?;
        while self.is_keyword(Keyword::And) {
            self.advance();
            let right = self.not_expr()?;
            left = Expr::Bool(Box::new(left), BoolOp::And, Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.is_keyword(Keyword::Not) {
            self.advance();
            let inner = self.not_expr()?;
            Ok(Expr::Not(Box::new(inner)))
        } else {
            self.compare_expr()
        }
    }

    fn compare_expr(&mut self) -> Result<Expr, ParseError> {
        let left = self.additive_expr()?;
        let op = match &self.peek().kind {
            TokenKind::Symbol("=") => Some(CompareOp::Eq),
            TokenKind::Symbol("<>") => Some(CompareOp::Ne),
            TokenKind::Symbol("<") => Some(CompareOp::Lt),
            TokenKind::Symbol("<=") => Some(CompareOp::Le),
            TokenKind::Symbol(">") => Some(CompareOp::Gt),
            TokenKind::Symbol(">=") => Some(CompareOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.additive_expr()?;
            Ok(Expr::Compare(Box::new(left), op, Box::new(right)))
        } else {
            Ok(left)
        }
    }

    fn additive_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Symbol("+") => ArithOp::Add,
                TokenKind::Symbol("-") => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative_expr()?;
            left = Expr::Arith(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.atom()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Symbol("*") => ArithOp::Mul,
                TokenKind::Symbol("/") => ArithOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.atom()?;
            left = Expr::Arith(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        match &self.peek().kind {
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.eat_rparen()?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            TokenKind::IntegerLiteral(v) => {
                let v = *v;
                self.advance();
                Ok(Expr::Literal(Literal::Integer(v)))
            }
            TokenKind::DecimalLiteral(v) => {
                let v = *v;
                self.advance();
                Ok(Expr::Literal(Literal::Decimal(v)))
            }
            TokenKind::StringLiteral(s) => {
                let s = s.clone();
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                if let Some(agg) = AggKind::from_name(&name) {
                    // Only recognized as an aggregate call when followed by
                    // `(`; otherwise it is an ordinary column/identifier.
                    if matches!(self.tokens.get(self.idx + 1).map(|t| &t.kind), Some(TokenKind::LParen))
                    {
                        return self.aggregate_call(agg);
                    }
                }
                Ok(Expr::Column(self.qualified_name()?))
            }
            _ => Err(self.err("an expression")),
        }
    }

    fn aggregate_call(&mut self, agg: AggKind) -> Result<Expr, ParseError> {
        self.advance(); // function name identifier
        self.eat_lparen()?;
        let arg = if self.is_symbol("*") {
            if agg != AggKind::Count {
                return Err(self.err("'*' is only valid as the argument to count(*)"));
            }
            self.advance();
            None
        } else {
            Some(Box::new(self.expr()?))
        };
        self.eat_rparen()?;
        Ok(Expr::Aggregate(agg, arg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Script {
        Parser::parse_script(src).expect("parse should succeed")
    }

    #[test]
    fn parses_load_and_decl() {
        let script = parse(
            "load Src from 'src.dict';\n\
             table types for Src.Types;\n\
             stream users for Src.Users;",
        );
        assert_eq!(script.statements.len(), 3);
        assert!(matches!(
            script.statements[0].kind,
            StatementKind::Load { .. }
        ));
        assert!(matches!(
            script.statements[1].kind,
            StatementKind::Decl {
                kind: DeclKind::Table,
                ..
            }
        ));
        assert!(matches!(
            script.statements[2].kind,
            StatementKind::Decl {
                kind: DeclKind::Stream,
                ..
            }
        ));
    }

    #[test]
    fn parses_open_statement() {
        let script = parse("open R as MSSQL for read Src with 'server=x';");
        match &script.statements[0].kind {
            StatementKind::Open {
                name,
                connector,
                direction,
                dict_ref,
                conn_string,
            } => {
                assert_eq!(name, "R");
                assert_eq!(connector, "MSSQL");
                assert_eq!(*direction, Direction::Read);
                assert_eq!(dict_ref, "Src");
                assert_eq!(conn_string, "server=x");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_join_and_filter_select() {
        let script = parse(
            "select u.id, u.name, t.name AS type from users u \
             join types t on u.typeId = t.Id \
             where u.id = 1 into users2;",
        );
        match &script.statements[0].kind {
            StatementKind::Select { query, into_name } => {
                assert_eq!(into_name, "users2");
                assert_eq!(query.items.len(), 3);
                assert!(query.join.is_some());
                assert!(query.where_clause.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_group_by_having_count_star() {
        let script = parse(
            "select p.Vendor, max(p.Price), count(*) from products p \
             group by Vendor having count(*) > 5 into out;",
        );
        match &script.statements[0].kind {
            StatementKind::Select { query, .. } => {
                assert_eq!(query.group_by.len(), 1);
                assert!(query.having.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_order_by_rejected_later_but_parses_syntactically() {
        let script = parse("select p.Vendor from products p order by p.Vendor into out;");
        match &script.statements[0].kind {
            StatementKind::Select { query, .. } => assert_eq!(query.order_by.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_map_with_field_list() {
        let script = parse("map Orders to OrderData with (OrderId = Id, VendorName = Vendor);");
        match &script.statements[0].kind {
            StatementKind::Map {
                src,
                dst,
                field_map,
            } => {
                assert_eq!(src.to_string(), "Orders");
                assert_eq!(dst.to_string(), "OrderData");
                assert_eq!(field_map.as_ref().unwrap().len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_sync_and_abort() {
        let script = parse("sync R to W; abort 'stop here';");
        assert!(matches!(
            script.statements[0].kind,
            StatementKind::Sync { .. }
        ));
        assert!(matches!(
            script.statements[1].kind,
            StatementKind::Abort { .. }
        ));
    }

    #[test]
    fn unexpected_token_is_fatal() {
        assert!(Parser::parse_script("foo bar").is_err());
    }
}
