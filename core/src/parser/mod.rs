//! Recursive-descent parser for the URL-shaped query syntax.
//!
//! ```text
//! /fields@segment/segment?condition:+sort,-sort[offset:limit]
//! ```
//!
//! The parser owns two pieces of delicate behavior: the in-flight
//! precedence rebalance of binary expressions (see [`rebalance`]) and the
//! substitution of global placeholder identifiers at parse time.


use std::collections::HashMap;

use crate::ast::{
    BinaryExpr, Const, Expr, ExprList, Ident, LimitsStmt, OrderByStmt, OrderDir, UnaryExpr,
};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::scanner::Scanner;
use crate::token::{Pos, Token};

/// The parser. One instance per flow of control; the globals table may be
/// shared by value across instances.
#[derive(Debug)]
pub struct Parser {
    scanner: Scanner,
    pos: Pos,
    tok: Token,
    lit: String,
    globals: HashMap<String, Expr>,
}

impl Default for Parser {
    fn default() -> Self {
        Parser::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            scanner: Scanner::default(),
            pos: 0,
            tok: Token::Eof,
            lit: String::new(),
            globals: HashMap::new(),
        }
    }

    /// Registers placeholder identifiers. Any identifier whose text is a
    /// key of this table — plain or `$`-prefixed — parses as the stored
    /// expression instead.
    pub fn with_globals(mut self, globals: HashMap<String, Expr>) -> Self {
        self.globals = globals;
        self
    }

    /// Parses a complete query.
    pub fn parse(&mut self, src: &str) -> Result<Query> {
        self.scanner = Scanner::new(src);

        let (path, fields) = self.parse_path_and_fields()?;

        let mut condition = None;
        if self.tok == Token::Query {
            condition = self.parse_expr()?.map(|(expr, _)| expr);
        }

        let mut order_by = Vec::new();
        if self.tok == Token::Colon {
            order_by = self.parse_order_by()?;
        }

        let mut limits = None;
        if self.tok == Token::Lbrack {
            limits = Some(self.parse_limits()?);
        }

        if self.tok != Token::Eof {
            return Err(self.unexpected());
        }

        Ok(Query::new(path, fields, condition, order_by, limits))
    }

    fn next(&mut self) {
        let (pos, tok, lit) = self.scanner.scan();
        self.pos = pos;
        self.tok = tok;
        self.lit = lit;
    }

    fn unexpected(&self) -> Error {
        Error::unexpected(self.tok, self.pos)
    }

    /// An identifier, after placeholder substitution. `$name` placeholders
    /// must be registered; plain identifiers fall back to themselves.
    fn parse_ident(&mut self) -> Result<Expr> {
        match self.tok {
            Token::Ident => match self.globals.get(&self.lit) {
                Some(global) => Ok(global.clone()),
                None => Ok(Expr::Ident(Ident::new(self.lit.clone(), self.pos))),
            },
            Token::Pseudo => match self.globals.get(&self.lit) {
                Some(global) => Ok(global.clone()),
                None => Err(self.unexpected()),
            },
            _ => Err(self.unexpected()),
        }
    }

    /// Reads identifiers separated by `/` into the path until a section
    /// marker. A `,` or `@` diverts the pending identifier run into the
    /// projection list; after `@` path parsing resumes.
    fn parse_path_and_fields(&mut self) -> Result<(String, Vec<Ident>)> {
        let mut path: Vec<String> = Vec::new();
        let mut fields: Vec<Ident> = Vec::new();
        let mut ident: Option<Ident> = None;
        let mut prev = Token::Illegal;

        loop {
            self.next();
            match self.tok {
                Token::Ident => match self.parse_ident()? {
                    Expr::Ident(id) => ident = Some(id),
                    _ => return Err(self.unexpected()),
                },
                Token::Quo => {
                    if let Some(id) = ident.take() {
                        path.push(id.name);
                    }
                }
                Token::At | Token::Comma => {
                    let already = if prev == Token::Ident { ident.take() } else { None };
                    fields = self.parse_fields(already)?;
                }
                Token::Query | Token::Lbrack | Token::Colon | Token::Eof => {
                    if let Some(id) = ident.take() {
                        path.push(id.name);
                    }
                    return Ok((path.join("/"), fields));
                }
                _ => return Err(self.unexpected()),
            }
            prev = self.tok;
        }
    }

    /// The projection list in front of `@`. Entered on the `,` or `@` that
    /// revealed the list; `already` is the identifier read before it.
    fn parse_fields(&mut self, already: Option<Ident>) -> Result<Vec<Ident>> {
        let mut fields = Vec::new();
        if let Some(id) = already {
            fields.push(id);
        }
        let mut ident: Option<Ident> = None;

        while self.tok != Token::At {
            match self.tok {
                Token::Ident => match self.parse_ident()? {
                    Expr::Ident(id) => ident = Some(id),
                    _ => return Err(self.unexpected()),
                },
                Token::Comma => {
                    if let Some(id) = ident.take() {
                        fields.push(id);
                    }
                }
                _ => return Err(self.unexpected()),
            }
            self.next();
        }
        if let Some(id) = ident.take() {
            fields.push(id);
        }
        Ok(fields)
    }

    /// One expression, starting on the token before it. Returns `None` when
    /// the input ends immediately (a bare trailing `?` is legal). The flag
    /// reports whether the leading operand was parenthesized.
    fn parse_expr(&mut self) -> Result<Option<(Expr, bool)>> {
        self.next();
        if self.tok == Token::Eof {
            return Ok(None);
        }
        let (x, is_isolated) = self.parse_unary_expr()?;
        self.next();
        if self.tok.is_operator() {
            let expr = self.parse_binary_expr(x)?;
            return Ok(Some((expr, is_isolated)));
        }
        match self.tok {
            Token::Comma
            | Token::Rbrace
            | Token::Rparen
            | Token::Colon
            | Token::Lbrack
            | Token::Eof => Ok(Some((x, is_isolated))),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_unary_expr(&mut self) -> Result<(Expr, bool)> {
        match self.tok {
            Token::Ident | Token::Pseudo => Ok((self.parse_ident()?, false)),
            Token::Int | Token::Float | Token::Str => Ok((
                Expr::Const(Const::new(self.lit.clone(), self.pos, self.tok)),
                false,
            )),
            Token::Lbrace => Ok((self.parse_expr_list()?, false)),
            Token::Lparen => match self.parse_expr()? {
                Some((expr, _)) => Ok((expr, true)),
                None => Err(self.unexpected()),
            },
            Token::Minus | Token::Not => {
                let op = self.tok;
                let pos = self.pos;
                self.next();
                let (x, _) = self.parse_unary_expr()?;
                Ok((
                    Expr::Unary(UnaryExpr { op, x: Box::new(x), pos }),
                    false,
                ))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// The right side of `x op …`, with the precedence rebalance applied
    /// unless the right side was parenthesized.
    fn parse_binary_expr(&mut self, x: Expr) -> Result<Expr> {
        let op = self.tok;
        let pos = self.pos;
        let (y, y_is_isolated) = match self.parse_expr()? {
            Some(parsed) => parsed,
            None => return Err(self.unexpected()),
        };
        if y_is_isolated {
            Ok(Expr::Binary(BinaryExpr::new(op, x, y, pos)))
        } else {
            Ok(rebalance(op, x, pos, y))
        }
    }

    /// `{expr, expr, …}` — entered on the `{`, leaves on the `}`.
    fn parse_expr_list(&mut self) -> Result<Expr> {
        let pos = self.pos;
        let mut exprs = Vec::new();
        while self.tok != Token::Rbrace {
            match self.parse_expr()? {
                Some((expr, _)) => exprs.push(expr),
                None => return Err(self.unexpected()),
            }
        }
        Ok(Expr::List(ExprList { exprs, pos }))
    }

    fn parse_order_by(&mut self) -> Result<Vec<OrderByStmt>> {
        self.next();
        let mut order_by = Vec::new();
        loop {
            match self.tok {
                Token::Lbrack | Token::Eof => return Ok(order_by),
                Token::Comma => {
                    self.next();
                    continue;
                }
                Token::Plus | Token::Minus => {
                    let direction = if self.tok == Token::Plus {
                        OrderDir::Asc
                    } else {
                        OrderDir::Desc
                    };
                    self.next();
                    if self.tok != Token::Ident {
                        return Err(self.unexpected());
                    }
                    order_by.push(OrderByStmt {
                        field: Ident::new(self.lit.clone(), self.pos),
                        direction,
                    });
                }
                _ => return Err(self.unexpected()),
            }
            self.next();
        }
    }

    /// `[from:len]`, each bound independently optional.
    fn parse_limits(&mut self) -> Result<LimitsStmt> {
        self.next();
        let from = match self.tok {
            Token::Colon => None,
            Token::Int => {
                let bound = self.parse_int_const()?;
                self.next();
                if self.tok != Token::Colon {
                    return Err(self.unexpected());
                }
                Some(bound)
            }
            _ => return Err(self.unexpected()),
        };

        self.next();
        let len = match self.tok {
            Token::Rbrack => None,
            Token::Int => {
                let bound = self.parse_int_const()?;
                self.next();
                if self.tok != Token::Rbrack {
                    return Err(self.unexpected());
                }
                Some(bound)
            }
            _ => return Err(self.unexpected()),
        };
        self.next();

        Ok(LimitsStmt { from, len })
    }

    fn parse_int_const(&mut self) -> Result<Const> {
        if self.lit.parse::<u64>().is_err() {
            return Err(Error::InvalidNumber {
                literal: self.lit.clone(),
                pos: self.pos,
            });
        }
        Ok(Const::new(self.lit.clone(), self.pos, Token::Int))
    }
}

/// Rebuilds `x op y` left-associatively while `y` is a binary expression
/// whose operator binds strictly weaker than `op`:
/// `x op (yx yop yy)` becomes `(x op yx) yop yy`, recursively. Parenthesized
/// right sides never reach this function — they stay opaque.
fn rebalance(op: Token, x: Expr, pos: Pos, y: Expr) -> Expr {
    match y {
        Expr::Binary(yb) if op.precedence() > yb.op.precedence() => {
            let left = rebalance(op, x, pos, *yb.x);
            Expr::Binary(BinaryExpr {
                op: yb.op,
                x: Box::new(left),
                y: yb.y,
                pos: yb.pos,
            })
        }
        y => Expr::Binary(BinaryExpr::new(op, x, y, pos)),
    }
}
