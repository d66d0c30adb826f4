//! WHERE-clause compilation.
//!
//! The interesting part is operator reinterpretation: `=` against a brace
//! list becomes `in`, against an array column becomes `@>` containment,
//! against an object column becomes a JSON path predicate, and against the
//! `null` keyword becomes `is null`. The schema decides, not the syntax.

use crate::ast::{BinaryExpr, Const, Expr, ExprList, Ident, UnaryExpr};
use crate::error::{Error, Result};
use crate::source::{Col, Datatype, Source};
use crate::token::{Pos, Token};

use super::cast_for;

pub(crate) fn compile_expr(expr: &Expr, source: &Source) -> Result<String> {
    match expr {
        Expr::Unary(unary) => compile_unary(unary, source),
        Expr::Binary(binary) => compile_binary(binary, source),
        Expr::Ident(ident) => compile_ident(ident, source),
        Expr::Const(constant) => compile_const(constant),
        Expr::List(list) => Err(Error::unexpected(Token::Lbrace, list.pos)),
    }
}

fn compile_unary(expr: &UnaryExpr, source: &Source) -> Result<String> {
    let op = match expr.op {
        Token::Not => "not ",
        Token::Minus => "-",
        _ => return Err(Error::unexpected(expr.op, expr.pos)),
    };
    Ok(format!("{}{}", op, compile_expr(&expr.x, source)?))
}

fn compile_binary(expr: &BinaryExpr, source: &Source) -> Result<String> {
    match expr.op {
        Token::And | Token::Or => compile_logical(expr, source),
        Token::Eql | Token::Neq => compile_equality(expr, source),
        Token::Lss | Token::Leq | Token::Gtr | Token::Geq | Token::Like => {
            compile_comparison(expr, source)
        }
        _ => Err(Error::unexpected(expr.op, expr.pos)),
    }
}

/// `and` / `or` over two predicates. A side whose operator binds strictly
/// weaker than the connective gets parenthesized; equal precedence does not.
fn compile_logical(expr: &BinaryExpr, source: &Source) -> Result<String> {
    let x = match expr.x.as_ref() {
        Expr::Binary(binary) => binary,
        other => return Err(Error::unexpected(other.token(), other.pos())),
    };
    let y = match expr.y.as_ref() {
        Expr::Binary(binary) => binary,
        other => return Err(Error::unexpected(other.token(), other.pos())),
    };

    let op = if expr.op == Token::And { "and" } else { "or" };
    let mut compiled_x = compile_binary(x, source)?;
    let mut compiled_y = compile_binary(y, source)?;
    if x.op.precedence() < expr.op.precedence() {
        compiled_x = format!("({})", compiled_x);
    }
    if y.op.precedence() < expr.op.precedence() {
        compiled_y = format!("({})", compiled_y);
    }
    Ok(format!("{} {} {}", compiled_x, op, compiled_y))
}

/// `=` / `!=`. A brace list on either side reroutes into the list forms;
/// otherwise the left resolves to a scalar column and the right is a
/// constant or keyword identifier.
fn compile_equality(expr: &BinaryExpr, source: &Source) -> Result<String> {
    match (expr.x.as_ref(), expr.y.as_ref()) {
        (Expr::List(_), Expr::List(_)) => {}
        (Expr::List(list), other) => return compile_with_list(other, list, expr.op, source),
        (other, Expr::List(list)) => return compile_with_list(other, list, expr.op, source),
        _ => {}
    }

    let x = match expr.x.as_ref() {
        Expr::Ident(ident) => ident,
        other => return Err(Error::unexpected(other.token(), other.pos())),
    };
    let x_col = source
        .cols
        .by_name(&x.name)
        .ok_or_else(|| Error::not_defined(&x.name, x.pos))?;
    let compiled_x = compile_ident(x, source)?;
    let compiled_y = match expr.y.as_ref() {
        Expr::Const(constant) => compile_const(constant)?,
        Expr::Ident(ident) => compile_ident(ident, source)?,
        other => return Err(Error::unexpected(other.token(), other.pos())),
    };

    if x_col.is_array {
        let value = containment_literal(&compiled_y);
        return Ok(if expr.op == Token::Eql {
            format!("{} @> {}", compiled_x, value)
        } else {
            format!("not {} @> {}", compiled_x, value)
        });
    }
    if compiled_y == "null" {
        return Ok(if expr.op == Token::Eql {
            format!("{} is null", compiled_x)
        } else {
            format!("{} is not null", compiled_x)
        });
    }
    Ok(if expr.op == Token::Eql {
        format!("{} = {}", compiled_x, compiled_y)
    } else {
        format!("{} != {}", compiled_x, compiled_y)
    })
}

/// `< <= > >= ~=` between a column and a constant, with the operand domain
/// pinned by the column type: numbers compare to numeric literals, times to
/// strings, and `~=` wants a string column and a string pattern.
fn compile_comparison(expr: &BinaryExpr, source: &Source) -> Result<String> {
    let x = match expr.x.as_ref() {
        Expr::Ident(ident) => ident,
        other => return Err(Error::unexpected(other.token(), other.pos())),
    };
    let y = match expr.y.as_ref() {
        Expr::Const(constant) => constant,
        other => return Err(Error::unexpected(other.token(), other.pos())),
    };
    let datatype = source
        .cols
        .datatype(&x.name)
        .ok_or_else(|| Error::not_defined(&x.name, x.pos))?;

    if expr.op == Token::Like {
        if datatype != Datatype::String {
            return Err(Error::must_be(&x.name, x.pos, "string", "any"));
        }
        if y.tok != Token::Str {
            return Err(Error::must_be(&y.value, y.pos, "string", y.tok.to_string()));
        }
    } else {
        match datatype {
            Datatype::Number => {
                if y.tok != Token::Int && y.tok != Token::Float {
                    return Err(Error::must_be(&y.value, y.pos, "number", y.tok.to_string()));
                }
            }
            Datatype::Time => {
                if y.tok != Token::Str {
                    return Err(Error::must_be(&y.value, y.pos, "time", y.tok.to_string()));
                }
            }
            _ => return Err(Error::must_be(&x.name, x.pos, "number or time", "any")),
        }
    }

    let compiled_x = compile_ident(x, source)?;
    if expr.op == Token::Like {
        Ok(format!(
            "{} like '%{}%'",
            compiled_x,
            escape_str(&y.value)
        ))
    } else {
        Ok(format!("{} {} {}", compiled_x, expr.op, compile_const(y)?))
    }
}

/// `col = {…}` / `col != {…}`. Constant members make an `in` list against a
/// scalar column; binary members make a nested JSON predicate against an
/// object column. Mixing the two is rejected.
fn compile_with_list(x: &Expr, list: &ExprList, op: Token, source: &Source) -> Result<String> {
    let ident = match x {
        Expr::Ident(ident) => ident,
        other => return Err(Error::unexpected(other.token(), other.pos())),
    };
    let column = source
        .cols
        .by_name(&ident.name)
        .ok_or_else(|| Error::not_defined(&ident.name, ident.pos))?;

    if is_const_list(list) {
        if column.datatype == Datatype::Object {
            return Err(Error::must_be(
                &column.name,
                ident.pos,
                "boolean/numeric/text/timestamp",
                "object",
            ));
        }
        if column.is_array {
            return Err(Error::must_be(
                &column.name,
                ident.pos,
                "boolean/numeric/text/timestamp",
                "array",
            ));
        }
        let compiled_x = compile_ident(ident, source)?;
        let items = compile_in_list(list, source)?;
        let op = if op == Token::Neq { "not in" } else { "in" };
        return Ok(format!("{} {} ({})", compiled_x, op, items));
    }

    if column.datatype != Datatype::Object {
        return Err(Error::must_be(
            &column.name,
            ident.pos,
            "array of object",
            "any",
        ));
    }
    let members = compile_member_list(list, column, source)?;
    if column.is_array {
        Ok(format!(
            "exists (select 1 from (select jsonb_array_elements({}::jsonb) item) q where {})",
            column.db_name, members
        ))
    } else {
        Ok(members)
    }
}

/// A brace list is an `in` list when its first member is a constant.
fn is_const_list(list: &ExprList) -> bool {
    matches!(list.exprs.first(), Some(Expr::Const(_)))
}

/// Members of an `in` list: constants, or unary-negated constants.
fn compile_in_list(list: &ExprList, source: &Source) -> Result<String> {
    if list.exprs.is_empty() {
        return Err(Error::EmptyExprList);
    }
    let mut items = Vec::with_capacity(list.exprs.len());
    for member in &list.exprs {
        match member {
            Expr::Const(constant) => items.push(compile_const(constant)?),
            Expr::Unary(unary) => items.push(compile_unary(unary, source)?),
            other => return Err(Error::unexpected(other.token(), other.pos())),
        }
    }
    Ok(items.join(", "))
}

/// Members of a nested JSON predicate group, `and`-joined.
fn compile_member_list(list: &ExprList, column: &Col, source: &Source) -> Result<String> {
    if list.exprs.is_empty() {
        return Err(Error::EmptyExprList);
    }
    let mut members = Vec::with_capacity(list.exprs.len());
    for member in &list.exprs {
        match member {
            Expr::Binary(binary) => members.push(compile_json_member(binary, column, source)?),
            other => return Err(Error::unexpected(other.token(), other.pos())),
        }
    }
    Ok(members.join(" and "))
}

/// One `child op value` predicate inside a JSON object or array-of-object
/// column. The left side names a child column; the dereference is
/// `(ref #>> '{path}')::cast`, where `ref` is `q.item` inside the
/// `jsonb_array_elements` subquery and the outer column itself otherwise.
/// Constants on the right get the same cast appended; the keywords `null`,
/// `true` and `false` stay bare.
fn compile_json_member(expr: &BinaryExpr, column: &Col, source: &Source) -> Result<String> {
    let ident = match expr.x.as_ref() {
        Expr::Ident(ident) => ident,
        other => return Err(Error::unexpected(other.token(), other.pos())),
    };
    let name = format!("{}.{}", column.name, ident.name);
    let child = source
        .cols
        .by_name(&name)
        .ok_or_else(|| Error::not_defined(&name, ident.pos))?;
    if child.datatype == Datatype::Object {
        return Err(Error::must_be(
            &name,
            ident.pos,
            "boolean/numeric/text/timestamp",
            "object",
        ));
    }
    if expr.op == Token::Like {
        if child.datatype != Datatype::String {
            return Err(Error::must_be(&name, ident.pos, "string", "any"));
        }
        if !matches!(expr.y.as_ref(), Expr::Const(constant) if constant.tok == Token::Str) {
            return Err(Error::must_be(
                &name,
                ident.pos,
                "string",
                expr.y.token().to_string(),
            ));
        }
    }
    let cast = cast_for(child.datatype);
    let path = source
        .cols
        .json_path(&name)
        .ok_or_else(|| Error::not_defined(&name, ident.pos))?;

    let (compiled_y, cast_rhs) = match expr.y.as_ref() {
        Expr::Const(constant) => (compile_const(constant)?, true),
        Expr::Ident(id) if matches!(id.name.as_str(), "null" | "true" | "false") => {
            (id.name.clone(), false)
        }
        other => return Err(Error::unexpected(other.token(), other.pos())),
    };

    let reference = if column.is_array {
        format!("(q.item #>> '{{{}}}')::{}", path, cast)
    } else {
        format!("({} #>> '{{{}}}')::{}", column.db_name, path, cast)
    };

    let (op, compiled_y) = json_member_operator(expr.op, ident.pos, compiled_y)?;

    if cast_rhs {
        Ok(format!("{} {} {}::{}", reference, op, compiled_y, cast))
    } else {
        Ok(format!("{} {} {}", reference, op, compiled_y))
    }
}

/// Operator spelling inside a JSON member predicate, with the `null`
/// keyword and `~=` rewrites applied to the right side. `~=` operands were
/// validated by the caller, so the pattern is always a quoted string.
fn json_member_operator(op: Token, pos: Pos, compiled_y: String) -> Result<(&'static str, String)> {
    match op {
        Token::Eql if compiled_y == "null" => Ok(("is", compiled_y)),
        Token::Neq if compiled_y == "null" => Ok(("is not", compiled_y)),
        Token::Eql => Ok(("=", compiled_y)),
        Token::Neq => Ok(("!=", compiled_y)),
        Token::Lss => Ok(("<", compiled_y)),
        Token::Leq => Ok(("<=", compiled_y)),
        Token::Gtr => Ok((">", compiled_y)),
        Token::Geq => Ok((">=", compiled_y)),
        Token::Like => {
            let inner = quoted_inner(&compiled_y).unwrap_or(&compiled_y).to_string();
            Ok(("like", format!("'%{}%'", inner)))
        }
        _ => Err(Error::unexpected(op, pos)),
    }
}

/// `true`, `false` and `null` pass through; anything else must resolve to a
/// column and emits its `db_name`.
fn compile_ident(expr: &Ident, source: &Source) -> Result<String> {
    match expr.name.as_str() {
        "true" | "false" | "null" => Ok(expr.name.clone()),
        _ => source
            .cols
            .by_name(&expr.name)
            .map(|col| col.db_name.clone())
            .ok_or_else(|| Error::not_defined(&expr.name, expr.pos)),
    }
}

/// Numbers verbatim; strings single-quoted with apostrophes doubled.
fn compile_const(expr: &Const) -> Result<String> {
    match expr.tok {
        Token::Int | Token::Float => Ok(expr.value.clone()),
        Token::Str => Ok(format!("'{}'", escape_str(&expr.value))),
        _ => Err(Error::unexpected(expr.tok, expr.pos)),
    }
}

fn escape_str(value: &str) -> String {
    value.replace('\'', "''")
}

/// The JSONB literal for `@>`: an already-quoted string becomes a quoted
/// JSON string, a bare number stays a bare JSON number.
fn containment_literal(compiled: &str) -> String {
    match quoted_inner(compiled) {
        Some(inner) => format!("'\"{}\"'", inner),
        None => format!("'{}'", compiled),
    }
}

fn quoted_inner(compiled: &str) -> Option<&str> {
    compiled.strip_prefix('\'')?.strip_suffix('\'')
}
