//! Schema-aware SQL generation, PostgreSQL dialect.
//!
//! Walks a [`Query`] bound to a [`Source`](crate::source::Source) and emits
//! a complete `select` statement, or an error — never partial SQL. Column
//! references resolve through the schema so that JSON path dereferences,
//! casts, containment and `in` lists match the semantic type of each column.

mod predicate;
#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use crate::query::Query;
use crate::source::{Datatype, Source};

pub(crate) use predicate::compile_expr;

/// Compiles `q` against `target`, substituted verbatim after `from`.
pub fn compile(q: &Query, target: &str) -> Result<String> {
    if q.path().is_empty() {
        return Err(Error::PathNotDefined);
    }
    let source = q.source().ok_or(Error::SourceNotDefined)?;

    let mut parts = vec![
        "select".to_string(),
        compile_select(q, source)?,
        "from".to_string(),
        target.to_string(),
    ];
    if let Some(cond) = q.condition() {
        parts.push("where".to_string());
        parts.push(compile_expr(cond, source)?);
    }
    let order_by = compile_order_by(q, source)?;
    if !order_by.is_empty() {
        parts.push("order by".to_string());
        parts.push(order_by);
    }
    if let Some(limits) = compile_limits(q) {
        parts.push(limits);
    }
    Ok(parts.join(" "))
}

/// The projection: `*` without fields, otherwise resolved `db_name`s.
/// Only top-level columns may be projected — JSON sub-fields have no
/// standalone column to select.
fn compile_select(q: &Query, source: &Source) -> Result<String> {
    if q.fields().is_empty() {
        return Ok("*".to_string());
    }
    let mut fields = Vec::with_capacity(q.fields().len());
    for field in q.fields() {
        if field.name.contains('.') {
            return Err(Error::must_be(
                &field.name,
                field.pos,
                "a column",
                "a json field",
            ));
        }
        let col = source
            .cols
            .by_name(&field.name)
            .ok_or_else(|| Error::not_defined(&field.name, field.pos))?;
        fields.push(col.db_name.clone());
    }
    Ok(fields.join(", "))
}

fn compile_order_by(q: &Query, source: &Source) -> Result<String> {
    let mut parts = Vec::with_capacity(q.order_by().len());
    for stmt in q.order_by() {
        let field = &stmt.field;
        let col = source
            .cols
            .by_name(&field.name)
            .ok_or_else(|| Error::not_defined(&field.name, field.pos))?;
        let compiled = match source.cols.json_path(&field.name) {
            Some(path) => {
                let outer = match field.name.split_once('.') {
                    Some((head, _)) => head,
                    None => field.name.as_str(),
                };
                let main = source
                    .cols
                    .by_name(outer)
                    .ok_or_else(|| Error::not_defined(outer, field.pos))?;
                format!(
                    "({} #>> '{{{}}}')::{}",
                    main.db_name,
                    path,
                    cast_for(col.datatype)
                )
            }
            None => col.db_name.clone(),
        };
        parts.push(format!("{} {}", compiled, stmt.direction.as_str()));
    }
    Ok(parts.join(", "))
}

fn compile_limits(q: &Query) -> Option<String> {
    let limits = q.limits()?;
    let mut parts = Vec::new();
    if let Some(len) = &limits.len {
        parts.push(format!("limit {}", len.value));
    }
    if let Some(from) = &limits.from {
        parts.push(format!("offset {}", from.value));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// The `::cast` spelling for a semantic type.
pub(crate) fn cast_for(datatype: Datatype) -> &'static str {
    match datatype {
        Datatype::Bool => "boolean",
        Datatype::Number => "numeric",
        Datatype::String => "text",
        Datatype::Time => "timestamp",
        Datatype::Object => "text",
    }
}
