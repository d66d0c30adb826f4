//! The parsed query value: path, projection, condition, ordering, bounds,
//! and the source it is bound to for compilation.

use std::sync::Arc;

use crate::ast::{Expr, Ident, LimitsStmt, OrderByStmt};
use crate::error::Result;
use crate::source::Source;
use crate::token::Token;
use crate::transpiler;

/// A parsed query. Built by the parser, bound to a [`Source`] with
/// [`Query::with_source`], and compiled with [`Query::compile`]. The same
/// query may be rebound to another source.
#[derive(Debug, Clone, Default)]
pub struct Query {
    path: String,
    fields: Vec<Ident>,
    condition: Option<Expr>,
    order_by: Vec<OrderByStmt>,
    limits: Option<LimitsStmt>,
    source: Option<Arc<Source>>,
}

impl Query {
    pub fn new(
        path: String,
        fields: Vec<Ident>,
        condition: Option<Expr>,
        order_by: Vec<OrderByStmt>,
        limits: Option<LimitsStmt>,
    ) -> Self {
        Query {
            path,
            fields,
            condition,
            order_by,
            limits,
            source: None,
        }
    }

    /// Binds the query to a schema. Sources are shared, read-only values;
    /// cloning the `Arc` is all rebinding costs.
    pub fn with_source(mut self, source: Arc<Source>) -> Self {
        self.source = Some(source);
        self
    }

    /// Slash-joined resource path, without a leading slash.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn fields(&self) -> &[Ident] {
        &self.fields
    }

    pub fn condition(&self) -> Option<&Expr> {
        self.condition.as_ref()
    }

    pub fn order_by(&self) -> &[OrderByStmt] {
        &self.order_by
    }

    pub fn limits(&self) -> Option<&LimitsStmt> {
        self.limits.as_ref()
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_deref()
    }

    /// Replaces the condition wholesale.
    pub fn rewrite_condition(&mut self, condition: Expr) {
        self.condition = Some(condition);
    }

    /// Installs `x op <current condition>` as the new condition, or just `x`
    /// when there is none. Handlers use this to force predicates the client
    /// cannot opt out of.
    pub fn wrap_condition(&mut self, x: Expr, op: Token) {
        self.condition = Some(match self.condition.take() {
            None => x,
            Some(current) => Expr::binary(op, x, current, 0),
        });
    }

    /// Compiles the query into a PostgreSQL `select` against `target`,
    /// which is substituted verbatim (a table name or subquery text).
    pub fn compile(&self, target: &str) -> Result<String> {
        transpiler::compile(self, target)
    }
}
