//! Declarative schema for a routable data source.
//!
//! A [`Source`] enumerates columns with their semantic types, array flags,
//! and — for JSON objects — recursive child columns. The DSL and error
//! messages speak in `name`; the emitted SQL speaks in `db_name`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Datatype {
    Number,
    String,
    Bool,
    Time,
    Object,
}

/// One column of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Col {
    pub datatype: Datatype,
    pub is_array: bool,
    /// Name used by clients in the query DSL.
    pub name: String,
    /// Name emitted into SQL.
    pub db_name: String,
    pub required: bool,
    /// Non-empty only for `Datatype::Object`.
    pub children: Cols,
}

impl Col {
    pub fn new(
        datatype: Datatype,
        name: impl Into<String>,
        db_name: impl Into<String>,
        is_array: bool,
    ) -> Self {
        Col {
            datatype,
            is_array,
            name: name.into(),
            db_name: db_name.into(),
            required: false,
            children: Cols::default(),
        }
    }

    pub fn with_children(mut self, children: Cols) -> Self {
        self.children = children;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Column catalogue keyed by DSL name. Dotted names resolve recursively
/// through object children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cols(HashMap<String, Col>);

impl Cols {
    pub fn new() -> Self {
        Cols::default()
    }

    pub fn with_col(mut self, col: Col) -> Self {
        self.0.insert(col.name.clone(), col);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolves a possibly dotted name to its terminal column.
    pub fn by_name(&self, name: &str) -> Option<&Col> {
        match name.split_once('.') {
            None => self.0.get(name),
            Some((head, rest)) => self.0.get(head)?.children.by_name(rest),
        }
    }

    /// Semantic type of the resolved column.
    pub fn datatype(&self, name: &str) -> Option<Datatype> {
        self.by_name(name).map(|col| col.datatype)
    }

    /// The `#>>` path for a dotted name: the `db_name`s of the resolution
    /// chain from the second element on, comma-joined. `None` for flat
    /// names and broken chains — the first element is the outer column
    /// reference, not part of the path.
    pub fn json_path(&self, name: &str) -> Option<String> {
        let path = self.path_by_name(name)?;
        if path.len() < 2 {
            return None;
        }
        Some(path[1..].join(","))
    }

    fn path_by_name(&self, name: &str) -> Option<Vec<&str>> {
        match name.split_once('.') {
            None => self.0.get(name).map(|col| vec![col.db_name.as_str()]),
            Some((head, rest)) => {
                let col = self.0.get(head)?;
                let mut path = vec![col.db_name.as_str()];
                path.extend(col.children.path_by_name(rest)?);
                Some(path)
            }
        }
    }
}

/// A named schema attached to a routable path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub cols: Cols,
}

impl Source {
    pub fn new(cols: Cols) -> Self {
        Source { cols }
    }
}
