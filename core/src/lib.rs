//! URL-shaped query DSL compiled to PostgreSQL.
//!
//! A client ships a single compact expression — path, projection, filter,
//! sort, bounds — and gets back a well-formed `select` whose JSON path
//! dereferences, casts, containment operators and subqueries follow the
//! semantic type of every referenced column:
//!
//! ```ignore
//! use std::sync::Arc;
//! use wql_core::{Col, Cols, Datatype, Parser, Source};
//!
//! let source = Arc::new(Source::new(
//!     Cols::new().with_col(Col::new(Datatype::String, "name", "name", false)),
//! ));
//! let query = Parser::new().parse("/users?name~=\"smith\":+name[:50]")?;
//! let sql = query.with_source(source).compile("users")?;
//! assert_eq!(sql, "select * from users where name like '%smith%' order by name asc limit 50");
//! ```
//!
//! The pipeline: [`scanner`] tokenizes, [`parser`] builds the [`ast`] and
//! rearranges operator precedence, [`source`] answers schema questions, and
//! [`transpiler`] emits SQL. Everything is synchronous and CPU-bound; the
//! schema is immutable after construction and freely shareable.

pub mod ast;
pub mod error;
pub mod parser;
pub mod query;
pub mod scanner;
pub mod source;
pub mod token;
pub mod transpiler;

pub use error::{Error, Result};
pub use parser::Parser;
pub use query::Query;
pub use scanner::Scanner;
pub use source::{Col, Cols, Datatype, Source};
pub use token::{Pos, Token};
