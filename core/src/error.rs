//! Error types raised by the parser and the SQL transpiler.

use thiserror::Error;

use crate::token::{Pos, Token};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A token the current production cannot accept, including `ILLEGAL`
    /// tokens surfaced by the scanner.
    #[error("unexpected {token} at {pos}")]
    Unexpected { token: Token, pos: Pos },

    /// A name that does not resolve to a column of the bound source.
    #[error("{name} at {pos} is not defined")]
    NotDefined { name: String, pos: Pos },

    /// An operand whose kind does not fit the operator or column type.
    #[error("{name} at {pos} must be {expected} not {got}")]
    TypeMismatch {
        name: String,
        pos: Pos,
        expected: String,
        got: String,
    },

    /// An offset/limit literal that does not survive a base-10 parse.
    #[error("invalid number {literal} at {pos}")]
    InvalidNumber { literal: String, pos: Pos },

    #[error("unexpected empty expression list")]
    EmptyExprList,

    /// Compilation attempted before binding the query to a source.
    #[error("source is not defined")]
    SourceNotDefined,

    /// Compilation attempted on a free-floating query with no path.
    #[error("path is not defined")]
    PathNotDefined,
}

impl Error {
    pub fn unexpected(token: Token, pos: Pos) -> Self {
        Error::Unexpected { token, pos }
    }

    pub fn not_defined(name: impl Into<String>, pos: Pos) -> Self {
        Error::NotDefined { name: name.into(), pos }
    }

    pub fn must_be(
        name: impl Into<String>,
        pos: Pos,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Error::TypeMismatch {
            name: name.into(),
            pos,
            expected: expected.into(),
            got: got.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
