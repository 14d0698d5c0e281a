//! AST construction errors.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AstError {
    #[error("Unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },
    #[error("Conflicting compinfo for key {key}: {existing} vs {new}")]
    CompInfoConflict {
        key: i64,
        existing: String,
        new: String,
    },
    #[error("Symbol already declared: {0}")]
    DuplicateSymbol(String),
    #[error("Prototype of {0} is not a function type")]
    NotAFunctionType(String),
}

pub type Result<T> = std::result::Result<T, AstError>;
