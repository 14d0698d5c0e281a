//! Conversion errors.

use thiserror::Error;

/// A recovered value could not be turned into an AST fragment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Unresolved value: {0}")]
    Unresolved(String),
    #[error("Temporary variable has no AST counterpart: {0}")]
    Temporary(String),
    #[error("Expected one fragment for {expr}, got {count}")]
    Ambiguous { expr: String, count: usize },
}

pub type Result<T> = std::result::Result<T, ConversionError>;
