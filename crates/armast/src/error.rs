use armast_ir::AstError;
use armast_isa::LiftError;
use thiserror::Error;

/// Lifter errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Lift failed at {address:#x}: {source}")]
    Lift {
        address: u64,
        #[source]
        source: LiftError,
    },
    #[error("Opcode registry unavailable: {0}")]
    Registry(#[source] LiftError),
    #[error("AST error: {0}")]
    Ast(#[from] AstError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Address of the faulting instruction, if any.
    pub const fn address(&self) -> Option<u64> {
        match self {
            Self::Lift { address, .. } => Some(*address),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
