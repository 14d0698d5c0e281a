//! Lifting errors.

use armast_ir::AstError;
use thiserror::Error;

/// Contract violations while decoding or lifting an instruction.
///
/// All variants abort the enclosing function lift. Recoverable conditions
/// (bad facts, failed conversions) are logged and degrade the output instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiftError {
    #[error(
        "{opcode}: expected {expected_tags} tags and {expected_args} args, found {found_tags} and {found_args}"
    )]
    DecodeArity {
        opcode: &'static str,
        expected_tags: usize,
        expected_args: usize,
        found_tags: usize,
        found_args: usize,
    },
    #[error("Unknown opcode tag: {0}")]
    UnknownOpcode(String),
    #[error("Decoded record has no mnemonic")]
    MissingMnemonic,
    #[error("Opcode tag registered twice: {0}")]
    DuplicateTag(String),
    #[error("Unknown operand index: {0}")]
    UnknownOperand(i64),
    #[error("Operand {operand} is not {expected}")]
    OperandKind {
        operand: String,
        expected: &'static str,
    },
    #[error("Operand {0} cannot be assigned to")]
    NotAnLvalue(String),
    #[error("{0} is not a call")]
    NotACall(&'static str),
    #[error("{0}: call target not resolved")]
    UnresolvedCallTarget(&'static str),
    #[error("{opcode} at {address:#x}: expected one {what}, found {count}")]
    MultipleValues {
        opcode: &'static str,
        address: u64,
        what: &'static str,
        count: usize,
    },
    #[error("{opcode} at {address:#x}: no {what} recovered")]
    MissingValue {
        opcode: &'static str,
        address: u64,
        what: &'static str,
    },
    #[error(transparent)]
    Ast(#[from] AstError),
}

pub type Result<T> = std::result::Result<T, LiftError>;
