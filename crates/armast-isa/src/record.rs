//! Decoded instruction records.

use rustc_hash::FxHashMap;

use crate::error::LiftError;
use crate::operand::Operand;

/// Decoder output for one instruction: tags (mnemonic first) and args
/// (operand indices and flags).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedRecord {
    pub tags: Vec<String>,
    pub args: Vec<i64>,
}

impl DecodedRecord {
    pub fn new(tags: &[&str], args: Vec<i64>) -> Self {
        Self {
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            args,
        }
    }

    pub fn mnemonic(&self) -> Result<&str, LiftError> {
        self.tags
            .first()
            .map(String::as_str)
            .ok_or(LiftError::MissingMnemonic)
    }

    /// Condition code tag, if present.
    pub fn condition(&self) -> Option<&str> {
        self.tags.get(1).map(String::as_str).filter(|c| !c.is_empty())
    }

    /// Enforce an exact tag and argument count.
    pub fn check_arity(&self, opcode: &'static str, tags: usize, args: usize) -> Result<(), LiftError> {
        if self.tags.len() == tags && self.args.len() == args {
            Ok(())
        } else {
            Err(LiftError::DecodeArity {
                opcode,
                expected_tags: tags,
                expected_args: args,
                found_tags: self.tags.len(),
                found_args: self.args.len(),
            })
        }
    }

    pub fn arg(&self, index: usize) -> i64 {
        self.args.get(index).copied().unwrap_or_default()
    }
}

/// Operands referenced by index from decoded records.
#[derive(Clone, Debug, Default)]
pub struct OperandTable {
    operands: FxHashMap<i64, Operand>,
}

impl OperandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: i64, operand: Operand) {
        self.operands.insert(index, operand);
    }

    #[must_use]
    pub fn with(mut self, index: i64, operand: Operand) -> Self {
        self.insert(index, operand);
        self
    }

    pub fn get(&self, index: i64) -> Result<&Operand, LiftError> {
        self.operands
            .get(&index)
            .ok_or(LiftError::UnknownOperand(index))
    }

    /// Operand referenced by `record.args[arg]`, cloned for the opcode.
    pub fn resolve(&self, record: &DecodedRecord, arg: usize) -> Result<Operand, LiftError> {
        self.get(record.arg(arg)).cloned()
    }

    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }
}
