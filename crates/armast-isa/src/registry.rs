//! Opcode registry: mnemonic tag → constructor.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use crate::error::LiftError;
use crate::opcodes::{
    BitfieldExtract, Branch, BranchExchange, BranchLink, CompareBranch, LoadMultiple, Move,
    MoveTop, Opcode, Preload, ReverseSubtract, StoreMultiple,
};
use crate::record::{DecodedRecord, OperandTable};

/// Builds an opcode from its decoded record, validating arity.
pub type OpcodeConstructor = fn(&DecodedRecord, &OperandTable) -> Result<Opcode, LiftError>;

/// Map from mnemonic tags to opcode constructors.
#[derive(Clone, Debug, Default)]
pub struct OpcodeRegistry {
    constructors: FxHashMap<String, OpcodeConstructor>,
}

static STANDARD: LazyLock<Result<OpcodeRegistry, LiftError>> = LazyLock::new(OpcodeRegistry::standard);

impl OpcodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every supported ARM opcode.
    pub fn standard() -> Result<Self, LiftError> {
        let mut registry = Self::new();
        registry.register("B", Branch::from_record)?;
        registry.register("BL", BranchLink::bl)?;
        registry.register("BLX", BranchLink::blx)?;
        registry.register("BX", BranchExchange::from_record)?;
        registry.register("CBZ", CompareBranch::cbz)?;
        registry.register("CBNZ", CompareBranch::cbnz)?;
        registry.register("LDM", LoadMultiple::from_record)?;
        registry.register("STM", StoreMultiple::from_record)?;
        registry.register("UBFX", BitfieldExtract::ubfx)?;
        registry.register("SBFX", BitfieldExtract::sbfx)?;
        registry.register("PLD", Preload::pld)?;
        registry.register("PLDW", Preload::pldw)?;
        registry.register("PLI", Preload::pli)?;
        registry.register("MOV", Move::from_record)?;
        registry.register("MOVT", MoveTop::from_record)?;
        registry.register("RSB", ReverseSubtract::from_record)?;
        Ok(registry)
    }

    /// Shared standard registry, built on first use.
    pub fn global() -> Result<&'static Self, LiftError> {
        STANDARD.as_ref().map_err(Clone::clone)
    }

    /// Register a constructor. A tag can only be registered once.
    pub fn register(&mut self, tag: &str, constructor: OpcodeConstructor) -> Result<(), LiftError> {
        if self.constructors.contains_key(tag) {
            return Err(LiftError::DuplicateTag(tag.to_string()));
        }
        self.constructors.insert(tag.to_string(), constructor);
        Ok(())
    }

    /// Construct the opcode named by the record's mnemonic.
    pub fn construct(&self, record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        let tag = record.mnemonic()?;
        let constructor = self
            .constructors
            .get(tag)
            .ok_or_else(|| LiftError::UnknownOpcode(tag.to_string()))?;
        constructor(record, operands)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::OpcodeSemantics;
    use crate::operand::Operand;
    use crate::register::Register;

    #[test]
    fn test_standard_registry() {
        let registry = OpcodeRegistry::global().unwrap();
        assert_eq!(registry.len(), 16);
        assert!(registry.contains("CBNZ"));
        assert!(!registry.contains("ADD"));
        assert_eq!(registry.tags()[0], "B");
    }

    #[test]
    fn test_duplicate_tag() {
        let mut registry = OpcodeRegistry::new();
        registry.register("B", Branch::from_record).unwrap();
        assert_eq!(
            registry.register("B", Branch::from_record),
            Err(LiftError::DuplicateTag("B".to_string()))
        );
    }

    #[test]
    fn test_unknown_opcode() {
        let registry = OpcodeRegistry::global().unwrap();
        let ops = OperandTable::new();
        let err = registry
            .construct(&DecodedRecord::new(&["ADD", ""], vec![]), &ops)
            .unwrap_err();
        assert_eq!(err, LiftError::UnknownOpcode("ADD".to_string()));
        let err = registry.construct(&DecodedRecord::new(&[], vec![]), &ops).unwrap_err();
        assert_eq!(err, LiftError::MissingMnemonic);
    }

    #[test]
    fn test_construct_dispatches() {
        let registry = OpcodeRegistry::global().unwrap();
        let ops = OperandTable::new()
            .with(1, Operand::register(Register::R2))
            .with(2, Operand::absolute(0x200));
        let op = registry
            .construct(&DecodedRecord::new(&["CBNZ"], vec![1, 2]), &ops)
            .unwrap();
        assert_eq!(op.mnemonic(), "CBNZ");
        assert_eq!(op.operands().len(), 2);
    }
}
