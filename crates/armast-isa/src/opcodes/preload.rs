//! PLD / PLDW / PLI: preload hints.

use armast_facts::InstrXData;
use tracing::trace;

use super::{facts_usable, Opcode, OpcodeSemantics, ERROR_VALUE};
use crate::context::{LiftContext, LiftedInstrs};
use crate::error::LiftError;
use crate::operand::Operand;
use crate::record::{DecodedRecord, OperandTable};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreloadKind {
    Data,
    DataWrite,
    Instruction,
}

/// `PLD{W}<c> [<Rn>, #<imm>]` and `PLI<c> [<Rn>, #<imm>]`
///
/// PLD/PLDW: `args[0]` is-write, `args[1]` base, `args[2]` memory operand.
/// PLI: `args[0]` base, `args[1]` memory operand.
///
/// Bundle: `xprs[0]` base value, `xprs[1]` memory location. Hints produce no
/// instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preload {
    kind: PreloadKind,
    base: Operand,
    memory: Operand,
}

impl Preload {
    pub const PLD: &'static str = "PLD";
    pub const PLDW: &'static str = "PLDW";
    pub const PLI: &'static str = "PLI";

    fn data(record: &DecodedRecord, operands: &OperandTable, kind: PreloadKind) -> Result<Opcode, LiftError> {
        let mnemonic = if kind == PreloadKind::DataWrite { Self::PLDW } else { Self::PLD };
        record.check_arity(mnemonic, 2, 3)?;
        Ok(Opcode::Preload(Self {
            kind,
            base: operands.resolve(record, 1)?,
            memory: operands.resolve(record, 2)?,
        }))
    }

    pub fn pld(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        Self::data(record, operands, PreloadKind::Data)
    }

    pub fn pldw(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        Self::data(record, operands, PreloadKind::DataWrite)
    }

    pub fn pli(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        record.check_arity(Self::PLI, 2, 2)?;
        Ok(Opcode::Preload(Self {
            kind: PreloadKind::Instruction,
            base: operands.resolve(record, 0)?,
            memory: operands.resolve(record, 1)?,
        }))
    }

    pub const fn kind(&self) -> PreloadKind {
        self.kind
    }

    pub const fn base(&self) -> &Operand {
        &self.base
    }
}

impl OpcodeSemantics for Preload {
    fn mnemonic(&self) -> &'static str {
        match self.kind {
            PreloadKind::Data => Self::PLD,
            PreloadKind::DataWrite => Self::PLDW,
            PreloadKind::Instruction => Self::PLI,
        }
    }

    fn operands(&self) -> Vec<&Operand> {
        vec![&self.memory]
    }

    fn annotation(&self, xdata: &InstrXData) -> String {
        if !xdata.is_ok() {
            return ERROR_VALUE.to_string();
        }
        let location = xdata
            .xpr(1)
            .map_or_else(|| self.memory.to_string(), ToString::to_string);
        match self.kind {
            PreloadKind::Data | PreloadKind::DataWrite => format!("Preload-data({location})"),
            PreloadKind::Instruction => format!("Preload-instruction({location})"),
        }
    }

    /// Preloads carry no data flow; only the annotation is kept.
    fn lift(
        &self,
        _ctx: &mut LiftContext<'_>,
        address: u64,
        _bytes: &str,
        xdata: &InstrXData,
    ) -> Result<LiftedInstrs, LiftError> {
        if facts_usable(self.mnemonic(), address, xdata) {
            trace!(addr = format!("{address:#x}"), opcode = self.mnemonic(), "preload lifts to nothing");
        }
        Ok(LiftedInstrs::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LiftConfig;
    use crate::operand::Writeback;
    use crate::register::Register;
    use armast_facts::{SymbolicResolver, XExpr};
    use armast_ir::AstBuilder;

    fn table() -> OperandTable {
        OperandTable::new()
            .with(1, Operand::register(Register::R2))
            .with(2, Operand::indirect(Register::R2, 32, Writeback::Offset))
    }

    #[test]
    fn test_arity() {
        let ops = table();
        assert!(Preload::pld(&DecodedRecord::new(&["PLD", ""], vec![0, 1, 2]), &ops).is_ok());
        assert!(Preload::pldw(&DecodedRecord::new(&["PLDW", ""], vec![1, 1, 2]), &ops).is_ok());
        assert!(Preload::pli(&DecodedRecord::new(&["PLI", ""], vec![1, 2]), &ops).is_ok());
        assert!(matches!(
            Preload::pli(&DecodedRecord::new(&["PLI", ""], vec![0, 1, 2]), &ops),
            Err(LiftError::DecodeArity { opcode: "PLI", expected_args: 2, .. })
        ));
    }

    #[test]
    fn test_annotation_only() {
        let ops = table();
        let Opcode::Preload(pld) = Preload::pld(&DecodedRecord::new(&["PLD", ""], vec![0, 1, 2]), &ops).unwrap()
        else {
            panic!("expected preload");
        };
        let xd = InstrXData::new().with_xprs(vec![XExpr::reg("R2"), XExpr::reg("buf")]);
        assert_eq!(pld.annotation(&xd), "Preload-data(buf)");
        assert_eq!(pld.operands().len(), 1);

        let mut ast = AstBuilder::new();
        let config = LiftConfig::default();
        let mut ctx = LiftContext::new(&mut ast, &SymbolicResolver, &config);
        assert!(pld.lift(&mut ctx, 0x10, "20f0d2f5", &xd).unwrap().is_empty());
        let invalid = InstrXData::invalid("no invariants");
        assert!(pld.lift(&mut ctx, 0x14, "20f0d2f5", &invalid).unwrap().is_empty());
        assert_eq!(ast.instr_count(), 0);
    }

    #[test]
    fn test_pli_annotation() {
        let pli = Preload {
            kind: PreloadKind::Instruction,
            base: Operand::register(Register::R2),
            memory: Operand::indirect(Register::R2, 0, Writeback::Offset),
        };
        let xd = InstrXData::new().with_xprs(vec![XExpr::reg("R2"), XExpr::reg("handler")]);
        assert_eq!(pli.annotation(&xd), "Preload-instruction(handler)");
        assert_eq!(pli.annotation(&InstrXData::invalid("bad")), ERROR_VALUE);
    }
}
