//! BL / BLX: branch with link.

use armast_facts::{CallTarget, InstrXData, XExpr};

use super::call::{argument_count, arguments, call_annotation, call_target, lift_call};
use super::{facts_usable, Opcode, OpcodeSemantics, ERROR_VALUE};
use crate::context::{LiftContext, LiftedInstrs};
use crate::error::LiftError;
use crate::operand::Operand;
use crate::record::{DecodedRecord, OperandTable};

/// `BL<c> <label>` and `BLX<c> <label|Rm>`
///
/// - `tags[1]`: condition
/// - `args[0]`: target
///
/// Always a call; the bundle follows the call layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchLink {
    exchange: bool,
    target: Operand,
}

impl BranchLink {
    pub const BL: &'static str = "BL";
    pub const BLX: &'static str = "BLX";

    fn build(record: &DecodedRecord, operands: &OperandTable, exchange: bool) -> Result<Opcode, LiftError> {
        let mnemonic = if exchange { Self::BLX } else { Self::BL };
        record.check_arity(mnemonic, 2, 1)?;
        Ok(Opcode::BranchLink(Self {
            exchange,
            target: operands.resolve(record, 0)?,
        }))
    }

    pub fn bl(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        Self::build(record, operands, false)
    }

    pub fn blx(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        Self::build(record, operands, true)
    }
}

impl OpcodeSemantics for BranchLink {
    fn mnemonic(&self) -> &'static str {
        if self.exchange { Self::BLX } else { Self::BL }
    }

    fn operands(&self) -> Vec<&Operand> {
        vec![&self.target]
    }

    fn annotation(&self, xdata: &InstrXData) -> String {
        if !xdata.is_ok() {
            return ERROR_VALUE.to_string();
        }
        call_annotation(self.mnemonic(), xdata, &self.target)
    }

    fn lift(
        &self,
        ctx: &mut LiftContext<'_>,
        address: u64,
        bytes: &str,
        xdata: &InstrXData,
    ) -> Result<LiftedInstrs, LiftError> {
        if !facts_usable(self.mnemonic(), address, xdata) {
            return Ok(LiftedInstrs::default());
        }
        lift_call(ctx, self.mnemonic(), address, bytes, xdata, &self.target)
    }

    fn is_call(&self, _xdata: &InstrXData) -> bool {
        true
    }

    fn call_target(&self, xdata: &InstrXData) -> Result<CallTarget, LiftError> {
        call_target(self.mnemonic(), xdata, &self.target)
    }

    fn argument_count(&self, xdata: &InstrXData) -> Result<usize, LiftError> {
        let target = self.call_target(xdata)?;
        Ok(argument_count(self.mnemonic(), &target))
    }

    fn arguments<'x>(&self, xdata: &'x InstrXData) -> Result<&'x [XExpr], LiftError> {
        let count = self.argument_count(xdata)?;
        Ok(arguments(xdata, count))
    }
}
