//! STM: store multiple, increment after.

use armast_facts::InstrXData;

use super::load_multiple::{lift_writeback, slot_address, MultipleFacts};
use super::{facts_usable, Opcode, OpcodeSemantics, ERROR_VALUE};
use crate::context::{LiftContext, LiftedInstrs};
use crate::emit::{emit_variable_intro, OperandEffects, VariableIntro};
use crate::error::LiftError;
use crate::operand::Operand;
use crate::record::{DecodedRecord, OperandTable};
use crate::register::Register;

/// `STM<c> <Rn>{!}, <registers>`
///
/// Same record layout as LDM. Bundle for `n` registers:
/// - `vars[0]`: base lhs, `vars[1..=n]`: memory lhss
/// - `xprs[0]`: base rhs, `xprs[1]`: updated base, `xprs[2]`: updated base
///   (simplified), `xprs[3..3+n]`: values stored
/// - `rdefs[0]`: base, `rdefs[1..=n]`: stored registers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreMultiple {
    writeback: bool,
    base: Operand,
    registers: Operand,
    memory: Operand,
}

impl StoreMultiple {
    pub const MNEMONIC: &'static str = "STM";

    pub fn from_record(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        record.check_arity(Self::MNEMONIC, 2, 4)?;
        let registers = operands.resolve(record, 2)?;
        registers.registers()?;
        Ok(Opcode::StoreMultiple(Self {
            writeback: record.arg(0) == 1,
            base: operands.resolve(record, 1)?,
            registers,
            memory: operands.resolve(record, 3)?,
        }))
    }

    fn register_list(&self) -> Result<&[Register], LiftError> {
        self.registers.registers()
    }
}

impl OpcodeSemantics for StoreMultiple {
    fn mnemonic(&self) -> &'static str {
        Self::MNEMONIC
    }

    fn operands(&self) -> Vec<&Operand> {
        vec![&self.base, &self.registers, &self.memory]
    }

    fn annotation(&self, xdata: &InstrXData) -> String {
        if !xdata.is_ok() {
            return ERROR_VALUE.to_string();
        }
        let xd = MultipleFacts(xdata);
        let regs = self.register_list().unwrap_or_default();
        let assigns: Vec<String> = regs
            .iter()
            .enumerate()
            .map(|(k, reg)| {
                let lhs = xd.lhs(k).map_or_else(|| "?".to_string(), ToString::to_string);
                let rhs = xd.value(k).map_or_else(|| reg.to_string(), ToString::to_string);
                format!("{lhs} := {rhs}")
            })
            .collect();
        assigns.join("; ") + &xd.writeback_annotation(self.writeback)
    }

    fn lift(
        &self,
        ctx: &mut LiftContext<'_>,
        address: u64,
        bytes: &str,
        xdata: &InstrXData,
    ) -> Result<LiftedInstrs, LiftError> {
        if !facts_usable(Self::MNEMONIC, address, xdata) {
            return Ok(LiftedInstrs::default());
        }
        let xd = MultipleFacts(xdata);
        let site = ctx.site(address, bytes, &self.annotation(xdata));
        let mut effects = OperandEffects::default();
        let ll_base = effects.take(self.base.ast_rvalue(ctx.ast, &site)?);
        let regs = self.register_list()?;

        let mut lifted = LiftedInstrs::default();
        for (k, reg) in regs.iter().enumerate() {
            let addr = slot_address(ctx, ll_base, k);
            let ll_lhs = ctx.ast.mk_memref_lval(addr);
            let ll_rhs = ctx.ast.mk_variable_expr(reg.name());
            let rdefs = xdata.rdefs_in(k + 1..=k + 1);
            let pair = emit_variable_intro(
                ctx,
                Self::MNEMONIC,
                &site,
                VariableIntro {
                    ll_lhs,
                    ll_rhs,
                    ll_rdef_expr: None,
                    lhs: xd.lhs(k),
                    rhs: xd.value(k),
                    hl_rdefs: rdefs.clone(),
                    ll_rdefs: rdefs,
                    defuse: xdata.defuse(k + 1),
                    defuse_high: xdata.defuse_high(k + 1),
                },
            )?;
            lifted.high.extend(pair.high);
            lifted.low.extend(pair.low);
        }

        if self.writeback {
            let pair = lift_writeback(ctx, Self::MNEMONIC, &site, &self.base, regs.len(), xdata)?;
            lifted.high.extend(pair.high);
            lifted.low.extend(pair.low);
        }
        Ok(effects.surround(ctx, &site, lifted))
    }
}
