//! LDM: load multiple, increment after.

use armast_facts::{simplify_result, InstrXData, XExpr, XVariable};
use armast_ir::{BinaryOp, ExprId, InstrSite, LvalId};

use super::{facts_usable, Opcode, OpcodeSemantics, ERROR_VALUE};
use crate::context::{LiftContext, LiftedInstrs};
use crate::emit::{emit_variable_intro, OperandEffects, VariableIntro};
use crate::error::LiftError;
use crate::operand::Operand;
use crate::record::{DecodedRecord, OperandTable};
use crate::register::Register;

/// `LDM<c> <Rn>{!}, <registers>`
///
/// - `tags[1]`: condition
/// - `args[0]`: writeback
/// - `args[1]`: Rn
/// - `args[2]`: register list
/// - `args[3]`: base memory operand
///
/// Bundle for `n` registers:
/// - `vars[0]`: base lhs, `vars[1..=n]`: register lhss
/// - `xprs[0]`: base rhs, `xprs[1]`: updated base, `xprs[2]`: updated base
///   (simplified), `xprs[3..3+n]`: values loaded
/// - `rdefs[0]`: base, `rdefs[1..=n]`: memory locations
/// - `uses`/`useshigh` aligned with `vars`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadMultiple {
    writeback: bool,
    base: Operand,
    registers: Operand,
    memory: Operand,
}

impl LoadMultiple {
    pub const MNEMONIC: &'static str = "LDM";

    pub fn from_record(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        record.check_arity(Self::MNEMONIC, 2, 4)?;
        let registers = operands.resolve(record, 2)?;
        registers.registers()?;
        Ok(Opcode::LoadMultiple(Self {
            writeback: record.arg(0) == 1,
            base: operands.resolve(record, 1)?,
            registers,
            memory: operands.resolve(record, 3)?,
        }))
    }

    pub const fn writeback(&self) -> bool {
        self.writeback
    }

    fn register_list(&self) -> Result<&[Register], LiftError> {
        self.registers.registers()
    }
}

/// Fact accessors shared by the multiple-register transfers.
pub(super) struct MultipleFacts<'x>(pub(super) &'x InstrXData);

impl<'x> MultipleFacts<'x> {
    pub(super) fn base_lhs(&self) -> Option<&'x XVariable> {
        self.0.var(0)
    }

    pub(super) fn lhs(&self, k: usize) -> Option<&'x XVariable> {
        self.0.var(k + 1)
    }

    pub(super) fn base_update(&self) -> Option<&'x XExpr> {
        self.0.xpr(1)
    }

    pub(super) fn base_update_simplified(&self) -> Option<&'x XExpr> {
        self.0.xpr(2)
    }

    pub(super) fn value(&self, k: usize) -> Option<&'x XExpr> {
        self.0.xpr(k + 3)
    }

    /// `; base := update` when the base is written back.
    pub(super) fn writeback_annotation(&self, writeback: bool) -> String {
        match (writeback, self.base_lhs(), self.base_update(), self.base_update_simplified()) {
            (true, Some(lhs), Some(x), Some(y)) => format!("; {lhs} := {}", simplify_result(x, y)),
            _ => String::new(),
        }
    }
}

/// Low `base := base + 4*count` and its high-level counterpart.
pub(super) fn lift_writeback(
    ctx: &mut LiftContext<'_>,
    opcode: &'static str,
    site: &InstrSite,
    base: &Operand,
    count: usize,
    xdata: &InstrXData,
) -> Result<LiftedInstrs, LiftError> {
    let xd = MultipleFacts(xdata);
    let mut effects = OperandEffects::default();
    let ll_lhs = effects.take(base.ast_lvalue(ctx.ast, site)?);
    let ll_base = effects.take(base.ast_rvalue(ctx.ast, site)?);
    let incr = ctx.ast.mk_integer_constant(4 * i64::try_from(count).unwrap_or_default());
    let ll_rhs = ctx.ast.mk_binary_op(BinaryOp::Plus, ll_base, incr);
    let rdefs: Vec<_> = xdata.rdefs_in(..1);
    let lifted = emit_variable_intro(
        ctx,
        opcode,
        site,
        VariableIntro {
            ll_lhs,
            ll_rhs,
            ll_rdef_expr: None,
            lhs: xd.base_lhs(),
            rhs: xd.base_update_simplified(),
            hl_rdefs: rdefs.clone(),
            ll_rdefs: rdefs,
            defuse: xdata.defuse(0),
            defuse_high: xdata.defuse_high(0),
        },
    )?;
    Ok(effects.surround(ctx, site, lifted))
}

/// `*(base + 4*k)`
pub(super) fn slot_address(ctx: &mut LiftContext<'_>, base: ExprId, k: usize) -> ExprId {
    let offset = ctx.ast.mk_integer_constant(4 * i64::try_from(k).unwrap_or_default());
    ctx.ast.mk_binary_op(BinaryOp::Plus, base, offset)
}

impl OpcodeSemantics for LoadMultiple {
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
                let lhs = xd.lhs(k).map_or_else(|| reg.to_string(), ToString::to_string);
                let rhs = xd.value(k).map_or_else(|| "?".to_string(), ToString::to_string);
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
            let ll_lhs: LvalId = ctx.ast.mk_variable_lval(reg.name());
            let ll_rhs = ctx.ast.mk_memref_expr(addr);
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
