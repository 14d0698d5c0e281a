//! BX: branch and exchange.

use armast_facts::{CallTarget, InstrXData, XExpr};
use armast_ir::ExprId;
use tracing::error;

use super::call::{argument_count, arguments, call_annotation, call_target, lift_call};
use super::{facts_usable, BranchConditions, Opcode, OpcodeSemantics, ERROR_VALUE};
use crate::context::{LiftContext, LiftedInstrs};
use crate::emit::convert_rhs;
use crate::error::LiftError;
use crate::operand::Operand;
use crate::record::{DecodedRecord, OperandTable};
use crate::register::Register;

/// `BX<c> <Rm>`
///
/// - `tags[1]`: condition
/// - `args[0]`: target register
///
/// Bundle: `xprs[0]` target, `xprs[1]` target (rewritten). Bundles tagged as
/// calls follow the call layout instead. A conditional BX carries the taken
/// condition in `xprs[0]` and the fall-through condition in `xprs[1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchExchange {
    target: Operand,
}

impl BranchExchange {
    pub const MNEMONIC: &'static str = "BX";

    pub fn from_record(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        record.check_arity(Self::MNEMONIC, 2, 1)?;
        Ok(Opcode::BranchExchange(Self {
            target: operands.resolve(record, 0)?,
        }))
    }

    /// Branch to the link register.
    pub fn is_return_instruction(&self) -> bool {
        self.target.reg().is_ok_and(|r| r == Register::LR)
    }

    /// Rewritten return value, when the analysis recovered one.
    pub const fn return_value(xdata: &InstrXData) -> Option<&XExpr> {
        xdata.return_xpr.as_ref()
    }
}

impl OpcodeSemantics for BranchExchange {
    fn mnemonic(&self) -> &'static str {
        Self::MNEMONIC
    }

    fn operands(&self) -> Vec<&Operand> {
        vec![&self.target]
    }

    fn annotation(&self, xdata: &InstrXData) -> String {
        if !xdata.is_ok() {
            return ERROR_VALUE.to_string();
        }
        if self.is_call(xdata) {
            return call_annotation(Self::MNEMONIC, xdata, &self.target);
        }
        if let Some(rv) = Self::return_value(xdata) {
            return format!("return {rv}");
        }
        if let Some(conds) = self.conditions(xdata) {
            return format!("if {} then goto {}", conds.on_true, self.target);
        }
        let target = xdata
            .xpr(1)
            .map_or_else(|| self.target.to_string(), ToString::to_string);
        format!("goto {target}")
    }

    /// A call-classified BX lifts as a call; anything else leaves a low-level
    /// placeholder. A branch to LR is not turned into a return.
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
        if self.is_call(xdata) && xdata.call_target.is_some() {
            return lift_call(ctx, Self::MNEMONIC, address, bytes, xdata, &self.target);
        }
        let site = ctx.site(address, bytes, &self.annotation(xdata));
        let nop = ctx.ast.mk_nop_instruction(Self::MNEMONIC, site);
        ctx.record_spans(&[nop], address);
        Ok(LiftedInstrs::new(Vec::new(), vec![nop]))
    }

    fn conditions<'x>(&self, xdata: &'x InstrXData) -> Option<BranchConditions<'x>> {
        if !xdata.is_ok() || !xdata.has_branch_conditions() {
            return None;
        }
        Some(BranchConditions {
            on_true: xdata.xpr(0)?,
            on_false: xdata.xpr(1)?,
        })
    }

    /// The bundle holds a single form of each condition; both levels are
    /// built from it.
    fn condition_ast(
        &self,
        ctx: &mut LiftContext<'_>,
        address: u64,
        xdata: &InstrXData,
        reverse: bool,
    ) -> Result<Option<(ExprId, ExprId)>, LiftError> {
        if !xdata.has_branch_conditions() {
            return Ok(None);
        }
        let zero = ctx.ast.mk_integer_constant(0);
        let Some(conds) = self.conditions(xdata) else {
            error!(
                addr = format!("{address:#x}"),
                opcode = Self::MNEMONIC,
                "no condition expressions found; returning zero"
            );
            return Ok(Some((zero, zero)));
        };

        let ll_cond = convert_rhs(ctx, Self::MNEMONIC, address, Some(conds.select(reverse)), zero)
            .first()
            .copied()
            .unwrap_or(zero);
        let prov = ctx.ast.provenance_mut();
        prov.add_expr_mapping(ll_cond, ll_cond);
        prov.add_reaching_defs(ll_cond, xdata.rdefs_in(..));
        prov.add_condition_address(ll_cond, &[address]);
        Ok(Some((ll_cond, ll_cond)))
    }

    fn is_call(&self, xdata: &InstrXData) -> bool {
        xdata.has_call_tag()
    }

    fn call_target(&self, xdata: &InstrXData) -> Result<CallTarget, LiftError> {
        if !self.is_call(xdata) {
            return Err(LiftError::NotACall(Self::MNEMONIC));
        }
        call_target(Self::MNEMONIC, xdata, &self.target)
    }

    fn argument_count(&self, xdata: &InstrXData) -> Result<usize, LiftError> {
        let target = self.call_target(xdata)?;
        Ok(argument_count(Self::MNEMONIC, &target))
    }

    fn arguments<'x>(&self, xdata: &'x InstrXData) -> Result<&'x [XExpr], LiftError> {
        let count = self.argument_count(xdata)?;
        Ok(arguments(xdata, count))
    }
}
