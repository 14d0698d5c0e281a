//! CBZ / CBNZ: compare with zero and branch.

use armast_facts::{simplify_result, InstrXData, XExpr};
use armast_ir::{BinaryOp, ExprId};
use tracing::error;

use super::{assembly_placeholder, facts_usable, BranchConditions, Opcode, OpcodeSemantics, ERROR_VALUE};
use crate::context::{LiftContext, LiftedInstrs};
use crate::emit::convert_rhs;
use crate::error::LiftError;
use crate::operand::Operand;
use crate::record::{DecodedRecord, OperandTable};

/// `CBZ <Rn>, <label>` and `CBNZ <Rn>, <label>`
///
/// - `args[0]`: Rn
/// - `args[1]`: target
///
/// Bundle: `xprs[0]` Rn, `xprs[1]` true condition, `xprs[2]` false
/// condition, `xprs[3]`/`xprs[4]` the same simplified, `xprs[5]` target;
/// `rdefs[0]` Rn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompareBranch {
    nonzero: bool,
    rn: Operand,
    target: Operand,
}

impl CompareBranch {
    pub const CBZ: &'static str = "CBZ";
    pub const CBNZ: &'static str = "CBNZ";

    fn build(record: &DecodedRecord, operands: &OperandTable, nonzero: bool) -> Result<Opcode, LiftError> {
        let mnemonic = if nonzero { Self::CBNZ } else { Self::CBZ };
        record.check_arity(mnemonic, 1, 2)?;
        let rn = operands.resolve(record, 0)?;
        rn.reg()?;
        Ok(Opcode::CompareBranch(Self {
            nonzero,
            rn,
            target: operands.resolve(record, 1)?,
        }))
    }

    pub fn cbz(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        Self::build(record, operands, false)
    }

    pub fn cbnz(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        Self::build(record, operands, true)
    }

    /// Low-level test for the taken (`reverse == false`) or fall-through edge.
    const fn comparison(&self, reverse: bool) -> BinaryOp {
        if self.nonzero == reverse { BinaryOp::Eq } else { BinaryOp::Ne }
    }
}

struct CompareBranchFacts<'x>(&'x InstrXData);

impl<'x> CompareBranchFacts<'x> {
    fn txpr(&self) -> Option<&'x XExpr> {
        self.0.xpr(1)
    }

    fn tcond(&self) -> Option<&'x XExpr> {
        self.0.xpr(3)
    }

    fn fcond(&self) -> Option<&'x XExpr> {
        self.0.xpr(4)
    }

    fn target(&self) -> Option<&'x XExpr> {
        self.0.xpr(5)
    }
}

impl OpcodeSemantics for CompareBranch {
    fn mnemonic(&self) -> &'static str {
        if self.nonzero { Self::CBNZ } else { Self::CBZ }
    }

    fn operands(&self) -> Vec<&Operand> {
        vec![&self.rn, &self.target]
    }

    fn annotation(&self, xdata: &InstrXData) -> String {
        if !xdata.is_ok() {
            return ERROR_VALUE.to_string();
        }
        let xd = CompareBranchFacts(xdata);
        let target = xd
            .target()
            .map_or_else(|| self.target.to_string(), ToString::to_string);
        match (xd.txpr(), xd.tcond()) {
            (Some(txpr), Some(tcond)) => {
                format!("if {} then goto {target}", simplify_result(txpr, tcond))
            }
            _ => format!("if {} {} 0 then goto {target}", self.rn, self.comparison(false).symbol()),
        }
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
        let annotation = self.annotation(xdata);
        Ok(assembly_placeholder(ctx, self.mnemonic(), address, bytes, &annotation))
    }

    fn conditions<'x>(&self, xdata: &'x InstrXData) -> Option<BranchConditions<'x>> {
        if !xdata.is_ok() || !xdata.has_branch_conditions() {
            return None;
        }
        let xd = CompareBranchFacts(xdata);
        Some(BranchConditions {
            on_true: xd.tcond()?,
            on_false: xd.fcond()?,
        })
    }

    fn condition_ast(
        &self,
        ctx: &mut LiftContext<'_>,
        address: u64,
        xdata: &InstrXData,
        reverse: bool,
    ) -> Result<Option<(ExprId, ExprId)>, LiftError> {
        let ll_op = ctx.ast.mk_variable_expr(self.rn.reg()?.name());
        let zero = ctx.ast.mk_integer_constant(0);
        let ll_cond = ctx.ast.mk_binary_op(self.comparison(reverse), ll_op, zero);

        let Some(conds) = self.conditions(xdata) else {
            error!(
                addr = format!("{address:#x}"),
                opcode = self.mnemonic(),
                "no condition expressions found; returning zero"
            );
            return Ok(Some((zero, zero)));
        };

        let hl_cond = convert_rhs(ctx, self.mnemonic(), address, Some(conds.select(reverse)), ll_cond)
            .first()
            .copied()
            .unwrap_or(ll_cond);

        let prov = ctx.ast.provenance_mut();
        prov.add_expr_mapping(hl_cond, ll_cond);
        prov.add_reaching_defs(hl_cond, xdata.rdefs_in(..));
        prov.add_reaching_defs(ll_op, xdata.rdefs_in(..1));
        prov.add_condition_address(ll_cond, &[address]);
        prov.add_condition_address(hl_cond, &[address]);
        Ok(Some((hl_cond, ll_cond)))
    }
}
