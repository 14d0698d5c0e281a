//! B: (conditional) branch.

use armast_facts::{simplify_result, InstrXData, XExpr};
use armast_ir::ExprId;
use tracing::error;

use super::{assembly_placeholder, facts_usable, BranchConditions, Opcode, OpcodeSemantics, ERROR_VALUE};
use crate::context::{LiftContext, LiftedInstrs};
use crate::emit::convert_rhs;
use crate::error::LiftError;
use crate::operand::Operand;
use crate::record::{DecodedRecord, OperandTable};

/// `B<c> <label>`
///
/// - `tags[1]`: condition
/// - `args[0]`: target
///
/// Conditional bundle: `xprs[0]` true condition, `xprs[1]` false condition,
/// `xprs[2]`/`xprs[3]` the same simplified, `xprs[4]` target. Unconditional
/// bundle: `xprs[0]` target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Branch {
    condition: Option<String>,
    target: Operand,
}

impl Branch {
    pub const MNEMONIC: &'static str = "B";

    pub fn from_record(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        record.check_arity(Self::MNEMONIC, 2, 1)?;
        Ok(Opcode::Branch(Self {
            condition: record.condition().map(str::to_string),
            target: operands.resolve(record, 0)?,
        }))
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

struct BranchFacts<'x>(&'x InstrXData);

impl<'x> BranchFacts<'x> {
    const fn conditional(&self) -> bool {
        self.0.has_branch_conditions()
    }

    fn txpr(&self) -> Option<&'x XExpr> {
        self.0.xpr(0)
    }

    fn fxpr(&self) -> Option<&'x XExpr> {
        self.0.xpr(1)
    }

    fn tcond(&self) -> Option<&'x XExpr> {
        self.0.xpr(2)
    }

    fn fcond(&self) -> Option<&'x XExpr> {
        self.0.xpr(3)
    }

    fn target(&self) -> Option<&'x XExpr> {
        self.0.xpr(if self.conditional() { 4 } else { 0 })
    }
}

impl OpcodeSemantics for Branch {
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
        let xd = BranchFacts(xdata);
        let target = xd
            .target()
            .map_or_else(|| self.target.to_string(), ToString::to_string);
        match (xd.conditional(), xd.txpr(), xd.tcond()) {
            (true, Some(txpr), Some(tcond)) => {
                format!("if {} then goto {target}", simplify_result(txpr, tcond))
            }
            _ => format!("goto {target}"),
        }
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
        let annotation = self.annotation(xdata);
        Ok(assembly_placeholder(ctx, Self::MNEMONIC, address, bytes, &annotation))
    }

    fn conditions<'x>(&self, xdata: &'x InstrXData) -> Option<BranchConditions<'x>> {
        let xd = BranchFacts(xdata);
        if !xdata.is_ok() || !xd.conditional() {
            return None;
        }
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
        let xd = BranchFacts(xdata);
        if !xd.conditional() {
            return Ok(None);
        }
        let literal = if reverse { xd.fxpr() } else { xd.txpr() };
        let (Some(literal), Some(conds)) = (literal, self.conditions(xdata)) else {
            error!(
                addr = format!("{address:#x}"),
                opcode = Self::MNEMONIC,
                "no condition expressions found; returning zero"
            );
            let zero = ctx.ast.mk_integer_constant(0);
            return Ok(Some((zero, zero)));
        };

        let zero = ctx.ast.mk_integer_constant(0);
        let ll_cond = convert_rhs(ctx, Self::MNEMONIC, address, Some(literal), zero)
            .first()
            .copied()
            .unwrap_or(zero);
        let hl_cond = convert_rhs(ctx, Self::MNEMONIC, address, Some(conds.select(reverse)), ll_cond)
            .first()
            .copied()
            .unwrap_or(ll_cond);

        let prov = ctx.ast.provenance_mut();
        prov.add_expr_mapping(hl_cond, ll_cond);
        prov.add_reaching_defs(hl_cond, xdata.rdefs_in(..));
        prov.add_condition_address(ll_cond, &[address]);
        prov.add_condition_address(hl_cond, &[address]);
        Ok(Some((hl_cond, ll_cond)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LiftConfig;
    use crate::register::Register;
    use armast_facts::SymbolicResolver;
    use armast_ir::{AstBuilder, BinaryOp};

    fn branch() -> Branch {
        Branch {
            condition: Some("NE".to_string()),
            target: Operand::absolute(0x1040),
        }
    }

    fn conditional_facts() -> InstrXData {
        let r0 = || XExpr::reg(Register::R0.name());
        InstrXData::new()
            .with_xprs(vec![
                XExpr::binary(BinaryOp::Ne, r0(), XExpr::konst(0)),
                XExpr::binary(BinaryOp::Eq, r0(), XExpr::konst(0)),
                XExpr::binary(BinaryOp::Ne, XExpr::reg("count"), XExpr::konst(0)),
                XExpr::binary(BinaryOp::Eq, XExpr::reg("count"), XExpr::konst(0)),
                XExpr::konst(0x1040),
            ])
            .with_branch_conditions()
    }

    #[test]
    fn test_arity() {
        let ops = OperandTable::new().with(1, Operand::absolute(0x10));
        let ok = DecodedRecord::new(&["B", "EQ"], vec![1]);
        assert!(Branch::from_record(&ok, &ops).is_ok());
        let bad = DecodedRecord::new(&["B"], vec![1]);
        assert!(matches!(
            Branch::from_record(&bad, &ops),
            Err(LiftError::DecodeArity { opcode: "B", .. })
        ));
    }

    #[test]
    fn test_annotation() {
        let b = branch();
        assert_eq!(
            b.annotation(&conditional_facts()),
            "if R0 != 0 (= count != 0) then goto 4160"
        );
        let plain = InstrXData::new().with_xprs(vec![XExpr::konst(0x2000)]);
        assert_eq!(b.annotation(&plain), "goto 8192");
        assert_eq!(b.annotation(&InstrXData::invalid("x")), ERROR_VALUE);
    }

    #[test]
    fn test_condition_levels() {
        let mut ast = AstBuilder::new();
        let config = LiftConfig::default();
        let mut ctx = LiftContext::new(&mut ast, &SymbolicResolver, &config);
        let xd = conditional_facts();
        let (hl, ll) = branch().condition_ast(&mut ctx, 0x1000, &xd, true).unwrap().unwrap();
        assert_eq!(ast.expr_to_string(ll), "R0 == 0");
        assert_eq!(ast.expr_to_string(hl), "count == 0");
        assert_eq!(ast.provenance().low_expr(hl), Some(ll));
        assert_eq!(ast.provenance().condition_addresses(ll), &[0x1000]);
    }

    #[test]
    fn test_lift_emits_shared_placeholder() {
        let mut ast = AstBuilder::new();
        let config = LiftConfig::default();
        let mut ctx = LiftContext::new(&mut ast, &SymbolicResolver, &config);
        let lifted = branch().lift(&mut ctx, 0x1000, "0a0000ea", &conditional_facts()).unwrap();
        assert_eq!(lifted.high, lifted.low);
        assert_eq!(ast.instr_to_string(lifted.low[0]), "nop (B)");
        assert_eq!(ast.provenance().low_instr(lifted.high[0]), Some(lifted.low[0]));
        assert_eq!(ast.provenance().instr_addresses(lifted.low[0]), &[0x1000]);

        let mut ctx = LiftContext::new(&mut ast, &SymbolicResolver, &config);
        let invalid = branch().lift(&mut ctx, 0x1004, "00", &InstrXData::invalid("x")).unwrap();
        assert!(invalid.is_empty());
    }

    #[test]
    fn test_unconditional_has_no_condition() {
        let mut ast = AstBuilder::new();
        let config = LiftConfig::default();
        let mut ctx = LiftContext::new(&mut ast, &SymbolicResolver, &config);
        let xd = InstrXData::new().with_xprs(vec![XExpr::konst(0x2000)]);
        assert!(branch().condition_ast(&mut ctx, 0x1000, &xd, false).unwrap().is_none());
        assert!(branch().conditions(&xd).is_none());
    }
}
