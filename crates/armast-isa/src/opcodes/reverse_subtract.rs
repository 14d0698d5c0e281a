//! RSB: reverse subtract.

use armast_facts::{simplify_result, InstrXData};
use armast_ir::BinaryOp;

use super::{facts_usable, Opcode, OpcodeSemantics, ERROR_VALUE};
use crate::context::{LiftContext, LiftedInstrs};
use crate::emit::{emit_variable_intro, OperandEffects, VariableIntro};
use crate::error::LiftError;
use crate::operand::Operand;
use crate::record::{DecodedRecord, OperandTable};

/// `RSB{S}<c> <Rd>, <Rn>, <Rm|#imm>`
///
/// - `tags[1]`: condition
/// - `args[0]`: S, `args[1]`: Rd, `args[2]`: Rn, `args[3]`: Rm or
///   immediate, `args[4]`: wide
///
/// Bundle: `vars[0]` lhs; `xprs[0]` Rn, `xprs[1]` Rm, `xprs[2]` Rm - Rn,
/// `xprs[3]` result (simplified); `rdefs[0]` Rn, `rdefs[1]` Rm, `rdefs[2..]`
/// simplified result; `uses[0]`, `useshigh[0]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReverseSubtract {
    setflags: bool,
    wide: bool,
    rd: Operand,
    rn: Operand,
    rm: Operand,
}

impl ReverseSubtract {
    pub const MNEMONIC: &'static str = "RSB";

    pub fn from_record(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        record.check_arity(Self::MNEMONIC, 2, 5)?;
        Ok(Opcode::ReverseSubtract(Self {
            setflags: record.arg(0) == 1,
            wide: record.arg(4) == 1,
            rd: operands.resolve(record, 1)?,
            rn: operands.resolve(record, 2)?,
            rm: operands.resolve(record, 3)?,
        }))
    }

    pub const fn is_wide(&self) -> bool {
        self.wide
    }
}

impl OpcodeSemantics for ReverseSubtract {
    fn mnemonic(&self) -> &'static str {
        if self.setflags { "RSBS" } else { Self::MNEMONIC }
    }

    fn operands(&self) -> Vec<&Operand> {
        vec![&self.rd, &self.rn, &self.rm]
    }

    fn annotation(&self, xdata: &InstrXData) -> String {
        if !xdata.is_ok() {
            return ERROR_VALUE.to_string();
        }
        let lhs = xdata.var(0).map_or_else(|| self.rd.to_string(), ToString::to_string);
        match (xdata.xpr(2), xdata.xpr(3)) {
            (Some(x), Some(y)) => format!("{lhs} := {}", simplify_result(x, y)),
            _ => format!("{lhs} := {} - {}", self.rm, self.rn),
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
        let site = ctx.site(address, bytes, &self.annotation(xdata));
        let mut effects = OperandEffects::default();
        let ll_lhs = effects.take(self.rd.ast_lvalue(ctx.ast, &site)?);
        let ll_op1 = effects.take(self.rn.ast_rvalue(ctx.ast, &site)?);
        let ll_op2 = effects.take(self.rm.ast_rvalue(ctx.ast, &site)?);
        let ll_rhs = ctx.ast.mk_binary_op(BinaryOp::Minus, ll_op2, ll_op1);

        let prov = ctx.ast.provenance_mut();
        prov.add_reaching_defs(ll_op1, xdata.rdefs_in(..1));
        prov.add_reaching_defs(ll_op2, xdata.rdefs_in(1..2));

        let lifted = emit_variable_intro(
            ctx,
            self.mnemonic(),
            &site,
            VariableIntro {
                ll_lhs,
                ll_rhs,
                ll_rdef_expr: None,
                lhs: xdata.var(0),
                rhs: xdata.xpr(3),
                hl_rdefs: xdata.rdefs_in(2..),
                ll_rdefs: xdata.rdefs_in(..2),
                defuse: xdata.defuse(0),
                defuse_high: xdata.defuse_high(0),
            },
        )?;
        Ok(effects.surround(ctx, &site, lifted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LiftConfig;
    use crate::register::Register;
    use armast_facts::{SymbolicResolver, XExpr, XVariable};
    use armast_ir::{AstBuilder, ReachingDefinition};

    fn rsb() -> ReverseSubtract {
        ReverseSubtract {
            setflags: false,
            wide: false,
            rd: Operand::register(Register::R0),
            rn: Operand::register(Register::R1),
            rm: Operand::immediate(0),
        }
    }

    #[test]
    fn test_negation() {
        let xd = InstrXData::new()
            .with_vars(vec![XVariable::register("R0")])
            .with_xprs(vec![
                XExpr::reg("R1"),
                XExpr::konst(0),
                XExpr::binary(BinaryOp::Minus, XExpr::konst(0), XExpr::reg("R1")),
                XExpr::binary(BinaryOp::Minus, XExpr::konst(0), XExpr::reg("delta")),
            ])
            .with_reaching_defs(vec![Some(ReachingDefinition::new("R1", vec![0x30])), None]);
        assert_eq!(rsb().annotation(&xd), "R0 := 0 - R1 (= 0 - delta)");

        let mut ast = AstBuilder::new();
        let config = LiftConfig::default();
        let mut ctx = LiftContext::new(&mut ast, &SymbolicResolver, &config);
        let lifted = rsb().lift(&mut ctx, 0x34, "000061e2", &xd).unwrap();
        assert_eq!(ast.instr_to_string(lifted.low[0]), "R0 := 0 - R1");
        assert_eq!(ast.instr_to_string(lifted.high[0]), "R0 := 0 - delta");
    }

    #[test]
    fn test_arity() {
        let ops = OperandTable::new()
            .with(1, Operand::register(Register::R0))
            .with(2, Operand::immediate(0));
        let rec = DecodedRecord::new(&["RSB", ""], vec![1, 1, 1, 2, 0]);
        let Opcode::ReverseSubtract(op) = ReverseSubtract::from_record(&rec, &ops).unwrap() else {
            panic!("expected rsb");
        };
        assert_eq!(op.mnemonic(), "RSBS");
        assert!(!op.is_wide());
        let short = DecodedRecord::new(&["RSB", ""], vec![1, 1, 1, 2]);
        assert!(ReverseSubtract::from_record(&short, &ops).is_err());
    }
}
