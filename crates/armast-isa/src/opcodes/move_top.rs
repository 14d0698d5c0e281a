//! MOVT: move to top half.

use armast_facts::{simplify_result, InstrXData};
use armast_ir::BinaryOp;

use super::{facts_usable, Opcode, OpcodeSemantics, ERROR_VALUE};
use crate::context::{LiftContext, LiftedInstrs};
use crate::emit::{emit_variable_intro, OperandEffects, VariableIntro};
use crate::error::LiftError;
use crate::operand::Operand;
use crate::record::{DecodedRecord, OperandTable};

/// `MOVT<c> <Rd>, #<imm16>`
///
/// - `tags[1]`: condition
/// - `args[0]`: Rd, `args[1]`: imm16
///
/// Bundle: `vars[0]` lhs; `xprs[0]` imm16, `xprs[1]` Rd, `xprs[2]` Rd mod
/// 2^16, `xprs[3]` result, `xprs[4]` result (simplified); `rdefs[0]` Rd,
/// `rdefs[1..]` simplified result; `uses[0]`, `useshigh[0]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveTop {
    rd: Operand,
    imm: Operand,
}

impl MoveTop {
    pub const MNEMONIC: &'static str = "MOVT";

    pub fn from_record(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        record.check_arity(Self::MNEMONIC, 2, 2)?;
        Ok(Opcode::MoveTop(Self {
            rd: operands.resolve(record, 0)?,
            imm: operands.resolve(record, 1)?,
        }))
    }
}

impl OpcodeSemantics for MoveTop {
    fn mnemonic(&self) -> &'static str {
        Self::MNEMONIC
    }

    fn operands(&self) -> Vec<&Operand> {
        vec![&self.rd, &self.imm]
    }

    fn annotation(&self, xdata: &InstrXData) -> String {
        if !xdata.is_ok() {
            return ERROR_VALUE.to_string();
        }
        let lhs = xdata.var(0).map_or_else(|| self.rd.to_string(), ToString::to_string);
        match (xdata.xpr(3), xdata.xpr(4)) {
            (Some(x), Some(y)) => format!("{lhs} := {}", simplify_result(x, y)),
            _ => format!("{lhs} := ({} << 16) + ({lhs} % 65536)", self.imm),
        }
    }

    /// Low level `Rd := (imm16 << 16) + (Rd % 65536)`.
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
        let site = ctx.site(address, bytes, &self.annotation(xdata));
        let mut effects = OperandEffects::default();
        let ll_lhs = effects.take(self.rd.ast_lvalue(ctx.ast, &site)?);
        let ll_rd = effects.take(self.rd.ast_rvalue(ctx.ast, &site)?);
        let imm = ctx.ast.mk_integer_constant(self.imm.value()?);
        let sixteen = ctx.ast.mk_integer_constant(16);
        let top = ctx.ast.mk_binary_op(BinaryOp::Lsl, imm, sixteen);
        let modulus = ctx.ast.mk_integer_constant(65536);
        let bottom = ctx.ast.mk_binary_op(BinaryOp::Mod, ll_rd, modulus);
        let ll_rhs = ctx.ast.mk_binary_op(BinaryOp::Plus, top, bottom);
        let lifted = emit_variable_intro(
            ctx,
            Self::MNEMONIC,
            &site,
            VariableIntro {
                ll_lhs,
                ll_rhs,
                ll_rdef_expr: Some(ll_rd),
                lhs: xdata.var(0),
                rhs: xdata.xpr(4),
                hl_rdefs: xdata.rdefs_in(1..),
                ll_rdefs: xdata.rdefs_in(..1),
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

    #[test]
    fn test_movt_low_level_operand_order() {
        let ops = OperandTable::new()
            .with(1, Operand::register(Register::R3))
            .with(2, Operand::immediate(0x2));
        let Opcode::MoveTop(movt) = MoveTop::from_record(&DecodedRecord::new(&["MOVT", ""], vec![1, 2]), &ops).unwrap()
        else {
            panic!("expected movt");
        };
        let result = XExpr::binary(
            BinaryOp::Plus,
            XExpr::binary(BinaryOp::Mod, XExpr::reg("R3"), XExpr::konst(65536)),
            XExpr::konst(0x20000),
        );
        let xd = InstrXData::new()
            .with_vars(vec![XVariable::register("R3")])
            .with_xprs(vec![
                XExpr::konst(2),
                XExpr::reg("R3"),
                XExpr::binary(BinaryOp::Mod, XExpr::reg("R3"), XExpr::konst(65536)),
                result,
                XExpr::konst(0x2_1000),
            ])
            .with_reaching_defs(vec![Some(ReachingDefinition::new("R3", vec![0x100]))]);
        assert_eq!(movt.annotation(&xd), "R3 := (R3 % 65536) + 131072 (= 135168)");

        let mut ast = AstBuilder::new();
        let config = LiftConfig::default();
        let mut ctx = LiftContext::new(&mut ast, &SymbolicResolver, &config);
        let lifted = movt.lift(&mut ctx, 0x104, "c0f20203", &xd).unwrap();
        assert_eq!(ast.instr_to_string(lifted.low[0]), "R3 := (2 << 16) + (R3 % 65536)");
        assert_eq!(ast.instr_to_string(lifted.high[0]), "R3 := 135168");
    }
}
