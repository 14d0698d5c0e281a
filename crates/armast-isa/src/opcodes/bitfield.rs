//! UBFX / SBFX: bit field extract.

use armast_facts::{simplify_result, InstrXData};
use armast_ir::{BinaryOp, ExprId};

use super::{facts_usable, Opcode, OpcodeSemantics, ERROR_VALUE};
use crate::context::{LiftContext, LiftedInstrs};
use crate::emit::{emit_variable_intro, OperandEffects, VariableIntro};
use crate::error::LiftError;
use crate::operand::Operand;
use crate::record::{DecodedRecord, OperandTable};

/// `UBFX<c> <Rd>, <Rn>, #<lsb>, #<width>` and the signed `SBFX`.
///
/// - `tags[1]`: condition
/// - `args[0]`: Rd, `args[1]`: Rn, `args[2]`: lsb, `args[3]`: width
///
/// Bundle: `vars[0]` lhs; `xprs[0]` Rn, `xprs[1]` result (simplified);
/// `rdefs[0]` Rn, `rdefs[1..]` simplified result; `uses[0]`, `useshigh[0]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitfieldExtract {
    signed: bool,
    rd: Operand,
    rn: Operand,
    lsb: Operand,
    width: Operand,
}

impl BitfieldExtract {
    pub const UBFX: &'static str = "UBFX";
    pub const SBFX: &'static str = "SBFX";

    fn build(record: &DecodedRecord, operands: &OperandTable, signed: bool) -> Result<Opcode, LiftError> {
        let mnemonic = if signed { Self::SBFX } else { Self::UBFX };
        record.check_arity(mnemonic, 2, 4)?;
        Ok(Opcode::BitfieldExtract(Self {
            signed,
            rd: operands.resolve(record, 0)?,
            rn: operands.resolve(record, 1)?,
            lsb: operands.resolve(record, 2)?,
            width: operands.resolve(record, 3)?,
        }))
    }

    pub fn ubfx(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        Self::build(record, operands, false)
    }

    pub fn sbfx(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        Self::build(record, operands, true)
    }

    /// `(Rn >> lsb) & mask`, or `(Rn << (32 - lsb - width)) s>> (32 - width)`
    /// when signed.
    fn extraction(&self, ctx: &mut LiftContext<'_>, rn: ExprId) -> Result<ExprId, LiftError> {
        let lsb = self.lsb.value()?;
        let width = self.width.value()?;
        let ast = &mut *ctx.ast;
        if self.signed {
            let up = ast.mk_integer_constant(32 - lsb - width);
            let down = ast.mk_integer_constant(32 - width);
            let shifted = ast.mk_binary_op(BinaryOp::Lsl, rn, up);
            Ok(ast.mk_binary_op(BinaryOp::Asr, shifted, down))
        } else {
            let shift = ast.mk_integer_constant(lsb);
            let mask = ast.mk_integer_constant((1_i128 << width.clamp(0, 64)) - 1);
            let shifted = ast.mk_binary_op(BinaryOp::Lsr, rn, shift);
            Ok(ast.mk_binary_op(BinaryOp::BAnd, shifted, mask))
        }
    }
}

impl OpcodeSemantics for BitfieldExtract {
    fn mnemonic(&self) -> &'static str {
        if self.signed { Self::SBFX } else { Self::UBFX }
    }

    fn operands(&self) -> Vec<&Operand> {
        vec![&self.rd, &self.rn, &self.lsb, &self.width]
    }

    fn annotation(&self, xdata: &InstrXData) -> String {
        if !xdata.is_ok() {
            return ERROR_VALUE.to_string();
        }
        let lhs = xdata.var(0).map_or_else(|| self.rd.to_string(), ToString::to_string);
        match (xdata.xpr(0), xdata.xpr(1)) {
            (Some(x), Some(y)) => format!("{lhs} := {}", simplify_result(x, y)),
            _ => format!("{lhs} := ?"),
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
        let ll_rn = effects.take(self.rn.ast_rvalue(ctx.ast, &site)?);
        let ll_rhs = self.extraction(ctx, ll_rn)?;
        let lifted = emit_variable_intro(
            ctx,
            self.mnemonic(),
            &site,
            VariableIntro {
                ll_lhs,
                ll_rhs,
                ll_rdef_expr: Some(ll_rn),
                lhs: xdata.var(0),
                rhs: xdata.xpr(1),
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

    fn bfx(signed: bool) -> BitfieldExtract {
        BitfieldExtract {
            signed,
            rd: Operand::register(Register::R0),
            rn: Operand::register(Register::R1),
            lsb: Operand::immediate(4),
            width: Operand::immediate(8),
        }
    }

    fn facts() -> InstrXData {
        let field = XExpr::binary(
            BinaryOp::BAnd,
            XExpr::binary(BinaryOp::Lsr, XExpr::reg("flags"), XExpr::konst(4)),
            XExpr::konst(255),
        );
        InstrXData::new()
            .with_vars(vec![XVariable::register("R0")])
            .with_xprs(vec![XExpr::reg("R1"), field])
            .with_reaching_defs(vec![
                Some(ReachingDefinition::new("R1", vec![0x70])),
                Some(ReachingDefinition::new("flags", vec![0x6c])),
            ])
    }

    #[test]
    fn test_ubfx_single_pair() {
        let mut ast = AstBuilder::new();
        let config = LiftConfig::default();
        let mut ctx = LiftContext::new(&mut ast, &SymbolicResolver, &config);
        let lifted = bfx(false).lift(&mut ctx, 0x74, "5102e4e7", &facts()).unwrap();
        assert_eq!(lifted.low.len(), 1);
        assert_eq!(lifted.high.len(), 1);
        assert_eq!(ast.instr_to_string(lifted.low[0]), "R0 := (R1 >> 4) & 255");
        assert_eq!(ast.instr_to_string(lifted.high[0]), "R0 := (flags >> 4) & 255");
        let armast_ir::Instr::Assign { rhs: hl_rhs, .. } = ast.instr(lifted.high[0]) else {
            panic!("expected assign");
        };
        let rdefs = ast.provenance().reaching_defs(*hl_rhs);
        assert_eq!(rdefs.len(), 1);
        assert_eq!(rdefs[0].variable, "flags");
    }

    #[test]
    fn test_sbfx_extraction() {
        let mut ast = AstBuilder::new();
        let config = LiftConfig::default();
        let mut ctx = LiftContext::new(&mut ast, &SymbolicResolver, &config);
        let lifted = bfx(true).lift(&mut ctx, 0x74, "5102a4e7", &facts()).unwrap();
        assert_eq!(ast.instr_to_string(lifted.low[0]), "R0 := (R1 << 20) s>> 24");
    }

    #[test]
    fn test_arity() {
        let ops = OperandTable::new()
            .with(1, Operand::register(Register::R0))
            .with(2, Operand::immediate(3));
        let rec = DecodedRecord::new(&["UBFX", ""], vec![1, 1, 2, 2]);
        assert!(BitfieldExtract::ubfx(&rec, &ops).is_ok());
        let short = DecodedRecord::new(&["SBFX", ""], vec![1, 1]);
        assert!(matches!(
            BitfieldExtract::sbfx(&short, &ops),
            Err(LiftError::DecodeArity { opcode: "SBFX", .. })
        ));
    }

    #[test]
    fn test_annotation() {
        assert_eq!(bfx(false).annotation(&facts()), "R0 := R1 (= (flags >> 4) & 255)");
    }
}
