//! MOV: move register or immediate.

use armast_facts::{simplify_result, InstrXData};

use super::{facts_usable, Opcode, OpcodeSemantics, ERROR_VALUE};
use crate::context::{LiftContext, LiftedInstrs};
use crate::emit::{emit_variable_intro, OperandEffects, VariableIntro};
use crate::error::LiftError;
use crate::operand::Operand;
use crate::record::{DecodedRecord, OperandTable};

/// `MOV{S}<c> <Rd>, <Rm|#imm>`
///
/// - `tags[1]`: condition
/// - `args[0]`: S, `args[1]`: Rd, `args[2]`: Rm or immediate, `args[3]`: wide
///
/// Bundle: `vars[0]` lhs; `xprs[0]` rhs, `xprs[1]` rhs (simplified);
/// `rdefs[0]` Rm, `rdefs[1..]` simplified rhs; `uses[0]`, `useshigh[0]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Move {
    setflags: bool,
    wide: bool,
    rd: Operand,
    src: Operand,
}

impl Move {
    pub const MNEMONIC: &'static str = "MOV";

    pub fn from_record(record: &DecodedRecord, operands: &OperandTable) -> Result<Opcode, LiftError> {
        record.check_arity(Self::MNEMONIC, 2, 4)?;
        Ok(Opcode::Move(Self {
            setflags: record.arg(0) == 1,
            wide: record.arg(3) == 1,
            rd: operands.resolve(record, 1)?,
            src: operands.resolve(record, 2)?,
        }))
    }

    /// Thumb-2 wide encoding.
    pub const fn is_wide(&self) -> bool {
        self.wide
    }
}

impl OpcodeSemantics for Move {
    fn mnemonic(&self) -> &'static str {
        if self.setflags { "MOVS" } else { Self::MNEMONIC }
    }

    fn operands(&self) -> Vec<&Operand> {
        vec![&self.rd, &self.src]
    }

    fn annotation(&self, xdata: &InstrXData) -> String {
        if !xdata.is_ok() {
            return ERROR_VALUE.to_string();
        }
        let lhs = xdata.var(0).map_or_else(|| self.rd.to_string(), ToString::to_string);
        match (xdata.xpr(0), xdata.xpr(1)) {
            (Some(x), Some(y)) => format!("{lhs} := {}", simplify_result(x, y)),
            _ => format!("{lhs} := {}", self.src),
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
        let ll_rhs = effects.take(self.src.ast_rvalue(ctx.ast, &site)?);
        let lifted = emit_variable_intro(
            ctx,
            self.mnemonic(),
            &site,
            VariableIntro {
                ll_lhs,
                ll_rhs,
                ll_rdef_expr: None,
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
    use crate::operand::Writeback;
    use crate::register::Register;
    use armast_facts::{SymbolicResolver, XExpr, XVariable};
    use armast_ir::{AstBuilder, DefUse, ReachingDefinition};

    fn table() -> OperandTable {
        OperandTable::new()
            .with(1, Operand::register(Register::R4))
            .with(2, Operand::register(Register::R0))
    }

    #[test]
    fn test_mov_register() {
        let Opcode::Move(mov) = Move::from_record(&DecodedRecord::new(&["MOV", ""], vec![0, 1, 2, 0]), &table()).unwrap()
        else {
            panic!("expected mov");
        };
        let xd = InstrXData::new()
            .with_vars(vec![XVariable::register("R4")])
            .with_xprs(vec![XExpr::reg("R0"), XExpr::reg("arg0")])
            .with_reaching_defs(vec![Some(ReachingDefinition::new("R0", vec![0x0]))])
            .with_defuses(vec![Some(DefUse::new("R4", vec![0x10, 0x14]))]);
        assert_eq!(mov.annotation(&xd), "R4 := R0 (= arg0)");

        let mut ast = AstBuilder::new();
        let config = LiftConfig::default();
        let mut ctx = LiftContext::new(&mut ast, &SymbolicResolver, &config);
        let lifted = mov.lift(&mut ctx, 0x8, "0040a0e1", &xd).unwrap();
        assert_eq!(ast.instr_to_string(lifted.low[0]), "R4 := R0");
        assert_eq!(ast.instr_to_string(lifted.high[0]), "R4 := arg0");
    }

    #[test]
    fn test_post_indexed_source_updates_base_after() {
        let ops = OperandTable::new()
            .with(1, Operand::register(Register::R4))
            .with(2, Operand::indirect(Register::R1, 4, Writeback::PostIndexed));
        let Opcode::Move(mov) = Move::from_record(&DecodedRecord::new(&["MOV", ""], vec![0, 1, 2, 0]), &ops).unwrap()
        else {
            panic!("expected mov");
        };
        let xd = InstrXData::new()
            .with_vars(vec![XVariable::register("R4")])
            .with_xprs(vec![XExpr::reg("R1"), XExpr::reg("head")]);

        let mut ast = AstBuilder::new();
        let config = LiftConfig::default();
        let mut ctx = LiftContext::new(&mut ast, &SymbolicResolver, &config);
        let lifted = mov.lift(&mut ctx, 0x20, "0440b1e4", &xd).unwrap();
        let low: Vec<String> = lifted.low.iter().map(|&i| ast.instr_to_string(i)).collect();
        assert_eq!(low, ["R4 := *R1", "R1 := R1 + 4"]);
        assert_eq!(lifted.high.len(), 1);
        assert_eq!(ast.instr_to_string(lifted.high[0]), "R4 := head");
        assert_eq!(ast.provenance().low_instr(lifted.high[0]), Some(lifted.low[0]));
        assert_eq!(ast.provenance().instr_addresses(lifted.low[1]), &[0x20]);
    }

    #[test]
    fn test_movs_mnemonic() {
        let Opcode::Move(mov) = Move::from_record(&DecodedRecord::new(&["MOV", ""], vec![1, 1, 2, 1]), &table()).unwrap()
        else {
            panic!("expected mov");
        };
        assert_eq!(mov.mnemonic(), "MOVS");
        assert!(mov.is_wide());
    }
}
