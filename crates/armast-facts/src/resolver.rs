//! Conversion of recovered facts into AST fragments.

use armast_ir::{AstBuilder, BinaryOp, ExprId, LvalId};
use tracing::trace;

use crate::error::ConversionError;
use crate::xpr::{VarDenotation, XExpr, XVariable};

/// Turns recovered variables and expressions into high-level AST nodes.
///
/// A conversion may yield zero or more fragments.
pub trait ExprResolver: Sync {
    fn variable_to_lvals(
        &self,
        ast: &mut AstBuilder,
        var: &XVariable,
    ) -> Result<Vec<LvalId>, ConversionError>;

    fn expr_to_exprs(&self, ast: &mut AstBuilder, expr: &XExpr) -> Result<Vec<ExprId>, ConversionError>;

    /// Convert to exactly one expression.
    fn expr_to_expr(&self, ast: &mut AstBuilder, expr: &XExpr) -> Result<ExprId, ConversionError> {
        let exprs = self.expr_to_exprs(ast, expr)?;
        match exprs.as_slice() {
            [single] => Ok(*single),
            _ => Err(ConversionError::Ambiguous {
                expr: expr.to_string(),
                count: exprs.len(),
            }),
        }
    }
}

/// Resolver mapping facts onto variables and memory references by name.
///
/// Registers and stack slots become named variables, globals are registered
/// in the global symbol table, and memory variables become `*(base + off)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymbolicResolver;

impl ExprResolver for SymbolicResolver {
    fn variable_to_lvals(
        &self,
        ast: &mut AstBuilder,
        var: &XVariable,
    ) -> Result<Vec<LvalId>, ConversionError> {
        let lval = match &var.denotation {
            VarDenotation::Tmp => {
                trace!(variable = %var.name, "temporary has no lvalue");
                return Err(ConversionError::Temporary(var.name.clone()));
            }
            VarDenotation::Global { address } => ast.mk_global_variable_lval(&var.name, *address),
            VarDenotation::Memory { base, offset } => {
                let base = ast.mk_variable_expr(base);
                let addr = if *offset == 0 {
                    base
                } else {
                    let offset = ast.mk_integer_constant(*offset);
                    ast.mk_binary_op(BinaryOp::Plus, base, offset)
                };
                ast.mk_memref_lval(addr)
            }
            VarDenotation::Register
            | VarDenotation::Stack { .. }
            | VarDenotation::ReturnValue { .. } => ast.mk_variable_lval(&var.name),
        };
        Ok(vec![lval])
    }

    fn expr_to_exprs(&self, ast: &mut AstBuilder, expr: &XExpr) -> Result<Vec<ExprId>, ConversionError> {
        match expr {
            XExpr::Const(value) => Ok(vec![ast.mk_integer_constant(*value)]),
            XExpr::Var(var) => {
                let lvals = self.variable_to_lvals(ast, var)?;
                Ok(lvals.into_iter().map(|l| ast.mk_lval_expr(l)).collect())
            }
            XExpr::Unary(op, arg) => {
                let arg = self.expr_to_expr(ast, arg)?;
                Ok(vec![ast.mk_unary_op(*op, arg)])
            }
            XExpr::Binary(op, lhs, rhs) => {
                let lhs = self.expr_to_expr(ast, lhs)?;
                let rhs = self.expr_to_expr(ast, rhs)?;
                Ok(vec![ast.mk_binary_op(*op, lhs, rhs)])
            }
            XExpr::Unresolved(text) => {
                trace!(value = %text, "unresolved expression");
                Err(ConversionError::Unresolved(text.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_expression() {
        let mut ast = AstBuilder::new();
        let e = XExpr::binary(BinaryOp::Plus, XExpr::reg("R0"), XExpr::konst(4));
        let id = SymbolicResolver.expr_to_expr(&mut ast, &e).unwrap();
        assert_eq!(ast.expr_to_string(id), "R0 + 4");
    }

    #[test]
    fn test_memory_variable() {
        let mut ast = AstBuilder::new();
        let v = XVariable::memory("R4[8]", "R4", 8);
        let lvals = SymbolicResolver.variable_to_lvals(&mut ast, &v).unwrap();
        assert_eq!(lvals.len(), 1);
        assert_eq!(ast.lval_to_string(lvals[0]), "*(R4 + 8)");
    }

    #[test]
    fn test_global_registered() {
        let mut ast = AstBuilder::new();
        let v = XVariable::global("gv_flags", 0x2_1000);
        SymbolicResolver.variable_to_lvals(&mut ast, &v).unwrap();
        assert_eq!(ast.globals().lock().name_at(0x2_1000), Some("gv_flags"));
    }

    #[test]
    fn test_failures() {
        let mut ast = AstBuilder::new();
        let tmp = XVariable::tmp("t1");
        assert!(matches!(
            SymbolicResolver.variable_to_lvals(&mut ast, &tmp),
            Err(ConversionError::Temporary(_))
        ));
        let e = XExpr::binary(BinaryOp::Plus, XExpr::reg("R0"), XExpr::unresolved("?"));
        assert!(matches!(
            SymbolicResolver.expr_to_exprs(&mut ast, &e),
            Err(ConversionError::Unresolved(_))
        ));
    }
}
