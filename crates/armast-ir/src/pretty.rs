//! C-like rendering of AST nodes.

use std::fmt;

use crate::builder::AstBuilder;
use crate::node::{Expr, ExprId, Instr, InstrId, Lhost, LvalId, Offset, OffsetId, Stmt, StmtId, Typ, TypId};

impl AstBuilder {
    pub fn expr_to_string(&self, id: ExprId) -> String {
        match self.expr(id) {
            Expr::IntConst { value } => value.to_string(),
            Expr::GlobalAddress { value, .. } => format!("{value:#x}"),
            Expr::StringConst { value, .. } => format!("{value:?}"),
            Expr::Lval { lval } => self.lval_to_string(*lval),
            Expr::Substituted { expr, .. } => self.expr_to_string(*expr),
            Expr::Cast { typ, expr } => {
                format!("({}){}", self.typ_to_string(*typ), self.operand_to_string(*expr))
            }
            Expr::Unary { op, arg } => format!("{}{}", op.symbol(), self.operand_to_string(*arg)),
            Expr::Binary { op, lhs, rhs } => format!(
                "{} {} {}",
                self.operand_to_string(*lhs),
                op.symbol(),
                self.operand_to_string(*rhs)
            ),
            Expr::Question {
                cond,
                then_expr,
                else_expr,
            } => format!(
                "{} ? {} : {}",
                self.operand_to_string(*cond),
                self.operand_to_string(*then_expr),
                self.operand_to_string(*else_expr)
            ),
            Expr::AddressOf { lval } => format!("&{}", self.lval_to_string(*lval)),
        }
    }

    /// Render a subexpression, parenthesized when it is compound.
    fn operand_to_string(&self, id: ExprId) -> String {
        let text = self.expr_to_string(id);
        match self.expr(id) {
            Expr::Binary { .. } | Expr::Question { .. } => format!("({text})"),
            _ => text,
        }
    }

    pub fn lval_to_string(&self, id: LvalId) -> String {
        let lval = self.lval(id);
        let host = match &lval.host {
            Lhost::Var { name, .. } => name.clone(),
            Lhost::MemRef { addr } => format!("*{}", self.operand_to_string(*addr)),
        };
        let offset = self.offset_to_string(lval.offset);
        if offset.is_empty() {
            host
        } else if matches!(lval.host, Lhost::MemRef { .. }) {
            format!("({host}){offset}")
        } else {
            format!("{host}{offset}")
        }
    }

    pub fn offset_to_string(&self, id: OffsetId) -> String {
        match self.offset(id) {
            Offset::None => String::new(),
            Offset::Field { name, offset, .. } => format!(".{name}{}", self.offset_to_string(*offset)),
            Offset::Index { index, offset } => format!(
                "[{}]{}",
                self.expr_to_string(*index),
                self.offset_to_string(*offset)
            ),
        }
    }

    pub fn typ_to_string(&self, id: TypId) -> String {
        match self.typ(id) {
            Typ::Void => "void".to_string(),
            Typ::Int { ikind } => ikind.c_name().to_string(),
            Typ::Float { fkind } => fkind.c_name().to_string(),
            Typ::Ptr { target } => format!("{} *", self.typ_to_string(*target)),
            Typ::Array { elem, size } => match size {
                Some(size) => format!("{}[{}]", self.typ_to_string(*elem), self.expr_to_string(*size)),
                None => format!("{}[]", self.typ_to_string(*elem)),
            },
            Typ::Fun { ret, args } => {
                let args = args.map_or_else(String::new, |a| self.typ_to_string(a));
                format!("{} ({args})", self.typ_to_string(*ret))
            }
            Typ::FunArgs { args } => args
                .iter()
                .map(|&a| self.typ_to_string(a))
                .collect::<Vec<_>>()
                .join(", "),
            Typ::FunArg { name, typ } => format!("{} {name}", self.typ_to_string(*typ)),
            Typ::Named { name, .. } => name.clone(),
            Typ::Comp { name, .. } => format!("struct {name}"),
        }
    }

    pub fn instr_to_string(&self, id: InstrId) -> String {
        match self.instr(id) {
            Instr::Assign { lhs, rhs, .. } => {
                format!("{} := {}", self.lval_to_string(*lhs), self.expr_to_string(*rhs))
            }
            Instr::Call { lhs, tgt, args, .. } => {
                let args: Vec<String> = args.iter().map(|&a| self.expr_to_string(a)).collect();
                let call = format!("{}({})", self.expr_to_string(*tgt), args.join(", "));
                match lhs {
                    Some(lhs) => format!("{} := {call}", self.lval_to_string(*lhs)),
                    None => call,
                }
            }
            Instr::Nop { descr, .. } if descr.is_empty() => "nop".to_string(),
            Instr::Nop { descr, .. } => format!("nop ({descr})"),
        }
    }

    /// Multi-line rendering of a statement.
    pub fn stmt_to_string(&self, id: StmtId) -> String {
        StmtDisplay { ast: self, id }.to_string()
    }

    fn write_stmt(&self, out: &mut fmt::Formatter<'_>, id: StmtId, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self.stmt(id) {
            Stmt::Return { expr: Some(expr) } => writeln!(out, "{indent}return {};", self.expr_to_string(*expr)),
            Stmt::Return { expr: None } => writeln!(out, "{indent}return;"),
            Stmt::Instrs { instrs } => {
                for &instr in instrs {
                    writeln!(out, "{indent}{};", self.instr_to_string(instr))?;
                }
                Ok(())
            }
            Stmt::Block { stmts } => {
                for &stmt in stmts {
                    self.write_stmt(out, stmt, depth)?;
                }
                Ok(())
            }
            Stmt::Branch {
                cond,
                then_stmt,
                else_stmt,
                ..
            } => {
                writeln!(out, "{indent}if ({}) {{", self.expr_to_string(*cond))?;
                self.write_stmt(out, *then_stmt, depth + 1)?;
                writeln!(out, "{indent}}} else {{")?;
                self.write_stmt(out, *else_stmt, depth + 1)?;
                writeln!(out, "{indent}}}")
            }
        }
    }
}

struct StmtDisplay<'a> {
    ast: &'a AstBuilder,
    id: StmtId,
}

impl fmt::Display for StmtDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ast.write_stmt(f, self.id, 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::node::{BinaryOp, InstrSite, IntKind, UnaryOp};
    use crate::AstBuilder;

    #[test]
    fn test_memory_load() {
        let mut ast = AstBuilder::new();
        let r0 = ast.mk_variable_expr("R0");
        let four = ast.mk_integer_constant(4);
        let addr = ast.mk_binary_op(BinaryOp::Plus, r0, four);
        let rhs = ast.mk_memref_expr(addr);
        let lhs = ast.mk_variable_lval("R1");
        let instr = ast.mk_assign(lhs, rhs, InstrSite::default());
        assert_eq!(ast.instr_to_string(instr), "R1 := *(R0 + 4)");
    }

    #[test]
    fn test_nested_operators_parenthesized() {
        let mut ast = AstBuilder::new();
        let a = ast.mk_variable_expr("a");
        let b = ast.mk_variable_expr("b");
        let c = ast.mk_integer_constant(2);
        let sum = ast.mk_binary_op(BinaryOp::Plus, a, b);
        let prod = ast.mk_binary_op(BinaryOp::Mult, sum, c);
        let neg = ast.mk_unary_op(UnaryOp::Neg, a);
        assert_eq!(ast.expr_to_string(prod), "(a + b) * 2");
        assert_eq!(ast.expr_to_string(neg), "-a");
    }

    #[test]
    fn test_call_and_cast() {
        let mut ast = AstBuilder::new();
        let tgt = ast.mk_variable_expr("memcpy");
        let r0 = ast.mk_variable_expr("R0");
        let r1 = ast.mk_variable_expr("R1");
        let ret = ast.mk_variable_lval("n");
        let call = ast.mk_call(Some(ret), tgt, vec![r0, r1], InstrSite::default());
        assert_eq!(ast.instr_to_string(call), "n := memcpy(R0, R1)");

        let uint = ast.mk_int_type(IntKind::UInt);
        let cast = ast.mk_cast_expr(uint, r0);
        assert_eq!(ast.expr_to_string(cast), "(unsigned int)R0");
    }

    #[test]
    fn test_branch_statement() {
        let mut ast = AstBuilder::new();
        let r0 = ast.mk_variable_expr("R0");
        let zero = ast.mk_integer_constant(0);
        let cond = ast.mk_binary_op(BinaryOp::Eq, r0, zero);
        let empty = ast.mk_instr_sequence(vec![]);
        let ret = ast.mk_return(Some(r0));
        let branch = ast.mk_branch(cond, ret, empty, 8);
        assert_eq!(
            ast.stmt_to_string(branch),
            "if (R0 == 0) {\n  return R0;\n} else {\n}\n"
        );
    }
}
