//! Dual-AST emission.
//!
//! Emits a low-level/high-level assignment pair and records the provenance
//! that ties them together: instruction, expression and lvalue mappings,
//! reaching definitions on both right-hand sides and def-use chains on the
//! high-level left-hand side.

use armast_facts::{XExpr, XVariable};
use armast_ir::{DefUse, ExprId, InstrId, InstrSite, LvalId, ReachingDefinition};
use tracing::error;

use crate::context::{LiftContext, LiftedInstrs};
use crate::error::LiftError;
use crate::operand::AstFragment;

/// Base-register updates produced while lowering operands.
///
/// Pre-updates run before the instruction's own low-level assignments and
/// post-updates after them. Neither has a high-level counterpart.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperandEffects {
    pub pre: Vec<InstrId>,
    pub post: Vec<InstrId>,
}

impl OperandEffects {
    /// Keep the updates of `fragment` and return its node.
    pub fn take<T>(&mut self, fragment: AstFragment<T>) -> T {
        let (node, pre, post) = fragment;
        self.pre.extend(pre);
        self.post.extend(post);
        node
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }

    /// Splice the updates around `lifted.low`.
    pub fn surround(self, ctx: &mut LiftContext<'_>, site: &InstrSite, mut lifted: LiftedInstrs) -> LiftedInstrs {
        if self.is_empty() {
            return lifted;
        }
        if let Some(address) = site.address {
            ctx.record_spans(&self.pre, address);
            ctx.record_spans(&self.post, address);
        }
        let mut low = self.pre;
        low.append(&mut lifted.low);
        low.extend(self.post);
        lifted.low = low;
        lifted
    }
}

/// One destination, at both levels.
#[derive(Clone, Debug)]
pub struct DualAssign {
    pub ll_lhs: LvalId,
    pub ll_rhs: ExprId,
    pub hl_lhs: LvalId,
    pub hl_rhs: ExprId,
    /// Low-level operand receiving `ll_rdefs`; `ll_rhs` if unset.
    pub ll_rdef_expr: Option<ExprId>,
    pub hl_rdefs: Vec<ReachingDefinition>,
    pub ll_rdefs: Vec<ReachingDefinition>,
    pub defuse: Option<DefUse>,
    pub defuse_high: Option<DefUse>,
}

impl DualAssign {
    pub const fn new(ll_lhs: LvalId, ll_rhs: ExprId, hl_lhs: LvalId, hl_rhs: ExprId) -> Self {
        Self {
            ll_lhs,
            ll_rhs,
            hl_lhs,
            hl_rhs,
            ll_rdef_expr: None,
            hl_rdefs: Vec::new(),
            ll_rdefs: Vec::new(),
            defuse: None,
            defuse_high: None,
        }
    }

    #[must_use]
    pub fn with_rdefs(mut self, hl: Vec<ReachingDefinition>, ll: Vec<ReachingDefinition>) -> Self {
        self.hl_rdefs = hl;
        self.ll_rdefs = ll;
        self
    }

    #[must_use]
    pub const fn with_ll_rdef_expr(mut self, expr: ExprId) -> Self {
        self.ll_rdef_expr = Some(expr);
        self
    }

    #[must_use]
    pub fn with_defuses(mut self, defuse: Option<&DefUse>, defuse_high: Option<&DefUse>) -> Self {
        self.defuse = defuse.cloned();
        self.defuse_high = defuse_high.cloned();
        self
    }
}

/// Emit both assignments and their provenance. Returns `(high, low)`.
pub fn emit_assign(ctx: &mut LiftContext<'_>, site: &InstrSite, pair: DualAssign) -> (InstrId, InstrId) {
    let ast = &mut *ctx.ast;
    let low = ast.mk_assign(pair.ll_lhs, pair.ll_rhs, site.clone());
    let high = ast.mk_assign(pair.hl_lhs, pair.hl_rhs, site.clone());
    let prov = ast.provenance_mut();
    prov.add_instr_mapping(high, low);
    prov.add_expr_mapping(pair.hl_rhs, pair.ll_rhs);
    prov.add_lval_mapping(pair.hl_lhs, pair.ll_lhs);
    prov.add_reaching_defs(pair.hl_rhs, pair.hl_rdefs);
    prov.add_reaching_defs(pair.ll_rdef_expr.unwrap_or(pair.ll_rhs), pair.ll_rdefs);
    prov.add_defuses(pair.hl_lhs, pair.defuse);
    prov.add_defuses_high(pair.hl_lhs, pair.defuse_high);
    if let Some(address) = site.address {
        ctx.record_spans(&[high, low], address);
    }
    (high, low)
}

/// High-level lvalues for a recovered variable, or `fallback` if the
/// variable is missing or cannot be converted.
pub fn convert_lhs(
    ctx: &mut LiftContext<'_>,
    opcode: &'static str,
    address: u64,
    var: Option<&XVariable>,
    fallback: LvalId,
) -> Vec<LvalId> {
    let Some(var) = var else {
        return vec![fallback];
    };
    match ctx.resolver.variable_to_lvals(ctx.ast, var) {
        Ok(lvals) => lvals,
        Err(err) => {
            error!(
                addr = format!("{address:#x}"),
                opcode,
                error = %err,
                "lhs conversion failed; using low-level lvalue"
            );
            vec![fallback]
        }
    }
}

/// High-level expressions for a recovered value, or `fallback` if the value
/// is missing or cannot be converted.
pub fn convert_rhs(
    ctx: &mut LiftContext<'_>,
    opcode: &'static str,
    address: u64,
    xpr: Option<&XExpr>,
    fallback: ExprId,
) -> Vec<ExprId> {
    let Some(xpr) = xpr else {
        return vec![fallback];
    };
    match ctx.resolver.expr_to_exprs(ctx.ast, xpr) {
        Ok(exprs) => exprs,
        Err(err) => {
            error!(
                addr = format!("{address:#x}"),
                opcode,
                error = %err,
                "rhs conversion failed; using low-level expression"
            );
            vec![fallback]
        }
    }
}

/// Single conversion result for a value that must not fan out.
pub fn expect_one<T: Copy>(
    values: &[T],
    opcode: &'static str,
    address: u64,
    what: &'static str,
) -> Result<T, LiftError> {
    match values {
        [single] => Ok(*single),
        [] => Err(LiftError::MissingValue {
            opcode,
            address,
            what,
        }),
        _ => Err(LiftError::MultipleValues {
            opcode,
            address,
            what,
            count: values.len(),
        }),
    }
}

/// A destination whose high-level side comes from recovered facts.
#[derive(Clone, Debug)]
pub struct VariableIntro<'x> {
    pub ll_lhs: LvalId,
    pub ll_rhs: ExprId,
    pub ll_rdef_expr: Option<ExprId>,
    pub lhs: Option<&'x XVariable>,
    pub rhs: Option<&'x XExpr>,
    pub hl_rdefs: Vec<ReachingDefinition>,
    pub ll_rdefs: Vec<ReachingDefinition>,
    pub defuse: Option<&'x DefUse>,
    pub defuse_high: Option<&'x DefUse>,
}

/// Convert the recovered lhs and rhs (falling back to the low-level
/// fragments), require exactly one of each, and emit the pair.
pub fn emit_variable_intro(
    ctx: &mut LiftContext<'_>,
    opcode: &'static str,
    site: &InstrSite,
    intro: VariableIntro<'_>,
) -> Result<LiftedInstrs, LiftError> {
    let address = site.address.unwrap_or_default();
    let hl_lhss = convert_lhs(ctx, opcode, address, intro.lhs, intro.ll_lhs);
    let hl_rhss = convert_rhs(ctx, opcode, address, intro.rhs, intro.ll_rhs);
    let hl_lhs = expect_one(&hl_lhss, opcode, address, "lvalue")?;
    let hl_rhs = expect_one(&hl_rhss, opcode, address, "rvalue")?;

    let mut pair = DualAssign::new(intro.ll_lhs, intro.ll_rhs, hl_lhs, hl_rhs)
        .with_rdefs(intro.hl_rdefs, intro.ll_rdefs)
        .with_defuses(intro.defuse, intro.defuse_high);
    if let Some(expr) = intro.ll_rdef_expr {
        pair = pair.with_ll_rdef_expr(expr);
    }
    let (high, low) = emit_assign(ctx, site, pair);
    Ok(LiftedInstrs::new(vec![high], vec![low]))
}
