//! Lifting shared by call-classified opcodes.
//!
//! Bundle layout for calls:
//! - `xprs[0..n]`: arguments
//! - `rdefs[0..n]`: reaching definitions of the arguments
//! - `vars[0]`: return value lhs, when the callee returns a value
//! - `uses[0]`, `useshigh[0]`: uses of the return value

use armast_facts::{CallTarget, InstrXData, XExpr};
use armast_ir::{BinaryOp, ExprId, LvalId};
use tracing::warn;

use crate::context::{LiftContext, LiftedInstrs};
use crate::emit::{convert_lhs, convert_rhs, expect_one, OperandEffects};
use crate::error::LiftError;
use crate::operand::Operand;
use crate::register::Register;

/// Call target from the facts, or `sub_<addr>` for a direct call.
pub(crate) fn call_target(
    mnemonic: &'static str,
    xdata: &InstrXData,
    target: &Operand,
) -> Result<CallTarget, LiftError> {
    if let Some(tgt) = &xdata.call_target {
        return Ok(tgt.clone());
    }
    match target.address() {
        Ok(address) => Ok(CallTarget::new(&format!("sub_{address:x}")).with_address(address)),
        Err(_) => Err(LiftError::UnresolvedCallTarget(mnemonic)),
    }
}

pub(crate) fn argument_count(mnemonic: &'static str, target: &CallTarget) -> usize {
    target.argument_count.unwrap_or_else(|| {
        warn!(opcode = mnemonic, callee = %target.name, "call target has no argument count");
        0
    })
}

pub(crate) fn arguments(xdata: &InstrXData, count: usize) -> &[XExpr] {
    &xdata.xprs[..count.min(xdata.xprs.len())]
}

/// `call name(a, b)`.
pub(crate) fn call_annotation(mnemonic: &'static str, xdata: &InstrXData, target: &Operand) -> String {
    match call_target(mnemonic, xdata, target) {
        Ok(tgt) => {
            let argc = argument_count(mnemonic, &tgt);
            let args: Vec<String> = arguments(xdata, argc).iter().map(ToString::to_string).collect();
            format!("call {}({})", tgt.name, args.join(", "))
        }
        Err(_) => format!("call {target}"),
    }
}

/// Low-level location of the `index`-th argument: `R0`-`R3`, then the stack.
fn ll_argument(ctx: &mut LiftContext<'_>, index: usize) -> ExprId {
    if let Some(reg) = Register::ARGS.get(index) {
        return ctx.ast.mk_variable_expr(reg.name());
    }
    let sp = ctx.ast.mk_variable_expr(Register::SP.name());
    let slot = i64::try_from(index - Register::ARGS.len()).unwrap_or(i64::MAX / 4);
    let offset = ctx.ast.mk_integer_constant(4 * slot);
    let addr = ctx.ast.mk_binary_op(BinaryOp::Plus, sp, offset);
    ctx.ast.mk_memref_expr(addr)
}

/// Lift a call: low `[R0 :=] tgt(R0, ..)`, high `[lhs :=] name(args)`.
pub(crate) fn lift_call(
    ctx: &mut LiftContext<'_>,
    mnemonic: &'static str,
    address: u64,
    bytes: &str,
    xdata: &InstrXData,
    target: &Operand,
) -> Result<LiftedInstrs, LiftError> {
    let tgt = call_target(mnemonic, xdata, target)?;
    let argc = argument_count(mnemonic, &tgt);
    let xargs = arguments(xdata, argc);
    let annotation = call_annotation(mnemonic, xdata, target);
    let site = ctx.site(address, bytes, &annotation);

    // low level
    let mut effects = OperandEffects::default();
    let ll_tgt = effects.take(target.ast_rvalue(ctx.ast, &site)?);
    let ll_args: Vec<ExprId> = (0..argc).map(|i| ll_argument(ctx, i)).collect();
    let ll_lhs: Option<LvalId> = tgt
        .returns_value
        .then(|| ctx.ast.mk_variable_lval(Register::R0.name()));
    let low = ctx.ast.mk_call(ll_lhs, ll_tgt, ll_args.clone(), site.clone());

    // high level
    let hl_lhs = match ll_lhs {
        Some(fallback) => {
            let lvals = convert_lhs(ctx, mnemonic, address, xdata.var(0), fallback);
            Some(expect_one(&lvals, mnemonic, address, "return lvalue")?)
        }
        None => None,
    };
    let hl_tgt = match tgt.address {
        Some(addr) => {
            let lval = ctx.ast.mk_global_variable_lval(&tgt.name, addr);
            ctx.ast.mk_lval_expr(lval)
        }
        None => ctx.ast.mk_variable_expr(&tgt.name),
    };
    let mut hl_args = Vec::with_capacity(argc);
    for (i, &ll_arg) in ll_args.iter().enumerate() {
        let exprs = convert_rhs(ctx, mnemonic, address, xargs.get(i), ll_arg);
        hl_args.push(expect_one(&exprs, mnemonic, address, "argument")?);
    }
    let high = ctx.ast.mk_call(hl_lhs, hl_tgt, hl_args.clone(), site.clone());

    let prov = ctx.ast.provenance_mut();
    prov.add_instr_mapping(high, low);
    prov.add_expr_mapping(hl_tgt, ll_tgt);
    for (i, (&hl_arg, &ll_arg)) in hl_args.iter().zip(&ll_args).enumerate() {
        prov.add_expr_mapping(hl_arg, ll_arg);
        let rdefs: Vec<_> = xdata.rdef(i).cloned().into_iter().collect();
        prov.add_reaching_defs(hl_arg, rdefs.clone());
        prov.add_reaching_defs(ll_arg, rdefs);
    }
    if let (Some(hl), Some(ll)) = (hl_lhs, ll_lhs) {
        prov.add_lval_mapping(hl, ll);
        prov.add_defuses(hl, xdata.defuse(0).cloned());
        prov.add_defuses_high(hl, xdata.defuse_high(0).cloned());
    }
    ctx.record_spans(&[high, low], address);
    Ok(effects.surround(ctx, &site, LiftedInstrs::new(vec![high], vec![low])))
}
