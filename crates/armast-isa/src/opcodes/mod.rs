//! ARM opcode handlers.
//!
//! Each supported mnemonic has a handler struct that validates its decoded
//! record at construction, documents its fact layout, and lifts to the dual
//! AST. [`Opcode`] closes over all of them.

mod bitfield;
mod branch;
mod branch_exchange;
mod branch_link;
mod call;
mod compare_branch;
mod load_multiple;
mod move_top;
mod mov;
mod preload;
mod reverse_subtract;
mod store_multiple;

pub use bitfield::BitfieldExtract;
pub use branch::Branch;
pub use branch_exchange::BranchExchange;
pub use branch_link::BranchLink;
pub use compare_branch::CompareBranch;
pub use load_multiple::LoadMultiple;
pub use mov::Move;
pub use move_top::MoveTop;
pub use preload::{Preload, PreloadKind};
pub use reverse_subtract::ReverseSubtract;
pub use store_multiple::StoreMultiple;

use armast_facts::{CallTarget, InstrXData, XExpr};
use armast_ir::ExprId;
use tracing::warn;

use crate::context::{LiftContext, LiftedInstrs};
use crate::error::LiftError;
use crate::operand::Operand;

/// Annotation returned for instructions whose facts are unusable.
pub const ERROR_VALUE: &str = "Error value";

/// True and false conditions of a conditional branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchConditions<'x> {
    pub on_true: &'x XExpr,
    pub on_false: &'x XExpr,
}

impl<'x> BranchConditions<'x> {
    /// Condition guarding the taken edge; `reverse` selects the negated test.
    pub const fn select(&self, reverse: bool) -> &'x XExpr {
        if reverse { self.on_false } else { self.on_true }
    }
}

/// Behavior shared by all opcode handlers.
pub trait OpcodeSemantics {
    fn mnemonic(&self) -> &'static str;

    /// Operands in the opcode's documented order.
    fn operands(&self) -> Vec<&Operand>;

    /// Human-readable summary; [`ERROR_VALUE`] if the facts are invalid.
    fn annotation(&self, xdata: &InstrXData) -> String;

    /// Lift to `(high, low)` instruction lists.
    fn lift(
        &self,
        ctx: &mut LiftContext<'_>,
        address: u64,
        bytes: &str,
        xdata: &InstrXData,
    ) -> Result<LiftedInstrs, LiftError>;

    fn conditions<'x>(&self, _xdata: &'x InstrXData) -> Option<BranchConditions<'x>> {
        None
    }

    /// `(high, low)` condition of a conditional branch; `None` if the opcode
    /// carries no condition.
    fn condition_ast(
        &self,
        _ctx: &mut LiftContext<'_>,
        _address: u64,
        _xdata: &InstrXData,
        _reverse: bool,
    ) -> Result<Option<(ExprId, ExprId)>, LiftError> {
        Ok(None)
    }

    fn is_call(&self, _xdata: &InstrXData) -> bool {
        false
    }

    fn call_target(&self, _xdata: &InstrXData) -> Result<CallTarget, LiftError> {
        Err(LiftError::NotACall(self.mnemonic()))
    }

    fn argument_count(&self, _xdata: &InstrXData) -> Result<usize, LiftError> {
        Err(LiftError::NotACall(self.mnemonic()))
    }

    fn arguments<'x>(&self, _xdata: &'x InstrXData) -> Result<&'x [XExpr], LiftError> {
        Err(LiftError::NotACall(self.mnemonic()))
    }
}

/// Check bundle validity before lifting; logs when the facts are unusable.
pub(crate) fn facts_usable(mnemonic: &'static str, address: u64, xdata: &InstrXData) -> bool {
    if xdata.is_ok() {
        return true;
    }
    warn!(
        addr = format!("{address:#x}"),
        opcode = mnemonic,
        reason = xdata.error().unwrap_or_default(),
        "invalid facts; no instructions emitted"
    );
    false
}

/// One `nop (<mnemonic>)` standing in for the instruction at both levels.
///
/// Used by control transfers whose effect lives in the condition rather than
/// in an assignment.
pub(crate) fn assembly_placeholder(
    ctx: &mut LiftContext<'_>,
    mnemonic: &'static str,
    address: u64,
    bytes: &str,
    annotation: &str,
) -> LiftedInstrs {
    let site = ctx.site(address, bytes, annotation);
    let nop = ctx.ast.mk_nop_instruction(mnemonic, site);
    ctx.ast.provenance_mut().add_instr_mapping(nop, nop);
    ctx.record_spans(&[nop], address);
    LiftedInstrs::new(vec![nop], vec![nop])
}

/// A constructed opcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    Branch(Branch),
    BranchExchange(BranchExchange),
    BranchLink(BranchLink),
    CompareBranch(CompareBranch),
    LoadMultiple(LoadMultiple),
    StoreMultiple(StoreMultiple),
    BitfieldExtract(BitfieldExtract),
    Preload(Preload),
    Move(Move),
    MoveTop(MoveTop),
    ReverseSubtract(ReverseSubtract),
}

macro_rules! dispatch {
    ($self:ident, $op:ident => $body:expr) => {
        match $self {
            Self::Branch($op) => $body,
            Self::BranchExchange($op) => $body,
            Self::BranchLink($op) => $body,
            Self::CompareBranch($op) => $body,
            Self::LoadMultiple($op) => $body,
            Self::StoreMultiple($op) => $body,
            Self::BitfieldExtract($op) => $body,
            Self::Preload($op) => $body,
            Self::Move($op) => $body,
            Self::MoveTop($op) => $body,
            Self::ReverseSubtract($op) => $body,
        }
    };
}

impl OpcodeSemantics for Opcode {
    fn mnemonic(&self) -> &'static str {
        dispatch!(self, op => op.mnemonic())
    }

    fn operands(&self) -> Vec<&Operand> {
        dispatch!(self, op => op.operands())
    }

    fn annotation(&self, xdata: &InstrXData) -> String {
        dispatch!(self, op => op.annotation(xdata))
    }

    fn lift(
        &self,
        ctx: &mut LiftContext<'_>,
        address: u64,
        bytes: &str,
        xdata: &InstrXData,
    ) -> Result<LiftedInstrs, LiftError> {
        dispatch!(self, op => op.lift(ctx, address, bytes, xdata))
    }

    fn conditions<'x>(&self, xdata: &'x InstrXData) -> Option<BranchConditions<'x>> {
        dispatch!(self, op => op.conditions(xdata))
    }

    fn condition_ast(
        &self,
        ctx: &mut LiftContext<'_>,
        address: u64,
        xdata: &InstrXData,
        reverse: bool,
    ) -> Result<Option<(ExprId, ExprId)>, LiftError> {
        dispatch!(self, op => op.condition_ast(ctx, address, xdata, reverse))
    }

    fn is_call(&self, xdata: &InstrXData) -> bool {
        dispatch!(self, op => op.is_call(xdata))
    }

    fn call_target(&self, xdata: &InstrXData) -> Result<CallTarget, LiftError> {
        dispatch!(self, op => op.call_target(xdata))
    }

    fn argument_count(&self, xdata: &InstrXData) -> Result<usize, LiftError> {
        dispatch!(self, op => op.argument_count(xdata))
    }

    fn arguments<'x>(&self, xdata: &'x InstrXData) -> Result<&'x [XExpr], LiftError> {
        dispatch!(self, op => op.arguments(xdata))
    }
}
