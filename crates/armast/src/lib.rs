//! ARM dual-level AST lifter.
//!
//! Lifts decoded ARM instructions, together with the facts recovered for
//! them by data-flow analysis, into a low-level AST that mirrors the machine
//! semantics and a high-level AST over recovered variables. Provenance maps
//! link the two.
//!
//! # Example
//!
//! ```ignore
//! use armast::{FunctionLifter, FunctionSource, LiftConfig, SymbolicResolver};
//!
//! let lifter = FunctionLifter::new(LiftConfig::default(), &SymbolicResolver);
//! let lifted = lifter.lift(&source)?;
//! println!("{}", lifted.to_json()?);
//! ```

pub use armast_facts::{
    CallTarget, ConversionError, ExprResolver, InstrXData, SymbolicResolver, VarDenotation,
    XExpr, XVariable, simplify_result,
};
pub use armast_ir::{
    graph, AstBuilder, AstError, BinaryOp, DefUse, Expr, ExprId, GlobalSymbolTable, Instr,
    InstrId, LvalId, NodeIndex, NodeRecord, Provenance, ProvenanceSnapshot, ReachingDefinition,
    SharedGlobals, StmtId, UnaryOp,
};
pub use armast_isa::{
    DecodedRecord, LiftConfig, LiftContext, LiftError, LiftedInstrs, Opcode, OpcodeRegistry,
    OpcodeSemantics, Operand, OperandTable, Register, Writeback, ERROR_VALUE,
};

mod error;
mod function;
pub mod metrics;
mod session;

pub use error::*;
pub use function::*;
pub use session::*;
