//! Dual-level AST for lifted machine code.
//!
//! This crate provides the ISA-independent AST: node types, the
//! content-addressed node table, the per-function builder, provenance maps
//! linking the low-level and high-level forms, and symbol tables.
//! Instruction semantics live in `armast-isa`.

mod builder;
mod error;
pub mod graph;
mod node;
mod pretty;
mod provenance;
mod symbols;
mod table;

pub use builder::*;
pub use error::*;
pub use node::*;
pub use provenance::*;
pub use symbols::*;
pub use table::*;
