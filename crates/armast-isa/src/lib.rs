//! ARM instruction semantics for dual-level lifting.
//!
//! This crate provides the operand model, decoded records, the opcode
//! registry and one handler per supported opcode. Handlers consume recovered
//! facts and emit paired low-level and high-level instructions through the
//! emission protocol in [`emit`].

mod config;
mod context;
pub mod emit;
mod error;
pub mod opcodes;
mod operand;
mod record;
mod register;
mod registry;

pub use config::*;
pub use context::*;
pub use error::*;
pub use opcodes::{Opcode, OpcodeSemantics, ERROR_VALUE};
pub use operand::*;
pub use record::*;
pub use register::*;
pub use registry::*;
