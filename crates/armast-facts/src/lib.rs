//! Analysis facts consumed by the ARM lifter.
//!
//! The data-flow and invariant engine runs elsewhere; this crate holds its
//! per-instruction results and the conversion of those results into
//! high-level AST fragments.

mod bundle;
mod call;
mod error;
mod resolver;
mod xpr;

pub use bundle::*;
pub use call::*;
pub use error::*;
pub use resolver::*;
pub use xpr::*;
