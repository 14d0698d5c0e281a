//! Per-instruction lifting context.

use armast_facts::ExprResolver;
use armast_ir::{AstBuilder, InstrId, InstrSite};

use crate::config::LiftConfig;

/// What a handler produced for one instruction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiftedInstrs {
    pub high: Vec<InstrId>,
    pub low: Vec<InstrId>,
}

impl LiftedInstrs {
    pub const fn new(high: Vec<InstrId>, low: Vec<InstrId>) -> Self {
        Self { high, low }
    }

    pub fn is_empty(&self) -> bool {
        self.high.is_empty() && self.low.is_empty()
    }
}

/// Builder, resolver and options shared by all handlers of a function.
pub struct LiftContext<'a> {
    pub ast: &'a mut AstBuilder,
    pub resolver: &'a dyn ExprResolver,
    pub config: &'a LiftConfig,
}

impl<'a> LiftContext<'a> {
    pub fn new(ast: &'a mut AstBuilder, resolver: &'a dyn ExprResolver, config: &'a LiftConfig) -> Self {
        Self {
            ast,
            resolver,
            config,
        }
    }

    /// Site for instructions emitted at `address`.
    pub fn site(&self, address: u64, bytes: &str, annotation: &str) -> InstrSite {
        let site = InstrSite::at(address, bytes);
        if self.config.annotate {
            site.with_annotations(vec![format!("{address:#x}"), annotation.to_string()])
        } else {
            site
        }
    }

    /// Record the address of emitted instructions, if spans are enabled.
    pub fn record_spans(&mut self, instrs: &[InstrId], address: u64) {
        if !self.config.record_spans {
            return;
        }
        for &instr in instrs {
            self.ast.provenance_mut().add_instr_address(instr, &[address]);
        }
    }
}
