//! Parallel lifting of independent functions.

use armast_facts::ExprResolver;
use armast_ir::{GlobalSymbolTable, SharedGlobals};
use armast_isa::LiftConfig;
use rayon::prelude::*;
use tracing::{debug, error};

use crate::error::Result;
use crate::function::{FunctionLifter, FunctionSource, LiftedFunction};
use crate::metrics;

/// Lifts many functions against one global symbol table.
///
/// Each function gets its own builder; only the global table is shared.
pub struct LiftSession<R: ExprResolver> {
    config: LiftConfig,
    resolver: R,
    globals: SharedGlobals,
}

impl<R: ExprResolver> LiftSession<R> {
    pub fn new(config: LiftConfig, resolver: R) -> Self {
        Self {
            config,
            resolver,
            globals: GlobalSymbolTable::shared(),
        }
    }

    /// Session using an existing global table.
    #[must_use]
    pub fn with_globals(mut self, globals: SharedGlobals) -> Self {
        self.globals = globals;
        self
    }

    pub const fn globals(&self) -> &SharedGlobals {
        &self.globals
    }

    fn lifter(&self) -> FunctionLifter<'_> {
        FunctionLifter::with_globals(self.config.clone(), &self.resolver, self.globals.clone())
    }

    pub fn lift(&self, source: &FunctionSource) -> Result<LiftedFunction> {
        self.lifter().lift(source).inspect_err(|err| {
            metrics::record_failure();
            error!(name = %source.name, error = %err, "function lift failed");
        })
    }

    /// Lift all functions in parallel, preserving input order.
    pub fn lift_all(&self, sources: &[FunctionSource]) -> Vec<Result<LiftedFunction>> {
        let results: Vec<_> = sources.par_iter().map(|source| self.lift(source)).collect();
        debug!(
            functions = results.len(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            globals = self.globals.lock().len(),
            "session lifted"
        );
        results
    }
}
