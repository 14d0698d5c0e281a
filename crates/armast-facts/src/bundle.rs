//! Per-instruction fact bundle.
//!
//! The positional layout of each sequence is fixed per opcode class and
//! documented by the handler that consumes it.

use armast_ir::{DefUse, ReachingDefinition};

use crate::call::CallTarget;
use crate::xpr::{XExpr, XVariable};

/// Facts recovered by the analysis for one instruction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstrXData {
    /// Classification tags (for example `"call"` at position 1).
    pub tags: Vec<String>,
    /// Opcode-specific integer flags.
    pub args: Vec<i64>,
    pub vars: Vec<XVariable>,
    pub xprs: Vec<XExpr>,
    /// Reaching definitions; `None` where the analysis has none.
    pub reaching_defs: Vec<Option<ReachingDefinition>>,
    /// Def-use chains aligned with `vars`.
    pub defuses: Vec<Option<DefUse>>,
    /// High-level def-use chains aligned with `vars`.
    pub defuses_high: Vec<Option<DefUse>>,
    pub call_target: Option<CallTarget>,
    /// Rewritten return value, for instructions that return.
    pub return_xpr: Option<XExpr>,
    branch_conditions: bool,
    error: Option<String>,
}

impl InstrXData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle for an instruction the analysis could not handle.
    pub fn invalid(reason: &str) -> Self {
        Self {
            error: Some(reason.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| (*t).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<i64>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_vars(mut self, vars: Vec<XVariable>) -> Self {
        self.vars = vars;
        self
    }

    #[must_use]
    pub fn with_xprs(mut self, xprs: Vec<XExpr>) -> Self {
        self.xprs = xprs;
        self
    }

    #[must_use]
    pub fn with_reaching_defs(mut self, rdefs: Vec<Option<ReachingDefinition>>) -> Self {
        self.reaching_defs = rdefs;
        self
    }

    #[must_use]
    pub fn with_defuses(mut self, defuses: Vec<Option<DefUse>>) -> Self {
        self.defuses = defuses;
        self
    }

    #[must_use]
    pub fn with_defuses_high(mut self, defuses: Vec<Option<DefUse>>) -> Self {
        self.defuses_high = defuses;
        self
    }

    /// Classify as a call to `target`.
    #[must_use]
    pub fn with_call_target(mut self, target: CallTarget) -> Self {
        if self.tags.is_empty() {
            self.tags.push(String::new());
        }
        if self.tags.len() == 1 {
            self.tags.push("call".to_string());
        } else {
            self.tags[1] = "call".to_string();
        }
        self.call_target = Some(target);
        self
    }

    /// Mark the true/false conditions as present.
    #[must_use]
    pub const fn with_branch_conditions(mut self) -> Self {
        self.branch_conditions = true;
        self
    }

    #[must_use]
    pub fn with_return_xpr(mut self, xpr: XExpr) -> Self {
        self.return_xpr = Some(xpr);
        self
    }

    /// True unless the analysis flagged the instruction as failed.
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub const fn has_branch_conditions(&self) -> bool {
        self.branch_conditions
    }

    /// Classified as a call by the analysis.
    pub fn has_call_tag(&self) -> bool {
        self.tags.len() >= 2 && self.tags[1] == "call"
    }

    pub const fn has_return_xpr(&self) -> bool {
        self.return_xpr.is_some()
    }

    pub fn var(&self, index: usize) -> Option<&XVariable> {
        self.vars.get(index)
    }

    pub fn xpr(&self, index: usize) -> Option<&XExpr> {
        self.xprs.get(index)
    }

    pub fn rdef(&self, index: usize) -> Option<&ReachingDefinition> {
        self.reaching_defs.get(index).and_then(Option::as_ref)
    }

    /// Present reaching definitions in `range`.
    pub fn rdefs_in(&self, range: impl std::ops::RangeBounds<usize>) -> Vec<ReachingDefinition> {
        let start = match range.start_bound() {
            std::ops::Bound::Included(&s) => s,
            std::ops::Bound::Excluded(&s) => s + 1,
            std::ops::Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            std::ops::Bound::Included(&e) => e + 1,
            std::ops::Bound::Excluded(&e) => e,
            std::ops::Bound::Unbounded => self.reaching_defs.len(),
        }
        .min(self.reaching_defs.len());
        if start >= end {
            return Vec::new();
        }
        self.reaching_defs[start..end].iter().flatten().cloned().collect()
    }

    pub fn defuse(&self, index: usize) -> Option<&DefUse> {
        self.defuses.get(index).and_then(Option::as_ref)
    }

    pub fn defuse_high(&self, index: usize) -> Option<&DefUse> {
        self.defuses_high.get(index).and_then(Option::as_ref)
    }
}
