//! Cross-references between the low-level and high-level AST.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::node::{ExprId, InstrId, LvalId};

/// Definition sites of a variable reaching a use.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ReachingDefinition {
    pub variable: String,
    /// Addresses of the defining instructions.
    pub sites: Vec<u64>,
}

impl ReachingDefinition {
    pub fn new(variable: &str, sites: Vec<u64>) -> Self {
        Self {
            variable: variable.to_string(),
            sites,
        }
    }
}

/// Use sites of a definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DefUse {
    pub variable: String,
    pub uses: Vec<u64>,
}

impl DefUse {
    pub fn new(variable: &str, uses: Vec<u64>) -> Self {
        Self {
            variable: variable.to_string(),
            uses,
        }
    }
}

/// Provenance maps for one function, keyed by construction handles.
#[derive(Debug, Default)]
pub struct Provenance {
    /// High-level instruction → low-level instruction.
    instr_mapping: FxHashMap<InstrId, InstrId>,
    /// Low-level instruction → high-level instructions.
    reverse_instr_mapping: FxHashMap<InstrId, Vec<InstrId>>,
    expr_mapping: FxHashMap<ExprId, ExprId>,
    lval_mapping: FxHashMap<LvalId, LvalId>,
    reaching_defs: FxHashMap<ExprId, Vec<ReachingDefinition>>,
    defuses: FxHashMap<LvalId, Vec<DefUse>>,
    defuses_high: FxHashMap<LvalId, Vec<DefUse>>,
    instr_addresses: FxHashMap<InstrId, Vec<u64>>,
    condition_addresses: FxHashMap<ExprId, Vec<u64>>,
}

impl Provenance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instr_mapping(&mut self, high: InstrId, low: InstrId) {
        self.instr_mapping.insert(high, low);
        let highs = self.reverse_instr_mapping.entry(low).or_default();
        if !highs.contains(&high) {
            highs.push(high);
        }
    }

    /// Low-level counterpart of a high-level instruction.
    pub fn low_instr(&self, high: InstrId) -> Option<InstrId> {
        self.instr_mapping.get(&high).copied()
    }

    /// High-level instructions derived from a low-level one.
    pub fn high_instrs(&self, low: InstrId) -> &[InstrId] {
        self.reverse_instr_mapping.get(&low).map_or(&[], Vec::as_slice)
    }

    pub fn add_expr_mapping(&mut self, high: ExprId, low: ExprId) {
        self.expr_mapping.insert(high, low);
    }

    pub fn low_expr(&self, high: ExprId) -> Option<ExprId> {
        self.expr_mapping.get(&high).copied()
    }

    pub fn add_lval_mapping(&mut self, high: LvalId, low: LvalId) {
        self.lval_mapping.insert(high, low);
    }

    pub fn low_lval(&self, high: LvalId) -> Option<LvalId> {
        self.lval_mapping.get(&high).copied()
    }

    /// Attach reaching definitions to an expression. Repeats are ignored.
    pub fn add_reaching_defs<I>(&mut self, expr: ExprId, rdefs: I)
    where
        I: IntoIterator<Item = ReachingDefinition>,
    {
        let entry = self.reaching_defs.entry(expr).or_default();
        for rdef in rdefs {
            if !entry.contains(&rdef) {
                entry.push(rdef);
            }
        }
    }

    pub fn reaching_defs(&self, expr: ExprId) -> &[ReachingDefinition] {
        self.reaching_defs.get(&expr).map_or(&[], Vec::as_slice)
    }

    pub fn add_defuses(&mut self, lval: LvalId, defuse: Option<DefUse>) {
        let entry = self.defuses.entry(lval).or_default();
        entry.extend(defuse);
    }

    /// Def-use chains of an lvalue. `None` if never annotated.
    pub fn defuses(&self, lval: LvalId) -> Option<&[DefUse]> {
        self.defuses.get(&lval).map(Vec::as_slice)
    }

    pub fn add_defuses_high(&mut self, lval: LvalId, defuse: Option<DefUse>) {
        let entry = self.defuses_high.entry(lval).or_default();
        entry.extend(defuse);
    }

    pub fn defuses_high(&self, lval: LvalId) -> Option<&[DefUse]> {
        self.defuses_high.get(&lval).map(Vec::as_slice)
    }

    pub fn add_instr_address(&mut self, instr: InstrId, addresses: &[u64]) {
        self.instr_addresses
            .entry(instr)
            .or_default()
            .extend_from_slice(addresses);
    }

    pub fn instr_addresses(&self, instr: InstrId) -> &[u64] {
        self.instr_addresses.get(&instr).map_or(&[], Vec::as_slice)
    }

    pub fn add_condition_address(&mut self, cond: ExprId, addresses: &[u64]) {
        self.condition_addresses
            .entry(cond)
            .or_default()
            .extend_from_slice(addresses);
    }

    pub fn condition_addresses(&self, cond: ExprId) -> &[u64] {
        self.condition_addresses.get(&cond).map_or(&[], Vec::as_slice)
    }

    pub fn instr_mappings(&self) -> impl Iterator<Item = (InstrId, InstrId)> + '_ {
        self.instr_mapping.iter().map(|(&h, &l)| (h, l))
    }

    pub fn expr_mappings(&self) -> impl Iterator<Item = (ExprId, ExprId)> + '_ {
        self.expr_mapping.iter().map(|(&h, &l)| (h, l))
    }

    pub fn lval_mappings(&self) -> impl Iterator<Item = (LvalId, LvalId)> + '_ {
        self.lval_mapping.iter().map(|(&h, &l)| (h, l))
    }

    pub fn all_reaching_defs(
        &self,
    ) -> impl Iterator<Item = (ExprId, &[ReachingDefinition])> + '_ {
        self.reaching_defs.iter().map(|(&e, r)| (e, r.as_slice()))
    }

    pub fn all_defuses(&self) -> impl Iterator<Item = (LvalId, &[DefUse])> + '_ {
        self.defuses.iter().map(|(&l, d)| (l, d.as_slice()))
    }

    pub fn all_defuses_high(&self) -> impl Iterator<Item = (LvalId, &[DefUse])> + '_ {
        self.defuses_high.iter().map(|(&l, d)| (l, d.as_slice()))
    }

    pub fn all_instr_addresses(&self) -> impl Iterator<Item = (InstrId, &[u64])> + '_ {
        self.instr_addresses.iter().map(|(&i, a)| (i, a.as_slice()))
    }

    pub fn all_condition_addresses(&self) -> impl Iterator<Item = (ExprId, &[u64])> + '_ {
        self.condition_addresses
            .iter()
            .map(|(&e, a)| (e, a.as_slice()))
    }
}

/// Provenance expressed in node identities, ready for serialization.
///
/// Mappings whose construction handles share an identity are merged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProvenanceSnapshot {
    pub instruction_mapping: BTreeMap<u32, u32>,
    pub expression_mapping: BTreeMap<u32, u32>,
    pub lval_mapping: BTreeMap<u32, u32>,
    pub reaching_definitions: BTreeMap<u32, Vec<ReachingDefinition>>,
    pub defuses: BTreeMap<u32, Vec<DefUse>>,
    pub defuses_high: BTreeMap<u32, Vec<DefUse>>,
    pub instruction_addresses: BTreeMap<u32, Vec<String>>,
    pub condition_addresses: BTreeMap<u32, Vec<String>>,
}
