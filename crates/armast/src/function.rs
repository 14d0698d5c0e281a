//! Function lifting: decoded instructions + facts → dual AST.

use armast_facts::{ExprResolver, InstrXData};
use armast_ir::{graph, AstBuilder, ExprId, GlobalSymbolTable, InstrId, SharedGlobals, StmtId};
use armast_isa::{DecodedRecord, LiftConfig, LiftContext, OpcodeRegistry, OpcodeSemantics, OperandTable};
use serde::Serialize;
use tracing::{debug, trace_span};

use crate::error::{Error, Result};
use crate::metrics;

/// One machine instruction with its decoder record and recovered facts.
#[derive(Clone, Debug)]
pub struct InstructionSite {
    pub address: u64,
    /// Hex-encoded instruction bytes.
    pub bytes: String,
    pub record: DecodedRecord,
    pub xdata: InstrXData,
    /// Lift the fall-through condition of a conditional branch instead of
    /// the taken one.
    pub reverse: bool,
}

impl InstructionSite {
    pub fn new(address: u64, bytes: &str, record: DecodedRecord, xdata: InstrXData) -> Self {
        Self {
            address,
            bytes: bytes.to_string(),
            record,
            xdata,
            reverse: false,
        }
    }

    #[must_use]
    pub const fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// Input for one function lift.
#[derive(Clone, Debug, Default)]
pub struct FunctionSource {
    pub name: String,
    pub operands: OperandTable,
    pub sites: Vec<InstructionSite>,
}

impl FunctionSource {
    pub fn new(name: &str, operands: OperandTable) -> Self {
        Self {
            name: name.to_string(),
            operands,
            sites: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_site(mut self, site: InstructionSite) -> Self {
        self.sites.push(site);
        self
    }
}

/// What one machine instruction lifted to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiftedInstruction {
    pub address: u64,
    pub mnemonic: &'static str,
    pub annotation: String,
    pub high: Vec<InstrId>,
    pub low: Vec<InstrId>,
    /// Lifted from invalid facts.
    pub degraded: bool,
}

/// Paired condition of a conditional branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiftedCondition {
    pub address: u64,
    pub high: ExprId,
    pub low: ExprId,
}

/// A lifted function: both instruction sequences, their conditions and the
/// AST that owns them.
#[derive(Debug)]
pub struct LiftedFunction {
    pub name: String,
    pub instructions: Vec<LiftedInstruction>,
    pub conditions: Vec<LiftedCondition>,
    pub high_body: StmtId,
    pub low_body: StmtId,
    pub ast: AstBuilder,
}

#[derive(Serialize)]
struct InstructionExport<'a> {
    address: String,
    mnemonic: &'static str,
    annotation: &'a str,
    high: Vec<u32>,
    low: Vec<u32>,
}

#[derive(Serialize)]
struct FunctionExport<'a> {
    name: &'a str,
    high: u32,
    low: u32,
    instructions: Vec<InstructionExport<'a>>,
    nodes: Vec<armast_ir::NodeRecord>,
    provenance: armast_ir::ProvenanceSnapshot,
}

impl LiftedFunction {
    pub fn high_text(&self) -> String {
        self.ast.stmt_to_string(self.high_body)
    }

    pub fn low_text(&self) -> String {
        self.ast.stmt_to_string(self.low_body)
    }

    /// Instructions lifted from invalid facts.
    pub fn degraded(&self) -> impl Iterator<Item = &LiftedInstruction> {
        self.instructions.iter().filter(|i| i.degraded)
    }

    /// Node table, provenance and per-instruction results as JSON.
    pub fn to_json(&self) -> Result<String> {
        let ids = |instrs: &[InstrId]| -> Vec<u32> {
            instrs.iter().map(|&i| self.ast.instr_index(i).get()).collect()
        };
        let export = FunctionExport {
            name: &self.name,
            high: self.ast.stmt_index(self.high_body).get(),
            low: self.ast.stmt_index(self.low_body).get(),
            instructions: self
                .instructions
                .iter()
                .map(|i| InstructionExport {
                    address: format!("{:#x}", i.address),
                    mnemonic: i.mnemonic,
                    annotation: &i.annotation,
                    high: ids(&i.high),
                    low: ids(&i.low),
                })
                .collect(),
            nodes: self.ast.records(),
            provenance: self.ast.provenance_snapshot(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// DOT rendering of the high-level body with its low-level mappings.
    pub fn to_dot(&self) -> Result<String> {
        let graph = graph::to_graph(&self.ast, self.high_body)?;
        Ok(graph.to_dot())
    }
}

/// Lifts functions one at a time against a shared global symbol table.
pub struct FunctionLifter<'a> {
    config: LiftConfig,
    resolver: &'a dyn ExprResolver,
    globals: SharedGlobals,
}

impl<'a> FunctionLifter<'a> {
    pub fn new(config: LiftConfig, resolver: &'a dyn ExprResolver) -> Self {
        Self::with_globals(config, resolver, GlobalSymbolTable::shared())
    }

    pub fn with_globals(config: LiftConfig, resolver: &'a dyn ExprResolver, globals: SharedGlobals) -> Self {
        Self {
            config,
            resolver,
            globals,
        }
    }

    pub const fn config(&self) -> &LiftConfig {
        &self.config
    }

    pub const fn globals(&self) -> &SharedGlobals {
        &self.globals
    }

    /// Lift every instruction of `source` into a fresh AST.
    ///
    /// Contract violations abort the lift with the faulting address.
    /// Instructions with invalid facts degrade to empty lists.
    pub fn lift(&self, source: &FunctionSource) -> Result<LiftedFunction> {
        let _span = trace_span!("lift_function", name = %source.name).entered();
        let registry = OpcodeRegistry::global().map_err(Error::Registry)?;
        let mut ast = AstBuilder::with_globals(self.globals.clone());
        let mut instructions = Vec::with_capacity(source.sites.len());
        let mut conditions = Vec::new();

        for site in &source.sites {
            let fail = |err| Error::Lift {
                address: site.address,
                source: err,
            };
            let opcode = registry.construct(&site.record, &source.operands).map_err(fail)?;
            let mut ctx = LiftContext::new(&mut ast, self.resolver, &self.config);
            let lifted = opcode
                .lift(&mut ctx, site.address, &site.bytes, &site.xdata)
                .map_err(fail)?;
            let cond = opcode
                .condition_ast(&mut ctx, site.address, &site.xdata, site.reverse)
                .map_err(fail)?;
            if let Some((high, low)) = cond {
                conditions.push(LiftedCondition {
                    address: site.address,
                    high,
                    low,
                });
            }

            let degraded = !site.xdata.is_ok();
            metrics::record_instruction(opcode.mnemonic(), degraded);
            instructions.push(LiftedInstruction {
                address: site.address,
                mnemonic: opcode.mnemonic(),
                annotation: opcode.annotation(&site.xdata),
                high: lifted.high,
                low: lifted.low,
                degraded,
            });
        }

        let high: Vec<InstrId> = instructions.iter().flat_map(|i| i.high.iter().copied()).collect();
        let low: Vec<InstrId> = instructions.iter().flat_map(|i| i.low.iter().copied()).collect();
        let high_body = ast.mk_instr_sequence(high);
        let low_body = ast.mk_instr_sequence(low);

        let function = LiftedFunction {
            name: source.name.clone(),
            instructions,
            conditions,
            high_body,
            low_body,
            ast,
        };
        debug!(
            name = %function.name,
            instructions = function.instructions.len(),
            conditions = function.conditions.len(),
            degraded = function.degraded().count(),
            nodes = function.ast.table().len(),
            "lifted function"
        );
        Ok(function)
    }
}
