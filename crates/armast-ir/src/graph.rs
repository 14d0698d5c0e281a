//! Graph description of an AST fragment.
//!
//! Pure: walks the builder and its provenance and returns nodes and edges.
//! Rendering to DOT is a separate step.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::builder::AstBuilder;
use crate::node::{Expr, ExprId, Instr, InstrId, Lhost, LvalId, NodeIndex, Offset, OffsetId, Stmt, StmtId};
use crate::AstError;

/// A graph node, named after the AST node identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphNode {
    pub name: String,
    pub label: String,
    pub color: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphEdge {
    pub src: String,
    pub tgt: String,
    pub label: Option<String>,
}

/// Nodes and edges of an AST fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AstGraph {
    pub name: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl AstGraph {
    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Render as a DOT digraph.
    pub fn to_dot(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AstGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph \"{}\" {{", escape(&self.name))?;
        for node in &self.nodes {
            writeln!(
                f,
                "  {} [label=\"{}\", style=filled, fillcolor=\"{}\"];",
                node.name,
                escape(&node.label),
                node.color
            )?;
        }
        for edge in &self.edges {
            match &edge.label {
                Some(label) => writeln!(f, "  {} -> {} [label=\"{}\"];", edge.src, edge.tgt, escape(label))?,
                None => writeln!(f, "  {} -> {};", edge.src, edge.tgt)?,
            }
        }
        f.write_str("}\n")
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn node_name(index: NodeIndex) -> String {
    format!("n{index}")
}

/// Graph of a statement and everything reachable from it.
pub fn to_graph(ast: &AstBuilder, root: StmtId) -> Result<AstGraph, AstError> {
    ast.try_stmt(root)?;
    let mut walker = GraphWalker::new(ast, format!("stmt-{}", ast.stmt_index(root)));
    walker.stmt(root);
    Ok(walker.graph)
}

/// Graph of a high-level instruction joined to its low-level counterpart.
pub fn instr_graph(ast: &AstBuilder, high: InstrId) -> Result<AstGraph, AstError> {
    ast.try_instr(high)?;
    let mut walker = GraphWalker::new(ast, format!("instr-{}", ast.instr_index(high)));
    let high_name = walker.instr(high);
    if let Some(low) = ast.provenance().low_instr(high) {
        let low_name = walker.instr(low);
        walker.edge(&high_name, &low_name, Some("low"));
    }
    Ok(walker.graph)
}

struct GraphWalker<'a> {
    ast: &'a AstBuilder,
    graph: AstGraph,
    seen: FxHashSet<NodeIndex>,
}

impl<'a> GraphWalker<'a> {
    fn new(ast: &'a AstBuilder, name: String) -> Self {
        Self {
            ast,
            graph: AstGraph {
                name,
                ..AstGraph::default()
            },
            seen: FxHashSet::default(),
        }
    }

    /// Add a node; returns false if it was already present.
    fn add(&mut self, index: NodeIndex, label: String, color: &'static str) -> bool {
        if !self.seen.insert(index) {
            return false;
        }
        self.graph.nodes.push(GraphNode {
            name: node_name(index),
            label,
            color,
        });
        true
    }

    fn edge(&mut self, src: &str, tgt: &str, label: Option<&str>) {
        self.graph.edges.push(GraphEdge {
            src: src.to_string(),
            tgt: tgt.to_string(),
            label: label.map(str::to_string),
        });
    }

    fn stmt(&mut self, id: StmtId) -> String {
        let ast = self.ast;
        let index = ast.stmt_index(id);
        let name = node_name(index);
        let stmt = ast.stmt(id);
        let label = match stmt {
            Stmt::Branch { pc_offset, .. } => format!("if (pc+{pc_offset})"),
            other => other.tag().to_string(),
        };
        if !self.add(index, label, "#ffcc99") {
            return name;
        }
        match stmt {
            Stmt::Return { expr } => {
                if let Some(expr) = expr {
                    let child = self.expr(*expr);
                    self.edge(&name, &child, None);
                }
            }
            Stmt::Block { stmts } => {
                for &s in stmts {
                    let child = self.stmt(s);
                    self.edge(&name, &child, None);
                }
            }
            Stmt::Instrs { instrs } => {
                for &i in instrs {
                    let child = self.instr(i);
                    self.edge(&name, &child, None);
                }
            }
            Stmt::Branch {
                cond,
                then_stmt,
                else_stmt,
                ..
            } => {
                let c = self.expr(*cond);
                self.edge(&name, &c, Some("cond"));
                let t = self.stmt(*then_stmt);
                self.edge(&name, &t, Some("then"));
                let e = self.stmt(*else_stmt);
                self.edge(&name, &e, Some("else"));
            }
        }
        name
    }

    fn instr(&mut self, id: InstrId) -> String {
        let ast = self.ast;
        let index = ast.instr_index(id);
        let name = node_name(index);
        let instr = ast.instr(id);
        let mut label = instr.tag().to_string();
        if let Some(address) = instr.site().address {
            label.push_str(&format!(" @ {address:#x}"));
        }
        if let Some(low) = ast.provenance().low_instr(id) {
            label.push_str(&format!("\nlow: {}", ast.instr_to_string(low)));
        }
        if !self.add(index, label, "#99ccff") {
            return name;
        }
        match instr {
            Instr::Assign { lhs, rhs, .. } => {
                let l = self.lval(*lhs);
                self.edge(&name, &l, Some("lhs"));
                let r = self.expr(*rhs);
                self.edge(&name, &r, Some("rhs"));
            }
            Instr::Call { lhs, tgt, args, .. } => {
                if let Some(lhs) = lhs {
                    let l = self.lval(*lhs);
                    self.edge(&name, &l, Some("lhs"));
                }
                let t = self.expr(*tgt);
                self.edge(&name, &t, Some("tgt"));
                for (i, &a) in args.iter().enumerate() {
                    let child = self.expr(a);
                    self.edge(&name, &child, Some(&format!("arg{i}")));
                }
            }
            Instr::Nop { .. } => {}
        }
        name
    }

    fn lval(&mut self, id: LvalId) -> String {
        let ast = self.ast;
        let index = ast.lval_index(id);
        let name = node_name(index);
        let lval = ast.lval(id);
        let mut label = match &lval.host {
            Lhost::Var { name, .. } => format!("var {name}"),
            Lhost::MemRef { .. } => "memref".to_string(),
        };
        if let Some(defuses) = ast.provenance().defuses_high(id) {
            for du in defuses {
                let uses: Vec<String> = du.uses.iter().map(|u| format!("{u:#x}")).collect();
                label.push_str(&format!("\nuses {}: {}", du.variable, uses.join(",")));
            }
        }
        if !self.add(index, label, "#ccffcc") {
            return name;
        }
        if let Lhost::MemRef { addr } = &lval.host {
            let a = self.expr(*addr);
            self.edge(&name, &a, Some("addr"));
        }
        if let Some(child) = self.offset(lval.offset) {
            self.edge(&name, &child, Some("offset"));
        }
        name
    }

    fn offset(&mut self, id: OffsetId) -> Option<String> {
        let ast = self.ast;
        let (label, index_expr, inner) = match ast.offset(id) {
            Offset::None => return None,
            Offset::Field { name, offset, .. } => (format!("field {name}"), None, *offset),
            Offset::Index { index, offset } => ("index".to_string(), Some(*index), *offset),
        };
        let index = ast.offset_index(id);
        let name = node_name(index);
        if !self.add(index, label, "#eeeeee") {
            return Some(name);
        }
        if let Some(e) = index_expr {
            let child = self.expr(e);
            self.edge(&name, &child, Some("index"));
        }
        if let Some(child) = self.offset(inner) {
            self.edge(&name, &child, None);
        }
        Some(name)
    }

    fn expr(&mut self, id: ExprId) -> String {
        let ast = self.ast;
        let index = ast.expr_index(id);
        let name = node_name(index);
        let expr = ast.expr(id);
        let mut label = match expr {
            Expr::IntConst { value } => value.to_string(),
            Expr::GlobalAddress { value, .. } => format!("&{value:#x}"),
            Expr::StringConst { value, .. } => format!("{value:?}"),
            Expr::Unary { op, .. } => op.symbol().to_string(),
            Expr::Binary { op, .. } => op.symbol().to_string(),
            other => other.tag().to_string(),
        };
        for rdef in ast.provenance().reaching_defs(id) {
            let sites: Vec<String> = rdef.sites.iter().map(|s| format!("{s:#x}")).collect();
            label.push_str(&format!("\nrdef {}: {}", rdef.variable, sites.join(",")));
        }
        for address in ast.provenance().condition_addresses(id) {
            label.push_str(&format!("\ncond @ {address:#x}"));
        }
        if !self.add(index, label, "#ffffcc") {
            return name;
        }
        let children: Vec<ExprId> = match expr {
            Expr::IntConst { .. } | Expr::StringConst { addr: None, .. } => Vec::new(),
            Expr::StringConst { addr: Some(a), .. } | Expr::GlobalAddress { addr: a, .. } => vec![*a],
            Expr::Lval { lval } | Expr::AddressOf { lval } => {
                let l = self.lval(*lval);
                self.edge(&name, &l, None);
                Vec::new()
            }
            Expr::Substituted { expr, .. } | Expr::Cast { expr, .. } => vec![*expr],
            Expr::Unary { arg, .. } => vec![*arg],
            Expr::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Expr::Question {
                cond,
                then_expr,
                else_expr,
            } => vec![*cond, *then_expr, *else_expr],
        };
        for child in children {
            let c = self.expr(child);
            self.edge(&name, &c, None);
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BinaryOp, InstrSite};
    use crate::provenance::ReachingDefinition;

    #[test]
    fn test_shared_nodes_appear_once() {
        let mut ast = AstBuilder::new();
        let r0 = ast.mk_variable_expr("R0");
        let sum = ast.mk_binary_op(BinaryOp::Plus, r0, r0);
        let lhs = ast.mk_variable_lval("R1");
        let assign = ast.mk_assign(lhs, sum, InstrSite::at(0x40, "0010"));
        let stmt = ast.mk_instr_sequence(vec![assign]);

        let graph = to_graph(&ast, stmt).unwrap();
        let r0_name = node_name(ast.expr_index(r0));
        assert_eq!(graph.nodes.iter().filter(|n| n.name == r0_name).count(), 1);
        assert_eq!(
            graph.edges.iter().filter(|e| e.tgt == r0_name).count(),
            2
        );
    }

    #[test]
    fn test_labels_carry_provenance() {
        let mut ast = AstBuilder::new();
        let low_lhs = ast.mk_variable_lval("R0");
        let low_rhs = ast.mk_variable_expr("R1");
        let low = ast.mk_assign(low_lhs, low_rhs, InstrSite::at(0x40, "0800"));
        let high_lhs = ast.mk_variable_lval("count");
        let high_rhs = ast.mk_variable_expr("total");
        let high = ast.mk_assign(high_lhs, high_rhs, InstrSite::at(0x40, "0800"));
        ast.provenance_mut().add_instr_mapping(high, low);
        ast.provenance_mut()
            .add_reaching_defs(high_rhs, [ReachingDefinition::new("R1", vec![0x3c])]);

        let graph = instr_graph(&ast, high).unwrap();
        let high_node = graph.node(&node_name(ast.instr_index(high))).unwrap();
        assert!(high_node.label.contains("low: R0 := R1"));
        let rhs_node = graph.node(&node_name(ast.expr_index(high_rhs))).unwrap();
        assert!(rhs_node.label.contains("rdef R1: 0x3c"));
        assert!(graph.edges.iter().any(|e| e.label.as_deref() == Some("low")));

        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("->"));
    }

    #[test]
    fn test_dot_rendering_escapes_labels() {
        let graph = AstGraph {
            name: "f\"1".to_string(),
            nodes: vec![GraphNode {
                name: "n1".to_string(),
                label: "nop\nlow: x".to_string(),
                color: "#99ccff",
            }],
            edges: vec![
                GraphEdge {
                    src: "n1".to_string(),
                    tgt: "n2".to_string(),
                    label: Some("low".to_string()),
                },
                GraphEdge {
                    src: "n1".to_string(),
                    tgt: "n3".to_string(),
                    label: None,
                },
            ],
        };
        assert_eq!(
            graph.to_dot(),
            "digraph \"f\\\"1\" {\n  n1 [label=\"nop\\nlow: x\", style=filled, fillcolor=\"#99ccff\"];\n  n1 -> n2 [label=\"low\"];\n  n1 -> n3;\n}\n"
        );
    }

    #[test]
    fn test_unknown_root_rejected() {
        let mut other = AstBuilder::new();
        other.mk_return(None);
        let foreign = other.mk_return(None);
        let ast = AstBuilder::new();
        assert!(to_graph(&ast, foreign).is_err());
    }
}
