//! Per-function AST builder.
//!
//! Owns the node arenas, the interning table, the provenance maps and the
//! local symbol table of one function lift. Every `mk_*` call interns the new
//! node before returning its handle.

use std::collections::BTreeMap;

use crate::node::{
    BinaryOp, CompInfo, CompInfoId, Expr, ExprId, FieldInfo, FieldInfoId, FloatKind, Instr,
    InstrId, InstrSite, IntKind, Lhost, Lval, LvalId, NodeIndex, Offset, OffsetId, Stmt, StmtId,
    Typ, TypId, UnaryOp, VarInfo, VarInfoId,
};
use crate::provenance::{Provenance, ProvenanceSnapshot};
use crate::symbols::{GlobalSymbolTable, SharedGlobals};
use crate::table::{NodeKey, NodeRecord, NodeTable};
use crate::AstError;

#[derive(Debug)]
struct Entry<T> {
    node: T,
    index: NodeIndex,
}

/// Builder and owner of a function's AST.
#[derive(Debug)]
pub struct AstBuilder {
    table: NodeTable,
    stmts: Vec<Entry<Stmt>>,
    instrs: Vec<Entry<Instr>>,
    lvals: Vec<Entry<Lval>>,
    offsets: Vec<Entry<Offset>>,
    exprs: Vec<Entry<Expr>>,
    typs: Vec<Entry<Typ>>,
    varinfos: Vec<Entry<VarInfo>>,
    fieldinfos: Vec<Entry<FieldInfo>>,
    compinfos: Vec<Entry<CompInfo>>,
    provenance: Provenance,
    locals: BTreeMap<String, VarInfoId>,
    formals: Vec<VarInfoId>,
    prototype: Option<VarInfoId>,
    globals: SharedGlobals,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! arena_accessors {
    ($get:ident, $try_get:ident, $index:ident, $field:ident, $id:ty, $node:ty, $kind:literal) => {
        #[must_use]
        pub fn $get(&self, id: $id) -> &$node {
            &self.$field[id.index()].node
        }

        /// Checked lookup for handles that may come from another builder.
        pub fn $try_get(&self, id: $id) -> Result<&$node, AstError> {
            self.$field
                .get(id.index())
                .map(|entry| &entry.node)
                .ok_or(AstError::UnknownHandle {
                    kind: $kind,
                    id: id.0,
                })
        }

        /// Interned identity of the node.
        #[must_use]
        pub fn $index(&self, id: $id) -> NodeIndex {
            self.$field[id.index()].index
        }
    };
}

fn next_id(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn arg(index: NodeIndex) -> i64 {
    i64::from(index.0)
}

fn addr_arg(address: u64) -> i64 {
    i64::try_from(address).unwrap_or(i64::MAX)
}

fn tags(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn site_record(record: NodeRecord, site: &InstrSite) -> NodeRecord {
    let record = match site.address {
        Some(address) => record.with_attr("address", format!("{address:#x}")),
        None => record,
    };
    if site.bytes.is_empty() {
        record
    } else {
        record.with_attr("bytes", &site.bytes)
    }
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::with_globals(GlobalSymbolTable::shared())
    }

    /// Builder sharing a session-wide global symbol table.
    pub fn with_globals(globals: SharedGlobals) -> Self {
        Self {
            table: NodeTable::new(),
            stmts: Vec::new(),
            instrs: Vec::new(),
            lvals: Vec::new(),
            offsets: Vec::new(),
            exprs: Vec::new(),
            typs: Vec::new(),
            varinfos: Vec::new(),
            fieldinfos: Vec::new(),
            compinfos: Vec::new(),
            provenance: Provenance::new(),
            locals: BTreeMap::new(),
            formals: Vec::new(),
            prototype: None,
            globals,
        }
    }

    arena_accessors!(stmt, try_stmt, stmt_index, stmts, StmtId, Stmt, "statement");
    arena_accessors!(instr, try_instr, instr_index, instrs, InstrId, Instr, "instruction");
    arena_accessors!(lval, try_lval, lval_index, lvals, LvalId, Lval, "lval");
    arena_accessors!(offset, try_offset, offset_index, offsets, OffsetId, Offset, "offset");
    arena_accessors!(expr, try_expr, expr_index, exprs, ExprId, Expr, "expression");
    arena_accessors!(typ, try_typ, typ_index, typs, TypId, Typ, "type");
    arena_accessors!(varinfo, try_varinfo, varinfo_index, varinfos, VarInfoId, VarInfo, "varinfo");
    arena_accessors!(fieldinfo, try_fieldinfo, fieldinfo_index, fieldinfos, FieldInfoId, FieldInfo, "fieldinfo");
    arena_accessors!(compinfo, try_compinfo, compinfo_index, compinfos, CompInfoId, CompInfo, "compinfo");

    pub const fn table(&self) -> &NodeTable {
        &self.table
    }

    /// Node table snapshot ordered by identity.
    pub fn records(&self) -> Vec<NodeRecord> {
        self.table.records()
    }

    pub const fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub const fn provenance_mut(&mut self) -> &mut Provenance {
        &mut self.provenance
    }

    pub const fn globals(&self) -> &SharedGlobals {
        &self.globals
    }

    pub fn instr_count(&self) -> usize {
        self.instrs.len()
    }

    fn intern(&mut self, tags: Vec<String>, args: Vec<i64>, record: NodeRecord) -> NodeIndex {
        self.table.intern(NodeKey::new(tags, args), record)
    }

    // Types

    pub fn mk_void_type(&mut self) -> TypId {
        let index = self.intern(tags(&["void"]), vec![], NodeRecord::new("void"));
        self.push_typ(Typ::Void, index)
    }

    pub fn mk_int_type(&mut self, ikind: IntKind) -> TypId {
        let record = NodeRecord::new("int").with_attr("ikind", ikind.name());
        let index = self.intern(tags(&["int", ikind.name()]), vec![], record);
        self.push_typ(Typ::Int { ikind }, index)
    }

    pub fn mk_float_type(&mut self, fkind: FloatKind) -> TypId {
        let record = NodeRecord::new("float").with_attr("fkind", fkind.name());
        let index = self.intern(tags(&["float", fkind.name()]), vec![], record);
        self.push_typ(Typ::Float { fkind }, index)
    }

    pub fn mk_pointer_type(&mut self, target: TypId) -> TypId {
        let args = vec![arg(self.typ_index(target))];
        let index = self.intern(tags(&["ptr"]), args, NodeRecord::new("ptr"));
        self.push_typ(Typ::Ptr { target }, index)
    }

    pub fn mk_array_type(&mut self, elem: TypId, size: Option<ExprId>) -> TypId {
        let size_arg = size.map_or(-1, |e| arg(self.expr_index(e)));
        let args = vec![arg(self.typ_index(elem)), size_arg];
        let index = self.intern(tags(&["array"]), args, NodeRecord::new("array"));
        self.push_typ(Typ::Array { elem, size }, index)
    }

    pub fn mk_fun_type(&mut self, ret: TypId, args: Option<TypId>) -> TypId {
        let args_arg = args.map_or(-1, |t| arg(self.typ_index(t)));
        let key_args = vec![arg(self.typ_index(ret)), args_arg];
        let index = self.intern(tags(&["fun"]), key_args, NodeRecord::new("fun"));
        self.push_typ(Typ::Fun { ret, args }, index)
    }

    pub fn mk_fun_args(&mut self, args: Vec<TypId>) -> TypId {
        let key_args = args.iter().map(|&t| arg(self.typ_index(t))).collect();
        let index = self.intern(tags(&["funargs"]), key_args, NodeRecord::new("funargs"));
        self.push_typ(Typ::FunArgs { args }, index)
    }

    pub fn mk_fun_arg(&mut self, name: &str, typ: TypId) -> TypId {
        let record = NodeRecord::new("funarg").with_attr("name", name);
        let args = vec![arg(self.typ_index(typ))];
        let index = self.intern(tags(&["funarg", name]), args, record);
        self.push_typ(
            Typ::FunArg {
                name: name.to_string(),
                typ,
            },
            index,
        )
    }

    pub fn mk_named_type(&mut self, name: &str, def: TypId) -> TypId {
        let record = NodeRecord::new("typdef").with_attr("name", name);
        let args = vec![arg(self.typ_index(def))];
        let index = self.intern(tags(&["typdef", name]), args, record);
        self.push_typ(
            Typ::Named {
                name: name.to_string(),
                def,
            },
            index,
        )
    }

    pub fn mk_comp_type(&mut self, name: &str, key: i64) -> TypId {
        let record = NodeRecord::new("comp").with_attr("name", name);
        let index = self.intern(tags(&["comp", name]), vec![key], record);
        self.push_typ(
            Typ::Comp {
                name: name.to_string(),
                key,
            },
            index,
        )
    }

    fn push_typ(&mut self, node: Typ, index: NodeIndex) -> TypId {
        let id = TypId(next_id(self.typs.len()));
        self.typs.push(Entry { node, index });
        id
    }

    // Declarations

    /// Declare a variable. The varinfo is interned like any other node.
    pub fn mk_varinfo(
        &mut self,
        name: &str,
        typ: Option<TypId>,
        parameter: Option<u32>,
        global_address: Option<u64>,
        descr: Option<&str>,
    ) -> VarInfoId {
        let mut key_tags = tags(&["varinfo", name]);
        let mut record = NodeRecord::new("varinfo").with_attr("name", name);
        if let Some(descr) = descr {
            key_tags.push(descr.to_string());
            record = record.with_attr("descr", descr);
        }
        let args = vec![
            typ.map_or(-1, |t| arg(self.typ_index(t))),
            parameter.map_or(-1, i64::from),
            global_address.map_or(-1, addr_arg),
        ];
        let index = self.intern(key_tags, args, record);
        let id = VarInfoId(next_id(self.varinfos.len()));
        self.varinfos.push(Entry {
            node: VarInfo {
                name: name.to_string(),
                typ,
                parameter,
                global_address,
                descr: descr.map(str::to_string),
            },
            index,
        });
        id
    }

    pub fn mk_fieldinfo(&mut self, name: &str, typ: TypId, compkey: i64) -> FieldInfoId {
        let record = NodeRecord::new("fieldinfo").with_attr("name", name);
        let args = vec![arg(self.typ_index(typ)), compkey];
        let index = self.intern(tags(&["fieldinfo", name]), args, record);
        let id = FieldInfoId(next_id(self.fieldinfos.len()));
        self.fieldinfos.push(Entry {
            node: FieldInfo {
                name: name.to_string(),
                typ,
                compkey,
            },
            index,
        });
        id
    }

    /// Declare a struct or union and register it in the global table.
    pub fn mk_compinfo(
        &mut self,
        name: &str,
        key: i64,
        is_union: bool,
        fields: Vec<FieldInfoId>,
    ) -> Result<CompInfoId, AstError> {
        self.globals.lock().add_compinfo(key, name, is_union)?;
        let record = NodeRecord::new("compinfo").with_attr("name", name);
        let mut args = vec![key, i64::from(is_union)];
        args.extend(fields.iter().map(|&f| arg(self.fieldinfo_index(f))));
        let index = self.intern(tags(&["compinfo", name]), args, record);
        let id = CompInfoId(next_id(self.compinfos.len()));
        self.compinfos.push(Entry {
            node: CompInfo {
                name: name.to_string(),
                key,
                is_union,
                fields,
            },
            index,
        });
        Ok(id)
    }

    // Local symbol table

    /// Varinfo for `name`, declaring it on first use.
    ///
    /// Names registered in the global table get their global address.
    pub fn variable_info(&mut self, name: &str) -> VarInfoId {
        if let Some(&vinfo) = self.locals.get(name) {
            return vinfo;
        }
        let gaddr = self.globals.lock().get(name).and_then(|s| s.address);
        let vinfo = self.mk_varinfo(name, None, None, gaddr, None);
        self.locals.insert(name.to_string(), vinfo);
        vinfo
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.locals.contains_key(name)
    }

    /// Declare the `index`-th formal parameter.
    pub fn add_formal(&mut self, name: &str, typ: TypId, index: u32) -> Result<VarInfoId, AstError> {
        if self.locals.contains_key(name) {
            return Err(AstError::DuplicateSymbol(name.to_string()));
        }
        let vinfo = self.mk_varinfo(name, Some(typ), Some(index), None, Some("formal"));
        self.locals.insert(name.to_string(), vinfo);
        self.formals.push(vinfo);
        Ok(vinfo)
    }

    pub fn formals(&self) -> &[VarInfoId] {
        &self.formals
    }

    /// Set the prototype of the function being lifted.
    pub fn set_function_prototype(&mut self, name: &str, typ: TypId) -> Result<VarInfoId, AstError> {
        if !self.typ(typ).is_function() {
            return Err(AstError::NotAFunctionType(name.to_string()));
        }
        let vinfo = self.mk_varinfo(name, Some(typ), None, None, Some("prototype"));
        self.prototype = Some(vinfo);
        Ok(vinfo)
    }

    pub const fn prototype(&self) -> Option<VarInfoId> {
        self.prototype
    }

    // Offsets and lvalues

    pub fn mk_no_offset(&mut self) -> OffsetId {
        let index = self.intern(tags(&["no-offset"]), vec![], NodeRecord::new("no-offset"));
        self.push_offset(Offset::None, index)
    }

    pub fn mk_field_offset(&mut self, name: &str, compkey: i64, offset: OffsetId) -> OffsetId {
        let record = NodeRecord::new("field-offset").with_attr("name", name);
        let args = vec![compkey, arg(self.offset_index(offset))];
        let index = self.intern(tags(&["field-offset", name]), args, record);
        self.push_offset(
            Offset::Field {
                name: name.to_string(),
                compkey,
                offset,
            },
            index,
        )
    }

    pub fn mk_index_offset(&mut self, index_expr: ExprId, offset: OffsetId) -> OffsetId {
        let args = vec![arg(self.expr_index(index_expr)), arg(self.offset_index(offset))];
        let index = self.intern(tags(&["index-offset"]), args, NodeRecord::new("index-offset"));
        self.push_offset(
            Offset::Index {
                index: index_expr,
                offset,
            },
            index,
        )
    }

    fn push_offset(&mut self, node: Offset, index: NodeIndex) -> OffsetId {
        let id = OffsetId(next_id(self.offsets.len()));
        self.offsets.push(Entry { node, index });
        id
    }

    /// Lvalue from a host and an offset.
    pub fn mk_lval(&mut self, host: Lhost, offset: OffsetId) -> LvalId {
        let host_index = match &host {
            Lhost::Var { name, .. } => {
                let record = NodeRecord::new("var").with_attr("name", name);
                self.intern(tags(&["var", name]), vec![], record)
            }
            Lhost::MemRef { addr } => {
                let args = vec![arg(self.expr_index(*addr))];
                self.intern(tags(&["memref"]), args, NodeRecord::new("memref"))
            }
        };
        let args = vec![arg(host_index), arg(self.offset_index(offset))];
        let index = self.intern(tags(&["lval"]), args, NodeRecord::new("lval"));
        let id = LvalId(next_id(self.lvals.len()));
        self.lvals.push(Entry {
            node: Lval { host, offset },
            index,
        });
        id
    }

    /// Variable lvalue with no offset.
    pub fn mk_variable_lval(&mut self, name: &str) -> LvalId {
        let vinfo = self.variable_info(name);
        let offset = self.mk_no_offset();
        self.mk_lval(
            Lhost::Var {
                name: name.to_string(),
                vinfo,
            },
            offset,
        )
    }

    /// Variable lvalue for a named global, registering the symbol.
    pub fn mk_global_variable_lval(&mut self, name: &str, address: u64) -> LvalId {
        self.globals.lock().add_symbol(name, Some(address), None);
        self.mk_variable_lval(name)
    }

    /// Memory lvalue `*addr`.
    pub fn mk_memref_lval(&mut self, addr: ExprId) -> LvalId {
        let offset = self.mk_no_offset();
        self.mk_lval(Lhost::MemRef { addr }, offset)
    }

    // Expressions

    pub fn mk_integer_constant(&mut self, value: impl Into<i128>) -> ExprId {
        let value = value.into();
        let text = value.to_string();
        let record = NodeRecord::new("integer-constant").with_attr("value", &text);
        let index = self.intern(tags(&["integer-constant", &text]), vec![], record);
        self.push_expr(Expr::IntConst { value }, index)
    }

    /// Address of a global, carried as an integer constant child.
    pub fn mk_global_address(&mut self, value: u64) -> ExprId {
        let addr = self.mk_integer_constant(value);
        let hex = format!("{value:#x}");
        let record = NodeRecord::new("global-address").with_attr("value", &hex);
        let args = vec![arg(self.expr_index(addr))];
        let index = self.intern(tags(&["global-address", &hex]), args, record);
        self.push_expr(Expr::GlobalAddress { value, addr }, index)
    }

    pub fn mk_string_constant(&mut self, value: &str, addr: Option<ExprId>, va: Option<u64>) -> ExprId {
        let mut key_tags = tags(&["string-constant", value]);
        let mut record = NodeRecord::new("string-constant").with_attr("value", value);
        if let Some(va) = va {
            key_tags.push(format!("{va:#x}"));
            record = record.with_attr("va", format!("{va:#x}"));
        }
        let args = vec![addr.map_or(-1, |e| arg(self.expr_index(e)))];
        let index = self.intern(key_tags, args, record);
        self.push_expr(
            Expr::StringConst {
                value: value.to_string(),
                addr,
                va,
            },
            index,
        )
    }

    pub fn mk_lval_expr(&mut self, lval: LvalId) -> ExprId {
        let args = vec![arg(self.lval_index(lval))];
        let index = self.intern(tags(&["lval-expr"]), args, NodeRecord::new("lval-expr"));
        self.push_expr(Expr::Lval { lval }, index)
    }

    /// Expression reading variable `name`.
    pub fn mk_variable_expr(&mut self, name: &str) -> ExprId {
        let lval = self.mk_variable_lval(name);
        self.mk_lval_expr(lval)
    }

    /// Expression `*addr`.
    pub fn mk_memref_expr(&mut self, addr: ExprId) -> ExprId {
        let lval = self.mk_memref_lval(addr);
        self.mk_lval_expr(lval)
    }

    /// `expr` substituted for `lval` as defined by the `assign` instruction.
    pub fn mk_substituted_expr(&mut self, assign: InstrId, lval: LvalId, expr: ExprId) -> ExprId {
        let args = vec![
            arg(self.instr_index(assign)),
            arg(self.lval_index(lval)),
            arg(self.expr_index(expr)),
        ];
        let record = NodeRecord::new("substituted-expr");
        let index = self.intern(tags(&["substituted-expr"]), args, record);
        self.push_expr(Expr::Substituted { assign, lval, expr }, index)
    }

    pub fn mk_cast_expr(&mut self, typ: TypId, expr: ExprId) -> ExprId {
        let args = vec![arg(self.typ_index(typ)), arg(self.expr_index(expr))];
        let index = self.intern(tags(&["cast-expr"]), args, NodeRecord::new("cast-expr"));
        self.push_expr(Expr::Cast { typ, expr }, index)
    }

    pub fn mk_unary_op(&mut self, op: UnaryOp, arg_expr: ExprId) -> ExprId {
        let record = NodeRecord::new("unary-op").with_attr("op", op.name());
        let args = vec![arg(self.expr_index(arg_expr))];
        let index = self.intern(tags(&["unary-op", op.name()]), args, record);
        self.push_expr(Expr::Unary { op, arg: arg_expr }, index)
    }

    pub fn mk_binary_op(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        let record = NodeRecord::new("binary-op").with_attr("op", op.name());
        let args = vec![arg(self.expr_index(lhs)), arg(self.expr_index(rhs))];
        let index = self.intern(tags(&["binary-op", op.name()]), args, record);
        self.push_expr(Expr::Binary { op, lhs, rhs }, index)
    }

    pub fn mk_question(&mut self, cond: ExprId, then_expr: ExprId, else_expr: ExprId) -> ExprId {
        let args = vec![
            arg(self.expr_index(cond)),
            arg(self.expr_index(then_expr)),
            arg(self.expr_index(else_expr)),
        ];
        let index = self.intern(tags(&["question"]), args, NodeRecord::new("question"));
        self.push_expr(
            Expr::Question {
                cond,
                then_expr,
                else_expr,
            },
            index,
        )
    }

    pub fn mk_address_of(&mut self, lval: LvalId) -> ExprId {
        let args = vec![arg(self.lval_index(lval))];
        let index = self.intern(tags(&["address-of"]), args, NodeRecord::new("address-of"));
        self.push_expr(Expr::AddressOf { lval }, index)
    }

    fn push_expr(&mut self, node: Expr, index: NodeIndex) -> ExprId {
        let id = ExprId(next_id(self.exprs.len()));
        self.exprs.push(Entry { node, index });
        id
    }

    // Instructions
    //
    // Instruction and statement keys include their construction id, so two
    // structurally equal instructions never share an identity.

    pub fn mk_assign(&mut self, lhs: LvalId, rhs: ExprId, site: InstrSite) -> InstrId {
        let id = InstrId(next_id(self.instrs.len()));
        let args = vec![
            i64::from(id.0),
            arg(self.lval_index(lhs)),
            arg(self.expr_index(rhs)),
        ];
        let record = site_record(NodeRecord::new("assign"), &site);
        let index = self.intern(tags(&["assign"]), args, record);
        self.instrs.push(Entry {
            node: Instr::Assign { lhs, rhs, site },
            index,
        });
        id
    }

    pub fn mk_call(
        &mut self,
        lhs: Option<LvalId>,
        tgt: ExprId,
        args: Vec<ExprId>,
        site: InstrSite,
    ) -> InstrId {
        let id = InstrId(next_id(self.instrs.len()));
        let mut key_args = vec![
            i64::from(id.0),
            lhs.map_or(-1, |l| arg(self.lval_index(l))),
            arg(self.expr_index(tgt)),
        ];
        key_args.extend(args.iter().map(|&a| arg(self.expr_index(a))));
        let record = site_record(NodeRecord::new("call"), &site);
        let index = self.intern(tags(&["call"]), key_args, record);
        self.instrs.push(Entry {
            node: Instr::Call {
                lhs,
                tgt,
                args,
                site,
            },
            index,
        });
        id
    }

    pub fn mk_nop_instruction(&mut self, descr: &str, site: InstrSite) -> InstrId {
        let id = InstrId(next_id(self.instrs.len()));
        let record = site_record(NodeRecord::new("nop").with_attr("descr", descr), &site);
        let index = self.intern(tags(&["nop", descr]), vec![i64::from(id.0)], record);
        self.instrs.push(Entry {
            node: Instr::Nop {
                descr: descr.to_string(),
                site,
            },
            index,
        });
        id
    }

    // Statements

    pub fn mk_instr_sequence(&mut self, instrs: Vec<InstrId>) -> StmtId {
        let id = StmtId(next_id(self.stmts.len()));
        let mut args = vec![i64::from(id.0)];
        args.extend(instrs.iter().map(|&i| arg(self.instr_index(i))));
        let index = self.intern(tags(&["instrs"]), args, NodeRecord::new("instrs"));
        self.push_stmt(Stmt::Instrs { instrs }, index)
    }

    pub fn mk_block(&mut self, stmts: Vec<StmtId>) -> StmtId {
        let id = StmtId(next_id(self.stmts.len()));
        let mut args = vec![i64::from(id.0)];
        args.extend(stmts.iter().map(|&s| arg(self.stmt_index(s))));
        let index = self.intern(tags(&["block"]), args, NodeRecord::new("block"));
        self.push_stmt(Stmt::Block { stmts }, index)
    }

    pub fn mk_branch(
        &mut self,
        cond: ExprId,
        then_stmt: StmtId,
        else_stmt: StmtId,
        pc_offset: i64,
    ) -> StmtId {
        let id = StmtId(next_id(self.stmts.len()));
        let args = vec![
            i64::from(id.0),
            arg(self.expr_index(cond)),
            arg(self.stmt_index(then_stmt)),
            arg(self.stmt_index(else_stmt)),
        ];
        let offset = pc_offset.to_string();
        let record = NodeRecord::new("if").with_attr("pc-offset", &offset);
        let index = self.intern(tags(&["if", &offset]), args, record);
        self.push_stmt(
            Stmt::Branch {
                cond,
                then_stmt,
                else_stmt,
                pc_offset,
            },
            index,
        )
    }

    pub fn mk_return(&mut self, expr: Option<ExprId>) -> StmtId {
        let id = StmtId(next_id(self.stmts.len()));
        let args = vec![i64::from(id.0), expr.map_or(-1, |e| arg(self.expr_index(e)))];
        let index = self.intern(tags(&["return"]), args, NodeRecord::new("return"));
        self.push_stmt(Stmt::Return { expr }, index)
    }

    fn push_stmt(&mut self, node: Stmt, index: NodeIndex) -> StmtId {
        let id = StmtId(next_id(self.stmts.len()));
        self.stmts.push(Entry { node, index });
        id
    }

    /// Provenance translated to node identities.
    ///
    /// Expression and lvalue mappings are keyed by identity, so handles that
    /// intern to the same node collapse into one entry and a later mapping
    /// overwrites an earlier one. This is intended: the snapshot describes
    /// nodes, not construction calls.
    pub fn provenance_snapshot(&self) -> ProvenanceSnapshot {
        let prov = &self.provenance;
        let mut snap = ProvenanceSnapshot::default();
        for (high, low) in prov.instr_mappings() {
            snap.instruction_mapping
                .insert(self.instr_index(high).0, self.instr_index(low).0);
        }
        for (high, low) in prov.expr_mappings() {
            snap.expression_mapping
                .insert(self.expr_index(high).0, self.expr_index(low).0);
        }
        for (high, low) in prov.lval_mappings() {
            snap.lval_mapping
                .insert(self.lval_index(high).0, self.lval_index(low).0);
        }
        for (expr, rdefs) in prov.all_reaching_defs() {
            let entry = snap
                .reaching_definitions
                .entry(self.expr_index(expr).0)
                .or_default();
            for rdef in rdefs {
                if !entry.contains(rdef) {
                    entry.push(rdef.clone());
                }
            }
        }
        for (lval, defuses) in prov.all_defuses() {
            let entry = snap.defuses.entry(self.lval_index(lval).0).or_default();
            for defuse in defuses {
                if !entry.contains(defuse) {
                    entry.push(defuse.clone());
                }
            }
        }
        for (lval, defuses) in prov.all_defuses_high() {
            let entry = snap.defuses_high.entry(self.lval_index(lval).0).or_default();
            for defuse in defuses {
                if !entry.contains(defuse) {
                    entry.push(defuse.clone());
                }
            }
        }
        for (instr, addrs) in prov.all_instr_addresses() {
            snap.instruction_addresses
                .entry(self.instr_index(instr).0)
                .or_default()
                .extend(addrs.iter().map(|a| format!("{a:#x}")));
        }
        for (cond, addrs) in prov.all_condition_addresses() {
            let entry = snap
                .condition_addresses
                .entry(self.expr_index(cond).0)
                .or_default();
            for text in addrs.iter().map(|a| format!("{a:#x}")) {
                if !entry.contains(&text) {
                    entry.push(text);
                }
            }
        }
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::ReachingDefinition;

    #[test]
    fn test_structurally_equal_exprs_share_identity() {
        let mut ast = AstBuilder::new();
        let r0 = ast.mk_variable_expr("R0");
        let four = ast.mk_integer_constant(4);
        let a = ast.mk_binary_op(BinaryOp::Plus, r0, four);

        let r0b = ast.mk_variable_expr("R0");
        let fourb = ast.mk_integer_constant(4);
        let b = ast.mk_binary_op(BinaryOp::Plus, r0b, fourb);

        assert_ne!(a, b);
        assert_eq!(ast.expr_index(a), ast.expr_index(b));
    }

    #[test]
    fn test_operator_and_constant_distinguish_identity() {
        let mut ast = AstBuilder::new();
        let r0 = ast.mk_variable_expr("R0");
        let four = ast.mk_integer_constant(4);
        let eight = ast.mk_integer_constant(8);
        let plus4 = ast.mk_binary_op(BinaryOp::Plus, r0, four);
        let minus4 = ast.mk_binary_op(BinaryOp::Minus, r0, four);
        let plus8 = ast.mk_binary_op(BinaryOp::Plus, r0, eight);
        assert_ne!(ast.expr_index(plus4), ast.expr_index(minus4));
        assert_ne!(ast.expr_index(plus4), ast.expr_index(plus8));
    }

    #[test]
    fn test_equal_instructions_stay_distinct() {
        let mut ast = AstBuilder::new();
        let lhs = ast.mk_variable_lval("R1");
        let rhs = ast.mk_integer_constant(0);
        let a = ast.mk_assign(lhs, rhs, InstrSite::at(0x100, "00"));
        let b = ast.mk_assign(lhs, rhs, InstrSite::at(0x100, "00"));
        assert_ne!(ast.instr_index(a), ast.instr_index(b));
    }

    #[test]
    fn test_children_interned_before_parents() {
        let mut ast = AstBuilder::new();
        let r0 = ast.mk_variable_expr("R0");
        let c = ast.mk_integer_constant(1);
        let sum = ast.mk_binary_op(BinaryOp::Plus, r0, c);
        let records = ast.records();
        let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
        let expected: Vec<u32> = (1..=u32::try_from(records.len()).unwrap()).collect();
        assert_eq!(ids, expected);
        let sum_id = ast.expr_index(sum).get();
        assert!(ast.expr_index(r0).get() < sum_id);
        assert!(ast.expr_index(c).get() < sum_id);
    }

    #[test]
    fn test_variable_info_reused() {
        let mut ast = AstBuilder::new();
        let a = ast.variable_info("R4");
        let b = ast.variable_info("R4");
        assert_eq!(a, b);
        assert!(ast.has_symbol("R4"));
    }

    #[test]
    fn test_global_variable_gets_address() {
        let mut ast = AstBuilder::new();
        let lval = ast.mk_global_variable_lval("gv_count", 0x2_0010);
        let Lhost::Var { vinfo, .. } = &ast.lval(lval).host else {
            panic!("expected variable host");
        };
        assert_eq!(ast.varinfo(*vinfo).global_address, Some(0x2_0010));
    }

    #[test]
    fn test_prototype_requires_function_type() {
        let mut ast = AstBuilder::new();
        let int = ast.mk_int_type(IntKind::Int);
        assert!(matches!(
            ast.set_function_prototype("f", int),
            Err(AstError::NotAFunctionType(_))
        ));
        let fun = ast.mk_fun_type(int, None);
        assert!(ast.set_function_prototype("f", fun).is_ok());
        assert!(ast.prototype().is_some());
    }

    #[test]
    fn test_duplicate_formal_rejected() {
        let mut ast = AstBuilder::new();
        let int = ast.mk_int_type(IntKind::Int);
        ast.add_formal("arg0", int, 0).unwrap();
        assert!(matches!(
            ast.add_formal("arg0", int, 1),
            Err(AstError::DuplicateSymbol(_))
        ));
        assert_eq!(ast.formals().len(), 1);
    }

    #[test]
    fn test_compinfo_registered_globally() {
        let mut ast = AstBuilder::new();
        let int = ast.mk_int_type(IntKind::Int);
        let x = ast.mk_fieldinfo("x", int, 3);
        let y = ast.mk_fieldinfo("y", int, 3);
        ast.mk_compinfo("point", 3, false, vec![x, y]).unwrap();
        assert!(ast.globals().lock().compinfo(3).is_some());
        assert!(ast.mk_compinfo("other", 3, true, vec![]).is_err());
    }

    #[test]
    fn test_try_accessors_reject_foreign_handles() {
        let mut other = AstBuilder::new();
        other.mk_integer_constant(1);
        other.mk_integer_constant(2);
        let foreign = other.mk_integer_constant(3);
        let ast = AstBuilder::new();
        assert!(matches!(
            ast.try_expr(foreign),
            Err(AstError::UnknownHandle { kind: "expression", .. })
        ));
    }

    #[test]
    fn test_snapshot_uses_identities() {
        let mut ast = AstBuilder::new();
        let lhs = ast.mk_variable_lval("R0");
        let rhs = ast.mk_integer_constant(1);
        let low = ast.mk_assign(lhs, rhs, InstrSite::at(0x10, "0120a0e3"));
        let hlhs = ast.mk_variable_lval("x");
        let high = ast.mk_assign(hlhs, rhs, InstrSite::at(0x10, "0120a0e3"));
        ast.provenance_mut().add_instr_mapping(high, low);
        ast.provenance_mut()
            .add_reaching_defs(rhs, [ReachingDefinition::new("R0", vec![0x8])]);
        ast.provenance_mut().add_instr_address(high, &[0x10]);

        let snap = ast.provenance_snapshot();
        let high_id = ast.instr_index(high).get();
        assert_eq!(snap.instruction_mapping[&high_id], ast.instr_index(low).get());
        assert_eq!(snap.instruction_addresses[&high_id], vec!["0x10".to_string()]);
        assert_eq!(snap.reaching_definitions[&ast.expr_index(rhs).get()].len(), 1);
    }

    #[test]
    fn test_snapshot_collapses_shared_identities() {
        let mut ast = AstBuilder::new();
        let first = ast.mk_variable_expr("count");
        let second = ast.mk_variable_expr("count");
        let r0 = ast.mk_variable_expr("R0");
        let r1 = ast.mk_variable_expr("R1");
        assert_ne!(first, second);
        assert_eq!(ast.expr_index(first), ast.expr_index(second));
        ast.provenance_mut().add_expr_mapping(first, r0);
        ast.provenance_mut().add_expr_mapping(second, r1);

        let snap = ast.provenance_snapshot();
        assert_eq!(snap.expression_mapping.len(), 1);
        let low = snap.expression_mapping[&ast.expr_index(first).get()];
        assert!([ast.expr_index(r0).get(), ast.expr_index(r1).get()].contains(&low));
        assert_eq!(ast.provenance().expr_mappings().count(), 2);
    }
}
