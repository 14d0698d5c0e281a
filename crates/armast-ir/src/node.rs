//! AST node types.
//!
//! Nodes live in the per-function [`AstBuilder`](crate::AstBuilder) arena and
//! refer to each other through typed handles. A handle is a construction id:
//! every `mk_*` call yields a fresh one, while the content-addressed identity
//! of the node is kept in the [`NodeTable`](crate::NodeTable).

use std::fmt;

use serde::Serialize;

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Position of the node in its arena.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

node_id!(
    /// Handle of a statement.
    StmtId
);
node_id!(
    /// Handle of an instruction.
    InstrId
);
node_id!(
    /// Handle of an lvalue.
    LvalId
);
node_id!(
    /// Handle of an lvalue offset.
    OffsetId
);
node_id!(
    /// Handle of an expression.
    ExprId
);
node_id!(
    /// Handle of a type.
    TypId
);
node_id!(
    /// Handle of a variable declaration.
    VarInfoId
);
node_id!(
    /// Handle of a struct/union field declaration.
    FieldInfoId
);
node_id!(
    /// Handle of a struct/union declaration.
    CompInfoId
);

/// Content-addressed identity of a node, assigned by the node table.
///
/// Identities start at 1 and follow first-insertion order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(transparent)]
pub struct NodeIndex(pub(crate) u32);

impl NodeIndex {
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unary operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    Neg,
    BNot,
    LNot,
}

impl UnaryOp {
    /// Name used in node keys.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Neg => "neg",
            Self::BNot => "bnot",
            Self::LNot => "lnot",
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::BNot => "~",
            Self::LNot => "!",
        }
    }
}

/// Binary operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
    Lsl,
    Lsr,
    Asr,
    BAnd,
    BOr,
    BXor,
    LAnd,
    LOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Name used in node keys.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Mult => "mult",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Lsl => "lsl",
            Self::Lsr => "lsr",
            Self::Asr => "asr",
            Self::BAnd => "band",
            Self::BOr => "bor",
            Self::BXor => "bxor",
            Self::LAnd => "land",
            Self::LOr => "lor",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Mult => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Lsl => "<<",
            Self::Lsr => ">>",
            Self::Asr => "s>>",
            Self::BAnd => "&",
            Self::BOr => "|",
            Self::BXor => "^",
            Self::LAnd => "&&",
            Self::LOr => "||",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Comparison with the opposite truth value (`==` ↔ `!=`, `<` ↔ `>=`, ...).
    #[must_use]
    pub const fn negated(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Ne),
            Self::Ne => Some(Self::Eq),
            Self::Lt => Some(Self::Ge),
            Self::Ge => Some(Self::Lt),
            Self::Gt => Some(Self::Le),
            Self::Le => Some(Self::Gt),
            _ => None,
        }
    }
}

/// Integer kinds (C integer types).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum IntKind {
    Char,
    SChar,
    UChar,
    Bool,
    Int,
    UInt,
    Short,
    UShort,
    Long,
    ULong,
    LongLong,
    ULongLong,
}

impl IntKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Char => "ichar",
            Self::SChar => "ischar",
            Self::UChar => "iuchar",
            Self::Bool => "ibool",
            Self::Int => "iint",
            Self::UInt => "iuint",
            Self::Short => "ishort",
            Self::UShort => "iushort",
            Self::Long => "ilong",
            Self::ULong => "iulong",
            Self::LongLong => "ilonglong",
            Self::ULongLong => "iulonglong",
        }
    }

    /// C spelling of the type.
    #[must_use]
    pub const fn c_name(self) -> &'static str {
        match self {
            Self::Char => "char",
            Self::SChar => "signed char",
            Self::UChar => "unsigned char",
            Self::Bool => "_Bool",
            Self::Int => "int",
            Self::UInt => "unsigned int",
            Self::Short => "short",
            Self::UShort => "unsigned short",
            Self::Long => "long",
            Self::ULong => "unsigned long",
            Self::LongLong => "long long",
            Self::ULongLong => "unsigned long long",
        }
    }
}

/// Floating-point kinds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FloatKind {
    Float,
    Double,
    LongDouble,
}

impl FloatKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float => "ffloat",
            Self::Double => "fdouble",
            Self::LongDouble => "flongdouble",
        }
    }

    #[must_use]
    pub const fn c_name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Double => "double",
            Self::LongDouble => "long double",
        }
    }
}

/// Where an instruction came from: address, raw bytes and free-form notes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstrSite {
    pub address: Option<u64>,
    pub bytes: String,
    pub annotations: Vec<String>,
}

impl InstrSite {
    /// Site of a machine instruction.
    pub fn at(address: u64, bytes: &str) -> Self {
        Self {
            address: Some(address),
            bytes: bytes.to_string(),
            annotations: Vec::new(),
        }
    }

    /// Add annotations.
    #[must_use]
    pub fn with_annotations(mut self, annotations: Vec<String>) -> Self {
        self.annotations = annotations;
        self
    }
}

/// Statements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    Return {
        expr: Option<ExprId>,
    },
    Block {
        stmts: Vec<StmtId>,
    },
    Instrs {
        instrs: Vec<InstrId>,
    },
    Branch {
        cond: ExprId,
        then_stmt: StmtId,
        else_stmt: StmtId,
        pc_offset: i64,
    },
}

impl Stmt {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Return { .. } => "return",
            Self::Block { .. } => "block",
            Self::Instrs { .. } => "instrs",
            Self::Branch { .. } => "if",
        }
    }
}

/// Instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr {
    Assign {
        lhs: LvalId,
        rhs: ExprId,
        site: InstrSite,
    },
    Call {
        lhs: Option<LvalId>,
        tgt: ExprId,
        args: Vec<ExprId>,
        site: InstrSite,
    },
    Nop {
        descr: String,
        site: InstrSite,
    },
}

impl Instr {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Call { .. } => "call",
            Self::Nop { .. } => "nop",
        }
    }

    #[must_use]
    pub const fn site(&self) -> &InstrSite {
        match self {
            Self::Assign { site, .. } | Self::Call { site, .. } | Self::Nop { site, .. } => site,
        }
    }

    #[must_use]
    pub const fn is_assign(&self) -> bool {
        matches!(self, Self::Assign { .. })
    }
}

/// Host of an lvalue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lhost {
    Var { name: String, vinfo: VarInfoId },
    MemRef { addr: ExprId },
}

/// Lvalue: a host plus an offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lval {
    pub host: Lhost,
    pub offset: OffsetId,
}

impl Lval {
    /// Name of the variable if this is a plain variable lvalue.
    #[must_use]
    pub fn variable_name(&self) -> Option<&str> {
        match &self.host {
            Lhost::Var { name, .. } => Some(name),
            Lhost::MemRef { .. } => None,
        }
    }
}

/// Lvalue offsets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Offset {
    None,
    Field {
        name: String,
        compkey: i64,
        offset: OffsetId,
    },
    Index {
        index: ExprId,
        offset: OffsetId,
    },
}

/// Expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    IntConst {
        value: i128,
    },
    GlobalAddress {
        value: u64,
        addr: ExprId,
    },
    StringConst {
        value: String,
        addr: Option<ExprId>,
        va: Option<u64>,
    },
    Lval {
        lval: LvalId,
    },
    Substituted {
        assign: InstrId,
        lval: LvalId,
        expr: ExprId,
    },
    Cast {
        typ: TypId,
        expr: ExprId,
    },
    Unary {
        op: UnaryOp,
        arg: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Question {
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    AddressOf {
        lval: LvalId,
    },
}

impl Expr {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::IntConst { .. } => "integer-constant",
            Self::GlobalAddress { .. } => "global-address",
            Self::StringConst { .. } => "string-constant",
            Self::Lval { .. } => "lval-expr",
            Self::Substituted { .. } => "substituted-expr",
            Self::Cast { .. } => "cast-expr",
            Self::Unary { .. } => "unary-op",
            Self::Binary { .. } => "binary-op",
            Self::Question { .. } => "question",
            Self::AddressOf { .. } => "address-of",
        }
    }

    /// Constant value of an integer literal.
    #[must_use]
    pub const fn int_value(&self) -> Option<i128> {
        match self {
            Self::IntConst { value } => Some(*value),
            _ => None,
        }
    }
}

/// Types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Typ {
    Void,
    Int { ikind: IntKind },
    Float { fkind: FloatKind },
    Ptr { target: TypId },
    Array { elem: TypId, size: Option<ExprId> },
    Fun { ret: TypId, args: Option<TypId> },
    FunArgs { args: Vec<TypId> },
    FunArg { name: String, typ: TypId },
    Named { name: String, def: TypId },
    Comp { name: String, key: i64 },
}

impl Typ {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Int { .. } => "int",
            Self::Float { .. } => "float",
            Self::Ptr { .. } => "ptr",
            Self::Array { .. } => "array",
            Self::Fun { .. } => "fun",
            Self::FunArgs { .. } => "funargs",
            Self::FunArg { .. } => "funarg",
            Self::Named { .. } => "typdef",
            Self::Comp { .. } => "comp",
        }
    }

    #[must_use]
    pub const fn is_function(&self) -> bool {
        matches!(self, Self::Fun { .. })
    }
}

/// Variable declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarInfo {
    pub name: String,
    pub typ: Option<TypId>,
    pub parameter: Option<u32>,
    pub global_address: Option<u64>,
    pub descr: Option<String>,
}

/// Struct/union field declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub typ: TypId,
    pub compkey: i64,
}

/// Struct/union declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompInfo {
    pub name: String,
    pub key: i64,
    pub is_union: bool,
    pub fields: Vec<FieldInfoId>,
}
