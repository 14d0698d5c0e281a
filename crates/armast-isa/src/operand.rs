//! Instruction operands.
//!
//! Operands are immutable and owned by the opcode that references them.
//! Kind-specific accessors fail with [`LiftError::OperandKind`] when asked
//! about the wrong kind.

use std::fmt;

use armast_ir::{AstBuilder, BinaryOp, ExprId, InstrId, InstrSite, LvalId};

use crate::error::LiftError;
use crate::register::Register;

/// Base register update performed by an indirect operand.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Writeback {
    /// Access `base + offset`; base unchanged.
    Offset,
    /// `base := base + offset`, then access `*base`.
    PreIndexed,
    /// Access `*base`, then `base := base + offset`.
    PostIndexed,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum OperandKind {
    Register(Register),
    IndirectRegister {
        base: Register,
        offset: i64,
        writeback: Writeback,
    },
    /// Ascending by register number, no duplicates.
    RegisterList(Vec<Register>),
    Immediate(i64),
    Absolute(u64),
}

impl OperandKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Register(_) => "a register",
            Self::IndirectRegister { .. } => "an indirect register",
            Self::RegisterList(_) => "a register list",
            Self::Immediate(_) => "an immediate",
            Self::Absolute(_) => "an absolute address",
        }
    }
}

/// An operand with its access size in bytes.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Operand {
    kind: OperandKind,
    size: u8,
}

/// Lifted operand: the node plus instructions to run before and after it.
pub type AstFragment<T> = (T, Vec<InstrId>, Vec<InstrId>);

impl Operand {
    pub const fn new(kind: OperandKind, size: u8) -> Self {
        Self { kind, size }
    }

    pub const fn register(reg: Register) -> Self {
        Self::new(OperandKind::Register(reg), 4)
    }

    pub const fn indirect(base: Register, offset: i64, writeback: Writeback) -> Self {
        Self::new(
            OperandKind::IndirectRegister {
                base,
                offset,
                writeback,
            },
            4,
        )
    }

    /// Register list; members are sorted and deduplicated.
    pub fn register_list(mut regs: Vec<Register>) -> Self {
        regs.sort_unstable();
        regs.dedup();
        let size = u8::try_from(regs.len() * 4).unwrap_or(u8::MAX);
        Self::new(OperandKind::RegisterList(regs), size)
    }

    /// Register list from a 16-bit mask (bit n = register n).
    pub fn from_mask(mask: u16) -> Self {
        let regs = Register::ALL
            .into_iter()
            .filter(|r| mask & (1 << r.number()) != 0)
            .collect();
        Self::register_list(regs)
    }

    pub const fn immediate(value: i64) -> Self {
        Self::new(OperandKind::Immediate(value), 4)
    }

    pub const fn absolute(address: u64) -> Self {
        Self::new(OperandKind::Absolute(address), 4)
    }

    pub const fn kind(&self) -> &OperandKind {
        &self.kind
    }

    pub const fn size(&self) -> u8 {
        self.size
    }

    pub const fn is_register(&self) -> bool {
        matches!(self.kind, OperandKind::Register(_))
    }

    pub const fn is_indirect_register(&self) -> bool {
        matches!(self.kind, OperandKind::IndirectRegister { .. })
    }

    pub const fn is_register_list(&self) -> bool {
        matches!(self.kind, OperandKind::RegisterList(_))
    }

    pub const fn is_immediate(&self) -> bool {
        matches!(self.kind, OperandKind::Immediate(_))
    }

    pub const fn is_absolute(&self) -> bool {
        matches!(self.kind, OperandKind::Absolute(_))
    }

    fn kind_error(&self, expected: &'static str) -> LiftError {
        LiftError::OperandKind {
            operand: self.to_string(),
            expected,
        }
    }

    /// Value of an immediate or absolute operand.
    pub fn value(&self) -> Result<i64, LiftError> {
        match self.kind {
            OperandKind::Immediate(v) => Ok(v),
            OperandKind::Absolute(a) => {
                i64::try_from(a).map_err(|_| self.kind_error("an immediate"))
            }
            _ => Err(self.kind_error("an immediate")),
        }
    }

    /// Address of an absolute operand.
    pub fn address(&self) -> Result<u64, LiftError> {
        match self.kind {
            OperandKind::Absolute(a) => Ok(a),
            _ => Err(self.kind_error("an absolute address")),
        }
    }

    /// Register of a register operand, or base of an indirect one.
    pub fn reg(&self) -> Result<Register, LiftError> {
        match self.kind {
            OperandKind::Register(r) | OperandKind::IndirectRegister { base: r, .. } => Ok(r),
            _ => Err(self.kind_error("a register")),
        }
    }

    pub fn registers(&self) -> Result<&[Register], LiftError> {
        match &self.kind {
            OperandKind::RegisterList(regs) => Ok(regs),
            _ => Err(self.kind_error("a register list")),
        }
    }

    pub fn offset(&self) -> Result<i64, LiftError> {
        match self.kind {
            OperandKind::IndirectRegister { offset, .. } => Ok(offset),
            _ => Err(self.kind_error("an indirect register")),
        }
    }

    /// Address expression and base updates of an indirect operand.
    fn memory_access(
        ast: &mut AstBuilder,
        site: &InstrSite,
        base: Register,
        offset: i64,
        writeback: Writeback,
    ) -> AstFragment<ExprId> {
        let base_plus_offset = |ast: &mut AstBuilder| {
            let b = ast.mk_variable_expr(base.name());
            if offset == 0 {
                b
            } else {
                let off = ast.mk_integer_constant(offset);
                ast.mk_binary_op(BinaryOp::Plus, b, off)
            }
        };
        let update = |ast: &mut AstBuilder| {
            let rhs = base_plus_offset(ast);
            let lhs = ast.mk_variable_lval(base.name());
            ast.mk_assign(lhs, rhs, site.clone())
        };
        match writeback {
            Writeback::Offset => (base_plus_offset(ast), Vec::new(), Vec::new()),
            Writeback::PreIndexed => {
                let pre = update(ast);
                (ast.mk_variable_expr(base.name()), vec![pre], Vec::new())
            }
            Writeback::PostIndexed => {
                let addr = ast.mk_variable_expr(base.name());
                let post = update(ast);
                (addr, Vec::new(), vec![post])
            }
        }
    }

    /// Low-level lvalue for this operand.
    pub fn ast_lvalue(&self, ast: &mut AstBuilder, site: &InstrSite) -> Result<AstFragment<LvalId>, LiftError> {
        match self.kind {
            OperandKind::Register(r) => Ok((ast.mk_variable_lval(r.name()), Vec::new(), Vec::new())),
            OperandKind::IndirectRegister {
                base,
                offset,
                writeback,
            } => {
                let (addr, pre, post) = Self::memory_access(ast, site, base, offset, writeback);
                Ok((ast.mk_memref_lval(addr), pre, post))
            }
            _ => Err(LiftError::NotAnLvalue(self.to_string())),
        }
    }

    /// Low-level rvalue for this operand.
    pub fn ast_rvalue(&self, ast: &mut AstBuilder, site: &InstrSite) -> Result<AstFragment<ExprId>, LiftError> {
        match self.kind {
            OperandKind::Register(r) => Ok((ast.mk_variable_expr(r.name()), Vec::new(), Vec::new())),
            OperandKind::Immediate(v) => Ok((ast.mk_integer_constant(v), Vec::new(), Vec::new())),
            OperandKind::Absolute(a) => Ok((ast.mk_integer_constant(a), Vec::new(), Vec::new())),
            OperandKind::IndirectRegister {
                base,
                offset,
                writeback,
            } => {
                let (addr, pre, post) = Self::memory_access(ast, site, base, offset, writeback);
                Ok((ast.mk_memref_expr(addr), pre, post))
            }
            OperandKind::RegisterList(_) => Err(self.kind_error("a value operand")),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OperandKind::Register(r) => write!(f, "{r}"),
            OperandKind::IndirectRegister {
                base,
                offset,
                writeback,
            } => match writeback {
                Writeback::Offset if *offset == 0 => write!(f, "[{base}]"),
                Writeback::Offset => write!(f, "[{base}, #{offset}]"),
                Writeback::PreIndexed => write!(f, "[{base}, #{offset}]!"),
                Writeback::PostIndexed => write!(f, "[{base}], #{offset}"),
            },
            OperandKind::RegisterList(regs) => {
                let names: Vec<&str> = regs.iter().map(|r| r.name()).collect();
                write!(f, "{{{}}}", names.join(","))
            }
            OperandKind::Immediate(v) => write!(f, "#{v}"),
            OperandKind::Absolute(a) => write!(f, "{a:#x}"),
        }
    }
}
