//! Symbolic variables and expressions produced by the analysis.

use std::fmt;

use armast_ir::{BinaryOp, UnaryOp};
use serde::Serialize;

/// What a symbolic variable stands for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum VarDenotation {
    /// A machine register.
    Register,
    /// Memory at a fixed offset from a base variable.
    Memory { base: String, offset: i64 },
    /// A global variable at a known address.
    Global { address: u64 },
    /// Stack slot at an offset from the initial stack pointer.
    Stack { offset: i64 },
    /// Value returned by a call.
    ReturnValue { callee: String, site: u64 },
    /// Analysis temporary with no source-level counterpart.
    Tmp,
}

/// A variable recovered by the analysis.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct XVariable {
    pub name: String,
    pub denotation: VarDenotation,
}

impl XVariable {
    pub fn register(name: &str) -> Self {
        Self::new(name, VarDenotation::Register)
    }

    pub fn global(name: &str, address: u64) -> Self {
        Self::new(name, VarDenotation::Global { address })
    }

    pub fn stack(name: &str, offset: i64) -> Self {
        Self::new(name, VarDenotation::Stack { offset })
    }

    pub fn memory(name: &str, base: &str, offset: i64) -> Self {
        Self::new(
            name,
            VarDenotation::Memory {
                base: base.to_string(),
                offset,
            },
        )
    }

    pub fn return_value(name: &str, callee: &str, site: u64) -> Self {
        Self::new(
            name,
            VarDenotation::ReturnValue {
                callee: callee.to_string(),
                site,
            },
        )
    }

    pub fn tmp(name: &str) -> Self {
        Self::new(name, VarDenotation::Tmp)
    }

    pub fn new(name: &str, denotation: VarDenotation) -> Self {
        Self {
            name: name.to_string(),
            denotation,
        }
    }

    pub const fn is_register(&self) -> bool {
        matches!(self.denotation, VarDenotation::Register)
    }

    pub const fn is_tmp(&self) -> bool {
        matches!(self.denotation, VarDenotation::Tmp)
    }
}

impl fmt::Display for XVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A symbolic expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum XExpr {
    Const(i64),
    Var(XVariable),
    Unary(UnaryOp, Box<XExpr>),
    Binary(BinaryOp, Box<XExpr>, Box<XExpr>),
    /// The analysis could not express the value.
    Unresolved(String),
}

impl XExpr {
    pub const fn konst(value: i64) -> Self {
        Self::Const(value)
    }

    pub const fn var(var: XVariable) -> Self {
        Self::Var(var)
    }

    /// Register read.
    pub fn reg(name: &str) -> Self {
        Self::Var(XVariable::register(name))
    }

    pub fn unary(op: UnaryOp, arg: Self) -> Self {
        Self::Unary(op, Box::new(arg))
    }

    pub fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn unresolved(text: &str) -> Self {
        Self::Unresolved(text.to_string())
    }

    pub const fn const_value(&self) -> Option<i64> {
        match self {
            Self::Const(v) => Some(*v),
            _ => None,
        }
    }

    /// True if any part of the expression is unresolved.
    pub fn has_unresolved(&self) -> bool {
        match self {
            Self::Const(_) | Self::Var(_) => false,
            Self::Unresolved(_) => true,
            Self::Unary(_, arg) => arg.has_unresolved(),
            Self::Binary(_, lhs, rhs) => lhs.has_unresolved() || rhs.has_unresolved(),
        }
    }

    /// Variables read by the expression, in order of first occurrence.
    pub fn variables(&self) -> Vec<&XVariable> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a XVariable>) {
        match self {
            Self::Var(v) => {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
            Self::Unary(_, arg) => arg.collect_variables(out),
            Self::Binary(_, lhs, rhs) => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
            Self::Const(_) | Self::Unresolved(_) => {}
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Self::Binary(..))
    }
}

impl fmt::Display for XExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operand = |f: &mut fmt::Formatter<'_>, e: &Self| {
            if e.is_compound() {
                write!(f, "({e})")
            } else {
                write!(f, "{e}")
            }
        };
        match self {
            Self::Const(v) => write!(f, "{v}"),
            Self::Var(v) => write!(f, "{v}"),
            Self::Unary(op, arg) => {
                f.write_str(op.symbol())?;
                operand(f, arg)
            }
            Self::Binary(op, lhs, rhs) => {
                operand(f, lhs)?;
                write!(f, " {} ", op.symbol())?;
                operand(f, rhs)
            }
            Self::Unresolved(text) => write!(f, "?{text}"),
        }
    }
}

/// Render an expression next to its simplified form.
///
/// Yields `x` when both agree and `x (= y)` otherwise.
pub fn simplify_result(syntactic: &XExpr, simplified: &XExpr) -> String {
    if syntactic == simplified {
        syntactic.to_string()
    } else {
        format!("{syntactic} (= {simplified})")
    }
}
