//! A small SSA-style IR that plays the role of the code generation backend.
//!
//! The shape follows LLVM's C API closely enough that lowering reads the same:
//! a [`Module`] accumulates globals and functions across inputs, a [`Builder`]
//! holds the single insertion point, and [`Value`]s are cheap handles into the
//! module. Every number is a `double`.
//!
//! The module prints as LLVM-flavoured text:
//!
//! ```text
//! ; ModuleID = 'top'
//!
//! @x = global double 5.0
//!
//! define double @add(double %a, double %b) {
//! entry:
//!   %addOp = fadd double %a, %b
//!   ret double %addOp
//! }
//! ```
use core::fmt;

mod builder;
mod module;
mod target;

pub use builder::{Builder, InsertPoint};
pub use module::{Checkpoint, Module};
pub use target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId(pub(crate) u32);

/// A handle to something that produces a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Const(f64),
    Param {
        function: FunctionId,
        index: u32,
    },
    Instruction {
        function: FunctionId,
        index: u32,
    },
    Global(GlobalId),
    Function(FunctionId),
}

impl Value {
    pub fn constant(value: f64) -> Self {
        Self::Const(value)
    }

    /// Everything but a function is a `double`.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Function(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatOpcode {
    FAdd,
    FSub,
    FMul,
    FDiv,
}

impl FloatOpcode {
    pub fn fold(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::FAdd => lhs + rhs,
            Self::FSub => lhs - rhs,
            Self::FMul => lhs * rhs,
            Self::FDiv => lhs / rhs,
        }
    }

    /// Name given to the instruction's result.
    pub fn result_name(self) -> &'static str {
        match self {
            Self::FAdd => "addOp",
            Self::FSub => "subOp",
            Self::FMul => "mulOp",
            Self::FDiv => "divOp",
        }
    }
}

impl fmt::Display for FloatOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = match self {
            Self::FAdd => "fadd",
            Self::FSub => "fsub",
            Self::FMul => "fmul",
            Self::FDiv => "fdiv",
        };
        f.write_str(mnemonic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Float {
        opcode: FloatOpcode,
        lhs: Value,
        rhs: Value,
    },
    Ret(Value),
}

impl Op {
    pub fn is_terminator(&self) -> bool {
        matches!(self, Self::Ret(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub(crate) name: Option<Box<str>>,
    pub(crate) op: Op,
}

impl Instruction {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn op(&self) -> &Op {
        &self.op
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Clone)]
pub enum BackendError {
    #[error("unknown target triple `{0}`")]
    UnknownTarget(Box<str>),
    #[error("symbol `{0}` is already defined")]
    DuplicateSymbol(Box<str>),
    #[error("initializer of global `{0}` is not a constant")]
    NonConstantInitializer(Box<str>),
    #[error("instruction `{0}` needs an enclosing function")]
    NoInsertionPoint(&'static str),
    #[error("a function cannot be used as a number")]
    NotANumber,
    #[error("only globals and functions can be named")]
    Unnameable,
    #[error("block already ends in a terminator")]
    BlockTerminated,
    #[error("no such {0} in this module")]
    Dangling(&'static str),
}

pub(crate) fn fmt_float(value: f64) -> String {
    format!("{value:?}")
}
