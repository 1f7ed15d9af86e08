//! This module contains a minimal, read-only representation of the SSA
//! intermediate representation that the operational semantics consumes.
//!
//! The IR is a small subset of LLVM's: typed values, constants and constant
//! expressions, instructions grouped into basic blocks, functions and a
//! module holding global variables. Programs are constructed with the
//! [`FunctionBuilder`], and are never mutated by the semantics.

pub mod builder;
pub mod function;
pub mod gep;
pub mod instruction;
pub mod types;
pub mod value;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub use builder::FunctionBuilder;
pub use function::{BasicBlock, Function, Global, Module};
pub use gep::{GepStep, GepTypeIter};
pub use instruction::{
    BinaryOp,
    Callee,
    CastOp,
    FloatPredicate,
    InstKind,
    Instruction,
    IntPredicate,
};
pub use types::{StructType, Type};
pub use value::{Constant, ConstantExpr, GlobalRef, Local, Value};

/// The identity of a value in a [`Module`].
///
/// Identifiers are unique across the whole module, and are what the
/// symbolic registers are named after.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct ValueId(pub u32);

impl Display for ValueId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// The index of a basic block within its [`Function`].
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct BlockId(pub u32);

impl BlockId {
    /// Gets the block identifier as an index into the function's blocks.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}
