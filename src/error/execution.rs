//! This module contains errors pertaining to the symbolic execution of the
//! IR.

use thiserror::Error;

use crate::{error::container, expr::Sort, ir::Type, vm::state::memory::Region};

/// Errors that occur during the translation of the IR by the
/// [`crate::vm::OpSem`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Values of type {ty} have no symbolic representation")]
    UnsupportedType { ty: Type },

    #[error("Values of type {ty} do not fit in the address space")]
    TypeTooLarge { ty: Type },

    #[error("An allocation of {size} bytes does not fit in the {region:?} region")]
    AllocationTooLarge { size: u64, region: Region },

    #[error("A constant of {width} bits cannot be represented concretely")]
    ConstantTooWide { width: u32 },

    #[error("The constant {constant} depends on addresses that are not fixed")]
    RelocatableConstant { constant: String },

    #[error("A write of {required} bytes does not fit in a buffer of {available} bytes")]
    BufferTooSmall { required: u64, available: u64 },

    #[error("The value {value} cannot be stored as a value of type {ty}")]
    ValueTypeMismatch { value: String, ty: Type },

    #[error("No basic block with index {block} exists in the function")]
    NoSuchBlock { block: u32 },

    #[error("Block {dst} is not a successor of block {src}")]
    NotASuccessor { src: u32, dst: u32 },

    #[error("Block {block} does not end in a terminator")]
    NoTerminator { block: u32 },

    #[error("Type {ty} is not a structure type")]
    NotAStructType { ty: Type },

    #[error("Field {field} is out of range for a structure with {count} fields")]
    FieldOutOfRange { field: u64, count: usize },

    #[error("Structures can only be indexed by constants")]
    NonConstantStructIndex,

    #[error("Expected a term of sort {expected} but found one of sort {found}")]
    SortMismatch { expected: Sort, found: Sort },

    #[error("The instruction {opcode} has no translation")]
    UnsupportedInstruction { opcode: String },

    #[error("The call to {callee} has no argument {index}")]
    MissingArgument { callee: String, index: usize },

    #[error("The call to {callee} is not modelled: {reason}")]
    UnmodelledCall { callee: String, reason: &'static str },

    #[error("The call to {callee} moves a length that is not a constant of at most {limit} bytes")]
    OversizedTransfer { callee: String, limit: u64 },
}

/// An execution error with an associated instruction location.
pub type LocatedError = container::Located<Error>;

/// The result type for methods that may have execution errors.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, location: u32) -> Self::Located {
        container::Located {
            location,
            payload: self,
        }
    }
}
