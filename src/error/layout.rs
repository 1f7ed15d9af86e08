//! This module contains errors pertaining to the parsing of data layout
//! descriptions.

use thiserror::Error;

use crate::error::container;

/// Errors that occur while parsing a data layout string into a
/// [`crate::layout::DataLayout`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Unrecognised data layout specification {_0:?}")]
    UnknownSpecification(String),

    #[error("Invalid number {_0:?} in data layout specification")]
    InvalidNumber(String),

    #[error("Size {_0} bits is not a whole number of bytes")]
    NotByteSized(u32),

    #[error("Pointer width {_0} bits is not supported")]
    UnsupportedPointerWidth(u32),
}

/// A layout error located at the byte offset in the layout string where the
/// offending specification begins.
pub type LocatedError = container::Located<Error>;

/// The result type for data layout parsing.
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
