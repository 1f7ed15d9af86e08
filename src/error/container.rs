use std::fmt::Formatter;

use thiserror::Error;

/// An error that is localised to a particular instruction in the IR, named by
/// the [`crate::ir::ValueId`] of that instruction.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The identifier of the instruction where the error occurred.
    pub location: u32,

    /// The error data
    pub payload: E,
}

/// Displays the error associated with the identifier of the instruction where
/// it occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[%{}]: {}", self.location, self.payload)
    }
}

/// A trait for types that can have an instruction location attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached location.
    type Located;

    /// Attach the location described by `location` (the identifier of an
    /// instruction) to the error.
    fn locate(self, location: u32) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, location: u32) -> Self::Located {
        self.map_err(|e| Located {
            location,
            payload: e,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::error::{
        container::{Locatable, Located},
        execution::Error,
    };

    #[test]
    fn can_locate_a_result() {
        let result: Result<(), Error> = Err(Error::NoTerminator { block: 2 });
        let located = result.locate(7);

        assert_eq!(
            located,
            Err(Located {
                location: 7,
                payload:  Error::NoTerminator { block: 2 },
            })
        );
    }

    #[test]
    fn located_errors_name_their_instruction() {
        let located = Error::NoSuchBlock { block: 9 }.locate(3);

        assert_eq!(
            located.to_string(),
            "[%3]: No basic block with index 9 exists in the function"
        );
    }
}
