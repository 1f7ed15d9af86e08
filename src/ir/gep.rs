//! Iteration over the steps of an address computation.

use crate::ir::{types::Type, value::Value};

/// One step of an address computation, pairing an index with the type it
/// indexes into.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GepStep<'v> {
    /// Moves over whole elements of type `element`. This is the step for the
    /// pointer operand itself and for indices into arrays and vectors.
    Sequential { element: Type, index: &'v Value },

    /// Selects a field of the structure `structure`.
    Field { structure: Type, index: &'v Value },

    /// Indexes into `ty`, which has no members.
    Invalid { ty: Type, index: &'v Value },
}

impl<'v> GepStep<'v> {
    /// Gets the index operand of the step.
    #[must_use]
    pub fn index(&self) -> &'v Value {
        match self {
            Self::Sequential { index, .. }
            | Self::Field { index, .. }
            | Self::Invalid { index, .. } => index,
        }
    }
}

/// An iterator over the steps of an address computation that starts from a
/// pointer to `source` and applies `indices` in order.
///
/// The first index steps over whole values of `source`; every later index
/// selects a member of the type reached so far.
#[derive(Clone, Debug)]
pub struct GepTypeIter<'v> {
    indices: std::slice::Iter<'v, Value>,
    current: Option<Type>,
    source:  Type,
}

impl<'v> GepTypeIter<'v> {
    /// Creates an iterator over the steps of indexing `source` by `indices`.
    #[must_use]
    pub fn new(source: &Type, indices: &'v [Value]) -> Self {
        Self {
            indices: indices.iter(),
            current: None,
            source:  source.clone(),
        }
    }
}

impl<'v> Iterator for GepTypeIter<'v> {
    type Item = GepStep<'v>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.indices.next()?;
        let Some(current) = self.current.take() else {
            self.current = Some(self.source.clone());
            return Some(GepStep::Sequential {
                element: self.source.clone(),
                index,
            });
        };

        let step = match current {
            structure @ Type::Struct(_) => {
                // Only constant indices can select a field, and anything past
                // an invalid selection cannot be indexed further.
                let field = index
                    .as_known_int()
                    .and_then(|i| i.to_u64())
                    .and_then(|i| structure.indexed(i))
                    .cloned();
                self.current = Some(field.unwrap_or(Type::Void));
                GepStep::Field { structure, index }
            }
            Type::Array(element, _) | Type::Vector(element, _) => {
                let element = element.as_ref().clone();
                self.current = Some(element.clone());
                GepStep::Sequential { element, index }
            }
            ty => {
                self.current = Some(Type::Void);
                GepStep::Invalid { ty, index }
            }
        };

        Some(step)
    }
}

#[cfg(test)]
mod test {
    use crate::ir::{
        gep::{GepStep, GepTypeIter},
        types::Type,
        value::{Constant, Value},
    };

    #[test]
    fn walks_arrays_and_structures() {
        let inner = Type::array(Type::Int(16), 4);
        let outer = Type::structure([Type::Int(32), inner.clone()]);
        let indices: Vec<Value> = vec![
            Constant::int(64, 0u8).into(),
            Constant::int(32, 1u8).into(),
            Constant::int(64, 3u8).into(),
        ];

        let steps: Vec<_> = GepTypeIter::new(&outer, &indices).collect();

        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[0],
            GepStep::Sequential {
                element: outer.clone(),
                index:   &indices[0],
            }
        );
        assert_eq!(
            steps[1],
            GepStep::Field {
                structure: outer,
                index:     &indices[1],
            }
        );
        assert_eq!(
            steps[2],
            GepStep::Sequential {
                element: Type::Int(16),
                index:   &indices[2],
            }
        );
    }

    #[test]
    fn flags_indices_into_scalars() {
        let indices: Vec<Value> = vec![
            Constant::int(64, 0u8).into(),
            Constant::int(64, 0u8).into(),
        ];

        let steps: Vec<_> = GepTypeIter::new(&Type::Int(8), &indices).collect();

        assert!(matches!(steps[1], GepStep::Invalid { ty: Type::Int(8), .. }));
    }
}
