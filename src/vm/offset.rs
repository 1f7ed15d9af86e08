//! This module contains the layout queries of the semantics, including the
//! translation of address computations into offsets.

use crate::{
    error::execution::Error,
    expr::Expr,
    ir::{GepStep, GepTypeIter, Type, Value},
    layout::QueryResult,
    vm::{state::Context, value::as_bv, value::known::KnownInt, OpSem},
};

impl OpSem<'_> {
    /// Gets the number of bytes written when storing a value of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `ty` has no size.
    pub fn storage_size(&self, ty: &Type) -> QueryResult<u64> {
        self.layout.store_size(ty)
    }

    /// Gets the distance between consecutive elements of type `ty` in an
    /// array.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `ty` has no size.
    pub fn alloc_size(&self, ty: &Type) -> QueryResult<u64> {
        self.layout.alloc_size(ty)
    }

    /// Gets the byte offset of field number `field` of the structure type
    /// `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `ty` is not a structure or has no such field.
    pub fn field_off(&self, ty: &Type, field: u64) -> QueryResult<u64> {
        self.layout.field_offset(ty, field)
    }

    /// Gets the number of bits in `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the type of `value` has no size.
    pub fn size_in_bits(&self, value: &Value) -> QueryResult<u64> {
        self.size_in_bits_of_type(&value.ty())
    }

    /// Gets the number of bits in a value of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `ty` has no size.
    pub fn size_in_bits_of_type(&self, ty: &Type) -> QueryResult<u64> {
        self.layout.type_size_in_bits(ty)
    }

    /// Gets the width of a pointer, and hence of every address term, in bits.
    #[must_use]
    pub fn pointer_size_in_bits(&self) -> u32 {
        self.layout.pointer_size_bits()
    }

    /// Computes the byte offset described by the steps of an address
    /// computation, as a single pointer-width term.
    ///
    /// Constant indices are folded into one constant, and symbolic indices
    /// are sign-extended or truncated to the pointer width before being
    /// scaled by the size of the element they step over. A computation whose
    /// indices are all constant yields a constant. Arithmetic wraps at the
    /// pointer width.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a step indexes into a type without members, a
    /// structure is indexed by a non-constant, or a type has no size.
    pub fn symbolic_indexed_offset(
        &self,
        steps: GepTypeIter<'_>,
        ctx: &Context,
    ) -> QueryResult<Expr> {
        let b = &self.builder;
        let width = self.pointer_size_in_bits();
        let mut constant = KnownInt::zero(width);
        let mut symbolic: Vec<Expr> = Vec::new();

        for step in steps {
            match step {
                GepStep::Sequential { element, index } => {
                    let stride = KnownInt::new(width, self.alloc_size(&element)?);
                    match index.as_known_int() {
                        Some(known) => {
                            let known = if known.width() < width {
                                known.sext(width)
                            } else {
                                known.trunc(width)
                            };
                            constant = constant + known * stride;
                        }
                        None => {
                            let index = as_bv(b, self.get_operand_value(index, ctx)?);
                            let index = b.resize_signed(index, width);
                            symbolic.push(b.bvmul(index, b.bv(stride)));
                        }
                    }
                }
                GepStep::Field { structure, index } => {
                    let field = index
                        .as_known_int()
                        .and_then(|k| k.to_u64())
                        .ok_or(Error::NonConstantStructIndex)?;
                    let offset = self.field_off(&structure, field)?;
                    constant = constant + KnownInt::new(width, offset);
                }
                GepStep::Invalid { ty, .. } => return Err(Error::UnsupportedType { ty }),
            }
        }

        let offset = symbolic
            .into_iter()
            .reduce(|acc, term| b.bvadd(acc, term))
            .map_or_else(|| b.bv(constant), |sum| b.bvadd(sum, b.bv(constant)));

        Ok(offset)
    }

    /// Computes the byte offset and type of the member of `aggregate`
    /// selected by the constant `indices`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if an index does not select a member.
    pub fn member_offset(&self, aggregate: &Type, indices: &[u32]) -> QueryResult<(u64, Type)> {
        let mut offset = 0;
        let mut current = aggregate.clone();
        for index in indices {
            let index = u64::from(*index);
            let member = match &current {
                Type::Struct(body) => {
                    offset += self.field_off(&current, index)?;
                    usize::try_from(index)
                        .ok()
                        .and_then(|i| body.fields.get(i))
                        .cloned()
                        .ok_or(Error::FieldOutOfRange {
                            field: index,
                            count: body.fields.len(),
                        })?
                }
                Type::Array(element, count) if index < *count => {
                    offset += index * self.alloc_size(element)?;
                    element.as_ref().clone()
                }
                Type::Array(_, count) => {
                    return Err(Error::FieldOutOfRange {
                        field: index,
                        count: usize::try_from(*count).unwrap_or(usize::MAX),
                    })
                }
                ty => return Err(Error::UnsupportedType { ty: ty.clone() }),
            };
            current = member;
        }

        Ok((offset, current))
    }
}
