//! This module contains the representation of program values, both as the
//! symbolic terms held in registers and as the concrete values produced by
//! constant evaluation.
//!
//! A value of type `ty` is held in a register of sort [`sort_of`]`(ty)`:
//!
//! - `i1` values are booleans.
//! - Other integers and pointers are bit-vectors of their width.
//! - Structures and arrays are bit-vectors holding the memory image of the
//!   aggregate, with byte `k` of the image at bits `8k + 7 .. 8k`. This makes
//!   loading an aggregate from memory and reading its members agree.

pub mod generic;
pub mod known;

use crate::{
    constant::BYTE_SIZE_BITS,
    error::execution::Error,
    expr::{Expr, ExprBuilder, Sort},
    ir::Type,
    layout::{DataLayout, QueryResult},
};

/// Gets the sort of the register that holds a value of type `ty`.
///
/// # Errors
///
/// Returns [`Err`] if values of type `ty` have no symbolic representation.
pub fn sort_of(ty: &Type, layout: &DataLayout) -> QueryResult<Sort> {
    let sort = match ty {
        Type::Int(1) => Sort::Bool,
        Type::Int(width) => Sort::Bv(*width),
        Type::Pointer => Sort::Bv(layout.pointer_size_bits()),
        Type::Array(..) | Type::Struct(_) if has_scalar_leaves(ty) => {
            let bytes = layout.store_size(ty)?;
            let width = u32::try_from(bytes * u64::from(BYTE_SIZE_BITS))
                .map_err(|_| Error::UnsupportedType { ty: ty.clone() })?;
            if width == 0 {
                return Err(Error::UnsupportedType { ty: ty.clone() });
            }
            Sort::Bv(width)
        }
        _ => return Err(Error::UnsupportedType { ty: ty.clone() }),
    };

    Ok(sort)
}

/// Checks whether every leaf of the aggregate `ty` is an integer or a
/// pointer, and that there is at least one leaf.
fn has_scalar_leaves(ty: &Type) -> bool {
    let leaves = ty.leaves();
    !leaves.is_empty() && leaves.iter().all(|t| t.is_integer() || t.is_pointer())
}

/// Converts a boolean term into a one-bit bit-vector, leaving bit-vectors
/// unchanged.
#[must_use]
pub fn as_bv(b: &ExprBuilder, value: Expr) -> Expr {
    if value.sort() == Sort::Bool {
        b.bool_to_bv(value)
    } else {
        value
    }
}

/// Builds the all-zero value of `sort`.
///
/// # Panics
///
/// Panics if `sort` is an array sort.
#[must_use]
pub fn zero_of_sort(b: &ExprBuilder, sort: Sort) -> Expr {
    match sort {
        Sort::Bool => b.bool(false),
        Sort::Bv(width) => b.zext(b.bv_u64(1, 0), width),
        Sort::Array { .. } => panic!("Arrays have no zero value"),
    }
}

/// Splits an aggregate image into its bytes, lowest address first.
#[must_use]
pub fn image_bytes(b: &ExprBuilder, image: &Expr) -> Vec<Expr> {
    let width = image.bv_width().unwrap_or(0);
    (0..width / BYTE_SIZE_BITS)
        .map(|k| b.extract(k * BYTE_SIZE_BITS + 7, k * BYTE_SIZE_BITS, image.clone()))
        .collect()
}

/// Serialises `value`, a term holding a value of type `ty`, into the bytes
/// that storing it writes to memory, lowest address first.
///
/// Exactly `store_size(ty)` bytes are produced, in the target's byte order.
///
/// # Errors
///
/// Returns [`Err`] if `ty` has no symbolic representation or `value` does not
/// have the sort of a `ty` register.
pub fn to_bytes(
    b: &ExprBuilder,
    value: Expr,
    ty: &Type,
    layout: &DataLayout,
) -> QueryResult<Vec<Expr>> {
    let expected = sort_of(ty, layout)?;
    if value.sort() != expected {
        return Err(Error::SortMismatch {
            expected,
            found: value.sort(),
        });
    }
    if ty.is_aggregate() {
        return Ok(image_bytes(b, &value));
    }

    let size = layout.store_size(ty)?;
    let width = u32::try_from(size).unwrap_or(0) * BYTE_SIZE_BITS;
    let wide = b.zext(as_bv(b, value), width);
    let mut bytes = image_bytes(b, &wide);
    if !layout.is_little_endian() {
        bytes.reverse();
    }

    Ok(bytes)
}

/// Deserialises the bytes read from memory, lowest address first, into a term
/// holding a value of type `ty`.
///
/// # Errors
///
/// Returns [`Err`] if `ty` has no symbolic representation or the number of
/// bytes is not the store size of `ty`.
pub fn from_bytes(
    b: &ExprBuilder,
    mut bytes: Vec<Expr>,
    ty: &Type,
    layout: &DataLayout,
) -> QueryResult<Expr> {
    let sort = sort_of(ty, layout)?;
    let size = layout.store_size(ty)?;
    if bytes.len() as u64 != size {
        return Err(Error::BufferTooSmall {
            required:  size,
            available: bytes.len() as u64,
        });
    }
    if !ty.is_aggregate() && !layout.is_little_endian() {
        bytes.reverse();
    }

    let wide = b.concat_le(bytes);
    let value = match sort {
        Sort::Bool => b.bv_to_bool(b.extract(0, 0, wide)),
        Sort::Bv(width) => b.resize_unsigned(wide, width),
        Sort::Array { .. } => return Err(Error::UnsupportedType { ty: ty.clone() }),
    };

    Ok(value)
}

#[cfg(test)]
mod test {
    use crate::{
        error::execution::Error,
        expr::{ExprBuilder, Sort},
        ir::Type,
        layout::DataLayout,
        vm::value::{from_bytes, sort_of, to_bytes},
    };

    #[test]
    fn sorts_follow_types() -> anyhow::Result<()> {
        let layout = DataLayout::default();

        assert_eq!(sort_of(&Type::bool(), &layout)?, Sort::Bool);
        assert_eq!(sort_of(&Type::Int(17), &layout)?, Sort::Bv(17));
        assert_eq!(sort_of(&Type::Pointer, &layout)?, Sort::Bv(64));

        let pair = Type::structure([Type::Int(8), Type::Int(32)]);
        assert_eq!(sort_of(&pair, &layout)?, Sort::Bv(64));

        assert_eq!(
            sort_of(&Type::Float, &layout),
            Err(Error::UnsupportedType { ty: Type::Float })
        );
        let mixed = Type::structure([Type::Int(8), Type::Double]);
        assert!(sort_of(&mixed, &layout).is_err());

        Ok(())
    }

    #[test]
    fn integers_serialise_little_endian() -> anyhow::Result<()> {
        let layout = DataLayout::default();
        let b = ExprBuilder::new(true);
        let value = b.bv_u64(32, 0x1122_3344);

        let bytes = to_bytes(&b, value.clone(), &Type::Int(32), &layout)?;
        let bytes_u64: Vec<_> = bytes.iter().filter_map(|e| e.as_bv()).map(|k| k.as_u64()).collect();
        assert_eq!(bytes_u64, vec![0x44, 0x33, 0x22, 0x11]);

        let back = from_bytes(&b, bytes, &Type::Int(32), &layout)?;
        assert_eq!(back, value);

        Ok(())
    }

    #[test]
    fn integers_serialise_big_endian() -> anyhow::Result<()> {
        let layout = DataLayout::parse("E")?;
        let b = ExprBuilder::new(true);

        let bytes = to_bytes(&b, b.bv_u64(16, 0xabcd), &Type::Int(16), &layout)?;
        let bytes_u64: Vec<_> = bytes.iter().filter_map(|e| e.as_bv()).map(|k| k.as_u64()).collect();
        assert_eq!(bytes_u64, vec![0xab, 0xcd]);

        Ok(())
    }

    #[test]
    fn symbolic_values_round_trip() -> anyhow::Result<()> {
        let layout = DataLayout::default();
        let b = ExprBuilder::new(true);
        let x = b.var("x", Sort::Bv(16));

        let bytes = to_bytes(&b, x.clone(), &Type::Int(16), &layout)?;
        assert_eq!(bytes.len(), 2);
        assert_eq!(from_bytes(&b, bytes, &Type::Int(16), &layout)?, x);

        let flag = b.var("c", Sort::Bool);
        let bytes = to_bytes(&b, flag.clone(), &Type::bool(), &layout)?;
        assert_eq!(bytes.len(), 1);
        assert_eq!(from_bytes(&b, bytes, &Type::bool(), &layout)?, flag);

        Ok(())
    }
}
