//! This module contains the data layout of the target, which determines the
//! size, alignment and byte order of every type in memory.
//!
//! The layout follows LLVM's rules: integer and floating-point alignments
//! come from a table, aggregates are aligned to their most-aligned member,
//! and structure fields are padded to their alignment unless the structure
//! is packed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    constant::{BYTE_SIZE_BITS, DEFAULT_POINTER_ALIGN_BYTES, DEFAULT_POINTER_SIZE_BITS},
    error::{
        container::Locatable,
        execution,
        layout::{Error, Result},
    },
    ir::types::{StructType, Type},
};

/// The result type for layout queries, whose errors are located by the
/// instruction that made the query.
pub type QueryResult<T> = std::result::Result<T, execution::Error>;

/// The order in which the bytes of a multi-byte value are stored.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Endianness {
    Little,
    Big,
}

/// The data layout of a target.
///
/// It is an immutable oracle once constructed, and is shared by reference
/// between every context that executes against it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DataLayout {
    endianness: Endianness,

    pointer_size_bits: u32,

    pointer_align: u64,

    /// The ABI alignment in bytes of integers, keyed by bit-width.
    int_aligns: BTreeMap<u32, u64>,

    /// The ABI alignment in bytes of floating-point types, keyed by
    /// bit-width.
    float_aligns: BTreeMap<u32, u64>,

    /// The minimum alignment in bytes of aggregates.
    aggregate_align: u64,
}

impl DataLayout {
    /// Parses a data layout string in LLVM's format, starting from the
    /// [`Default`] layout and overriding the parts that the string specifies.
    ///
    /// Specifications that do not affect memory layout (mangling, native
    /// integer widths, stack alignment and the like) are accepted and
    /// ignored, as are pointers in non-default address spaces.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] located at the byte offset of the offending
    /// specification if the string is malformed.
    pub fn parse(description: &str) -> Result<Self> {
        let mut layout = Self::default();
        let mut offset = 0usize;

        for spec in description.split('-') {
            let location = u32::try_from(offset).unwrap_or(u32::MAX);
            layout.apply(spec).locate(location)?;
            offset += spec.len() + 1;
        }

        Ok(layout)
    }

    /// Applies a single specification to the layout.
    fn apply(&mut self, spec: &str) -> std::result::Result<(), Error> {
        let Some(kind) = spec.chars().next() else {
            return Ok(());
        };
        let rest = &spec[kind.len_utf8()..];

        match kind {
            'e' if rest.is_empty() => self.endianness = Endianness::Little,
            'E' if rest.is_empty() => self.endianness = Endianness::Big,
            'p' => {
                let (space, fields) = rest.split_once(':').unwrap_or((rest, ""));
                if !space.is_empty() && space != "0" {
                    return Ok(());
                }
                let fields = parse_fields(fields)?;
                let [size, abi, ..] = fields[..] else {
                    return Err(Error::UnknownSpecification(spec.into()));
                };
                if size == 0 || size > 64 || size % BYTE_SIZE_BITS != 0 {
                    return Err(Error::UnsupportedPointerWidth(size));
                }
                self.pointer_size_bits = size;
                self.pointer_align = bytes(abi)?;
            }
            'i' | 'f' => {
                let fields = parse_fields(rest)?;
                let [size, abi, ..] = fields[..] else {
                    return Err(Error::UnknownSpecification(spec.into()));
                };
                let table = if kind == 'i' {
                    &mut self.int_aligns
                } else {
                    &mut self.float_aligns
                };
                table.insert(size, bytes(abi)?);
            }
            'a' => {
                let fields = parse_fields(rest.trim_start_matches(':'))?;
                if let Some(abi) = fields.first() {
                    self.aggregate_align = bytes(*abi)?.max(1);
                }
            }
            'm' | 'n' | 'S' | 'v' | 'F' | 'A' | 'P' | 'G' => (),
            _ => return Err(Error::UnknownSpecification(spec.into())),
        }

        Ok(())
    }

    /// Gets the byte order of the target.
    #[must_use]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Checks whether the target stores the least significant byte first.
    #[must_use]
    pub fn is_little_endian(&self) -> bool {
        self.endianness == Endianness::Little
    }

    /// Gets the width of a pointer in bits.
    #[must_use]
    pub fn pointer_size_bits(&self) -> u32 {
        self.pointer_size_bits
    }

    /// Gets the width of a pointer in bytes.
    #[must_use]
    pub fn pointer_size_bytes(&self) -> u64 {
        u64::from(self.pointer_size_bits / BYTE_SIZE_BITS)
    }

    /// Gets the number of bits needed to hold a value of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `ty` has no size.
    pub fn type_size_in_bits(&self, ty: &Type) -> QueryResult<u64> {
        let size = match ty {
            Type::Int(width) => u64::from(*width),
            Type::Pointer => u64::from(self.pointer_size_bits),
            Type::Float => 32,
            Type::Double => 64,
            Type::Vector(element, count) => self
                .type_size_in_bits(element)?
                .checked_mul(u64::from(*count))
                .ok_or_else(|| too_large(ty))?,
            Type::Array(..) | Type::Struct(_) => self
                .store_size(ty)?
                .checked_mul(u64::from(BYTE_SIZE_BITS))
                .ok_or_else(|| too_large(ty))?,
            _ => return Err(unsupported(ty)),
        };

        Ok(size)
    }

    /// Gets the number of bytes written when storing a value of type `ty`,
    /// excluding any padding after it.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `ty` has no size.
    pub fn store_size(&self, ty: &Type) -> QueryResult<u64> {
        match ty {
            Type::Array(element, count) => {
                self.alloc_size(element)?.checked_mul(*count).ok_or_else(|| too_large(ty))
            }
            Type::Struct(body) => Ok(self.struct_layout(body)?.size),
            _ => Ok(self.type_size_in_bits(ty)?.div_ceil(u64::from(BYTE_SIZE_BITS))),
        }
    }

    /// Gets the distance in bytes between consecutive values of type `ty` in
    /// an array, which is the store size rounded up to the ABI alignment.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `ty` has no size.
    pub fn alloc_size(&self, ty: &Type) -> QueryResult<u64> {
        align_to(self.store_size(ty)?, self.abi_align(ty)?).ok_or_else(|| too_large(ty))
    }

    /// Gets the ABI alignment in bytes of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `ty` has no alignment.
    pub fn abi_align(&self, ty: &Type) -> QueryResult<u64> {
        let align = match ty {
            Type::Int(width) => lookup_align(&self.int_aligns, *width),
            Type::Float => lookup_align(&self.float_aligns, 32),
            Type::Double => lookup_align(&self.float_aligns, 64),
            Type::Pointer => self.pointer_align,
            Type::Array(element, _) => self.abi_align(element)?,
            Type::Struct(body) => self.struct_layout(body)?.align,
            Type::Vector(..) => self.store_size(ty)?.next_power_of_two().max(1),
            _ => return Err(unsupported(ty)),
        };

        Ok(align)
    }

    /// Computes the placement of the fields of `body`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any field has no size.
    pub fn struct_layout(&self, body: &StructType) -> QueryResult<StructLayout> {
        let overflow = || execution::Error::TypeTooLarge {
            ty: Type::Struct(body.clone().into()),
        };
        let mut offsets = Vec::with_capacity(body.fields.len());
        let mut size: u64 = 0;
        let mut align = if body.packed { 1 } else { self.aggregate_align };

        for field in &body.fields {
            let field_align = if body.packed { 1 } else { self.abi_align(field)? };
            size = align_to(size, field_align).ok_or_else(overflow)?;
            offsets.push(size);
            size = size.checked_add(self.alloc_size(field)?).ok_or_else(overflow)?;
            align = align.max(field_align);
        }

        let size = align_to(size, align).ok_or_else(overflow)?;
        Ok(StructLayout {
            offsets,
            size,
            align,
        })
    }

    /// Gets the byte offset of field number `field` in the structure type
    /// `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `ty` is not a structure or has no such field.
    pub fn field_offset(&self, ty: &Type, field: u64) -> QueryResult<u64> {
        let Type::Struct(body) = ty else {
            return Err(execution::Error::NotAStructType { ty: ty.clone() });
        };
        let layout = self.struct_layout(body)?;
        usize::try_from(field)
            .ok()
            .and_then(|i| layout.offsets.get(i).copied())
            .ok_or(execution::Error::FieldOutOfRange {
                field,
                count: body.fields.len(),
            })
    }
}

/// The default layout is that of a 64-bit little-endian target, matching
/// LLVM's x86-64 layout.
impl Default for DataLayout {
    fn default() -> Self {
        let endianness = Endianness::Little;
        let pointer_size_bits = DEFAULT_POINTER_SIZE_BITS;
        let pointer_align = DEFAULT_POINTER_ALIGN_BYTES;
        let int_aligns = BTreeMap::from([(1, 1), (8, 1), (16, 2), (32, 4), (64, 8), (128, 16)]);
        let float_aligns = BTreeMap::from([(16, 2), (32, 4), (64, 8), (128, 16)]);
        let aggregate_align = 1;
        Self {
            endianness,
            pointer_size_bits,
            pointer_align,
            int_aligns,
            float_aligns,
            aggregate_align,
        }
    }
}

/// The placement of the fields of a structure.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StructLayout {
    /// The byte offset of each field.
    pub offsets: Vec<u64>,

    /// The size of the structure including trailing padding.
    pub size: u64,

    /// The alignment of the structure.
    pub align: u64,
}

/// Rounds `value` up to the next multiple of `align`, or [`None`] if the
/// result does not fit in 64 bits.
#[must_use]
pub fn align_to(value: u64, align: u64) -> Option<u64> {
    if align <= 1 {
        Some(value)
    } else {
        value.checked_next_multiple_of(align)
    }
}

/// Looks up the alignment of a `width`-bit scalar: the exact entry if there
/// is one, else the next wider entry, else the widest entry.
fn lookup_align(table: &BTreeMap<u32, u64>, width: u32) -> u64 {
    table
        .range(width..)
        .next()
        .or_else(|| table.iter().next_back())
        .map_or(1, |(_, align)| *align)
}

/// Parses the colon-separated numeric fields of a specification.
fn parse_fields(fields: &str) -> std::result::Result<Vec<u32>, Error> {
    fields
        .split(':')
        .filter(|f| !f.is_empty())
        .map(|f| f.parse().map_err(|_| Error::InvalidNumber(f.into())))
        .collect()
}

/// Converts an alignment in bits to bytes.
fn bytes(bits: u32) -> std::result::Result<u64, Error> {
    if bits % BYTE_SIZE_BITS == 0 {
        Ok(u64::from(bits / BYTE_SIZE_BITS))
    } else {
        Err(Error::NotByteSized(bits))
    }
}

fn unsupported(ty: &Type) -> execution::Error {
    execution::Error::UnsupportedType { ty: ty.clone() }
}

fn too_large(ty: &Type) -> execution::Error {
    execution::Error::TypeTooLarge { ty: ty.clone() }
}
