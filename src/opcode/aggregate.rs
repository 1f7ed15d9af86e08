//! Translations of the operations on aggregate registers.
//!
//! An aggregate register holds the memory image of the aggregate, so members
//! are read and replaced as runs of bytes at their offset in that image.

use std::ops::Range;

use crate::{
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    expr::Expr,
    ir::{
        instruction::{ExtractValue, InsertValue},
        Instruction,
        Type,
    },
    layout::QueryResult,
    opcode::{bind, operand, Translate},
    vm::{
        state::Context,
        value::{from_bytes, image_bytes, to_bytes},
        OpSem,
    },
};

/// Gets the byte range of the member of `aggregate` at `indices`, checking
/// that it lies within an image of `image_len` bytes.
fn member_range(
    sem: &OpSem,
    aggregate: &Type,
    indices: &[u32],
    image_len: usize,
) -> QueryResult<(Range<usize>, Type)> {
    let (offset, member) = sem.member_offset(aggregate, indices)?;
    let size = sem.storage_size(&member)?;
    let end = offset.saturating_add(size);
    if end > image_len as u64 {
        return Err(Error::BufferTooSmall {
            required:  end,
            available: image_len as u64,
        });
    }
    let start = usize::try_from(offset).unwrap_or(usize::MAX);
    let end = usize::try_from(end).unwrap_or(usize::MAX);

    Ok((start..end, member))
}

impl Translate for ExtractValue {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        let b = sem.builder();
        let location = instruction.id.0;
        let aggregate = operand(sem, instruction, &self.aggregate, ctx)?;
        let image = image_bytes(b, &aggregate);
        let (range, member) =
            member_range(sem, &self.aggregate.ty(), &self.indices, image.len()).locate(location)?;

        let value = from_bytes(b, image[range].to_vec(), &member, sem.layout()).locate(location)?;
        bind(sem, instruction, value, ctx)
    }
}

impl Translate for InsertValue {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        let b = sem.builder();
        let location = instruction.id.0;
        let aggregate = operand(sem, instruction, &self.aggregate, ctx)?;
        let element = operand(sem, instruction, &self.element, ctx)?;
        let mut image = image_bytes(b, &aggregate);
        let (range, member) =
            member_range(sem, &self.aggregate.ty(), &self.indices, image.len()).locate(location)?;

        let bytes: Vec<Expr> = to_bytes(b, element, &member, sem.layout()).locate(location)?;
        image.splice(range, bytes);
        bind(sem, instruction, b.concat_le(image), ctx)
    }
}
