//! This module contains the [`Translate`] trait, and the translation of each
//! kind of IR instruction into updates of an execution [`Context`].
//!
//! Translations read their operands through the semantics, bind at most one
//! result register and may add side assertions or update memory. Any error
//! they return is located at the instruction being translated, and the
//! engine treats it as a reason to record the instruction as unhandled.

pub mod aggregate;
pub mod arithmetic;
pub mod call;
pub mod cast;
pub mod control;
pub mod logic;
pub mod memory;

#[cfg(test)]
pub mod test_util;

use std::fmt::Debug;

use crate::{
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    expr::{Expr, ExprBuilder, Sort},
    ir::{InstKind, Instruction, Value},
    vm::{state::Context, OpSem},
};

/// This trait forms the core of instruction translation. It is implemented by
/// the payload of every instruction kind that has a translation.
///
/// # Object Safety
///
/// This trait must remain
/// [object safe](https://doc.rust-lang.org/reference/items/traits.html#object-safety)
/// so that payloads can be translated through dynamic dispatch.
pub trait Translate
where
    Self: Debug,
{
    /// Translates `instruction`, whose payload is `self`, updating `ctx`
    /// appropriately.
    ///
    /// # Errors
    ///
    /// If the instruction cannot be modelled, for example because one of its
    /// operands has no symbolic representation. The context may have been
    /// partially updated, but only in ways that over-approximate the
    /// instruction's behaviour.
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()>;
}

/// Translates a single instruction that is not a PHI node or terminator.
///
/// PHI nodes and terminators are handled by the control-flow driver, and are
/// accepted here without effect.
///
/// # Errors
///
/// If the instruction cannot be modelled.
pub fn translate(instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
    let payload: &dyn Translate = match &instruction.kind {
        InstKind::Binary(payload) => payload,
        InstKind::ICmp(payload) => payload,
        InstKind::FCmp(payload) => payload,
        InstKind::Select(payload) => payload,
        InstKind::Cast(payload) => payload,
        InstKind::Freeze(payload) => payload,
        InstKind::Alloca(payload) => payload,
        InstKind::Load(payload) => payload,
        InstKind::Store(payload) => payload,
        InstKind::Gep(payload) => payload,
        InstKind::ExtractValue(payload) => payload,
        InstKind::InsertValue(payload) => payload,
        InstKind::Call(payload) => payload,
        InstKind::Other(_) => {
            return Err(Error::UnsupportedInstruction {
                opcode: instruction.kind.as_text_code(),
            })
            .locate(instruction.id.0)
        }
        InstKind::Phi(_)
        | InstKind::Fence
        | InstKind::Br(_)
        | InstKind::CondBr(_)
        | InstKind::Switch(_)
        | InstKind::Ret(_)
        | InstKind::Unreachable => return Ok(()),
    };

    payload.translate(instruction, sem, ctx)
}

/// Reads the value of `operand` of `instruction`.
fn operand(sem: &OpSem, instruction: &Instruction, operand: &Value, ctx: &Context) -> Result<Expr> {
    sem.get_operand_value(operand, ctx).locate(instruction.id.0)
}

/// Binds the result of `instruction` to `value`.
fn bind(sem: &OpSem, instruction: &Instruction, value: Expr, ctx: &mut Context) -> Result<()> {
    sem.bind(instruction, value, ctx).locate(instruction.id.0)
}

/// Converts `value` to a term of `sort`, moving between booleans and one-bit
/// bit-vectors and truncating or zero-extending bit-vectors.
///
/// # Panics
///
/// Panics if either `value` or `sort` is an array sort.
fn to_sort(b: &ExprBuilder, value: Expr, sort: Sort) -> Expr {
    match (value.sort(), sort) {
        (from, to) if from == to => value,
        (Sort::Bool, Sort::Bv(width)) => b.resize_unsigned(b.bool_to_bv(value), width),
        (Sort::Bv(width), Sort::Bool) => {
            let bit = if width == 1 { value } else { b.extract(0, 0, value) };
            b.bv_to_bool(bit)
        }
        (Sort::Bv(_), Sort::Bv(width)) => b.resize_unsigned(value, width),
        (from, to) => panic!("Cannot convert a term of sort {from} to sort {to}"),
    }
}
