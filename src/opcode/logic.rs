//! Translations of comparisons and selection.

use crate::{
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    expr::{Expr, ExprBuilder, Op, Sort},
    ir::{
        instruction::{FCmp, ICmp, Select},
        Instruction,
        IntPredicate,
    },
    layout::QueryResult,
    opcode::{bind, operand, Translate},
    vm::{state::Context, value::as_bv, OpSem},
};

/// Builds the boolean term for the integer comparison `lhs predicate rhs`.
///
/// Booleans are compared as one-bit bit-vectors, so `true` is greater than
/// `false` when compared unsigned.
///
/// # Errors
///
/// Returns [`Err`] if the operands have different sorts.
pub fn icmp_term(
    b: &ExprBuilder,
    predicate: IntPredicate,
    lhs: Expr,
    rhs: Expr,
) -> QueryResult<Expr> {
    if lhs.sort() != rhs.sort() {
        return Err(Error::SortMismatch {
            expected: lhs.sort(),
            found:    rhs.sort(),
        });
    }
    if matches!(lhs.sort(), Sort::Array { .. }) {
        return Err(Error::SortMismatch {
            expected: Sort::Bv(1),
            found:    lhs.sort(),
        });
    }

    let (op, swap) = match predicate {
        IntPredicate::Eq => return Ok(b.eq(lhs, rhs)),
        IntPredicate::Ne => return Ok(b.ne(lhs, rhs)),
        IntPredicate::Ult => (Op::BvUlt, false),
        IntPredicate::Ule => (Op::BvUle, false),
        IntPredicate::Ugt => (Op::BvUlt, true),
        IntPredicate::Uge => (Op::BvUle, true),
        IntPredicate::Slt => (Op::BvSlt, false),
        IntPredicate::Sle => (Op::BvSle, false),
        IntPredicate::Sgt => (Op::BvSlt, true),
        IntPredicate::Sge => (Op::BvSle, true),
    };
    let (lhs, rhs) = (as_bv(b, lhs), as_bv(b, rhs));
    let term = if swap {
        b.bv_compare(op, rhs, lhs)
    } else {
        b.bv_compare(op, lhs, rhs)
    };

    Ok(term)
}

impl Translate for ICmp {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        let lhs = operand(sem, instruction, &self.lhs, ctx)?;
        let rhs = operand(sem, instruction, &self.rhs, ctx)?;
        let value = icmp_term(sem.builder(), self.predicate, lhs, rhs).locate(instruction.id.0)?;

        bind(sem, instruction, value, ctx)
    }
}

/// Floating-point values are never tracked.
impl Translate for FCmp {
    fn translate(&self, instruction: &Instruction, _: &OpSem, _: &mut Context) -> Result<()> {
        Err(Error::UnsupportedInstruction {
            opcode: instruction.kind.as_text_code(),
        })
        .locate(instruction.id.0)
    }
}

impl Translate for Select {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        let b = sem.builder();
        let condition = operand(sem, instruction, &self.condition, ctx)?;
        if condition.sort() != Sort::Bool {
            return Err(Error::SortMismatch {
                expected: Sort::Bool,
                found:    condition.sort(),
            })
            .locate(instruction.id.0);
        }
        let then_value = operand(sem, instruction, &self.then_value, ctx)?;
        let else_value = operand(sem, instruction, &self.else_value, ctx)?;
        if then_value.sort() != else_value.sort() {
            return Err(Error::SortMismatch {
                expected: then_value.sort(),
                found:    else_value.sort(),
            })
            .locate(instruction.id.0);
        }

        let value = b.ite(condition, then_value, else_value);
        bind(sem, instruction, value, ctx)
    }
}
