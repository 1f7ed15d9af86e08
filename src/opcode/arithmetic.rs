//! Translations of the arithmetic and bitwise operations.

use crate::{
    error::{container::Locatable, execution::Error, execution::Result},
    expr::{Expr, ExprBuilder, Op, Sort},
    ir::{
        instruction::{Binary, Freeze},
        BinaryOp,
        Instruction,
    },
    layout::QueryResult,
    opcode::{bind, operand, Translate},
    vm::{state::Context, value::as_bv, OpSem},
};

/// Builds the term for `lhs op rhs`.
///
/// On booleans the bitwise operations are the boolean connectives, and the
/// remaining operations are computed on one-bit bit-vectors.
///
/// # Errors
///
/// Returns [`Err`] if `op` is a floating-point operation or the operands have
/// different sorts.
pub fn binary_term(b: &ExprBuilder, op: BinaryOp, lhs: Expr, rhs: Expr) -> QueryResult<Expr> {
    if lhs.sort() != rhs.sort() {
        return Err(Error::SortMismatch {
            expected: lhs.sort(),
            found:    rhs.sort(),
        });
    }
    let bv_op = match op {
        BinaryOp::Add => Op::BvAdd,
        BinaryOp::Sub => Op::BvSub,
        BinaryOp::Mul => Op::BvMul,
        BinaryOp::UDiv => Op::BvUDiv,
        BinaryOp::SDiv => Op::BvSDiv,
        BinaryOp::URem => Op::BvURem,
        BinaryOp::SRem => Op::BvSRem,
        BinaryOp::Shl => Op::BvShl,
        BinaryOp::LShr => Op::BvLShr,
        BinaryOp::AShr => Op::BvAShr,
        BinaryOp::And => Op::BvAnd,
        BinaryOp::Or => Op::BvOr,
        BinaryOp::Xor => Op::BvXor,
        BinaryOp::FAdd | BinaryOp::FSub | BinaryOp::FMul | BinaryOp::FDiv | BinaryOp::FRem => {
            return Err(Error::UnsupportedInstruction {
                opcode: op.as_text_code().into(),
            })
        }
    };

    let term = match (lhs.sort(), op) {
        (Sort::Bool, BinaryOp::And) => b.and2(lhs, rhs),
        (Sort::Bool, BinaryOp::Or) => b.or2(lhs, rhs),
        (Sort::Bool, BinaryOp::Xor) => b.xor(lhs, rhs),
        (Sort::Bool, _) => b.bv_to_bool(b.bv_binary(bv_op, as_bv(b, lhs), as_bv(b, rhs))),
        (Sort::Bv(_), _) => b.bv_binary(bv_op, lhs, rhs),
        (sort @ Sort::Array { .. }, _) => {
            return Err(Error::SortMismatch {
                expected: Sort::Bv(1),
                found:    sort,
            })
        }
    };

    Ok(term)
}

impl Translate for Binary {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        let lhs = operand(sem, instruction, &self.lhs, ctx)?;
        let rhs = operand(sem, instruction, &self.rhs, ctx)?;
        let value = binary_term(sem.builder(), self.op, lhs, rhs).locate(instruction.id.0)?;

        bind(sem, instruction, value, ctx)
    }
}

/// Undefined values are materialised as zero, so freezing one is the
/// identity.
impl Translate for Freeze {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        let value = operand(sem, instruction, &self.value, ctx)?;
        bind(sem, instruction, value, ctx)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use crate::{
        expr::{ExprBuilder, Sort},
        ir::BinaryOp,
        opcode::arithmetic::binary_term,
        vm::value::known::KnownInt,
    };

    #[test]
    fn boolean_bitwise_operations_are_connectives() -> anyhow::Result<()> {
        let b = ExprBuilder::new(true);
        let p = b.var("p", Sort::Bool);
        let q = b.var("q", Sort::Bool);

        assert_eq!(binary_term(&b, BinaryOp::And, p.clone(), q.clone())?, b.and2(p.clone(), q.clone()));
        assert_eq!(binary_term(&b, BinaryOp::Xor, p.clone(), q.clone())?, b.xor(p.clone(), q.clone()));
        assert_eq!(binary_term(&b, BinaryOp::Add, p.clone(), q)?.sort(), Sort::Bool);
        assert!(binary_term(&b, BinaryOp::Add, b.bool(true), b.bool(true))?.is_false());

        Ok(())
    }

    #[test]
    fn rejects_floating_point_and_mixed_operands() {
        let b = ExprBuilder::new(true);
        let x = b.var("x", Sort::Bv(32));

        assert!(binary_term(&b, BinaryOp::FAdd, x.clone(), x.clone()).is_err());
        assert!(binary_term(&b, BinaryOp::Add, x, b.bv_u64(16, 1)).is_err());
    }

    proptest! {
        #[test]
        fn folds_like_two_complement_arithmetic(lhs: u32, rhs: u32) {
            let b = ExprBuilder::new(true);
            let term = |op| binary_term(&b, op, b.bv_u64(32, lhs.into()), b.bv_u64(32, rhs.into()))
                .map_err(|e| TestCaseError::fail(e.to_string()));

            prop_assert_eq!(term(BinaryOp::Add)?.as_bv(), Some(KnownInt::new(32, lhs.wrapping_add(rhs))));
            prop_assert_eq!(term(BinaryOp::Sub)?.as_bv(), Some(KnownInt::new(32, lhs.wrapping_sub(rhs))));
            prop_assert_eq!(term(BinaryOp::Mul)?.as_bv(), Some(KnownInt::new(32, lhs.wrapping_mul(rhs))));
            prop_assert_eq!(term(BinaryOp::Xor)?.as_bv(), Some(KnownInt::new(32, lhs ^ rhs)));
            if rhs != 0 {
                prop_assert_eq!(term(BinaryOp::UDiv)?.as_bv(), Some(KnownInt::new(32, lhs / rhs)));
                prop_assert_eq!(term(BinaryOp::URem)?.as_bv(), Some(KnownInt::new(32, lhs % rhs)));
            }
        }
    }
}
