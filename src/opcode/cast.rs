//! Translations of the conversion operations.

use crate::{
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    expr::{Expr, Sort},
    ir::{instruction::Cast, CastOp, Instruction, Type},
    layout::QueryResult,
    opcode::{bind, operand, to_sort, Translate},
    vm::{state::Context, value::as_bv, OpSem},
};

/// Builds the term for converting `value`, of type `from`, to type `to` with
/// `op`.
///
/// Integer and pointer conversions truncate, zero-extend or sign-extend the
/// underlying bits, and bit casts between types of the same sort are the
/// identity.
///
/// # Errors
///
/// Returns [`Err`] if either type is floating-point or has no symbolic
/// representation, or a bit cast changes the number of bits.
pub fn cast_term(
    sem: &OpSem,
    op: CastOp,
    value: Expr,
    from: &Type,
    to: &Type,
) -> QueryResult<Expr> {
    let b = sem.builder();
    if op.involves_floating_point() {
        let ty = if from.is_floating_point() { from } else { to };
        return Err(Error::UnsupportedType { ty: ty.clone() });
    }
    let target = sem.register_sort(to)?;
    let width = match target {
        Sort::Bool => 1,
        Sort::Bv(width) => width,
        Sort::Array { .. } => return Err(Error::UnsupportedType { ty: to.clone() }),
    };

    let term = match op {
        CastOp::Trunc | CastOp::ZExt | CastOp::PtrToInt | CastOp::IntToPtr => {
            to_sort(b, b.resize_unsigned(as_bv(b, value), width), target)
        }
        CastOp::SExt => to_sort(b, b.resize_signed(as_bv(b, value), width), target),
        CastOp::BitCast | CastOp::AddrSpaceCast => {
            let found = value.sort();
            let same_bits = match (found, target) {
                (Sort::Bool, Sort::Bv(1)) | (Sort::Bv(1), Sort::Bool) => true,
                (found, target) => found == target,
            };
            if !same_bits {
                return Err(Error::SortMismatch {
                    expected: target,
                    found,
                });
            }
            to_sort(b, value, target)
        }
        _ => return Err(Error::UnsupportedType { ty: to.clone() }),
    };

    Ok(term)
}

impl Translate for Cast {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        let value = operand(sem, instruction, &self.value, ctx)?;
        let value = cast_term(sem, self.op, value, &self.value.ty(), &instruction.ty)
            .locate(instruction.id.0)?;

        bind(sem, instruction, value, ctx)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        expr::Sort,
        ir::{CastOp, Module, Type},
        layout::DataLayout,
        library::TargetLibraryInfo,
        opcode::cast::cast_term,
        vm::{Config, OpSem},
    };

    #[test]
    fn converts_between_widths() -> anyhow::Result<()> {
        let module = Module::new("empty");
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());
        let b = sem.builder();
        let x = b.var("x", Sort::Bv(8));

        let wide = cast_term(&sem, CastOp::SExt, x.clone(), &Type::Int(8), &Type::Int(32))?;
        assert_eq!(wide, b.sext(x.clone(), 32));

        let bit = cast_term(&sem, CastOp::Trunc, x.clone(), &Type::Int(8), &Type::bool())?;
        assert_eq!(bit, b.bv_to_bool(b.extract(0, 0, x.clone())));

        let address = cast_term(&sem, CastOp::IntToPtr, x.clone(), &Type::Int(8), &Type::Pointer)?;
        assert_eq!(address, b.zext(x, 64));

        let widened = cast_term(&sem, CastOp::ZExt, b.bool(true), &Type::bool(), &Type::Int(16))?;
        assert_eq!(widened.as_bv().map(|k| k.as_u64()), Some(1));

        Ok(())
    }

    #[test]
    fn floating_point_conversions_are_unsupported() {
        let module = Module::new("empty");
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());
        let x = sem.builder().var("x", Sort::Bv(32));

        assert!(cast_term(&sem, CastOp::SIToFP, x.clone(), &Type::Int(32), &Type::Float).is_err());
        assert!(cast_term(&sem, CastOp::BitCast, x, &Type::Int(32), &Type::Int(64)).is_err());
    }
}
