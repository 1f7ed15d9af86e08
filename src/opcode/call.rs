//! Translations of calls.
//!
//! Only calls with known semantics are modelled: verifier intrinsics, a few
//! LLVM intrinsics and the library functions the target provides. The
//! semantics is intra-procedural, so any other call, including one to a
//! function defined in the module, is unmodelled. Its result is left
//! unconstrained and, when configured, so is memory.

use tracing::debug;

use crate::{
    constant::{
        ASSERT_FUNCTIONS,
        ASSUME_FUNCTIONS,
        ASSUME_NOT_FUNCTIONS,
        ERROR_FUNCTIONS,
        NONDET_CALL_PREFIXES,
    },
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    expr::{Expr, Op, Sort},
    ir::{instruction::Call, Callee, Instruction},
    layout::QueryResult,
    library::LibFunc,
    opcode::{bind, operand, to_sort, Translate},
    vm::{
        state::{memory::Region, Context},
        OpSem,
        TrackLevel,
    },
};

/// The ways in which a call can move bytes around in memory.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Transfer {
    /// Copies bytes from a source range.
    Copy,

    /// Writes the same byte repeatedly.
    Fill,
}

impl Translate for Call {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        let name = match &self.callee {
            Callee::Direct(name) => name.as_ref(),
            Callee::Indirect(target) => {
                return unmodelled(instruction, target.to_string(), "indirect call", sem, ctx)
            }
        };
        let b = sem.builder();

        if ASSUME_FUNCTIONS.contains(&name) {
            let condition = self.condition(0, name, instruction, sem, ctx)?;
            ctx.add_side(condition);
        } else if ASSUME_NOT_FUNCTIONS.contains(&name) {
            let condition = self.condition(0, name, instruction, sem, ctx)?;
            ctx.add_side(b.not(condition));
        } else if ASSERT_FUNCTIONS.contains(&name) {
            let condition = self.condition(0, name, instruction, sem, ctx)?;
            raise_error_flag(b.not(condition), instruction, sem, ctx)?;
        } else if ERROR_FUNCTIONS.contains(&name) {
            raise_error_flag(b.bool(true), instruction, sem, ctx)?;
        } else if NONDET_CALL_PREFIXES.iter().any(|p| name.starts_with(p)) {
            sem.havoc_result(instruction, ctx);
        } else if name.starts_with("llvm.memcpy") || name.starts_with("llvm.memmove") {
            self.transfer(Transfer::Copy, name, instruction, sem, ctx)?;
        } else if name.starts_with("llvm.memset") {
            self.transfer(Transfer::Fill, name, instruction, sem, ctx)?;
        } else if let Some(op) = min_max_op(name) {
            let lhs = self.argument(0, name, instruction, sem, ctx)?;
            let rhs = self.argument(1, name, instruction, sem, ctx)?;
            let value = min_max(sem, op, lhs, rhs).locate(instruction.id.0)?;
            bind(sem, instruction, value, ctx)?;
        } else if name.starts_with("llvm.abs.") {
            let value = self.argument(0, name, instruction, sem, ctx)?;
            let Some(width) = value.bv_width() else {
                return Err(Error::SortMismatch {
                    expected: Sort::Bv(1),
                    found:    value.sort(),
                })
                .locate(instruction.id.0);
            };
            let negative = b.bv_compare(Op::BvSlt, value.clone(), b.bv_u64(width, 0));
            let value = b.ite(negative, b.bvneg(value.clone()), value);
            bind(sem, instruction, value, ctx)?;
        } else if let Some(func) = sem.library().get_lib_func(name) {
            self.library_call(func, name, instruction, sem, ctx)?;
        } else {
            let reason = if sem.module().function(name).is_some() {
                "call to internal function"
            } else {
                "call to unknown function"
            };
            return unmodelled(instruction, name.into(), reason, sem, ctx);
        }

        Ok(())
    }
}

impl Call {
    /// Reads the argument at `index` of the call to `name`.
    fn argument(
        &self,
        index: usize,
        name: &str,
        instruction: &Instruction,
        sem: &OpSem,
        ctx: &Context,
    ) -> Result<Expr> {
        let argument = self
            .args
            .get(index)
            .ok_or_else(|| Error::MissingArgument {
                callee: name.into(),
                index,
            })
            .locate(instruction.id.0)?;

        operand(sem, instruction, argument, ctx)
    }

    /// Reads the argument at `index` of the call to `name` as a boolean.
    fn condition(
        &self,
        index: usize,
        name: &str,
        instruction: &Instruction,
        sem: &OpSem,
        ctx: &Context,
    ) -> Result<Expr> {
        let value = self.argument(index, name, instruction, sem, ctx)?;
        if matches!(value.sort(), Sort::Array { .. }) {
            return Err(Error::SortMismatch {
                expected: Sort::Bool,
                found:    value.sort(),
            })
            .locate(instruction.id.0);
        }

        Ok(to_sort(sem.builder(), value, Sort::Bool))
    }

    /// Reads the argument at `index` of the call to `name` as a concrete
    /// number, if it is one.
    fn known_argument(
        &self,
        index: usize,
        name: &str,
        instruction: &Instruction,
        sem: &OpSem,
        ctx: &Context,
    ) -> Result<Option<u64>> {
        let value = self.argument(index, name, instruction, sem, ctx)?;
        Ok(value.as_bv().and_then(|k| k.to_u64()))
    }

    /// Translates a call to the library function `func`.
    fn library_call(
        &self,
        func: LibFunc,
        name: &str,
        instruction: &Instruction,
        sem: &OpSem,
        ctx: &mut Context,
    ) -> Result<()> {
        match func {
            LibFunc::Malloc | LibFunc::OperatorNew | LibFunc::Calloc => {
                self.allocate(func, name, instruction, sem, ctx)
            }
            LibFunc::Memcpy | LibFunc::Memmove => {
                self.transfer(Transfer::Copy, name, instruction, sem, ctx)
            }
            LibFunc::Memset => self.transfer(Transfer::Fill, name, instruction, sem, ctx),
            LibFunc::Abort | LibFunc::Exit => {
                ctx.add_side(sem.builder().bool(false));
                Ok(())
            }
            LibFunc::Free | LibFunc::OperatorDelete => Ok(()),
        }
    }

    /// Allocates the heap object requested by a call to the allocation
    /// function `func`, binding its address to the result.
    ///
    /// Memory returned by `calloc` is zeroed when its size is a small enough
    /// constant.
    fn allocate(
        &self,
        func: LibFunc,
        name: &str,
        instruction: &Instruction,
        sem: &OpSem,
        ctx: &mut Context,
    ) -> Result<()> {
        let b = sem.builder();
        let config = sem.config();
        let size = if func == LibFunc::Calloc {
            let count = self.known_argument(0, name, instruction, sem, ctx)?;
            let each = self.known_argument(1, name, instruction, sem, ctx)?;
            count.zip(each).and_then(|(c, e)| c.checked_mul(e))
        } else {
            self.known_argument(0, name, instruction, sem, ctx)?
        };
        let reserved = size.unwrap_or_else(|| {
            debug!(%instruction, reserved = config.max_symbolic_alloc_bytes, "allocation of symbolic size");
            config.max_symbolic_alloc_bytes
        });

        let address = ctx
            .memory_mut()
            .allocate(Region::Heap, reserved, 1)
            .ok_or(Error::AllocationTooLarge {
                size:   reserved,
                region: Region::Heap,
            })
            .locate(instruction.id.0)?;
        let address = b.bv_u64(sem.pointer_size_in_bits(), address);
        let zeroed = func == LibFunc::Calloc
            && config.track_level == TrackLevel::Mem
            && size.is_some_and(|s| s <= config.max_concrete_copy_bytes);
        if zeroed {
            ctx.memory_mut().fill(b, &address, &b.bv_u64(8, 0), reserved);
        }

        bind(sem, instruction, address, ctx)
    }

    /// Translates a call to `name` that copies or fills memory.
    ///
    /// The destination is written byte by byte when the length is a constant
    /// no larger than the configured limit. Any other length forgets the
    /// contents of memory. Calls that return a value return the destination.
    fn transfer(
        &self,
        kind: Transfer,
        name: &str,
        instruction: &Instruction,
        sem: &OpSem,
        ctx: &mut Context,
    ) -> Result<()> {
        let b = sem.builder();
        let config = sem.config();
        if config.track_level < TrackLevel::Mem {
            if !instruction.ty.is_void() {
                let destination = self.argument(0, name, instruction, sem, ctx)?;
                bind(sem, instruction, destination, ctx)?;
            }
            return Ok(());
        }

        let destination = self.argument(0, name, instruction, sem, ctx)?;
        let source = self.argument(1, name, instruction, sem, ctx)?;
        let length = self.known_argument(2, name, instruction, sem, ctx)?;
        match length.filter(|l| *l <= config.max_concrete_copy_bytes) {
            Some(length) => match kind {
                Transfer::Copy => ctx.memory_mut().copy(b, &destination, &source, length),
                Transfer::Fill => {
                    let byte = to_sort(b, source, Sort::Bv(8));
                    ctx.memory_mut().fill(b, &destination, &byte, length);
                }
            },
            None => {
                sem.havoc_memory(ctx);
                return Err(Error::OversizedTransfer {
                    callee: name.into(),
                    limit:  config.max_concrete_copy_bytes,
                })
                .locate(instruction.id.0);
            }
        }

        if instruction.ty.is_void() {
            Ok(())
        } else {
            bind(sem, instruction, destination, ctx)
        }
    }
}

/// Gets the comparison that selects the first operand of the min or max
/// intrinsic `name`, along with whether its operands are swapped.
fn min_max_op(name: &str) -> Option<(Op, bool)> {
    let op = if name.starts_with("llvm.smin.") {
        (Op::BvSlt, false)
    } else if name.starts_with("llvm.smax.") {
        (Op::BvSlt, true)
    } else if name.starts_with("llvm.umin.") {
        (Op::BvUlt, false)
    } else if name.starts_with("llvm.umax.") {
        (Op::BvUlt, true)
    } else {
        return None;
    };

    Some(op)
}

/// Builds the minimum or maximum of `lhs` and `rhs` as selected by `op`.
fn min_max(
    sem: &OpSem,
    (op, swap): (Op, bool),
    lhs: Expr,
    rhs: Expr,
) -> QueryResult<Expr> {
    let b = sem.builder();
    if lhs.sort() != rhs.sort() || lhs.bv_width().is_none() {
        return Err(Error::SortMismatch {
            expected: lhs.sort(),
            found:    rhs.sort(),
        });
    }
    let pick_lhs = if swap {
        b.bv_compare(op, rhs.clone(), lhs.clone())
    } else {
        b.bv_compare(op, lhs.clone(), rhs.clone())
    };

    Ok(b.ite(pick_lhs, lhs, rhs))
}

/// Sets the error flag of the block being executed when `failed` holds.
fn raise_error_flag(
    failed: Expr,
    instruction: &Instruction,
    sem: &OpSem,
    ctx: &mut Context,
) -> Result<()> {
    let cursor = ctx
        .cursor()
        .cloned()
        .ok_or(Error::NoSuchBlock { block: 0 })
        .locate(instruction.id.0)?;
    let block = sem.block_at(&cursor)?;
    let flag = sem.error_flag(block);
    let raised = sem.builder().or2(sem.error_flag_value(block, ctx), failed);
    ctx.write(flag, raised);

    Ok(())
}

/// Gives up on modelling the call in `instruction` to `callee`, forgetting
/// the contents of memory if configured to.
fn unmodelled(
    instruction: &Instruction,
    callee: String,
    reason: &'static str,
    sem: &OpSem,
    ctx: &mut Context,
) -> Result<()> {
    let config = sem.config();
    if config.havoc_memory_on_unknown_call && config.track_level == TrackLevel::Mem {
        debug!(%instruction, "forgetting memory");
        sem.havoc_memory(ctx);
    }

    Err(Error::UnmodelledCall { callee, reason }).locate(instruction.id.0)
}

#[cfg(test)]
mod test {
    use crate::{
        expr::{Op, Sort},
        ir::{Constant, IntPredicate, Type},
        layout::DataLayout,
        library::TargetLibraryInfo,
        opcode::test_util::{run_function, single_block},
        vm::{trace::Classification, Config, OpSem},
    };

    #[test]
    fn assumptions_become_side_conditions() -> anyhow::Result<()> {
        let module = single_block("assume", &[("x", Type::Int(32))], Type::Void, |f| {
            let x = f.param(0);
            let small = f.icmp(IntPredicate::Ult, x, Constant::int(32, 10u8).into(), "small");
            f.call("verifier.assume", vec![small.clone()], Type::Void, "");
            f.call("verifier.assume.not", vec![small], Type::Void, "");
            f.ret(None);
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());
        let b = sem.builder();

        let ctx = run_function(&sem, "assume")?;
        let x = b.var("%x!0", Sort::Bv(32));
        let small = b.bv_compare(Op::BvUlt, x, b.bv_u64(32, 10));
        assert_eq!(ctx.side(), &[small.clone(), b.not(small)]);
        assert!(ctx.is_sound());

        Ok(())
    }

    #[test]
    fn failed_assertions_raise_the_error_flag() -> anyhow::Result<()> {
        let module = single_block("check", &[("ok", Type::bool())], Type::Void, |f| {
            let ok = f.param(0);
            f.call("verifier.assert", vec![ok], Type::Void, "");
            f.ret(None);
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());
        let b = sem.builder();
        let entry = module.function("check").and_then(|f| f.entry()).expect("entry exists");

        let ctx = run_function(&sem, "check")?;
        let ok = b.var("%ok!0", Sort::Bool);
        assert_eq!(sem.error_flag_value(entry, &ctx), b.not(ok));

        Ok(())
    }

    #[test]
    fn errors_set_the_error_flag() -> anyhow::Result<()> {
        let module = single_block("fail", &[], Type::Void, |f| {
            f.call("verifier.error", vec![], Type::Void, "");
            f.ret(None);
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());
        let entry = module.function("fail").and_then(|f| f.entry()).expect("entry exists");

        let ctx = run_function(&sem, "fail")?;
        assert!(sem.error_flag_value(entry, &ctx).is_true());

        Ok(())
    }

    #[test]
    fn copies_move_bytes_between_allocations() -> anyhow::Result<()> {
        let module = single_block("copy", &[("x", Type::Int(32))], Type::Int(32), |f| {
            let x = f.param(0);
            let from = f.alloca(Type::Int(32), "from");
            let to = f.alloca(Type::Int(32), "to");
            f.store(x, from.clone());
            let length = Constant::int(64, 4u8).into();
            f.call("llvm.memcpy.p0.p0.i64", vec![to.clone(), from, length], Type::Void, "");
            let read = f.load(Type::Int(32), to, "read");
            f.ret(Some(read));
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());

        let ctx = run_function(&sem, "copy")?;
        let x = sem.builder().var("%x!0", Sort::Bv(32));
        assert_eq!(ctx.return_value(), Some(&x));
        assert!(ctx.is_sound());

        Ok(())
    }

    #[test]
    fn calloc_memory_reads_as_zero() -> anyhow::Result<()> {
        let module = single_block("zeroed", &[], Type::Int(64), |f| {
            let count = Constant::int(64, 2u8).into();
            let size = Constant::int(64, 8u8).into();
            let block = f
                .call("calloc", vec![count, size], Type::Pointer, "block")
                .expect("calloc returns a pointer");
            let read = f.load(Type::Int(64), block, "read");
            f.ret(Some(read));
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());

        let ctx = run_function(&sem, "zeroed")?;
        let value = ctx.return_value().and_then(|v| v.as_bv());
        assert!(value.is_some_and(|k| k.is_zero()));
        assert_eq!(ctx.memory().allocations().last().map(|a| a.size), Some(16));

        Ok(())
    }

    #[test]
    fn unknown_calls_are_unhandled_and_forget_memory() -> anyhow::Result<()> {
        let module = single_block("opaque", &[], Type::Int(32), |f| {
            let result = f
                .call("mystery", vec![], Type::Int(32), "result")
                .expect("mystery returns a value");
            f.ret(Some(result));
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());

        let before = sem.mk_context();
        let ctx = run_function(&sem, "opaque")?;
        let unhandled: Vec<_> = ctx.trace().unhandled().collect();
        assert_eq!(unhandled.len(), 1);
        assert_eq!(unhandled[0].kind, Classification::Unhandled);
        assert!(unhandled[0].reason.contains("unknown function"));
        assert_ne!(ctx.memory().array(), before.memory().array());
        assert!(ctx.return_value().and_then(|v| v.var_name()).is_some());
        assert!(!ctx.is_sound());

        Ok(())
    }

    #[test]
    fn symbolic_copies_are_unhandled() -> anyhow::Result<()> {
        let module = single_block("long", &[("n", Type::Int(64))], Type::Void, |f| {
            let n = f.param(0);
            let from = f.alloca(Type::Int(8), "from");
            let to = f.alloca(Type::Int(8), "to");
            f.call("memmove", vec![to, from, n], Type::Pointer, "moved");
            f.ret(None);
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());

        let ctx = run_function(&sem, "long")?;
        assert_eq!(ctx.trace().unhandled().count(), 1);

        Ok(())
    }

    #[test]
    fn min_and_max_select_an_operand() -> anyhow::Result<()> {
        let module = single_block("clamp", &[], Type::Int(8), |f| {
            let minus_one = Constant::int(8, 0xffu8).into();
            let one = Constant::int(8, 1u8).into();
            let low = f
                .call("llvm.smin.i8", vec![minus_one, one], Type::Int(8), "low")
                .expect("smin returns a value");
            let high = f
                .call("llvm.umax.i8", vec![low, Constant::int(8, 2u8).into()], Type::Int(8), "high")
                .expect("umax returns a value");
            f.ret(Some(high));
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());

        let ctx = run_function(&sem, "clamp")?;
        let value = ctx.return_value().and_then(|v| v.as_bv()).map(|k| k.as_u64());
        assert_eq!(value, Some(0xff));

        Ok(())
    }
}
