//! Translations of the operations that allocate, address and access memory.

use tracing::debug;

use crate::{
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    expr::Sort,
    ir::{
        instruction::{Alloca, Gep, Load, Store},
        GepTypeIter,
        Instruction,
    },
    opcode::{bind, operand, Translate},
    vm::{
        state::{memory::Region, Context},
        value::{from_bytes, to_bytes},
        OpSem,
        TrackLevel,
    },
};

/// Allocations get a fresh, concrete address in the stack region. When the
/// number of elements is not a constant, a fixed number of bytes is reserved
/// instead.
impl Translate for Alloca {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        let location = instruction.id.0;
        let element = sem.alloc_size(&self.allocated).locate(location)?;
        let align = sem.layout().abi_align(&self.allocated).locate(location)?;
        let reserved = sem.config().max_symbolic_alloc_bytes;
        let size = match self.count.as_known_int() {
            Some(count) => count.to_u64().map_or(reserved, |c| c.saturating_mul(element)),
            None => {
                debug!(%instruction, reserved, "allocation of symbolic size");
                reserved
            }
        };

        let address = ctx
            .memory_mut()
            .allocate(Region::Stack, size, align)
            .ok_or(Error::AllocationTooLarge {
                size,
                region: Region::Stack,
            })
            .locate(location)?;
        let value = sem.builder().bv_u64(sem.pointer_size_in_bits(), address);
        bind(sem, instruction, value, ctx)
    }
}

/// Loads read the bytes of the result from memory. Below the memory track
/// level the contents of memory are unknown, so the result is unconstrained.
impl Translate for Load {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        if sem.config().track_level < TrackLevel::Mem {
            sem.havoc_result(instruction, ctx);
            return Ok(());
        }
        let b = sem.builder();
        let location = instruction.id.0;
        let address = operand(sem, instruction, &self.pointer, ctx)?;
        let count = sem.storage_size(&instruction.ty).locate(location)?;

        let bytes = ctx.memory().load(b, &address, count);
        let value = from_bytes(b, bytes, &instruction.ty, sem.layout()).locate(location)?;
        bind(sem, instruction, value, ctx)
    }
}

/// Stores write the bytes of the value to memory. A value that cannot be
/// represented leaves the bytes it covers unconstrained.
impl Translate for Store {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        let b = sem.builder();
        let location = instruction.id.0;
        let ty = self.value.ty();
        let address = operand(sem, instruction, &self.pointer, ctx)?;

        let bytes = operand(sem, instruction, &self.value, ctx)
            .and_then(|value| to_bytes(b, value, &ty, sem.layout()).locate(location));
        match bytes {
            Ok(bytes) => ctx.memory_mut().store(b, &address, bytes),
            Err(error) => {
                let count = sem.storage_size(&ty).locate(location)?;
                let bytes = (0..count).map(|_| ctx.fresh(b, Sort::Bv(8))).collect();
                ctx.memory_mut().store(b, &address, bytes);
                return Err(error);
            }
        }

        Ok(())
    }
}

impl Translate for Gep {
    fn translate(&self, instruction: &Instruction, sem: &OpSem, ctx: &mut Context) -> Result<()> {
        let base = operand(sem, instruction, &self.base, ctx)?;
        let offset = sem
            .symbolic_indexed_offset(GepTypeIter::new(&self.source, &self.indices), ctx)
            .locate(instruction.id.0)?;

        bind(sem, instruction, sem.builder().bvadd(base, offset), ctx)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        constant::STACK_REGION_BASE,
        expr::Sort,
        ir::{Constant, Type},
        layout::DataLayout,
        library::TargetLibraryInfo,
        opcode::test_util::{run_function, single_block},
        vm::{state::memory::Region, Config, OpSem, TrackLevel},
    };

    #[test]
    fn loads_see_earlier_stores() -> anyhow::Result<()> {
        let module = single_block("roundtrip", &[("x", Type::Int(32))], Type::Int(32), |f| {
            let x = f.param(0);
            let slot = f.alloca(Type::Int(32), "slot");
            f.store(x, slot.clone());
            let read = f.load(Type::Int(32), slot, "read");
            f.ret(Some(read));
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());

        let ctx = run_function(&sem, "roundtrip")?;
        let x = sem.builder().var("%x!0", Sort::Bv(32));
        assert_eq!(ctx.return_value(), Some(&x));
        assert!(ctx.is_sound());

        Ok(())
    }

    #[test]
    fn loads_are_unconstrained_without_memory() -> anyhow::Result<()> {
        let module = single_block("forget", &[], Type::Int(8), |f| {
            let slot = f.alloca(Type::Int(8), "slot");
            f.store(Constant::int(8, 7u8).into(), slot.clone());
            let read = f.load(Type::Int(8), slot, "read");
            f.ret(Some(read));
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let config = Config::default().with_track_level(TrackLevel::Ptr);
        let sem = OpSem::new(&module, &layout, &library, config);

        let ctx = run_function(&sem, "forget")?;
        let value = ctx.return_value().cloned().expect("a value is returned");
        assert_eq!(value.var_name(), Some("nd!0"));
        assert_eq!(ctx.trace().skipped().count(), 1);

        Ok(())
    }

    #[test]
    fn allocations_do_not_overlap() -> anyhow::Result<()> {
        let module = single_block("two", &[], Type::Void, |f| {
            f.alloca(Type::array(Type::Int(8), 20), "a");
            f.alloca(Type::Int(64), "b");
            f.ret(None);
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());

        let ctx = run_function(&sem, "two")?;
        let allocations = ctx.memory().allocations();
        let stack: Vec<_> = allocations.iter().rev().take(2).collect();
        assert!(stack[0].base >= stack[1].base + stack[1].size);

        Ok(())
    }

    #[test]
    fn oversized_allocations_are_unhandled() -> anyhow::Result<()> {
        let module = single_block("huge", &[], Type::Pointer, |f| {
            f.alloca_array(Type::Int(8), Constant::signed(64, -1).into(), "huge");
            let after = f.alloca(Type::Int(64), "after");
            f.ret(Some(after));
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());

        let ctx = run_function(&sem, "huge")?;
        let after = ctx.return_value().and_then(|v| v.as_bv()).map(|k| k.as_u64());
        assert_eq!(after, Some(STACK_REGION_BASE));
        let stack = ctx.memory().allocations().iter().filter(|a| a.region == Region::Stack);
        assert_eq!(stack.count(), 1);
        assert_eq!(ctx.trace().unhandled().count(), 1);
        assert!(!ctx.is_sound());

        Ok(())
    }

    #[test]
    fn addresses_advance_by_the_indexed_offset() -> anyhow::Result<()> {
        let record = Type::structure([Type::Int(32), Type::Int(64), Type::Int(32)]);
        let module = single_block("field", &[("p", Type::Pointer)], Type::Pointer, |f| {
            let p = f.param(0);
            let field = f.gep(
                record.clone(),
                p,
                vec![Constant::int(64, 0u8).into(), Constant::int(32, 2u8).into()],
                "field",
            );
            f.ret(Some(field));
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());
        let b = sem.builder();

        let ctx = run_function(&sem, "field")?;
        let p = b.var("%p!0", Sort::Bv(64));
        assert_eq!(ctx.return_value(), Some(&b.bvadd(p, b.bv_u64(64, 16))));

        Ok(())
    }
}
