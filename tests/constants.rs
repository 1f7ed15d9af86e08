//! This module is an integration test that checks how constants are laid out
//! in memory and how address computations agree with the data layout.
#![cfg(test)]

use bv_opsem::{
    ir::{Constant, GepTypeIter, Module, Type, Value},
    layout::DataLayout,
    vm::{value::generic::GenericValue, Config},
};
use proptest::prelude::*;

mod common;

use common::Program;

#[test]
fn constants_are_laid_out_in_target_byte_order() -> anyhow::Result<()> {
    let mut program = Program::new(Module::new("bytes"));
    let constant = Constant::int(32, 0x0102_0304u32);

    let sem = program.sem(Config::default());
    let mut buffer = [0u8; 4];
    sem.init_memory(&constant, &mut buffer)?;
    assert_eq!(buffer, [0x04, 0x03, 0x02, 0x01]);

    program.layout = DataLayout::parse("E-p:32:32")?;
    let sem = program.sem(Config::default());
    let mut buffer = [0u8; 4];
    sem.init_memory(&constant, &mut buffer)?;
    assert_eq!(buffer, [0x01, 0x02, 0x03, 0x04]);

    let address = GenericValue::Pointer(0xdead_beef);
    sem.store_value_to_memory(&address, &mut buffer, &Type::Pointer)?;
    assert_eq!(buffer, [0xde, 0xad, 0xbe, 0xef]);

    Ok(())
}

#[test]
fn constant_field_offsets_match_the_layout() -> anyhow::Result<()> {
    let program = Program::new(Module::new("offsets"));
    let sem = program.sem(Config::default());
    let ctx = sem.mk_context();
    let record = Type::structure([Type::Int(32), Type::Int(64), Type::Int(32)]);
    let indices: Vec<Value> = vec![Constant::int(64, 0u8).into(), Constant::int(32, 2u8).into()];

    let offset = sem.symbolic_indexed_offset(GepTypeIter::new(&record, &indices), &ctx)?;
    let expected = sem.field_off(&record, 2)?;
    assert_eq!(expected, 16);
    assert_eq!(offset.as_bv().map(|k| k.as_u64()), Some(expected));

    Ok(())
}

#[test]
fn globals_start_with_their_initialisers() -> anyhow::Result<()> {
    let mut module = Module::new("globals");
    let global = module.add_global("answer", Type::Int(16), Some(Constant::int(16, 42u8)), true);
    let program = Program::new(module);
    let sem = program.sem(Config::default());
    let b = sem.builder();

    let ctx = sem.mk_context();
    let address = sem.get_operand_value(&global.into(), &ctx)?;
    let bytes = ctx.memory().load(b, &address, 2);
    assert_eq!(bytes[0].as_bv().map(|k| k.as_u64()), Some(42));
    assert_eq!(bytes[1].as_bv().map(|k| k.as_u64()), Some(0));

    Ok(())
}

proptest! {
    #[test]
    fn integer_constants_round_trip_through_memory(value: u64, width in 1u32..=64) {
        let program = Program::new(Module::new("round_trip"));
        let sem = program.sem(Config::default());
        let constant = Constant::int(width, value);
        let size = usize::try_from(width.div_ceil(8)).unwrap_or_default();
        let expected = value & (u64::MAX >> (64 - width));

        let mut buffer = vec![0u8; size];
        sem.init_memory(&constant, &mut buffer).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let mut wide = [0u8; 8];
        wide[..size].copy_from_slice(&buffer);
        prop_assert_eq!(u64::from_le_bytes(wide), expected);

        let loaded = sem
            .load_value_from_memory(&buffer, &Type::Int(width))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(loaded.as_int().map(|k| k.as_u64()), Some(expected));
    }
}
